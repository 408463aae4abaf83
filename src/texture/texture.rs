use crate::error::{Result, StageError};
use crate::math::Rectangle;

use super::BaseTexture;

/// Normalized texture coordinates of a frame's four corners.
///
/// Corners are ordered top-left, top-right, bottom-right, bottom-left.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextureUvs {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub x3: f32,
    pub y3: f32,
}

impl TextureUvs {
    fn from_frame(frame: &Rectangle, base_width: u32, base_height: u32) -> Self {
        if base_width == 0 || base_height == 0 {
            return Self::default();
        }
        let tw = base_width as f32;
        let th = base_height as f32;
        let left = frame.x / tw;
        let right = (frame.x + frame.width) / tw;
        let top = frame.y / th;
        let bottom = (frame.y + frame.height) / th;
        Self {
            x0: left,
            y0: top,
            x1: right,
            y1: top,
            x2: right,
            y2: bottom,
            x3: left,
            y3: bottom,
        }
    }

    pub fn corners(&self) -> [[f32; 2]; 4] {
        [
            [self.x0, self.y0],
            [self.x1, self.y1],
            [self.x2, self.y2],
            [self.x3, self.y3],
        ]
    }
}

/// A rectangular region of a [`BaseTexture`].
///
/// `orig` is the untrimmed size used for layout; `trim`, when present, is the
/// position of the frame's pixels inside `orig`.
///
/// A texture made with [`Texture::from_base`] follows the base texture's size
/// when the base is updated. UVs are derived from the current base size.
#[derive(Debug, Clone)]
pub struct Texture {
    base: BaseTexture,
    frame: Rectangle,
    orig: Rectangle,
    trim: Option<Rectangle>,
    full_frame: bool,
}

impl Texture {
    pub fn new(base: BaseTexture, frame: Rectangle) -> Result<Self> {
        let orig = Rectangle::new(0.0, 0.0, frame.width, frame.height);
        Self::with_trim(base, frame, orig, None)
    }

    pub fn with_trim(
        base: BaseTexture,
        frame: Rectangle,
        orig: Rectangle,
        trim: Option<Rectangle>,
    ) -> Result<Self> {
        validate_frame(&base, &frame)?;
        Ok(Self {
            base,
            frame,
            orig,
            trim,
            full_frame: false,
        })
    }

    /// A texture covering the whole base texture.
    pub fn from_base(base: BaseTexture) -> Self {
        let frame = base_rect(&base);
        Self {
            base,
            frame,
            orig: frame,
            trim: None,
            full_frame: true,
        }
    }

    /// Shared 1x1 white texture. Untextured geometry samples from it.
    pub fn white() -> Self {
        thread_local! {
            static WHITE: Texture = Texture::from_base(BaseTexture::white());
        }
        WHITE.with(Clone::clone)
    }

    pub fn empty() -> Self {
        thread_local! {
            static EMPTY: Texture = Texture::from_base(BaseTexture::empty());
        }
        EMPTY.with(Clone::clone)
    }

    pub fn base(&self) -> &BaseTexture {
        &self.base
    }

    pub fn frame(&self) -> Rectangle {
        if self.full_frame {
            base_rect(&self.base)
        } else {
            self.frame
        }
    }

    /// Move the frame. The frame must lie inside the base texture.
    pub fn set_frame(&mut self, frame: Rectangle) -> Result<()> {
        validate_frame(&self.base, &frame)?;
        self.frame = frame;
        self.full_frame = false;
        if self.trim.is_none() {
            self.orig = Rectangle::new(0.0, 0.0, frame.width, frame.height);
        }
        Ok(())
    }

    pub fn orig(&self) -> Rectangle {
        if self.full_frame {
            base_rect(&self.base)
        } else {
            self.orig
        }
    }

    pub fn trim(&self) -> Option<Rectangle> {
        self.trim
    }

    pub fn uvs(&self) -> TextureUvs {
        TextureUvs::from_frame(&self.frame(), self.base.width(), self.base.height())
    }

    pub fn width(&self) -> f32 {
        self.orig().width
    }

    pub fn height(&self) -> f32 {
        self.orig().height
    }

    /// Map a UV relative to this frame into base-texture UV space.
    pub fn map_uv(&self, u: f32, v: f32) -> [f32; 2] {
        let uvs = self.uvs();
        [uvs.x0 + (uvs.x1 - uvs.x0) * u, uvs.y0 + (uvs.y3 - uvs.y0) * v]
    }
}

fn base_rect(base: &BaseTexture) -> Rectangle {
    Rectangle::new(0.0, 0.0, base.width() as f32, base.height() as f32)
}

fn validate_frame(base: &BaseTexture, frame: &Rectangle) -> Result<()> {
    let (bw, bh) = (base.width(), base.height());
    if frame.x < 0.0
        || frame.y < 0.0
        || frame.x + frame.width > bw as f32
        || frame.y + frame.height > bh as f32
    {
        return Err(StageError::InvalidFrame {
            x: frame.x,
            y: frame.y,
            width: frame.width,
            height: frame.height,
            base_width: bw,
            base_height: bh,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(w: u32, h: u32) -> BaseTexture {
        BaseTexture::from_rgba(w, h, vec![255; (w * h * 4) as usize]).unwrap()
    }

    #[test]
    fn test_full_frame_uvs() {
        let tex = Texture::from_base(base(4, 2));
        assert_eq!(
            tex.uvs().corners(),
            [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]
        );
        assert_eq!(tex.width(), 4.0);
    }

    #[test]
    fn test_sub_frame_uvs() {
        let tex = Texture::new(base(100, 50), Rectangle::new(50.0, 25.0, 25.0, 25.0)).unwrap();
        let uvs = tex.uvs();
        assert_eq!((uvs.x0, uvs.y0), (0.5, 0.5));
        assert_eq!((uvs.x2, uvs.y2), (0.75, 1.0));
        assert_eq!(tex.map_uv(0.5, 0.5), [0.625, 0.75]);
    }

    #[test]
    fn test_frame_outside_base_is_rejected() {
        let err = Texture::new(base(10, 10), Rectangle::new(5.0, 5.0, 10.0, 1.0)).unwrap_err();
        assert!(matches!(err, StageError::InvalidFrame { base_width: 10, .. }));

        let mut tex = Texture::from_base(base(10, 10));
        assert!(tex.set_frame(Rectangle::new(-1.0, 0.0, 2.0, 2.0)).is_err());
        assert_eq!(tex.frame(), Rectangle::new(0.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn test_full_frame_follows_base_resize() {
        let base = base(1, 1);
        let tex = Texture::from_base(base.clone());
        base.update(2, 1, vec![255; 8]).unwrap();
        assert_eq!(tex.frame(), Rectangle::new(0.0, 0.0, 2.0, 1.0));
        assert_eq!(tex.width(), 2.0);
        assert_eq!(tex.uvs().corners()[2], [1.0, 1.0]);
    }

    #[test]
    fn test_sub_frame_uvs_track_base_size() {
        let base = base(4, 4);
        let tex = Texture::new(base.clone(), Rectangle::new(0.0, 0.0, 2.0, 2.0)).unwrap();
        assert_eq!(tex.uvs().corners()[2], [0.5, 0.5]);
        base.update(8, 4, vec![255; 128]).unwrap();
        assert_eq!(tex.width(), 2.0);
        assert_eq!(tex.uvs().corners()[2], [0.25, 0.5]);
    }

    #[test]
    fn test_white_is_shared_per_thread() {
        let a = Texture::white();
        let b = Texture::white();
        assert_eq!(a.base().id(), b.base().id());
        assert_eq!(a.width(), 1.0);
    }
}

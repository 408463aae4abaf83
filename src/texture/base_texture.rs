use std::cell::{Ref, RefCell};
use std::path::Path;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use image::DynamicImage;

use crate::error::{Result, StageError};

static NEXT_BASE_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

/// Texture sampling filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScaleMode {
    #[default]
    Linear,
    Nearest,
}

/// Addressing outside the `0..1` UV range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WrapMode {
    #[default]
    Clamp,
    Repeat,
    MirroredRepeat,
}

#[derive(Debug)]
pub(crate) struct BaseTextureData {
    width: u32,
    height: u32,
    /// Premultiplied RGBA8
    pixels: Vec<u8>,
    scale_mode: ScaleMode,
    wrap_mode: WrapMode,
    version: u32,
}

/// A shared source of pixels.
///
/// Cloning is cheap and yields a handle to the same pixels. Every change bumps
/// [`BaseTexture::version`], which GPU caches compare against the version they
/// uploaded.
#[derive(Debug, Clone)]
pub struct BaseTexture {
    id: u64,
    data: Rc<RefCell<BaseTextureData>>,
}

/// Non-owning handle used by GPU caches to notice dropped textures.
#[derive(Debug, Clone)]
pub(crate) struct WeakBaseTexture(Weak<RefCell<BaseTextureData>>);

impl WeakBaseTexture {
    pub(crate) fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

fn premultiply(pixels: &mut [u8]) {
    for px in pixels.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 255 {
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

fn check_len(width: u32, height: u32, len: usize) -> Result<()> {
    let expected = width as usize * height as usize * 4;
    if expected != len {
        return Err(StageError::PixelBufferSize {
            width,
            height,
            expected,
            actual: len,
        });
    }
    Ok(())
}

impl BaseTexture {
    /// Create from straight-alpha RGBA8 pixels.
    pub fn from_rgba(width: u32, height: u32, mut pixels: Vec<u8>) -> Result<Self> {
        check_len(width, height, pixels.len())?;
        premultiply(&mut pixels);
        Ok(Self::from_premultiplied_unchecked(width, height, pixels))
    }

    /// Create from RGBA8 pixels whose color channels are already multiplied by alpha.
    pub fn from_premultiplied(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        check_len(width, height, pixels.len())?;
        Ok(Self::from_premultiplied_unchecked(width, height, pixels))
    }

    fn from_premultiplied_unchecked(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        let id = NEXT_BASE_TEXTURE_ID.fetch_add(1, Ordering::Relaxed);
        Self {
            id,
            data: Rc::new(RefCell::new(BaseTextureData {
                width,
                height,
                pixels,
                scale_mode: ScaleMode::default(),
                wrap_mode: WrapMode::default(),
                version: 0,
            })),
        }
    }

    pub fn from_image(image: &DynamicImage) -> Self {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        let mut pixels = rgba.into_raw();
        premultiply(&mut pixels);
        Self::from_premultiplied_unchecked(width, height, pixels)
    }

    /// Decode an encoded image (PNG, JPEG, GIF, WebP).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes)?;
        Ok(Self::from_image(&image))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let image = image::open(path.as_ref())?;
        log::trace!(
            "Decoded {} ({}x{})",
            path.as_ref().display(),
            image.width(),
            image.height()
        );
        Ok(Self::from_image(&image))
    }

    /// A single opaque white pixel.
    pub fn white() -> Self {
        Self::from_premultiplied_unchecked(1, 1, vec![255, 255, 255, 255])
    }

    /// A zero-sized texture.
    pub fn empty() -> Self {
        Self::from_premultiplied_unchecked(0, 0, Vec::new())
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.data.borrow().width
    }

    pub fn height(&self) -> u32 {
        self.data.borrow().height
    }

    pub fn is_valid(&self) -> bool {
        let data = self.data.borrow();
        data.width > 0 && data.height > 0
    }

    pub fn version(&self) -> u32 {
        self.data.borrow().version
    }

    pub fn scale_mode(&self) -> ScaleMode {
        self.data.borrow().scale_mode
    }

    pub fn set_scale_mode(&mut self, mode: ScaleMode) {
        let mut data = self.data.borrow_mut();
        if data.scale_mode != mode {
            data.scale_mode = mode;
            data.version = data.version.wrapping_add(1);
        }
    }

    pub fn wrap_mode(&self) -> WrapMode {
        self.data.borrow().wrap_mode
    }

    pub fn set_wrap_mode(&mut self, mode: WrapMode) {
        let mut data = self.data.borrow_mut();
        if data.wrap_mode != mode {
            data.wrap_mode = mode;
            data.version = data.version.wrapping_add(1);
        }
    }

    /// Borrow the premultiplied pixels.
    pub fn pixels(&self) -> Ref<'_, [u8]> {
        Ref::map(self.data.borrow(), |data| data.pixels.as_slice())
    }

    /// Replace the pixels (straight alpha) and possibly the size.
    pub fn update(&self, width: u32, height: u32, mut pixels: Vec<u8>) -> Result<()> {
        check_len(width, height, pixels.len())?;
        premultiply(&mut pixels);
        let mut data = self.data.borrow_mut();
        data.width = width;
        data.height = height;
        data.pixels = pixels;
        data.version = data.version.wrapping_add(1);
        Ok(())
    }

    pub(crate) fn downgrade(&self) -> WeakBaseTexture {
        WeakBaseTexture(Rc::downgrade(&self.data))
    }
}

impl PartialEq for BaseTexture {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for BaseTexture {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rgba_premultiplies() {
        let base = BaseTexture::from_rgba(1, 1, vec![255, 128, 0, 128]).unwrap();
        let px = base.pixels();
        assert_eq!(px[3], 128);
        assert_eq!(px[0], 128);
        assert_eq!(px[1], 64);
        assert_eq!(px[2], 0);
    }

    #[test]
    fn test_size_mismatch_is_rejected() {
        let err = BaseTexture::from_rgba(2, 2, vec![0; 15]).unwrap_err();
        assert!(matches!(err, StageError::PixelBufferSize { expected: 16, .. }));
    }

    #[test]
    fn test_update_bumps_version() {
        let base = BaseTexture::from_rgba(1, 1, vec![0; 4]).unwrap();
        assert_eq!(base.version(), 0);
        base.update(2, 1, vec![255; 8]).unwrap();
        assert_eq!(base.version(), 1);
        assert_eq!(base.width(), 2);
    }

    #[test]
    fn test_unique_ids_and_shared_clones() {
        let a = BaseTexture::white();
        let b = BaseTexture::white();
        assert_ne!(a.id(), b.id());
        let a2 = a.clone();
        assert_eq!(a, a2);
        a.update(1, 1, vec![0, 0, 0, 255]).unwrap();
        assert_eq!(a2.version(), 1);
    }

    #[test]
    fn test_weak_handle_tracks_drop() {
        let base = BaseTexture::white();
        let weak = base.downgrade();
        assert!(weak.is_alive());
        drop(base);
        assert!(!weak.is_alive());
    }

    #[test]
    fn test_from_bytes_decodes_png() {
        let mut encoded = Vec::new();
        let img = image::RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 255]));
        DynamicImage::ImageRgba8(img)
            .write_to(
                &mut std::io::Cursor::new(&mut encoded),
                image::ImageFormat::Png,
            )
            .unwrap();
        let base = BaseTexture::from_bytes(&encoded).unwrap();
        assert_eq!((base.width(), base.height()), (3, 2));
        assert_eq!(&base.pixels()[0..4], &[10, 20, 30, 255]);
    }
}

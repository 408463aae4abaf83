use crate::color::Color;
use crate::math::{Matrix, Point, Rectangle};
use crate::texture::Texture;

/// A textured quad.
///
/// `anchor` is the origin of the quad as a fraction of the texture size:
/// `(0, 0)` puts the top-left corner at the node position, `(0.5, 0.5)` the center.
#[derive(Debug, Clone)]
pub struct Sprite {
    pub texture: Texture,
    pub anchor: Point,
    pub tint: Color,
}

impl Sprite {
    pub fn new(texture: Texture) -> Self {
        Self {
            texture,
            anchor: Point::ZERO,
            tint: Color::WHITE,
        }
    }

    pub fn with_anchor(mut self, x: f32, y: f32) -> Self {
        self.anchor = Point::new(x, y);
        self
    }

    pub fn with_tint(mut self, tint: Color) -> Self {
        self.tint = tint;
        self
    }

    /// Untrimmed rectangle in local space.
    pub fn local_bounds(&self) -> Rectangle {
        let orig = self.texture.orig();
        Rectangle::new(
            -self.anchor.x * orig.width,
            -self.anchor.y * orig.height,
            orig.width,
            orig.height,
        )
    }

    /// Rectangle actually covered by pixels, which differs from
    /// [`Sprite::local_bounds`] for trimmed textures.
    pub fn quad(&self) -> Rectangle {
        let orig = self.texture.orig();
        let origin_x = -self.anchor.x * orig.width;
        let origin_y = -self.anchor.y * orig.height;
        match self.texture.trim() {
            Some(trim) => Rectangle::new(
                origin_x + trim.x,
                origin_y + trim.y,
                trim.width,
                trim.height,
            ),
            None => Rectangle::new(origin_x, origin_y, orig.width, orig.height),
        }
    }

    /// World positions of the quad corners, top-left then clockwise.
    pub fn vertex_data(&self, world: &Matrix) -> [f32; 8] {
        let q = self.quad();
        let tl = world.apply(q.left(), q.top());
        let tr = world.apply(q.right(), q.top());
        let br = world.apply(q.right(), q.bottom());
        let bl = world.apply(q.left(), q.bottom());
        [tl.x, tl.y, tr.x, tr.y, br.x, br.y, bl.x, bl.y]
    }

    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        self.local_bounds().contains(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::BaseTexture;

    fn texture(w: u32, h: u32) -> Texture {
        Texture::from_base(BaseTexture::from_rgba(w, h, vec![255; (w * h * 4) as usize]).unwrap())
    }

    #[test]
    fn test_anchor_centers_quad() {
        let sprite = Sprite::new(texture(10, 20)).with_anchor(0.5, 0.5);
        assert_eq!(sprite.local_bounds(), Rectangle::new(-5.0, -10.0, 10.0, 20.0));
        assert!(sprite.contains_point(0.0, 0.0));
        assert!(!sprite.contains_point(6.0, 0.0));
    }

    #[test]
    fn test_vertex_data_uses_world_matrix() {
        let sprite = Sprite::new(texture(2, 2));
        let world = Matrix::from_translation(10.0, 5.0);
        assert_eq!(
            sprite.vertex_data(&world),
            [10.0, 5.0, 12.0, 5.0, 12.0, 7.0, 10.0, 7.0]
        );
    }

    #[test]
    fn test_trimmed_quad_is_offset_inside_orig() {
        let base = BaseTexture::from_rgba(4, 4, vec![255; 64]).unwrap();
        let tex = Texture::with_trim(
            base,
            Rectangle::new(0.0, 0.0, 4.0, 4.0),
            Rectangle::new(0.0, 0.0, 8.0, 8.0),
            Some(Rectangle::new(2.0, 2.0, 4.0, 4.0)),
        )
        .unwrap();
        let sprite = Sprite::new(tex);
        assert_eq!(sprite.local_bounds(), Rectangle::new(0.0, 0.0, 8.0, 8.0));
        assert_eq!(sprite.quad(), Rectangle::new(2.0, 2.0, 4.0, 4.0));
    }
}

use super::{Matrix, Rectangle};

/// Axis-aligned bounding box accumulator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Bounds {
    pub fn new() -> Self {
        Self {
            min_x: f32::INFINITY,
            min_y: f32::INFINITY,
            max_x: f32::NEG_INFINITY,
            max_y: f32::NEG_INFINITY,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }

    pub fn add_point(&mut self, x: f32, y: f32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    /// Add the four corners of `rect` after transforming them by `matrix`.
    pub fn add_quad(&mut self, rect: &Rectangle, matrix: &Matrix) {
        if rect.is_empty() {
            return;
        }
        for (x, y) in [
            (rect.left(), rect.top()),
            (rect.right(), rect.top()),
            (rect.right(), rect.bottom()),
            (rect.left(), rect.bottom()),
        ] {
            let p = matrix.apply(x, y);
            self.add_point(p.x, p.y);
        }
    }

    /// Add already transformed vertices stored as `[x0, y0, x1, y1, ...]`.
    pub fn add_vertices(&mut self, vertices: &[f32]) {
        for pair in vertices.chunks_exact(2) {
            self.add_point(pair[0], pair[1]);
        }
    }

    pub fn add_bounds(&mut self, other: &Bounds) {
        if other.is_empty() {
            return;
        }
        self.add_point(other.min_x, other.min_y);
        self.add_point(other.max_x, other.max_y);
    }

    /// The accumulated box, or [`Rectangle::EMPTY`] when nothing was added.
    pub fn rectangle(&self) -> Rectangle {
        if self.is_empty() {
            return Rectangle::EMPTY;
        }
        Rectangle::new(
            self.min_x,
            self.min_y,
            self.max_x - self.min_x,
            self.max_y - self.min_y,
        )
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_bounds() {
        let b = Bounds::new();
        assert!(b.is_empty());
        assert_eq!(b.rectangle(), Rectangle::EMPTY);
    }

    #[test]
    fn test_add_quad_rotated() {
        let mut m = Matrix::identity();
        m.rotate(std::f32::consts::FRAC_PI_2);
        let mut b = Bounds::new();
        b.add_quad(&Rectangle::new(0.0, 0.0, 10.0, 5.0), &m);
        let r = b.rectangle();
        assert!((r.x + 5.0).abs() < 1e-4);
        assert!((r.width - 5.0).abs() < 1e-4);
        assert!((r.height - 10.0).abs() < 1e-4);
    }
}

use std::f32::consts::PI;

use super::Point;

/// A 2D affine matrix.
///
/// ```text
/// | a  c  tx |
/// | b  d  ty |
/// | 0  0  1  |
/// ```
///
/// Points are treated as column vectors, so `apply` computes
/// `(a*x + c*y + tx, b*x + d*y + ty)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub tx: f32,
    pub ty: f32,
}

/// Components recovered by [`Matrix::decompose`].
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct MatrixParts {
    pub position: Point,
    pub scale: Point,
    pub rotation: f32,
    pub skew: Point,
}

impl Matrix {
    pub const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    pub const fn new(a: f32, b: f32, c: f32, d: f32, tx: f32, ty: f32) -> Self {
        Self { a, b, c, d, tx, ty }
    }

    pub fn identity() -> Self {
        Self::IDENTITY
    }

    pub fn from_translation(x: f32, y: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, x, y)
    }

    pub fn set(&mut self, a: f32, b: f32, c: f32, d: f32, tx: f32, ty: f32) -> &mut Self {
        *self = Self::new(a, b, c, d, tx, ty);
        self
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Transform a point by this matrix.
    pub fn apply(&self, x: f32, y: f32) -> Point {
        Point::new(
            self.a * x + self.c * y + self.tx,
            self.b * x + self.d * y + self.ty,
        )
    }

    /// Transform a point by the inverse of this matrix.
    ///
    /// Degenerate matrices map every point to the origin.
    pub fn apply_inverse(&self, x: f32, y: f32) -> Point {
        let det = self.a * self.d - self.c * self.b;
        if det.abs() < 1e-12 {
            return Point::ZERO;
        }
        let id = 1.0 / det;
        Point::new(
            self.d * id * x - self.c * id * y + (self.ty * self.c - self.tx * self.d) * id,
            self.a * id * y - self.b * id * x + (-self.ty * self.a + self.tx * self.b) * id,
        )
    }

    pub fn translate(&mut self, x: f32, y: f32) -> &mut Self {
        self.tx += x;
        self.ty += y;
        self
    }

    pub fn scale(&mut self, x: f32, y: f32) -> &mut Self {
        self.a *= x;
        self.d *= y;
        self.c *= x;
        self.b *= y;
        self.tx *= x;
        self.ty *= y;
        self
    }

    /// Rotate by `angle` radians around the origin, after the current transform.
    pub fn rotate(&mut self, angle: f32) -> &mut Self {
        let (sin, cos) = angle.sin_cos();
        let Self { a, b, c, d, tx, ty } = *self;
        self.a = a * cos - b * sin;
        self.b = a * sin + b * cos;
        self.c = c * cos - d * sin;
        self.d = c * sin + d * cos;
        self.tx = tx * cos - ty * sin;
        self.ty = tx * sin + ty * cos;
        self
    }

    /// `self = self * other`: `other` is applied first, then `self`.
    pub fn append(&mut self, other: &Matrix) -> &mut Self {
        let Self { a, b, c, d, tx, ty } = *self;
        self.a = other.a * a + other.b * c;
        self.b = other.a * b + other.b * d;
        self.c = other.c * a + other.d * c;
        self.d = other.c * b + other.d * d;
        self.tx = other.tx * a + other.ty * c + tx;
        self.ty = other.tx * b + other.ty * d + ty;
        self
    }

    /// `self = other * self`: `self` is applied first, then `other`.
    pub fn prepend(&mut self, other: &Matrix) -> &mut Self {
        let Self { a, b, c, d, tx, ty } = *self;
        if other.a != 1.0 || other.b != 0.0 || other.c != 0.0 || other.d != 1.0 {
            self.a = a * other.a + b * other.c;
            self.b = a * other.b + b * other.d;
            self.c = c * other.a + d * other.c;
            self.d = c * other.b + d * other.d;
        }
        self.tx = tx * other.a + ty * other.c + other.tx;
        self.ty = tx * other.b + ty * other.d + other.ty;
        self
    }

    /// Compose without mutating: the result applies `other` first, then `self`.
    pub fn then(&self, other: &Matrix) -> Matrix {
        let mut out = *self;
        out.append(other);
        out
    }

    /// Invert in place. A degenerate matrix becomes the identity.
    pub fn invert(&mut self) -> &mut Self {
        let Self { a, b, c, d, tx, ty } = *self;
        let n = a * d - b * c;
        if n.abs() < 1e-12 {
            *self = Self::IDENTITY;
            return self;
        }
        self.a = d / n;
        self.b = -b / n;
        self.c = -c / n;
        self.d = a / n;
        self.tx = (c * ty - d * tx) / n;
        self.ty = -(a * ty - b * tx) / n;
        self
    }

    pub fn inverse(&self) -> Matrix {
        let mut out = *self;
        out.invert();
        out
    }

    /// Recover position, scale, rotation and skew.
    ///
    /// Pure rotations report zero skew; anything else reports zero rotation
    /// and puts the angular part into skew.
    pub fn decompose(&self) -> MatrixParts {
        let Self { a, b, c, d, .. } = *self;
        let skew_x = -(-c).atan2(d);
        let skew_y = b.atan2(a);
        let delta = (skew_x + skew_y).abs();

        let (rotation, skew) = if delta < 0.00001 || (PI * 2.0 - delta).abs() < 0.00001 {
            let mut rotation = skew_y;
            if a < 0.0 && d >= 0.0 {
                rotation += if rotation <= 0.0 { PI } else { -PI };
            }
            (rotation, Point::ZERO)
        } else {
            (0.0, Point::new(skew_x, skew_y))
        };

        MatrixParts {
            position: Point::new(self.tx, self.ty),
            scale: Point::new((a * a + b * b).sqrt(), (c * c + d * d).sqrt()),
            rotation,
            skew,
        }
    }

    /// 3x3 matrix as a flat array, row-major unless `transpose` is set.
    pub fn to_array(&self, transpose: bool) -> [f32; 9] {
        if transpose {
            [self.a, self.b, 0.0, self.c, self.d, 0.0, self.tx, self.ty, 1.0]
        } else {
            [self.a, self.c, self.tx, self.b, self.d, self.ty, 0.0, 0.0, 1.0]
        }
    }

    /// Column-major 4x4 matrix for shader uniforms.
    pub fn to_mat4(&self) -> [[f32; 4]; 4] {
        [
            [self.a, self.b, 0.0, 0.0],
            [self.c, self.d, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [self.tx, self.ty, 0.0, 1.0],
        ]
    }

    /// Orthographic projection mapping a `width` x `height` pixel area with a
    /// top-left origin onto normalized device coordinates.
    pub fn projection(width: f32, height: f32) -> Matrix {
        let w = width.max(1.0);
        let h = height.max(1.0);
        Matrix::new(2.0 / w, 0.0, 0.0, -2.0 / h, -1.0, 1.0)
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

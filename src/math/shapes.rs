//! Hit-testable geometric primitives used by graphics and hit areas.

use super::Point;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rectangle {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rectangle {
    pub const EMPTY: Rectangle = Rectangle::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        if self.is_empty() {
            return false;
        }
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Grow the rectangle by `px` horizontally and `py` vertically on each side.
    pub fn pad(&mut self, px: f32, py: f32) {
        self.x -= px;
        self.y -= py;
        self.width += px * 2.0;
        self.height += py * 2.0;
    }

    /// Expand to include `other`.
    pub fn enlarge(&mut self, other: &Rectangle) {
        let x1 = self.x.min(other.x);
        let y1 = self.y.min(other.y);
        let x2 = self.right().max(other.right());
        let y2 = self.bottom().max(other.bottom());
        *self = Rectangle::new(x1, y1, x2 - x1, y2 - y1);
    }

    /// Overlap of two rectangles, empty when they do not intersect.
    pub fn intersection(&self, other: &Rectangle) -> Rectangle {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());
        if x2 <= x1 || y2 <= y1 {
            return Rectangle::EMPTY;
        }
        Rectangle::new(x1, y1, x2 - x1, y2 - y1)
    }

    /// Whether `other` lies entirely inside this rectangle.
    pub fn contains_rect(&self, other: &Rectangle) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

impl Circle {
    pub const fn new(x: f32, y: f32, radius: f32) -> Self {
        Self { x, y, radius }
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        if self.radius <= 0.0 {
            return false;
        }
        let dx = self.x - x;
        let dy = self.y - y;
        dx * dx + dy * dy <= self.radius * self.radius
    }

    pub fn bounds(&self) -> Rectangle {
        Rectangle::new(
            self.x - self.radius,
            self.y - self.radius,
            self.radius * 2.0,
            self.radius * 2.0,
        )
    }
}

/// An axis-aligned ellipse. `half_width` and `half_height` are the radii.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipse {
    pub x: f32,
    pub y: f32,
    pub half_width: f32,
    pub half_height: f32,
}

impl Ellipse {
    pub const fn new(x: f32, y: f32, half_width: f32, half_height: f32) -> Self {
        Self {
            x,
            y,
            half_width,
            half_height,
        }
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        if self.half_width <= 0.0 || self.half_height <= 0.0 {
            return false;
        }
        let nx = (x - self.x) / self.half_width;
        let ny = (y - self.y) / self.half_height;
        nx * nx + ny * ny <= 1.0
    }

    pub fn bounds(&self) -> Rectangle {
        Rectangle::new(
            self.x - self.half_width,
            self.y - self.half_height,
            self.half_width * 2.0,
            self.half_height * 2.0,
        )
    }
}

/// A polygon stored as a flat `[x0, y0, x1, y1, ...]` list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Polygon {
    pub points: Vec<f32>,
    pub closed: bool,
}

impl Polygon {
    pub fn new(points: Vec<f32>) -> Self {
        Self {
            points,
            closed: true,
        }
    }

    pub fn from_points(points: &[Point]) -> Self {
        Self::new(points.iter().flat_map(|p| [p.x, p.y]).collect())
    }

    pub fn point_count(&self) -> usize {
        self.points.len() / 2
    }

    pub fn point(&self, index: usize) -> Point {
        Point::new(self.points[index * 2], self.points[index * 2 + 1])
    }

    pub fn push(&mut self, x: f32, y: f32) {
        self.points.push(x);
        self.points.push(y);
    }

    /// Even-odd ray casting.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        let n = self.point_count();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let (xi, yi) = (self.points[i * 2], self.points[i * 2 + 1]);
            let (xj, yj) = (self.points[j * 2], self.points[j * 2 + 1]);
            let intersects =
                (yi > y) != (yj > y) && x < (xj - xi) * ((y - yi) / (yj - yi)) + xi;
            if intersects {
                inside = !inside;
            }
            j = i;
        }
        inside
    }

    pub fn bounds(&self) -> Rectangle {
        if self.points.len() < 2 {
            return Rectangle::EMPTY;
        }
        let mut min_x = f32::INFINITY;
        let mut min_y = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut max_y = f32::NEG_INFINITY;
        for pair in self.points.chunks_exact(2) {
            min_x = min_x.min(pair[0]);
            max_x = max_x.max(pair[0]);
            min_y = min_y.min(pair[1]);
            max_y = max_y.max(pair[1]);
        }
        Rectangle::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundedRectangle {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub radius: f32,
}

impl RoundedRectangle {
    pub const fn new(x: f32, y: f32, width: f32, height: f32, radius: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            radius,
        }
    }

    /// Radius clamped to half the shorter side.
    pub fn effective_radius(&self) -> f32 {
        self.radius.max(0.0).min(self.width.min(self.height) / 2.0)
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        if self.width <= 0.0 || self.height <= 0.0 {
            return false;
        }
        if x < self.x || x > self.x + self.width || y < self.y || y > self.y + self.height {
            return false;
        }
        let r = self.effective_radius();
        if (y >= self.y + r && y <= self.y + self.height - r)
            || (x >= self.x + r && x <= self.x + self.width - r)
        {
            return true;
        }
        let cx = if x < self.x + r {
            self.x + r
        } else {
            self.x + self.width - r
        };
        let cy = if y < self.y + r {
            self.y + r
        } else {
            self.y + self.height - r
        };
        let dx = x - cx;
        let dy = y - cy;
        dx * dx + dy * dy <= r * r
    }

    pub fn bounds(&self) -> Rectangle {
        Rectangle::new(self.x, self.y, self.width, self.height)
    }
}

/// Any of the drawable primitives.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Rectangle(Rectangle),
    Circle(Circle),
    Ellipse(Ellipse),
    Polygon(Polygon),
    RoundedRectangle(RoundedRectangle),
}

impl Shape {
    pub fn contains(&self, x: f32, y: f32) -> bool {
        match self {
            Shape::Rectangle(s) => s.contains(x, y),
            Shape::Circle(s) => s.contains(x, y),
            Shape::Ellipse(s) => s.contains(x, y),
            Shape::Polygon(s) => s.contains(x, y),
            Shape::RoundedRectangle(s) => s.contains(x, y),
        }
    }

    pub fn bounds(&self) -> Rectangle {
        match self {
            Shape::Rectangle(s) => *s,
            Shape::Circle(s) => s.bounds(),
            Shape::Ellipse(s) => s.bounds(),
            Shape::Polygon(s) => s.bounds(),
            Shape::RoundedRectangle(s) => s.bounds(),
        }
    }
}

impl From<Rectangle> for Shape {
    fn from(s: Rectangle) -> Self {
        Shape::Rectangle(s)
    }
}

impl From<Circle> for Shape {
    fn from(s: Circle) -> Self {
        Shape::Circle(s)
    }
}

impl From<Ellipse> for Shape {
    fn from(s: Ellipse) -> Self {
        Shape::Ellipse(s)
    }
}

impl From<Polygon> for Shape {
    fn from(s: Polygon) -> Self {
        Shape::Polygon(s)
    }
}

impl From<RoundedRectangle> for Shape {
    fn from(s: RoundedRectangle) -> Self {
        Shape::RoundedRectangle(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangle_contains_is_half_open() {
        let r = Rectangle::new(0.0, 0.0, 10.0, 10.0);
        assert!(r.contains(0.0, 0.0));
        assert!(r.contains(9.9, 9.9));
        assert!(!r.contains(10.0, 5.0));
        assert!(!Rectangle::new(0.0, 0.0, 0.0, 10.0).contains(0.0, 0.0));
    }

    #[test]
    fn test_rectangle_enlarge() {
        let mut r = Rectangle::new(0.0, 0.0, 10.0, 10.0);
        r.enlarge(&Rectangle::new(-5.0, 5.0, 10.0, 20.0));
        assert_eq!(r, Rectangle::new(-5.0, 0.0, 15.0, 25.0));
    }

    #[test]
    fn test_rectangle_intersection() {
        let a = Rectangle::new(0.0, 0.0, 10.0, 10.0);
        let b = Rectangle::new(5.0, -5.0, 10.0, 10.0);
        assert_eq!(a.intersection(&b), Rectangle::new(5.0, 0.0, 5.0, 5.0));
        assert!(a.intersection(&Rectangle::new(20.0, 0.0, 1.0, 1.0)).is_empty());
    }

    #[test]
    fn test_circle_and_ellipse() {
        let c = Circle::new(5.0, 5.0, 2.0);
        assert!(c.contains(6.0, 6.0));
        assert!(!c.contains(8.0, 5.0));
        assert_eq!(c.bounds(), Rectangle::new(3.0, 3.0, 4.0, 4.0));

        let e = Ellipse::new(0.0, 0.0, 10.0, 2.0);
        assert!(e.contains(9.0, 0.0));
        assert!(!e.contains(0.0, 3.0));
    }

    #[test]
    fn test_polygon_even_odd() {
        // concave "U" shape
        let p = Polygon::new(vec![
            0.0, 0.0, 3.0, 0.0, 3.0, 3.0, 2.0, 3.0, 2.0, 1.0, 1.0, 1.0, 1.0, 3.0, 0.0, 3.0,
        ]);
        assert!(p.contains(0.5, 2.0));
        assert!(p.contains(2.5, 2.0));
        assert!(!p.contains(1.5, 2.0));
        assert!(!p.contains(4.0, 1.0));
        assert_eq!(p.bounds(), Rectangle::new(0.0, 0.0, 3.0, 3.0));
    }

    #[test]
    fn test_rounded_rectangle_corners() {
        let r = RoundedRectangle::new(0.0, 0.0, 20.0, 20.0, 5.0);
        assert!(r.contains(10.0, 10.0));
        assert!(r.contains(10.0, 0.5));
        assert!(!r.contains(0.2, 0.2));
        assert!(r.contains(2.0, 2.0));
    }
}

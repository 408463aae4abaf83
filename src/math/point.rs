/// A plain 2D coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

/// A 2D coordinate that records every change in a version counter.
///
/// Transforms compare versions instead of values to decide whether their
/// cached matrices are stale. Writes that leave the value unchanged do not
/// bump the version.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObservablePoint {
    x: f32,
    y: f32,
    version: u32,
}

impl ObservablePoint {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y, version: 0 }
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn get(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Current version. Increments on every effective mutation.
    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn set(&mut self, x: f32, y: f32) {
        if self.x != x || self.y != y {
            self.x = x;
            self.y = y;
            self.version = self.version.wrapping_add(1);
        }
    }

    pub fn set_x(&mut self, x: f32) {
        self.set(x, self.y);
    }

    pub fn set_y(&mut self, y: f32) {
        self.set(self.x, y);
    }

    pub fn copy_from(&mut self, point: Point) {
        self.set(point.x, point.y);
    }
}

impl Default for ObservablePoint {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

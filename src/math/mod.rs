//! Value types: points, affine matrices, hit-testable shapes and bounds.

mod bounds;
mod matrix;
mod point;
mod shapes;

pub use bounds::Bounds;
pub use matrix::{Matrix, MatrixParts};
pub use point::{ObservablePoint, Point};
pub use shapes::{Circle, Ellipse, Polygon, Rectangle, RoundedRectangle, Shape};

use crate::color::Color;
use crate::math::Shape;

/// Stroke settings applied to shapes drawn after [`super::Graphics::line_style`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineStyle {
    pub width: f32,
    pub color: Color,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillStyle {
    pub color: Color,
}

/// One shape of a [`super::Graphics`] together with the styles that were
/// active when it was drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphicsData {
    pub shape: Shape,
    pub fill: Option<FillStyle>,
    pub line: Option<LineStyle>,
    /// Shapes cut out of the fill.
    pub holes: Vec<Shape>,
}

impl GraphicsData {
    pub fn new(shape: Shape, fill: Option<FillStyle>, line: Option<LineStyle>) -> Self {
        Self {
            shape,
            fill,
            line,
            holes: Vec::new(),
        }
    }

    /// Point test against the filled area, excluding holes.
    pub fn fill_contains(&self, x: f32, y: f32) -> bool {
        self.fill.is_some()
            && self.shape.contains(x, y)
            && !self.holes.iter().any(|hole| hole.contains(x, y))
    }
}

//! Vector drawing.
//!
//! [`Graphics`] records shapes with the line and fill style active at the
//! time they were drawn. The renderer tessellates the recorded shapes once
//! and reuses the triangles until [`Graphics::dirty`] changes.

pub mod curves;
mod data;
mod tessellate;

use std::f32::consts::TAU;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::color::Color;
use crate::math::{
    Bounds, Circle, Ellipse, Point, Polygon, Rectangle, RoundedRectangle, Shape,
};

pub use data::{FillStyle, GraphicsData, LineStyle};
pub use tessellate::{tessellate, GraphicsGeometry};

static NEXT_GRAPHICS_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
pub struct Graphics {
    id: u64,
    data: Vec<GraphicsData>,
    line: Option<LineStyle>,
    fill: Option<FillStyle>,
    /// Index into `data` of the polygon that path commands extend.
    current_path: Option<usize>,
    pub tint: Color,
    dirty: u32,
    clear_dirty: u32,
}

impl Graphics {
    pub fn new() -> Self {
        Self {
            id: NEXT_GRAPHICS_ID.fetch_add(1, Ordering::Relaxed),
            data: Vec::new(),
            line: None,
            fill: None,
            current_path: None,
            tint: Color::WHITE,
            dirty: 0,
            clear_dirty: 0,
        }
    }

    /// Identity used by GPU caches. Clones get a new one.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Bumped on every change to the recorded shapes.
    pub fn dirty(&self) -> u32 {
        self.dirty
    }

    /// Bumped on every [`Graphics::clear`].
    pub fn clear_dirty(&self) -> u32 {
        self.clear_dirty
    }

    pub fn graphics_data(&self) -> &[GraphicsData] {
        &self.data
    }

    pub fn is_filling(&self) -> bool {
        self.fill.is_some()
    }

    fn touch(&mut self) {
        self.dirty = self.dirty.wrapping_add(1);
    }

    fn current_polygon(&mut self) -> Option<&mut Polygon> {
        let index = self.current_path?;
        match &mut self.data.get_mut(index)?.shape {
            Shape::Polygon(polygon) => Some(polygon),
            _ => None,
        }
    }

    fn last_point(&mut self) -> Option<(f32, f32)> {
        let polygon = self.current_polygon()?;
        let n = polygon.points.len();
        if n < 2 {
            return None;
        }
        Some((polygon.points[n - 2], polygon.points[n - 1]))
    }

    /// Set the stroke for subsequent shapes. A width of zero disables stroking.
    ///
    /// An open path with segments is split so the segments already drawn keep
    /// their old style.
    pub fn line_style(&mut self, width: f32, color: Color) -> &mut Self {
        self.line = (width > 0.0).then_some(LineStyle { width, color });

        let line = self.line;
        if let Some(polygon) = self.current_polygon() {
            if polygon.points.len() > 2 {
                let n = polygon.points.len();
                let (x, y) = (polygon.points[n - 2], polygon.points[n - 1]);
                self.move_to(x, y);
            } else if let Some(index) = self.current_path {
                self.data[index].line = line;
            }
        }
        self
    }

    pub fn begin_fill(&mut self, color: Color) -> &mut Self {
        self.fill = Some(FillStyle { color });
        let fill = self.fill;
        if let Some(index) = self.current_path {
            let data = &mut self.data[index];
            if let Shape::Polygon(polygon) = &mut data.shape {
                if polygon.points.len() <= 2 {
                    data.fill = fill;
                    polygon.closed = true;
                }
            }
        }
        self
    }

    pub fn end_fill(&mut self) -> &mut Self {
        self.fill = None;
        self
    }

    /// Start a new sub-path at `(x, y)`.
    pub fn move_to(&mut self, x: f32, y: f32) -> &mut Self {
        let mut polygon = Polygon::new(vec![x, y]);
        polygon.closed = false;
        self.draw_shape(polygon)
    }

    /// Without a current path this behaves like [`Graphics::move_to`].
    pub fn line_to(&mut self, x: f32, y: f32) -> &mut Self {
        match self.current_polygon() {
            Some(polygon) => {
                polygon.push(x, y);
                self.touch();
                self
            }
            None => self.move_to(x, y),
        }
    }

    pub fn quadratic_curve_to(&mut self, cpx: f32, cpy: f32, x: f32, y: f32) -> &mut Self {
        let Some(from) = self.last_point() else {
            return self.move_to(x, y);
        };
        let mut points = Vec::new();
        curves::quadratic(from, (cpx, cpy), (x, y), &mut points);
        self.extend_path(&points)
    }

    pub fn bezier_curve_to(
        &mut self,
        cp1x: f32,
        cp1y: f32,
        cp2x: f32,
        cp2y: f32,
        x: f32,
        y: f32,
    ) -> &mut Self {
        let Some(from) = self.last_point() else {
            return self.move_to(x, y);
        };
        let mut points = Vec::new();
        curves::bezier(from, (cp1x, cp1y), (cp2x, cp2y), (x, y), &mut points);
        self.extend_path(&points)
    }

    /// Circular arc around `(cx, cy)` from `start` to `end` radians.
    ///
    /// The arc connects to the current path with a straight segment.
    pub fn arc(
        &mut self,
        cx: f32,
        cy: f32,
        radius: f32,
        start: f32,
        end: f32,
        anticlockwise: bool,
    ) -> &mut Self {
        if start == end {
            return self;
        }
        let mut start = start;
        let mut end = end;
        if !anticlockwise && end <= start {
            end += TAU;
        } else if anticlockwise && start <= end {
            start += TAU;
        }
        let sweep = end - start;
        if sweep == 0.0 {
            return self;
        }

        let mut points = Vec::new();
        curves::arc(cx, cy, radius, start, sweep, &mut points);

        let start_point = (points[0], points[1]);
        match self.last_point() {
            Some(last) if last == start_point => self.extend_path(&points[2..]),
            Some(_) => self.extend_path(&points),
            None => {
                self.move_to(start_point.0, start_point.1);
                self.extend_path(&points[2..])
            }
        }
    }

    fn extend_path(&mut self, points: &[f32]) -> &mut Self {
        if let Some(polygon) = self.current_polygon() {
            polygon.points.extend_from_slice(points);
            self.touch();
        }
        self
    }

    pub fn draw_rect(&mut self, x: f32, y: f32, width: f32, height: f32) -> &mut Self {
        self.draw_shape(Rectangle::new(x, y, width, height))
    }

    pub fn draw_rounded_rect(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        radius: f32,
    ) -> &mut Self {
        self.draw_shape(RoundedRectangle::new(x, y, width, height, radius))
    }

    pub fn draw_circle(&mut self, x: f32, y: f32, radius: f32) -> &mut Self {
        self.draw_shape(Circle::new(x, y, radius))
    }

    /// `width` and `height` are the ellipse radii.
    pub fn draw_ellipse(&mut self, x: f32, y: f32, width: f32, height: f32) -> &mut Self {
        self.draw_shape(Ellipse::new(x, y, width, height))
    }

    pub fn draw_polygon(&mut self, points: &[Point]) -> &mut Self {
        self.draw_shape(Polygon::from_points(points))
    }

    /// Record a shape with the current styles.
    ///
    /// An empty path (a lone `move_to`) is replaced. Polygons become the
    /// current path and are closed when filled.
    pub fn draw_shape(&mut self, shape: impl Into<Shape>) -> &mut Self {
        if let Some(index) = self.current_path.take() {
            let empty = matches!(
                &self.data.get(index).map(|d| &d.shape),
                Some(Shape::Polygon(p)) if p.points.len() <= 2
            );
            if empty && index + 1 == self.data.len() {
                self.data.pop();
            }
        }

        let mut shape = shape.into();
        let is_path = if let Shape::Polygon(polygon) = &mut shape {
            polygon.closed = polygon.closed || self.fill.is_some();
            true
        } else {
            false
        };

        self.data.push(GraphicsData::new(shape, self.fill, self.line));
        if is_path {
            self.current_path = Some(self.data.len() - 1);
        }
        self.touch();
        self
    }

    /// Turn the most recent shape into a hole of the one before it.
    pub fn add_hole(&mut self) -> &mut Self {
        if self.data.len() < 2 {
            log::warn!("add_hole needs a shape to cut and a shape to cut from");
            return self;
        }
        if let Some(hole) = self.data.pop() {
            let len = self.data.len();
            self.data[len - 1].holes.push(hole.shape);
            self.current_path = None;
            self.touch();
        }
        self
    }

    /// Drop every shape and reset styles.
    pub fn clear(&mut self) -> &mut Self {
        if !self.data.is_empty() || self.line.is_some() || self.fill.is_some() {
            self.data.clear();
            self.line = None;
            self.fill = None;
            self.current_path = None;
            self.touch();
            self.clear_dirty = self.clear_dirty.wrapping_add(1);
        }
        self
    }

    /// Whether a local point is inside a filled shape and outside its holes.
    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        self.data.iter().any(|data| data.fill_contains(x, y))
    }

    /// Bounds of all shapes, including half the stroke width.
    pub fn local_bounds(&self) -> Rectangle {
        let mut bounds = Bounds::new();
        for data in &self.data {
            let mut rect = data.shape.bounds();
            if let Some(line) = &data.line {
                let pad = line.width / 2.0;
                rect.pad(pad, pad);
            }
            if rect.width >= 0.0 && rect.height >= 0.0 {
                bounds.add_point(rect.left(), rect.top());
                bounds.add_point(rect.right(), rect.bottom());
            }
        }
        bounds.rectangle()
    }

    /// Triangulate the recorded shapes.
    pub fn geometry(&self) -> GraphicsGeometry {
        tessellate(&self.data)
    }
}

impl Default for Graphics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Graphics {
    fn clone(&self) -> Self {
        Self {
            id: NEXT_GRAPHICS_ID.fetch_add(1, Ordering::Relaxed),
            data: self.data.clone(),
            line: self.line,
            fill: self.fill,
            current_path: self.current_path,
            tint: self.tint,
            dirty: self.dirty,
            clear_dirty: self.clear_dirty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_styles_are_captured_per_shape() {
        let mut g = Graphics::new();
        g.begin_fill(Color::from_hex(0xFF0000))
            .draw_rect(0.0, 0.0, 10.0, 10.0)
            .end_fill()
            .line_style(2.0, Color::BLACK)
            .draw_circle(50.0, 50.0, 5.0);

        let data = g.graphics_data();
        assert_eq!(data.len(), 2);
        assert!(data[0].fill.is_some() && data[0].line.is_none());
        assert!(data[1].fill.is_none());
        assert_eq!(data[1].line.map(|l| l.width), Some(2.0));
    }

    #[test]
    fn test_path_commands_extend_one_polygon() {
        let mut g = Graphics::new();
        g.move_to(0.0, 0.0)
            .line_to(10.0, 0.0)
            .quadratic_curve_to(15.0, 5.0, 10.0, 10.0);
        let data = g.graphics_data();
        assert_eq!(data.len(), 1);
        let Shape::Polygon(p) = &data[0].shape else {
            panic!("expected a polygon");
        };
        assert_eq!(p.point_count(), 2 + curves::CURVE_SEGMENTS);
        assert!(!p.closed);
    }

    #[test]
    fn test_empty_move_to_is_replaced() {
        let mut g = Graphics::new();
        g.move_to(5.0, 5.0).draw_rect(0.0, 0.0, 1.0, 1.0);
        assert_eq!(g.graphics_data().len(), 1);
        assert!(matches!(g.graphics_data()[0].shape, Shape::Rectangle(_)));
    }

    #[test]
    fn test_filled_path_is_closed() {
        let mut g = Graphics::new();
        g.begin_fill(Color::WHITE)
            .move_to(0.0, 0.0)
            .line_to(10.0, 0.0)
            .line_to(0.0, 10.0);
        let Shape::Polygon(p) = &g.graphics_data()[0].shape else {
            panic!("expected a polygon");
        };
        assert!(p.closed);
        assert!(g.contains_point(2.0, 2.0));
        assert!(!g.contains_point(8.0, 8.0));
    }

    #[test]
    fn test_line_style_splits_open_path() {
        let mut g = Graphics::new();
        g.line_style(1.0, Color::BLACK)
            .move_to(0.0, 0.0)
            .line_to(10.0, 0.0)
            .line_style(4.0, Color::WHITE)
            .line_to(10.0, 10.0);
        let data = g.graphics_data();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0].line.map(|l| l.width), Some(1.0));
        assert_eq!(data[1].line.map(|l| l.width), Some(4.0));
        let Shape::Polygon(p) = &data[1].shape else {
            panic!("expected a polygon");
        };
        assert_eq!(p.points, vec![10.0, 0.0, 10.0, 10.0]);
    }

    #[test]
    fn test_arc_connects_to_path() {
        let mut g = Graphics::new();
        g.move_to(0.0, 0.0)
            .arc(0.0, 0.0, 10.0, 0.0, std::f32::consts::PI, false);
        let Shape::Polygon(p) = &g.graphics_data()[0].shape else {
            panic!("expected a polygon");
        };
        // origin, then every arc point including its start
        assert_eq!(p.point_count(), 1 + curves::arc_segments(std::f32::consts::PI) + 1);
    }

    #[test]
    fn test_hole_excluded_from_hit_test() {
        let mut g = Graphics::new();
        g.begin_fill(Color::WHITE)
            .draw_rect(0.0, 0.0, 100.0, 100.0)
            .draw_circle(50.0, 50.0, 10.0)
            .add_hole();
        assert_eq!(g.graphics_data().len(), 1);
        assert!(g.contains_point(5.0, 5.0));
        assert!(!g.contains_point(50.0, 50.0));
    }

    #[test]
    fn test_clear_bumps_counters() {
        let mut g = Graphics::new();
        g.draw_rect(0.0, 0.0, 1.0, 1.0);
        let (dirty, cleared) = (g.dirty(), g.clear_dirty());
        g.clear();
        assert!(g.graphics_data().is_empty());
        assert_ne!(g.dirty(), dirty);
        assert_eq!(g.clear_dirty(), cleared + 1);
    }

    #[test]
    fn test_local_bounds_include_stroke() {
        let mut g = Graphics::new();
        g.line_style(4.0, Color::BLACK).draw_rect(0.0, 0.0, 10.0, 10.0);
        assert_eq!(g.local_bounds(), Rectangle::new(-2.0, -2.0, 14.0, 14.0));
    }

    #[test]
    fn test_clone_gets_new_id() {
        let g = Graphics::new();
        assert_ne!(g.id(), g.clone().id());
    }
}

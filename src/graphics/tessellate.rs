//! Triangulation of [`GraphicsData`] with lyon.

use lyon::math::point as lyon_point;
use lyon::path::Path;
use lyon::tessellation::{
    BuffersBuilder, FillOptions, FillRule, FillTessellator, FillVertex, LineJoin, StrokeOptions,
    StrokeTessellator, StrokeVertex, TessellationError, VertexBuffers,
};

use crate::color::Color;
use crate::math::Shape;
use crate::renderer::Vertex;

use super::curves;
use super::data::GraphicsData;

/// Triangles for a whole [`super::Graphics`], in its local space.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphicsGeometry {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl GraphicsGeometry {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    fn append(&mut self, buffers: VertexBuffers<Vertex, u32>) {
        let offset = self.vertices.len() as u32;
        self.vertices.extend(buffers.vertices);
        self.indices
            .extend(buffers.indices.into_iter().map(|index| index + offset));
    }
}

fn shape_closed(shape: &Shape) -> bool {
    match shape {
        Shape::Polygon(p) => p.closed,
        _ => true,
    }
}

/// Add `points` as one subpath.
fn add_subpath(builder: &mut lyon::path::path::Builder, points: &[f32], closed: bool) {
    let mut pairs = points.chunks_exact(2);
    let Some(first) = pairs.next() else {
        return;
    };
    builder.begin(lyon_point(first[0], first[1]));
    for pair in pairs {
        builder.line_to(lyon_point(pair[0], pair[1]));
    }
    builder.end(closed);
}

fn build_path(data: &GraphicsData, close_outline: bool) -> Path {
    let mut builder = Path::builder();
    add_subpath(&mut builder, &curves::outline(&data.shape), close_outline);
    for hole in &data.holes {
        add_subpath(&mut builder, &curves::outline(hole), true);
    }
    builder.build()
}

fn fill(path: &Path, color: Color) -> Result<VertexBuffers<Vertex, u32>, TessellationError> {
    let color = color.premultiplied();
    let mut buffers = VertexBuffers::new();
    FillTessellator::new().tessellate_path(
        path,
        &FillOptions::default().with_fill_rule(FillRule::EvenOdd),
        &mut BuffersBuilder::new(&mut buffers, |v: FillVertex| {
            Vertex::new(v.position().to_array(), [0.0, 0.0], color)
        }),
    )?;
    Ok(buffers)
}

fn stroke(
    path: &Path,
    width: f32,
    color: Color,
) -> Result<VertexBuffers<Vertex, u32>, TessellationError> {
    let color = color.premultiplied();
    let mut buffers = VertexBuffers::new();
    StrokeTessellator::new().tessellate_path(
        path,
        &StrokeOptions::default()
            .with_line_width(width)
            .with_line_join(LineJoin::Miter),
        &mut BuffersBuilder::new(&mut buffers, |v: StrokeVertex| {
            Vertex::new(v.position().to_array(), [0.0, 0.0], color)
        }),
    )?;
    Ok(buffers)
}

/// Triangulate all shapes in drawing order. A shape that fails to
/// tessellate is skipped with a warning.
pub fn tessellate(data: &[GraphicsData]) -> GraphicsGeometry {
    let mut geometry = GraphicsGeometry::default();

    for (index, shape) in data.iter().enumerate() {
        if let Some(fill_style) = &shape.fill {
            let path = build_path(shape, true);
            match fill(&path, fill_style.color) {
                Ok(buffers) => geometry.append(buffers),
                Err(err) => log::warn!("Failed to fill graphics shape {}: {:?}", index, err),
            }
        }

        if let Some(line) = shape.line.filter(|line| line.width > 0.0) {
            let path = build_path(shape, shape_closed(&shape.shape));
            match stroke(&path, line.width, line.color) {
                Ok(buffers) => geometry.append(buffers),
                Err(err) => log::warn!("Failed to stroke graphics shape {}: {:?}", index, err),
            }
        }
    }

    log::trace!(
        "Tessellated {} shapes into {} vertices, {} indices",
        data.len(),
        geometry.vertices.len(),
        geometry.indices.len()
    );
    geometry
}

use crate::color::Color;
use crate::math::{Bounds, Rectangle};
use crate::texture::Texture;

/// How [`Mesh::indices`] are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawMode {
    #[default]
    Triangles,
    TriangleStrip,
}

/// Arbitrary textured triangles.
///
/// Positions and UVs are flat `[x0, y0, x1, y1, ...]` lists. UVs are relative
/// to the texture frame, so a mesh keeps working when its texture is a region
/// of a larger atlas.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub texture: Texture,
    pub draw_mode: DrawMode,
    pub tint: Color,
    vertices: Vec<f32>,
    uvs: Vec<f32>,
    indices: Vec<u32>,
    dirty: u32,
}

impl Mesh {
    pub fn new(
        texture: Texture,
        vertices: Vec<f32>,
        uvs: Vec<f32>,
        indices: Vec<u32>,
        draw_mode: DrawMode,
    ) -> Self {
        Self {
            texture,
            draw_mode,
            tint: Color::WHITE,
            vertices,
            uvs,
            indices,
            dirty: 0,
        }
    }

    /// A grid of `cols` x `rows` vertices spanning the texture.
    pub fn plane(texture: Texture, cols: u32, rows: u32) -> Self {
        let cols = cols.max(2);
        let rows = rows.max(2);
        let width = texture.width();
        let height = texture.height();

        let mut vertices = Vec::with_capacity((cols * rows * 2) as usize);
        let mut uvs = Vec::with_capacity((cols * rows * 2) as usize);
        for row in 0..rows {
            let v = row as f32 / (rows - 1) as f32;
            for col in 0..cols {
                let u = col as f32 / (cols - 1) as f32;
                vertices.push(u * width);
                vertices.push(v * height);
                uvs.push(u);
                uvs.push(v);
            }
        }

        let mut indices = Vec::with_capacity(((cols - 1) * (rows - 1) * 6) as usize);
        for row in 0..rows - 1 {
            for col in 0..cols - 1 {
                let tl = row * cols + col;
                let tr = tl + 1;
                let bl = tl + cols;
                let br = bl + 1;
                indices.extend_from_slice(&[tl, tr, bl, tr, br, bl]);
            }
        }

        Self::new(texture, vertices, uvs, indices, DrawMode::Triangles)
    }

    pub fn vertices(&self) -> &[f32] {
        &self.vertices
    }

    pub fn uvs(&self) -> &[f32] {
        &self.uvs
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 2
    }

    /// Changes whenever geometry is replaced.
    pub fn dirty(&self) -> u32 {
        self.dirty
    }

    pub fn set_vertices(&mut self, vertices: Vec<f32>) {
        self.vertices = vertices;
        self.dirty = self.dirty.wrapping_add(1);
    }

    pub fn set_uvs(&mut self, uvs: Vec<f32>) {
        self.uvs = uvs;
        self.dirty = self.dirty.wrapping_add(1);
    }

    pub fn set_indices(&mut self, indices: Vec<u32>) {
        self.indices = indices;
        self.dirty = self.dirty.wrapping_add(1);
    }

    /// Indices as a triangle list regardless of draw mode.
    ///
    /// Strips alternate winding every other triangle; degenerate triangles are kept.
    pub fn triangle_indices(&self) -> Vec<u32> {
        match self.draw_mode {
            DrawMode::Triangles => self.indices.clone(),
            DrawMode::TriangleStrip => {
                if self.indices.len() < 3 {
                    return Vec::new();
                }
                let mut out = Vec::with_capacity((self.indices.len() - 2) * 3);
                for (i, w) in self.indices.windows(3).enumerate() {
                    if i % 2 == 0 {
                        out.extend_from_slice(&[w[0], w[1], w[2]]);
                    } else {
                        out.extend_from_slice(&[w[1], w[0], w[2]]);
                    }
                }
                out
            }
        }
    }

    pub fn local_bounds(&self) -> Rectangle {
        let mut bounds = Bounds::new();
        bounds.add_vertices(&self.vertices);
        bounds.rectangle()
    }

    /// Whether any triangle contains the local point.
    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        if !self.local_bounds().contains(x, y) {
            return false;
        }
        let point = |i: u32| -> Option<(f32, f32)> {
            let i = i as usize * 2;
            Some((*self.vertices.get(i)?, *self.vertices.get(i + 1)?))
        };
        self.triangle_indices().chunks_exact(3).any(|tri| {
            match (point(tri[0]), point(tri[1]), point(tri[2])) {
                (Some(a), Some(b), Some(c)) => triangle_contains(a, b, c, (x, y)),
                _ => false,
            }
        })
    }
}

fn triangle_contains(a: (f32, f32), b: (f32, f32), c: (f32, f32), p: (f32, f32)) -> bool {
    let sign = |p1: (f32, f32), p2: (f32, f32), p3: (f32, f32)| {
        (p1.0 - p3.0) * (p2.1 - p3.1) - (p2.0 - p3.0) * (p1.1 - p3.1)
    };
    let d1 = sign(p, a, b);
    let d2 = sign(p, b, c);
    let d3 = sign(p, c, a);
    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_neg && has_pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::BaseTexture;

    fn texture() -> Texture {
        Texture::from_base(BaseTexture::from_rgba(8, 4, vec![255; 128]).unwrap())
    }

    #[test]
    fn test_plane_layout() {
        let mesh = Mesh::plane(texture(), 3, 2);
        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.indices().len(), 2 * 6);
        assert_eq!(&mesh.vertices()[4..6], &[8.0, 0.0]);
        assert_eq!(&mesh.uvs()[10..12], &[1.0, 1.0]);
        assert_eq!(mesh.local_bounds(), Rectangle::new(0.0, 0.0, 8.0, 4.0));
    }

    #[test]
    fn test_strip_expands_to_list() {
        let mesh = Mesh::new(
            texture(),
            vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0],
            vec![0.0; 8],
            vec![0, 1, 2, 3],
            DrawMode::TriangleStrip,
        );
        assert_eq!(mesh.triangle_indices(), vec![0, 1, 2, 2, 1, 3]);
    }

    #[test]
    fn test_contains_point_uses_triangles() {
        let mesh = Mesh::new(
            texture(),
            vec![0.0, 0.0, 10.0, 0.0, 0.0, 10.0],
            vec![0.0; 6],
            vec![0, 1, 2],
            DrawMode::Triangles,
        );
        assert!(mesh.contains_point(2.0, 2.0));
        // inside the bounding box but outside the triangle
        assert!(!mesh.contains_point(9.0, 9.0));
    }

    #[test]
    fn test_setters_bump_dirty() {
        let mut mesh = Mesh::plane(texture(), 2, 2);
        let before = mesh.dirty();
        mesh.set_uvs(vec![0.0; 8]);
        assert_ne!(mesh.dirty(), before);
    }
}

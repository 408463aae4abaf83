use super::buffer::GlBuffer;
use super::vertex::Vertex;

/// Vertex buffer, index buffer and index count bound together.
pub struct VertexArrayObject {
    vertex: GlBuffer,
    index: GlBuffer,
    index_count: u32,
}

impl VertexArrayObject {
    pub fn new(device: &wgpu::Device, label: &'static str) -> Self {
        Self {
            vertex: GlBuffer::new(device, label, wgpu::BufferUsages::VERTEX, 0),
            index: GlBuffer::new(device, label, wgpu::BufferUsages::INDEX, 0),
            index_count: 0,
        }
    }

    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        vertices: &[Vertex],
        indices: &[u32],
    ) {
        self.vertex.upload(device, queue, bytemuck::cast_slice(vertices));
        self.index.upload(device, queue, bytemuck::cast_slice(indices));
        self.index_count = indices.len() as u32;
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn is_empty(&self) -> bool {
        self.index_count == 0
    }

    /// Bind both buffers. Returns `false` when there is nothing to draw.
    pub fn bind(&self, pass: &mut wgpu::RenderPass<'_>) -> bool {
        let (Some(vertices), Some(indices)) = (self.vertex.slice(), self.index.slice()) else {
            return false;
        };
        pass.set_vertex_buffer(0, vertices);
        pass.set_index_buffer(indices, wgpu::IndexFormat::Uint32);
        true
    }
}

use super::plan::{BatchDraw, RenderPlan};
use super::vao::VertexArrayObject;

/// Streams the batched sprite and mesh geometry of a frame.
pub struct MeshRenderer {
    vao: VertexArrayObject,
}

impl MeshRenderer {
    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            vao: VertexArrayObject::new(device, "stage2d batch"),
        }
    }

    /// Upload every batch vertex and index of `plan`.
    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, plan: &RenderPlan) {
        self.vao.upload(device, queue, &plan.vertices, &plan.indices);
    }

    pub fn bind(&self, pass: &mut wgpu::RenderPass<'_>) -> bool {
        self.vao.bind(pass)
    }

    /// Draw one batch; the batch buffers must be bound.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, batch: &BatchDraw) {
        pass.draw_indexed(batch.start..batch.start + batch.count, 0, 0..1);
    }
}

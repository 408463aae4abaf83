use std::collections::HashMap;

use crate::graphics::Graphics;

use super::vao::VertexArrayObject;

/// GPU geometry of one [`Graphics`], tagged with the `dirty` count it was
/// built from.
pub struct WebGLGraphicsData {
    vao: VertexArrayObject,
    dirty: u32,
    clear_dirty: u32,
    last_frame: u64,
}

impl WebGLGraphicsData {
    pub fn vao(&self) -> &VertexArrayObject {
        &self.vao
    }

    pub fn dirty(&self) -> u32 {
        self.dirty
    }
}

/// Per-graphics geometry cache.
///
/// Entries are keyed by [`Graphics::id`], rebuilt when the source's `dirty`
/// count moves, and released after a frame in which they were not drawn.
#[derive(Default)]
pub struct GraphicsRenderer {
    cache: HashMap<u64, WebGLGraphicsData>,
    frame: u64,
}

impl GraphicsRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_frame(&mut self) {
        self.frame += 1;
    }

    /// Make the cached geometry of `graphics` current and mark it used.
    pub fn update(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, graphics: &Graphics) {
        let frame = self.frame;
        let data = self.cache.entry(graphics.id()).or_insert_with(|| WebGLGraphicsData {
            vao: VertexArrayObject::new(device, "stage2d graphics"),
            // never matches a real count, so the first update builds
            dirty: graphics.dirty().wrapping_sub(1),
            clear_dirty: graphics.clear_dirty(),
            last_frame: frame,
        });
        data.last_frame = frame;
        if data.dirty == graphics.dirty() {
            return;
        }
        if data.clear_dirty != graphics.clear_dirty() {
            log::trace!("Graphics {} cleared", graphics.id());
            data.clear_dirty = graphics.clear_dirty();
        }
        let geometry = graphics.geometry();
        log::trace!(
            "Graphics {} rebuilt: {} vertices, {} indices",
            graphics.id(),
            geometry.vertices.len(),
            geometry.indices.len()
        );
        data.vao
            .upload(device, queue, &geometry.vertices, &geometry.indices);
        data.dirty = graphics.dirty();
    }

    pub fn get(&self, graphics_id: u64) -> Option<&WebGLGraphicsData> {
        self.cache.get(&graphics_id)
    }

    /// Release geometry not drawn this frame. Returns how many entries went.
    pub fn end_frame(&mut self) -> usize {
        let frame = self.frame;
        let before = self.cache.len();
        self.cache.retain(|_, data| data.last_frame == frame);
        before - self.cache.len()
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::renderer::GpuContext;

    fn context() -> Option<GpuContext> {
        let _ = env_logger::builder().is_test(true).try_init();
        match GpuContext::new() {
            Ok(context) => Some(context),
            Err(e) => {
                eprintln!("no GPU adapter, skipping: {}", e);
                None
            }
        }
    }

    #[test]
    fn test_geometry_rebuilt_only_when_dirty() {
        let Some(ctx) = context() else {
            return;
        };
        let mut renderer = GraphicsRenderer::new();
        let mut g = Graphics::new();
        g.begin_fill(Color::WHITE).draw_rect(0.0, 0.0, 10.0, 10.0);

        renderer.begin_frame();
        renderer.update(&ctx.device, &ctx.queue, &g);
        let data = renderer.get(g.id()).unwrap();
        assert_eq!(data.dirty(), g.dirty());
        let single = data.vao().index_count();
        assert!(single > 0);

        g.draw_rect(20.0, 0.0, 10.0, 10.0);
        renderer.update(&ctx.device, &ctx.queue, &g);
        let data = renderer.get(g.id()).unwrap();
        assert_eq!(data.dirty(), g.dirty());
        assert_eq!(data.vao().index_count(), single * 2);

        g.clear();
        renderer.update(&ctx.device, &ctx.queue, &g);
        assert!(renderer.get(g.id()).unwrap().vao().is_empty());
    }

    #[test]
    fn test_undrawn_geometry_is_released() {
        let Some(ctx) = context() else {
            return;
        };
        let mut renderer = GraphicsRenderer::new();
        let mut kept = Graphics::new();
        kept.begin_fill(Color::WHITE).draw_circle(0.0, 0.0, 5.0);
        let mut dropped = Graphics::new();
        dropped.begin_fill(Color::WHITE).draw_rect(0.0, 0.0, 5.0, 5.0);

        renderer.begin_frame();
        renderer.update(&ctx.device, &ctx.queue, &kept);
        renderer.update(&ctx.device, &ctx.queue, &dropped);
        assert_eq!(renderer.end_frame(), 0);
        assert_eq!(renderer.len(), 2);

        renderer.begin_frame();
        renderer.update(&ctx.device, &ctx.queue, &kept);
        assert_eq!(renderer.end_frame(), 1);
        assert!(renderer.get(kept.id()).is_some());
        assert!(renderer.get(dropped.id()).is_none());
    }
}

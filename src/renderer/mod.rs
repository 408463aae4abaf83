//! GPU rendering of a display tree.
//!
//! [`Renderer`] owns every GPU resource cache for one [`GpuContext`]:
//! uploaded textures, per-graphics geometry, the streamed batch buffers, the
//! per-draw uniform buffer and the pipeline cache. A frame updates world
//! transforms, flattens the tree into a [`RenderPlan`], uploads whatever
//! changed, and replays the plan in a single render pass.

mod buffer;
mod framebuffer;
mod gl_texture;
mod gpu_context;
mod graphics_renderer;
mod mesh_renderer;
mod pipeline;
mod plan;
mod state;
mod stencil;
mod vao;
mod vertex;

use std::sync::Arc;

use wgpu::{Device, Queue};

use crate::blend_mode::BlendMode;
use crate::color::Color;
use crate::display::{DisplayTree, NodeId};
use crate::error::{Result, StageError};
use crate::math::Matrix;
use crate::texture::{BaseTexture, Texture};

pub use buffer::GlBuffer;
pub use framebuffer::{GlFramebuffer, StencilBuffer, STENCIL_FORMAT};
pub use gl_texture::{GlTexture, TextureManager, TEXTURE_FORMAT};
pub use gpu_context::{GpuContext, SurfaceState};
pub use graphics_renderer::{GraphicsRenderer, WebGLGraphicsData};
pub use mesh_renderer::MeshRenderer;
pub use pipeline::{DrawUniforms, PipelineCache};
pub use plan::{build_render_plan, BatchDraw, GraphicsDraw, MaskDraw, RenderPlan, RenderStep};
pub use state::{PipelineKey, StateFlags, StencilMode, WebGLState};
pub use stencil::{StencilManager, StencilOp};
pub use vao::VertexArrayObject;
pub use vertex::Vertex;

#[derive(Debug, Clone, PartialEq)]
pub struct RendererOptions {
    pub width: u32,
    pub height: u32,
    /// Physical pixels per logical pixel.
    pub resolution: f32,
    pub background_color: Color,
    pub clear_before_render: bool,
    pub power_preference: wgpu::PowerPreference,
}

impl RendererOptions {
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn resolution(mut self, resolution: f32) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn background_color(mut self, color: Color) -> Self {
        self.background_color = color;
        self
    }

    pub fn clear_before_render(mut self, clear: bool) -> Self {
        self.clear_before_render = clear;
        self
    }

    pub fn power_preference(mut self, preference: wgpu::PowerPreference) -> Self {
        self.power_preference = preference;
        self
    }
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            resolution: 1.0,
            background_color: Color::BLACK,
            clear_before_render: true,
            power_preference: wgpu::PowerPreference::default(),
        }
    }
}

/// Counters for the last rendered frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub steps: u32,
    pub batches: u32,
    pub draw_calls: u32,
    pub pipeline_switches: u32,
}

struct FrameTarget<'a> {
    color: &'a wgpu::TextureView,
    stencil: &'a wgpu::TextureView,
    format: wgpu::TextureFormat,
    projection: Matrix,
    clear: Option<wgpu::Color>,
}

pub struct Renderer {
    device: Arc<Device>,
    queue: Arc<Queue>,
    context_uid: u32,
    options: RendererOptions,
    texture_layout: wgpu::BindGroupLayout,
    uniform_layout: wgpu::BindGroupLayout,
    pipelines: PipelineCache,
    state: WebGLState,
    textures: TextureManager,
    graphics: GraphicsRenderer,
    meshes: MeshRenderer,
    uniforms: GlBuffer,
    uniform_bind_group: wgpu::BindGroup,
    uniform_stride: u64,
    surface_stencil: Option<StencilBuffer>,
    last_stats: RenderStats,
}

impl Renderer {
    pub fn new(context: &GpuContext, options: RendererOptions) -> Self {
        let device = context.device.clone();
        let queue = context.queue.clone();

        let texture_layout = gl_texture::create_texture_bind_group_layout(&device);
        let uniform_layout = pipeline::create_uniform_bind_group_layout(&device);
        let pipelines = PipelineCache::new(&device, &uniform_layout, &texture_layout);
        let uniform_stride = pipeline::uniform_stride(&device);
        let uniforms = GlBuffer::new(
            &device,
            "stage2d uniforms",
            wgpu::BufferUsages::UNIFORM,
            uniform_stride * 64,
        );
        let uniform_bind_group = create_uniform_bind_group(&device, &uniform_layout, &uniforms);

        log::info!(
            "Renderer on context {} ({}x{} @{}x)",
            context.uid(),
            options.width,
            options.height,
            options.resolution
        );

        Self {
            meshes: MeshRenderer::new(&device),
            device,
            queue,
            context_uid: context.uid(),
            options,
            texture_layout,
            uniform_layout,
            pipelines,
            state: WebGLState::new(),
            textures: TextureManager::new(),
            graphics: GraphicsRenderer::new(),
            uniforms,
            uniform_bind_group,
            uniform_stride,
            surface_stencil: None,
            last_stats: RenderStats::default(),
        }
    }

    /// Uid of the context every cached resource belongs to.
    pub fn context_uid(&self) -> u32 {
        self.context_uid
    }

    pub fn options(&self) -> &RendererOptions {
        &self.options
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.options.width = width;
        self.options.height = height;
    }

    pub fn set_background_color(&mut self, color: Color) {
        self.options.background_color = color;
    }

    /// Fixed-function state applied to subsequent frames.
    pub fn state_mut(&mut self) -> &mut WebGLState {
        &mut self.state
    }

    pub fn textures(&self) -> &TextureManager {
        &self.textures
    }

    /// Release the GPU copy of `texture`; it is re-uploaded if drawn again.
    pub fn destroy_texture(&mut self, texture: &BaseTexture) -> bool {
        self.textures.destroy_texture(texture.id())
    }

    pub fn last_stats(&self) -> RenderStats {
        self.last_stats
    }

    /// An offscreen target in the texture format used for readback.
    pub fn create_framebuffer(&self, width: u32, height: u32) -> GlFramebuffer {
        GlFramebuffer::new(&self.device, width, height, TEXTURE_FORMAT)
    }

    fn projection(&self, width: u32, height: u32) -> Matrix {
        let resolution = if self.options.resolution > 0.0 {
            self.options.resolution
        } else {
            1.0
        };
        Matrix::projection(width as f32 / resolution, height as f32 / resolution)
    }

    fn clear_color(&self) -> Option<wgpu::Color> {
        self.options.clear_before_render.then(|| {
            let [r, g, b, a] = self.options.background_color.premultiplied();
            Color::rgba(r, g, b, a).to_wgpu()
        })
    }

    pub fn render_to_surface(
        &mut self,
        tree: &mut DisplayTree,
        root: NodeId,
        surface: &SurfaceState,
    ) -> Result<RenderStats> {
        let output = match surface.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost) | Err(wgpu::SurfaceError::Outdated) => {
                log::warn!("Surface lost, reconfiguring");
                surface.reconfigure();
                return Ok(RenderStats::default());
            }
            Err(e) => return Err(StageError::Surface(e.to_string())),
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let (width, height) = (surface.width(), surface.height());
        let mut stencil = self
            .surface_stencil
            .take()
            .unwrap_or_else(|| StencilBuffer::new(&self.device, width, height));
        stencil.ensure_size(&self.device, width, height);

        let target = FrameTarget {
            color: &view,
            stencil: stencil.view(),
            format: surface.format(),
            projection: self.projection(width, height),
            clear: self.clear_color(),
        };
        let stats = self.render_frame(tree, root, target);
        self.surface_stencil = Some(stencil);
        output.present();
        Ok(stats)
    }

    pub fn render_to_framebuffer(
        &mut self,
        tree: &mut DisplayTree,
        root: NodeId,
        framebuffer: &GlFramebuffer,
    ) -> RenderStats {
        let target = FrameTarget {
            color: framebuffer.color_view(),
            stencil: framebuffer.stencil_view(),
            format: framebuffer.format(),
            projection: self.projection(framebuffer.width(), framebuffer.height()),
            clear: self.clear_color(),
        };
        self.render_frame(tree, root, target)
    }

    /// Tightly packed RGBA8 rows of a framebuffer, premultiplied.
    pub fn extract_pixels(&self, framebuffer: &GlFramebuffer) -> Result<Vec<u8>> {
        framebuffer.read_pixels(&self.device, &self.queue)
    }

    /// Render `root` alone, cropped to its bounds, into a straight-alpha image.
    pub fn extract_image(
        &mut self,
        tree: &mut DisplayTree,
        root: NodeId,
    ) -> Result<image::RgbaImage> {
        if !tree.contains(root) {
            return Err(StageError::InvalidNode(root));
        }
        tree.update_transform(root);
        let bounds = tree.bounds(root);
        let resolution = self.options.resolution.max(f32::EPSILON);
        let width = (bounds.width * resolution).ceil().max(1.0) as u32;
        let height = (bounds.height * resolution).ceil().max(1.0) as u32;

        let framebuffer = self.create_framebuffer(width, height);
        let projection = self
            .projection(width, height)
            .then(&Matrix::from_translation(-bounds.x, -bounds.y));
        let target = FrameTarget {
            color: framebuffer.color_view(),
            stencil: framebuffer.stencil_view(),
            format: framebuffer.format(),
            projection,
            clear: Some(wgpu::Color::TRANSPARENT),
        };
        self.render_frame(tree, root, target);

        let mut pixels = self.extract_pixels(&framebuffer)?;
        unpremultiply(&mut pixels);
        image::RgbaImage::from_raw(width, height, pixels).ok_or_else(|| {
            StageError::Readback("pixel buffer does not match image size".to_string())
        })
    }

    fn step_key(&mut self, step: &RenderStep) -> PipelineKey {
        match step {
            RenderStep::Batch(batch) => {
                self.state.set_blend_mode(batch.blend);
                self.state.key(stencil::content_mode(batch.stencil_level))
            }
            RenderStep::Graphics(draw) => {
                self.state.set_blend_mode(draw.blend);
                self.state.key(stencil::content_mode(draw.stencil_level))
            }
            RenderStep::PushMask(mask) | RenderStep::PopMask(mask) => PipelineKey {
                flags: self.state.flags(),
                blend: BlendMode::Normal,
                stencil: mask.op.mode,
            },
        }
    }

    fn write_uniforms(&mut self, plan: &RenderPlan, projection: &Matrix) {
        if plan.steps.is_empty() {
            return;
        }
        let stride = self.uniform_stride as usize;
        let mut bytes = vec![0u8; stride * plan.steps.len()];
        for (i, step) in plan.steps.iter().enumerate() {
            let (transform, tint) = match step {
                RenderStep::Batch(_) => (*projection, [1.0; 4]),
                RenderStep::Graphics(draw) => (projection.then(&draw.world), draw.tint),
                RenderStep::PushMask(mask) | RenderStep::PopMask(mask) => {
                    (projection.then(&mask.world), [1.0; 4])
                }
            };
            let uniforms = DrawUniforms {
                transform: transform.to_mat4(),
                tint,
            };
            let offset = i * stride;
            bytes[offset..offset + std::mem::size_of::<DrawUniforms>()]
                .copy_from_slice(bytemuck::bytes_of(&uniforms));
        }
        if self.uniforms.upload(&self.device, &self.queue, &bytes) {
            self.uniform_bind_group =
                create_uniform_bind_group(&self.device, &self.uniform_layout, &self.uniforms);
        }
    }

    fn render_frame(
        &mut self,
        tree: &mut DisplayTree,
        root: NodeId,
        target: FrameTarget<'_>,
    ) -> RenderStats {
        tree.update_transform(root);
        let plan = build_render_plan(tree, root);

        self.graphics.begin_frame();
        for base in plan.textures() {
            self.textures
                .bind(&self.device, &self.queue, &self.texture_layout, base);
        }
        let white = Texture::white();
        self.textures
            .bind(&self.device, &self.queue, &self.texture_layout, white.base());
        for node in plan.graphics_nodes() {
            if let Some(graphics) = tree.get(node).and_then(|object| object.graphics()) {
                self.graphics.update(&self.device, &self.queue, graphics);
            }
        }
        self.meshes.upload(&self.device, &self.queue, &plan);
        self.write_uniforms(&plan, &target.projection);

        self.state.push();
        let keys: Vec<PipelineKey> = plan.steps.iter().map(|step| self.step_key(step)).collect();
        self.state.pop();
        for key in &keys {
            self.pipelines.prepare(&self.device, target.format, *key);
        }

        let mut stats = RenderStats {
            steps: plan.steps.len() as u32,
            batches: plan.batch_count() as u32,
            ..RenderStats::default()
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("stage2d frame encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("stage2d frame"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target.color,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: match target.clear {
                            Some(color) => wgpu::LoadOp::Clear(color),
                            None => wgpu::LoadOp::Load,
                        },
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: target.stencil,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(0),
                        store: wgpu::StoreOp::Discard,
                    }),
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            let white_group = self.textures.get(white.base().id()).map(|t| t.bind_group());
            let mut current_key: Option<PipelineKey> = None;
            let mut batch_bound = false;

            for (i, step) in plan.steps.iter().enumerate() {
                let key = keys[i];
                if current_key != Some(key) {
                    let Some(pipeline) = self.pipelines.get(target.format, key) else {
                        continue;
                    };
                    pass.set_pipeline(pipeline);
                    current_key = Some(key);
                    stats.pipeline_switches += 1;
                }
                let offset = (i as u64 * self.uniform_stride) as u32;
                pass.set_bind_group(0, &self.uniform_bind_group, &[offset]);

                match step {
                    RenderStep::Batch(batch) => {
                        let Some(texture) = self.textures.get(batch.texture.id()) else {
                            continue;
                        };
                        if !batch_bound {
                            if !self.meshes.bind(&mut pass) {
                                continue;
                            }
                            batch_bound = true;
                        }
                        pass.set_bind_group(1, texture.bind_group(), &[]);
                        pass.set_stencil_reference(batch.stencil_level);
                        self.meshes.draw(&mut pass, batch);
                    }
                    RenderStep::Graphics(GraphicsDraw {
                        node,
                        stencil_level: reference,
                        ..
                    })
                    | RenderStep::PushMask(MaskDraw {
                        node,
                        op: StencilOp { reference, .. },
                        ..
                    })
                    | RenderStep::PopMask(MaskDraw {
                        node,
                        op: StencilOp { reference, .. },
                        ..
                    }) => {
                        let data = tree
                            .get(*node)
                            .and_then(|object| object.graphics())
                            .and_then(|graphics| self.graphics.get(graphics.id()));
                        let (Some(data), Some(white_group)) = (data, white_group) else {
                            continue;
                        };
                        if !data.vao().bind(&mut pass) {
                            continue;
                        }
                        batch_bound = false;
                        pass.set_bind_group(1, white_group, &[]);
                        pass.set_stencil_reference(*reference);
                        pass.draw_indexed(0..data.vao().index_count(), 0, 0..1);
                    }
                }
                stats.draw_calls += 1;
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));

        let released = self.graphics.end_frame();
        let pruned = self.textures.prune();
        log::debug!(
            "Frame: {} steps, {} batches, {} draws, {} pipeline switches, {} graphics released, {} textures pruned",
            stats.steps,
            stats.batches,
            stats.draw_calls,
            stats.pipeline_switches,
            released,
            pruned
        );
        self.last_stats = stats;
        stats
    }
}

fn create_uniform_bind_group(
    device: &Device,
    layout: &wgpu::BindGroupLayout,
    uniforms: &GlBuffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("stage2d uniform bind group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: uniforms.buffer(),
                offset: 0,
                size: wgpu::BufferSize::new(std::mem::size_of::<DrawUniforms>() as u64),
            }),
        }],
    })
}

/// Convert premultiplied RGBA8 to straight alpha in place.
fn unpremultiply(pixels: &mut [u8]) {
    for px in pixels.chunks_exact_mut(4) {
        let a = px[3] as u32;
        if a == 0 || a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((*c as u32 * 255 + a / 2) / a).min(255) as u8;
        }
    }
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("context_uid", &self.context_uid)
            .field("textures", &self.textures.len())
            .field("graphics", &self.graphics.len())
            .field("pipelines", &self.pipelines.len())
            .finish()
    }
}

use std::collections::HashMap;

use wgpu::{Device, RenderPipeline, TextureFormat};

use super::framebuffer::STENCIL_FORMAT;
use super::state::{PipelineKey, StateFlags};
use super::vertex::Vertex;

const SHADER_SOURCE: &str = r#"
struct DrawUniforms {
    transform: mat4x4<f32>,
    tint: vec4<f32>,
}

@group(0) @binding(0) var<uniform> draw: DrawUniforms;
@group(1) @binding(0) var t_color: texture_2d<f32>;
@group(1) @binding(1) var s_color: sampler;

struct VertexInput {
    @location(0) position: vec2<f32>,
    @location(1) uv: vec2<f32>,
    @location(2) color: vec4<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) color: vec4<f32>,
}

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = draw.transform * vec4<f32>(in.position, 0.0, 1.0);
    out.uv = in.uv;
    // colors are premultiplied, so tinting is a plain product
    out.color = in.color * draw.tint;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(t_color, s_color, in.uv) * in.color;
}
"#;

/// Per-draw uniform block, written at a dynamic offset.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawUniforms {
    pub transform: [[f32; 4]; 4],
    pub tint: [f32; 4],
}

pub fn create_uniform_bind_group_layout(device: &Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("stage2d uniform layout"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: true,
                min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<DrawUniforms>() as u64),
            },
            count: None,
        }],
    })
}

/// Distance between consecutive [`DrawUniforms`] in the uniform buffer.
pub fn uniform_stride(device: &Device) -> u64 {
    let align = device.limits().min_uniform_buffer_offset_alignment as u64;
    let size = std::mem::size_of::<DrawUniforms>() as u64;
    size.div_ceil(align) * align
}

/// Render pipelines created on demand, one per target format and key.
pub struct PipelineCache {
    shader: wgpu::ShaderModule,
    layout: wgpu::PipelineLayout,
    pipelines: HashMap<(TextureFormat, PipelineKey), RenderPipeline>,
}

impl PipelineCache {
    pub fn new(
        device: &Device,
        uniform_layout: &wgpu::BindGroupLayout,
        texture_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("stage2d shader"),
            source: wgpu::ShaderSource::Wgsl(SHADER_SOURCE.into()),
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("stage2d pipeline layout"),
            bind_group_layouts: &[uniform_layout, texture_layout],
            immediate_size: 0,
        });

        Self {
            shader,
            layout,
            pipelines: HashMap::new(),
        }
    }

    pub fn prepare(&mut self, device: &Device, format: TextureFormat, key: PipelineKey) {
        if self.pipelines.contains_key(&(format, key)) {
            return;
        }
        log::debug!("Creating pipeline {:?} for {:?}", key, format);
        let pipeline = self.create(device, format, key);
        self.pipelines.insert((format, key), pipeline);
    }

    /// A pipeline previously created by [`PipelineCache::prepare`].
    pub fn get(&self, format: TextureFormat, key: PipelineKey) -> Option<&RenderPipeline> {
        self.pipelines.get(&(format, key))
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    fn create(&self, device: &Device, format: TextureFormat, key: PipelineKey) -> RenderPipeline {
        let flags = key.flags;
        let blend = flags
            .contains(StateFlags::BLEND)
            .then(|| key.blend.to_wgpu());
        let write_mask = if key.stencil.writes_color() {
            wgpu::ColorWrites::ALL
        } else {
            wgpu::ColorWrites::empty()
        };

        let stencil_face = key.stencil.to_wgpu();
        let depth_stencil = wgpu::DepthStencilState {
            format: STENCIL_FORMAT,
            depth_write_enabled: false,
            depth_compare: if flags.contains(StateFlags::DEPTH_TEST) {
                wgpu::CompareFunction::LessEqual
            } else {
                wgpu::CompareFunction::Always
            },
            stencil: wgpu::StencilState {
                front: stencil_face,
                back: stencil_face,
                read_mask: 0xff,
                write_mask: 0xff,
            },
            bias: if flags.contains(StateFlags::OFFSET) {
                wgpu::DepthBiasState {
                    constant: 1,
                    slope_scale: 1.0,
                    clamp: 0.0,
                }
            } else {
                wgpu::DepthBiasState::default()
            },
        };

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("stage2d pipeline"),
            layout: Some(&self.layout),
            vertex: wgpu::VertexState {
                module: &self.shader,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::desc()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &self.shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend,
                    write_mask,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: if flags.contains(StateFlags::WINDING) {
                    wgpu::FrontFace::Cw
                } else {
                    wgpu::FrontFace::Ccw
                },
                cull_mode: flags
                    .contains(StateFlags::CULL_FACE)
                    .then_some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(depth_stencil),
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        })
    }
}

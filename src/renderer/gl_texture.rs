//! GPU copies of [`BaseTexture`]s.

use std::collections::HashMap;

use wgpu::{Extent3d, TextureDimension, TextureUsages};

use crate::texture::{BaseTexture, ScaleMode, WeakBaseTexture, WrapMode};

pub const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Texture, view, sampler and bind group for one base texture.
pub struct GlTexture {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    width: u32,
    height: u32,
    version: u32,
    scale_mode: ScaleMode,
    wrap_mode: WrapMode,
}

impl GlTexture {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        base: &BaseTexture,
    ) -> Self {
        // zero-sized bases still need something bindable
        let width = base.width().max(1);
        let height = base.height().max(1);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("stage2d texture"),
            size: Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = create_sampler(device, base.scale_mode(), base.wrap_mode());
        let bind_group = create_bind_group(device, layout, &view, &sampler);

        let mut gl = Self {
            texture,
            bind_group,
            width: base.width(),
            height: base.height(),
            version: base.version(),
            scale_mode: base.scale_mode(),
            wrap_mode: base.wrap_mode(),
        };
        gl.write_pixels(queue, base);
        gl
    }

    fn write_pixels(&mut self, queue: &wgpu::Queue, base: &BaseTexture) {
        if !base.is_valid() {
            return;
        }
        let pixels = base.pixels();
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * base.width()),
                rows_per_image: Some(base.height()),
            },
            Extent3d {
                width: base.width(),
                height: base.height(),
                depth_or_array_layers: 1,
            },
        );
    }

    /// Bring this texture up to date with `base`.
    ///
    /// Same-sized pixel changes are written in place; size or sampler
    /// changes rebuild the GPU objects.
    pub fn update(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        base: &BaseTexture,
    ) {
        if self.version == base.version() {
            return;
        }
        let same_shape = self.width == base.width()
            && self.height == base.height()
            && self.scale_mode == base.scale_mode()
            && self.wrap_mode == base.wrap_mode();
        if same_shape {
            self.write_pixels(queue, base);
            self.version = base.version();
        } else {
            *self = GlTexture::new(device, queue, layout, base);
        }
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    pub fn version(&self) -> u32 {
        self.version
    }
}

fn create_sampler(device: &wgpu::Device, scale: ScaleMode, wrap: WrapMode) -> wgpu::Sampler {
    let filter = match scale {
        ScaleMode::Linear => wgpu::FilterMode::Linear,
        ScaleMode::Nearest => wgpu::FilterMode::Nearest,
    };
    let address = match wrap {
        WrapMode::Clamp => wgpu::AddressMode::ClampToEdge,
        WrapMode::Repeat => wgpu::AddressMode::Repeat,
        WrapMode::MirroredRepeat => wgpu::AddressMode::MirrorRepeat,
    };
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("stage2d sampler"),
        address_mode_u: address,
        address_mode_v: address,
        address_mode_w: address,
        mag_filter: filter,
        min_filter: filter,
        mipmap_filter: wgpu::MipmapFilterMode::Nearest,
        ..Default::default()
    })
}

pub(crate) fn create_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("stage2d texture bind group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

pub fn create_texture_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("stage2d texture layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}

struct Entry {
    source: WeakBaseTexture,
    texture: GlTexture,
}

/// GlTextures keyed by base texture id.
#[derive(Default)]
pub struct TextureManager {
    textures: HashMap<u64, Entry>,
}

impl TextureManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upload `base` if it is new or changed since the last upload.
    pub fn bind(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        base: &BaseTexture,
    ) {
        match self.textures.get_mut(&base.id()) {
            Some(entry) => {
                if entry.texture.version() != base.version() {
                    log::trace!("Re-uploading texture {} (v{})", base.id(), base.version());
                    entry.texture.update(device, queue, layout, base);
                }
            }
            None => {
                log::trace!(
                    "Uploading texture {} ({}x{})",
                    base.id(),
                    base.width(),
                    base.height()
                );
                self.textures.insert(
                    base.id(),
                    Entry {
                        source: base.downgrade(),
                        texture: GlTexture::new(device, queue, layout, base),
                    },
                );
            }
        }
    }

    pub fn get(&self, base_id: u64) -> Option<&GlTexture> {
        self.textures.get(&base_id).map(|entry| &entry.texture)
    }

    /// Drop the GPU copy of a texture. Returns whether one existed.
    pub fn destroy_texture(&mut self, base_id: u64) -> bool {
        self.textures.remove(&base_id).is_some()
    }

    /// Drop GPU copies whose base texture no longer exists.
    pub fn prune(&mut self) -> usize {
        let before = self.textures.len();
        self.textures.retain(|_, entry| entry.source.is_alive());
        let removed = before - self.textures.len();
        if removed > 0 {
            log::trace!("Released {} textures", removed);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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

    fn base(w: u32, h: u32) -> BaseTexture {
        BaseTexture::from_rgba(w, h, vec![255; (w * h * 4) as usize]).unwrap()
    }

    #[test]
    fn test_reupload_follows_base_version() {
        let Some(ctx) = context() else {
            return;
        };
        let layout = create_texture_bind_group_layout(&ctx.device);
        let mut manager = TextureManager::new();
        let texture = base(2, 2);

        manager.bind(&ctx.device, &ctx.queue, &layout, &texture);
        assert_eq!(manager.get(texture.id()).unwrap().version(), texture.version());

        texture.update(4, 2, vec![0; 32]).unwrap();
        assert_ne!(manager.get(texture.id()).unwrap().version(), texture.version());
        manager.bind(&ctx.device, &ctx.queue, &layout, &texture);
        assert_eq!(manager.get(texture.id()).unwrap().version(), texture.version());
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_prune_and_destroy() {
        let Some(ctx) = context() else {
            return;
        };
        let layout = create_texture_bind_group_layout(&ctx.device);
        let mut manager = TextureManager::new();
        let kept = base(1, 1);
        let dropped = base(1, 1);
        manager.bind(&ctx.device, &ctx.queue, &layout, &kept);
        manager.bind(&ctx.device, &ctx.queue, &layout, &dropped);
        assert_eq!(manager.len(), 2);

        let dropped_id = dropped.id();
        drop(dropped);
        assert_eq!(manager.prune(), 1);
        assert!(manager.get(dropped_id).is_none());

        assert!(manager.destroy_texture(kept.id()));
        assert!(!manager.destroy_texture(kept.id()));
        assert!(manager.is_empty());
    }
}

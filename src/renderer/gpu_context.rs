use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use wgpu::{Adapter, Device, Instance, Queue, Surface, SurfaceConfiguration};

use crate::error::{Result, StageError};

static NEXT_CONTEXT_UID: AtomicU32 = AtomicU32::new(1);

/// Instance, adapter, device and queue shared by renderers and surfaces.
///
/// Every context gets a process-unique [`GpuContext::uid`]; GPU resource
/// caches are only valid for the context they were created on.
pub struct GpuContext {
    pub instance: Instance,
    pub adapter: Adapter,
    pub device: Arc<Device>,
    pub queue: Arc<Queue>,
    uid: u32,
}

impl GpuContext {
    /// Headless context on the default adapter.
    pub fn new() -> Result<Self> {
        Self::with_power_preference(wgpu::PowerPreference::default())
    }

    pub fn with_power_preference(power_preference: wgpu::PowerPreference) -> Result<Self> {
        let instance = Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::from_env().unwrap_or(wgpu::Backends::PRIMARY),
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| StageError::NoAdapter(e.to_string()))?;

        let info = adapter.get_info();
        log::info!("Using adapter {} ({:?})", info.name, info.backend);

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("stage2d device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::default(),
            experimental_features: wgpu::ExperimentalFeatures::default(),
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| StageError::RequestDevice(e.to_string()))?;

        let uid = NEXT_CONTEXT_UID.fetch_add(1, Ordering::Relaxed);
        log::info!("GPU context {} ready", uid);

        Ok(Self {
            instance,
            adapter,
            device: Arc::new(device),
            queue: Arc::new(queue),
            uid,
        })
    }

    pub fn uid(&self) -> u32 {
        self.uid
    }

    /// Create and configure a surface for a native window.
    ///
    /// The window must outlive the returned surface.
    pub fn create_surface<W>(&self, window: W, width: u32, height: u32) -> Result<SurfaceState>
    where
        W: HasWindowHandle + HasDisplayHandle,
    {
        let surface = unsafe {
            let target = wgpu::SurfaceTargetUnsafe::from_window(&window)
                .map_err(|e| StageError::Surface(e.to_string()))?;
            self.instance
                .create_surface_unsafe(target)
                .map_err(|e| StageError::Surface(e.to_string()))?
        };

        if !self.adapter.is_surface_supported(&surface) {
            return Err(StageError::Surface(
                "adapter cannot present to this surface".to_string(),
            ));
        }

        let caps = surface.get_capabilities(&self.adapter);

        // non-sRGB 8-bit formats keep premultiplied blending linear in stored values
        let format = caps
            .formats
            .iter()
            .find(|f| {
                matches!(
                    f,
                    wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Rgba8Unorm
                )
            })
            .or_else(|| caps.formats.first())
            .copied()
            .ok_or_else(|| StageError::Surface("surface reports no formats".to_string()))?;

        log::info!("Using surface format: {:?}", format);

        let alpha_mode = if caps
            .alpha_modes
            .contains(&wgpu::CompositeAlphaMode::PreMultiplied)
        {
            wgpu::CompositeAlphaMode::PreMultiplied
        } else {
            caps.alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto)
        };

        let config = SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(&self.device, &config);

        Ok(SurfaceState {
            surface,
            config,
            device: self.device.clone(),
        })
    }
}

impl std::fmt::Debug for GpuContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuContext").field("uid", &self.uid).finish()
    }
}

pub struct SurfaceState {
    pub surface: Surface<'static>,
    pub config: SurfaceConfiguration,
    device: Arc<Device>,
}

impl SurfaceState {
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    /// Re-apply the current configuration after the surface was lost.
    pub fn reconfigure(&self) {
        self.surface.configure(&self.device, &self.config);
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn width(&self) -> u32 {
        self.config.width
    }

    pub fn height(&self) -> u32 {
        self.config.height
    }
}

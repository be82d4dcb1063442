use crate::gpu::WgpuSceneRenderer;
use crate::target::{DepthResolve, RenderTarget, needs_depth_resolve};
use offrender_common::ContextId;
use offrender_render::{GraphicsBackend, Platform, PlatformKind, RenderError};

/// A live device on the selected adapter.
pub struct Gpu {
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    /// Fixed-size target standing in for the context's default framebuffer.
    pub default_target: RenderTarget,
    /// Present when the adapter cannot copy depth textures to buffers.
    pub depth_resolve: Option<DepthResolve>,
}

impl Gpu {
    /// Run `f` inside a validation error scope, so device errors come back
    /// as [`RenderError::Device`] instead of reaching the uncaptured handler.
    pub fn validated<T>(
        &self,
        f: impl FnOnce() -> Result<T, RenderError>,
    ) -> Result<T, RenderError> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let result = f();
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(err) => Err(RenderError::Device(err.to_string())),
            None => result,
        }
    }
}

/// wgpu-backed graphics context.
///
/// - `HiddenWindow` requests a high-performance adapter on the native API.
/// - `Egl` picks the indexed adapter of the GL backend.
/// - `OsMesa` requests the software fallback adapter; it only renders into
///   its default target and must be recreated to change size.
pub struct WgpuPlatform {
    id: ContextId,
    kind: PlatformKind,
    width: u32,
    height: u32,
    gpu: Option<Gpu>,
}

impl WgpuPlatform {
    pub fn new(kind: PlatformKind, width: u32, height: u32) -> Self {
        Self {
            id: ContextId::new(),
            kind,
            width,
            height,
            gpu: None,
        }
    }

    pub fn gpu(&self) -> Result<&Gpu, RenderError> {
        self.gpu.as_ref().ok_or(RenderError::NoContext)
    }

    pub fn adapter_info(&self) -> Option<wgpu::AdapterInfo> {
        self.gpu.as_ref().map(|g| g.adapter.get_info())
    }
}

fn instance(backends: wgpu::Backends) -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends,
        ..Default::default()
    })
}

fn select_adapter(kind: PlatformKind) -> Result<wgpu::Adapter, RenderError> {
    match kind {
        PlatformKind::HiddenWindow => {
            let instance = instance(wgpu::Backends::PRIMARY);
            pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            }))
            .ok_or_else(|| RenderError::NoAdapter(kind.to_string()))
        }
        PlatformKind::Egl { device_index } => {
            let instance = instance(wgpu::Backends::GL);
            let adapters = instance.enumerate_adapters(wgpu::Backends::GL);
            let available = adapters.len();
            adapters.into_iter().nth(device_index).ok_or_else(|| {
                RenderError::NoAdapter(format!("{kind} ({available} devices available)"))
            })
        }
        PlatformKind::OsMesa => {
            let instance = instance(wgpu::Backends::all());
            pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::LowPower,
                compatible_surface: None,
                force_fallback_adapter: true,
            }))
            .ok_or_else(|| RenderError::NoAdapter(kind.to_string()))
        }
    }
}

impl Platform for WgpuPlatform {
    fn id(&self) -> ContextId {
        self.id
    }

    fn kind(&self) -> PlatformKind {
        self.kind
    }

    fn viewport(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn supports_framebuffers(&self) -> bool {
        !matches!(self.kind, PlatformKind::OsMesa)
    }

    fn init_context(&mut self) -> Result<(), RenderError> {
        if self.gpu.is_some() {
            return Ok(());
        }
        let adapter = select_adapter(self.kind)?;
        let info = adapter.get_info();
        let base_limits = if info.backend == wgpu::Backend::Gl {
            wgpu::Limits::downlevel_webgl2_defaults()
        } else {
            wgpu::Limits::downlevel_defaults()
        };
        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("offrender_device"),
                required_features: wgpu::Features::empty(),
                required_limits: base_limits.using_resolution(adapter.limits()),
                memory_hints: Default::default(),
            },
            None,
        ))
        .map_err(|e| RenderError::Device(e.to_string()))?;
        device.on_uncaptured_error(Box::new(|err: wgpu::Error| {
            tracing::error!(%err, "uncaptured device error");
        }));

        let resolve_depth = needs_depth_resolve(adapter.get_downlevel_capabilities().flags);
        tracing::info!(
            adapter = %info.name,
            backend = ?info.backend,
            device_type = ?info.device_type,
            resolve_depth,
            "graphics context initialized"
        );
        let default_target = RenderTarget::new(&device, self.width, self.height);
        let depth_resolve = resolve_depth.then(|| DepthResolve::new(&device));
        self.gpu = Some(Gpu {
            adapter,
            device,
            queue,
            default_target,
            depth_resolve,
        });
        Ok(())
    }

    fn make_current(&mut self) -> Result<(), RenderError> {
        self.gpu().map(|_| ())
    }

    fn delete_context(&mut self) -> Result<(), RenderError> {
        if let Some(gpu) = self.gpu.take() {
            let _ = gpu.device.poll(wgpu::Maintain::Wait);
            tracing::debug!(context = %self.id, "graphics context released");
        }
        Ok(())
    }
}

/// Creates [`WgpuPlatform`]s and [`WgpuSceneRenderer`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct WgpuBackend;

impl GraphicsBackend for WgpuBackend {
    type Platform = WgpuPlatform;
    type Renderer = WgpuSceneRenderer;

    fn create_platform(
        &mut self,
        kind: PlatformKind,
        width: u32,
        height: u32,
    ) -> Result<WgpuPlatform, RenderError> {
        Ok(WgpuPlatform::new(kind, width, height))
    }

    fn create_renderer(
        &mut self,
        platform: &mut WgpuPlatform,
        width: u32,
        height: u32,
    ) -> Result<WgpuSceneRenderer, RenderError> {
        WgpuSceneRenderer::new(platform.gpu()?, width, height)
    }
}

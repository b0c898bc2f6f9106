use crate::config::GpuConfig;
use crate::error::Result;

/// Headless GPU context owning the wgpu device and queue.
///
/// Textures are created without a surface; the device is only used to
/// allocate and upload sprite-sheet textures.
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_info: wgpu::AdapterInfo,
}

impl GpuContext {
    /// Initialize a headless GPU context, blocking the calling thread.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn new_blocking(config: GpuConfig) -> Result<Self> {
        pollster::block_on(Self::new(config))
    }

    /// Initialize a headless GPU context.
    ///
    /// Async so the same path serves WASM. On native, use
    /// [`GpuContext::new_blocking`].
    pub async fn new(config: GpuConfig) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: config.backends,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: config.power_preference,
                compatible_surface: None,
                force_fallback_adapter: config.force_fallback_adapter,
            })
            .await?;

        let adapter_info = adapter.get_info();
        log::info!(
            "GPU adapter: {} ({:?})",
            adapter_info.name,
            adapter_info.backend
        );

        // Downlevel limits keep the context usable on GL-only adapters
        let limits = wgpu::Limits::downlevel_webgl2_defaults().using_resolution(adapter.limits());

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Preload Device"),
                required_features: wgpu::Features::empty(),
                required_limits: limits,
                memory_hints: wgpu::MemoryHints::default(),
                experimental_features: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;

        Ok(Self {
            device,
            queue,
            adapter_info,
        })
    }

    /// Largest texture edge the device accepts.
    pub fn max_texture_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }
}

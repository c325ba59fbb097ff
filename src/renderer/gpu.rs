// renderer/gpu.rs
use std::sync::Arc;

use winit::{dpi::PhysicalSize, window::Window};

use crate::error::Result;
use crate::renderer::depth::{Depth, DEPTH_FORMAT};
use crate::renderer::render_states::RenderStates;
use crate::settings::RenderSettings;

/// Device, queue and swap chain shared by every sample.
pub struct GpuContext {
    surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    depth: Depth,
    msaa: Option<wgpu::TextureView>,
    sample_count: u32,
    frame_index: u64,
    render_states: RenderStates,
}

impl GpuContext {
    pub async fn new(window: Arc<Window>, settings: &RenderSettings) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;

        log::info!("Using adapter: {:?}", adapter.get_info());
        log::info!("Using backend: {:?}", adapter.get_info().backend);

        // wireframe passes fall back to fill when POLYGON_MODE_LINE is missing
        let optional = wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES
            | wgpu::Features::POLYGON_MODE_LINE;
        let required_features = adapter.features() & optional;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Device"),
                required_features,
                required_limits: wgpu::Limits::default(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: settings.present_mode(&surface_caps.present_modes),
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let sample_count = supported_sample_count(&adapter, format, settings.sample_count);
        let depth = Depth::new(&device, size, sample_count);
        let msaa = create_msaa_target(&device, &config, sample_count);
        let render_states = RenderStates::new(&device);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            depth,
            msaa,
            sample_count,
            frame_index: 0,
            render_states,
        })
    }

    pub fn config(&self) -> &wgpu::SurfaceConfiguration {
        &self.config
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn depth(&self) -> &Depth {
        &self.depth
    }

    pub fn depth_format(&self) -> wgpu::TextureFormat {
        DEPTH_FORMAT
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.size.width.max(1) as f32 / self.size.height.max(1) as f32
    }

    pub fn render_states(&self) -> &RenderStates {
        &self.render_states
    }

    /// Incremented once per presented frame; effects use it to recycle
    /// their constant buffer slots.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        self.depth = Depth::new(&self.device, new_size, self.sample_count);
        self.msaa = create_msaa_target(&self.device, &self.config, self.sample_count);
    }

    /// Acquires the next swap chain image, reconfiguring once if the surface went stale.
    /// Starts a new frame index once a surface texture is in hand, so constant
    /// rings restart even if drawing the frame later fails.
    pub fn acquire_frame(&mut self) -> Result<wgpu::SurfaceTexture> {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("Surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                self.surface.get_current_texture()?
            }
            Err(err) => return Err(err.into()),
        };
        self.frame_index += 1;
        Ok(frame)
    }

    /// Color attachment for the back buffer, rendering through the MSAA target when enabled.
    pub fn color_attachment<'a>(
        &'a self,
        frame_view: &'a wgpu::TextureView,
        load: wgpu::LoadOp<wgpu::Color>,
    ) -> wgpu::RenderPassColorAttachment<'a> {
        match &self.msaa {
            Some(msaa) => wgpu::RenderPassColorAttachment {
                view: msaa,
                depth_slice: None,
                resolve_target: Some(frame_view),
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
            },
            None => wgpu::RenderPassColorAttachment {
                view: frame_view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
            },
        }
    }

    /// Back buffer pass with the shared depth buffer, clearing both.
    pub fn begin_main_pass<'e>(
        &self,
        encoder: &'e mut wgpu::CommandEncoder,
        frame_view: &wgpu::TextureView,
        clear: wgpu::Color,
    ) -> wgpu::RenderPass<'e> {
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("MainPass"),
            color_attachments: &[Some(
                self.color_attachment(frame_view, wgpu::LoadOp::Clear(clear)),
            )],
            depth_stencil_attachment: Some(self.depth.clear_attachment()),
            timestamp_writes: None,
            occlusion_query_set: None,
        })
    }
}

fn supported_sample_count(adapter: &wgpu::Adapter, format: wgpu::TextureFormat, requested: u32) -> u32 {
    let color = adapter.get_texture_format_features(format).flags;
    let depth = adapter.get_texture_format_features(DEPTH_FORMAT).flags;
    if requested <= 1 {
        return 1;
    }
    if color.sample_count_supported(requested) && depth.sample_count_supported(requested) {
        requested
    } else {
        log::warn!(
            "Sample count {} not supported for {:?}, disabling MSAA",
            requested,
            format
        );
        1
    }
}

fn create_msaa_target(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    sample_count: u32,
) -> Option<wgpu::TextureView> {
    if sample_count <= 1 {
        return None;
    }
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("MsaaColor"),
        size: wgpu::Extent3d {
            width: config.width.max(1),
            height: config.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count,
        dimension: wgpu::TextureDimension::D2,
        format: config.format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    Some(texture.create_view(&wgpu::TextureViewDescriptor::default()))
}

// renderer/texture_render.rs
//! Off-screen render targets: a color+depth target and the deferred G-buffer.

use crate::renderer::depth::DEPTH_FORMAT;

fn create_target(
    device: &wgpu::Device,
    label: &str,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
    usage: wgpu::TextureUsages,
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

fn clear_target(view: &wgpu::TextureView) -> Option<wgpu::RenderPassColorAttachment<'_>> {
    Some(wgpu::RenderPassColorAttachment {
        view,
        depth_slice: None,
        resolve_target: None,
        ops: wgpu::Operations {
            load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
            store: wgpu::StoreOp::Store,
        },
    })
}

/// Color texture with its own depth buffer that later passes can sample.
pub struct TextureRender {
    label: String,
    format: wgpu::TextureFormat,
    color_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl TextureRender {
    pub fn new(device: &wgpu::Device, width: u32, height: u32, format: wgpu::TextureFormat, label: &str) -> Self {
        let usage = wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;
        let (_, color_view) = create_target(device, label, width, height, format, usage);
        let (_, depth_view) = create_target(
            device,
            &format!("{label}Depth"),
            width,
            height,
            DEPTH_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
        );
        log::debug!("Created render target {label} {width}x{height} {format:?}");
        Self {
            label: label.to_string(),
            format,
            color_view,
            depth_view,
            width: width.max(1),
            height: height.max(1),
        }
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if width == 0 || height == 0 || (width == self.width && height == self.height) {
            return;
        }
        *self = Self::new(device, width, height, self.format, &self.label);
    }

    /// Starts a pass that clears color to `clear` and depth to 1.
    pub fn begin<'e>(&self, encoder: &'e mut wgpu::CommandEncoder, clear: wgpu::Color) -> wgpu::RenderPass<'e> {
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(&self.label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.color_view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(0),
                    store: wgpu::StoreOp::Discard,
                }),
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        })
    }

    pub fn color_view(&self) -> &wgpu::TextureView {
        &self.color_view
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

pub const GBUFFER_NORMAL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const GBUFFER_ALBEDO_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
pub const GBUFFER_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Geometry buffer: view-independent normal + specular power, albedo + specular
/// intensity, and a sampleable depth buffer.
pub struct GBuffer {
    pub normal_spec: wgpu::TextureView,
    pub albedo: wgpu::TextureView,
    pub depth: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl GBuffer {
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let usage = wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;
        let (_, normal_spec) = create_target(device, "GBufferNormal", width, height, GBUFFER_NORMAL_FORMAT, usage);
        let (_, albedo) = create_target(device, "GBufferAlbedo", width, height, GBUFFER_ALBEDO_FORMAT, usage);
        let (_, depth) = create_target(device, "GBufferDepth", width, height, GBUFFER_DEPTH_FORMAT, usage);
        log::info!("Created G-buffer {}x{}", width, height);
        Self {
            normal_spec,
            albedo,
            depth,
            width: width.max(1),
            height: height.max(1),
        }
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if width == 0 || height == 0 || (width == self.width && height == self.height) {
            return;
        }
        *self = Self::new(device, width, height);
    }

    pub fn color_formats() -> [wgpu::TextureFormat; 2] {
        [GBUFFER_NORMAL_FORMAT, GBUFFER_ALBEDO_FORMAT]
    }

    /// Geometry pass clearing every target.
    pub fn begin<'e>(&self, encoder: &'e mut wgpu::CommandEncoder) -> wgpu::RenderPass<'e> {
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("GBufferPass"),
            color_attachments: &[clear_target(&self.normal_spec), clear_target(&self.albedo)],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

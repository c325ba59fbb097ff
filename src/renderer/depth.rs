use winit::dpi::PhysicalSize;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;

/// Depth-stencil buffer matching the swap chain size.
pub struct Depth {
    pub view: wgpu::TextureView,
    pub format: wgpu::TextureFormat,
    pub sample_count: u32,
}

impl Depth {
    pub fn new(device: &wgpu::Device, size: PhysicalSize<u32>, sample_count: u32) -> Self {
        let tex = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth"),
            size: wgpu::Extent3d {
                width: size.width.max(1),
                height: size.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = tex.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            view,
            format: DEPTH_FORMAT,
            sample_count,
        }
    }

    /// Clears depth to 1 and stencil to 0 at the start of the pass.
    pub fn clear_attachment(&self) -> wgpu::RenderPassDepthStencilAttachment<'_> {
        wgpu::RenderPassDepthStencilAttachment {
            view: &self.view,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(1.0),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(0),
                store: wgpu::StoreOp::Store,
            }),
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_format_has_stencil() {
        assert!(DEPTH_FORMAT.has_stencil_aspect());
        assert!(DEPTH_FORMAT.has_depth_aspect());
    }
}

// renderer/shadow_render.rs

pub const SHADOW_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Depth texture array rendered from the light, one layer per shadow map.
pub struct ShadowRender {
    _texture: wgpu::Texture,
    array_view: wgpu::TextureView,
    layer_views: Vec<wgpu::TextureView>,
    size: u32,
}

impl ShadowRender {
    pub fn new(device: &wgpu::Device, label: &str, size: u32, layers: u32) -> Self {
        let layers = layers.max(1);
        let size = size.max(1);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: layers,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SHADOW_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });

        let array_view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(&format!("{label}ArrayView")),
            format: Some(SHADOW_FORMAT),
            dimension: Some(wgpu::TextureViewDimension::D2Array),
            aspect: wgpu::TextureAspect::DepthOnly,
            base_array_layer: 0,
            array_layer_count: Some(layers),
            ..Default::default()
        });

        let layer_views = (0..layers)
            .map(|layer| {
                texture.create_view(&wgpu::TextureViewDescriptor {
                    label: Some(&format!("{label}Layer{layer}")),
                    format: Some(SHADOW_FORMAT),
                    dimension: Some(wgpu::TextureViewDimension::D2),
                    aspect: wgpu::TextureAspect::DepthOnly,
                    base_array_layer: layer,
                    array_layer_count: Some(1),
                    ..Default::default()
                })
            })
            .collect();

        log::info!("Created shadow map {label}: {size}x{size}, {layers} layer(s)");
        Self {
            _texture: texture,
            array_view,
            layer_views,
            size,
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn layer_count(&self) -> usize {
        self.layer_views.len()
    }

    pub fn array_view(&self) -> &wgpu::TextureView {
        &self.array_view
    }

    /// View of one layer, clamped to the last one.
    pub fn layer_view(&self, index: usize) -> &wgpu::TextureView {
        let clamped = index.min(self.layer_views.len() - 1);
        if clamped != index {
            log::warn!("Shadow layer {} clamped to {}", index, clamped);
        }
        &self.layer_views[clamped]
    }

    /// Depth-only pass into one layer, cleared to the far plane.
    pub fn begin<'e>(&self, encoder: &'e mut wgpu::CommandEncoder, layer: usize) -> wgpu::RenderPass<'e> {
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("ShadowPass"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: self.layer_view(layer),
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

    /// Size of one shadow texel in texture coordinates.
    pub fn texel_size(&self) -> f32 {
        1.0 / self.size as f32
    }
}

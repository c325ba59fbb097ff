// renderer/effects/mod.rs
//! Effects: shader programs plus the parameters and passes that drive them.

pub mod basic;
pub mod blur;
pub mod cascaded;
pub mod deferred;
pub mod screen_quad;
pub mod shadow;
pub mod skybox;

use glam::Mat4;

use crate::error::Result;
use crate::renderer::gpu::GpuContext;
use crate::renderer::lights::Material;

pub use basic::BasicEffect;
pub use blur::BlurEffect;
pub use cascaded::CascadedShadowEffect;
pub use deferred::DeferredEffect;
pub use screen_quad::ScreenQuadEffect;
pub use shadow::ShadowEffect;
pub use skybox::SkyboxEffect;

pub trait Effect {
    /// Uploads pending parameters and binds the active pass.
    fn apply(&mut self, gpu: &GpuContext, rpass: &mut wgpu::RenderPass<'_>) -> Result<()>;
}

pub trait EffectTransforms {
    fn set_world(&mut self, world: &Mat4) -> Result<()>;
    fn set_view(&mut self, view: &Mat4) -> Result<()>;
    fn set_proj(&mut self, proj: &Mat4) -> Result<()>;
}

pub trait EffectMaterial {
    fn set_material(&mut self, material: &Material) -> Result<()>;
    /// `None` falls back to an untextured white surface.
    fn set_diffuse_texture(&mut self, view: Option<&wgpu::TextureView>) -> Result<()>;
}

pub(crate) fn create_shader(device: &wgpu::Device, label: &str, source: &str) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    })
}

/// 1x1 depth texture bound where a shadow map is optional.
pub(crate) fn placeholder_depth(device: &wgpu::Device, dimension: wgpu::TextureViewDimension) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("PlaceholderDepth"),
        size: wgpu::Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: crate::renderer::shadow_render::SHADOW_FORMAT,
        usage: wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor {
        dimension: Some(dimension),
        ..Default::default()
    })
}

// renderer/effects/skybox.rs

use glam::{Mat3, Mat4};

use crate::error::Result;
use crate::renderer::depth::DEPTH_FORMAT;
use crate::renderer::effect_helper::{EffectHelper, RenderPassDesc, ResourceKind};
use crate::renderer::effects::{create_shader, Effect};
use crate::renderer::gpu::GpuContext;
use crate::renderer::render_states::{dss_less_equal, rs_no_cull};
use crate::renderer::vertex::{VertexFormat, VertexPos};

pub const PASS_SKYBOX: &str = "Skybox";

/// Cube-map sky drawn on the far plane around the camera.
pub struct SkyboxEffect {
    helper: EffectHelper,
}

impl SkyboxEffect {
    pub fn new(gpu: &GpuContext, sky: &wgpu::TextureView) -> Result<Self> {
        let device = &gpu.device;
        let mut helper = EffectHelper::builder("SkyboxEffect")
            .add_constant_buffer("CBChangesEveryFrame", 0, 64, wgpu::ShaderStages::VERTEX)
            .add_variable("g_ViewProj", 0, 0, 64)
            .add_resource(
                "g_TexCube",
                1,
                wgpu::ShaderStages::FRAGMENT,
                ResourceKind::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    dimension: wgpu::TextureViewDimension::Cube,
                },
            )
            .add_resource(
                "g_Sam",
                2,
                wgpu::ShaderStages::FRAGMENT,
                ResourceKind::Sampler(wgpu::SamplerBindingType::Filtering),
            )
            .build(device)?;

        let shader = create_shader(device, "Skybox", include_str!("../../shader/skybox.wgsl"));
        helper.add_render_pass(
            PASS_SKYBOX,
            RenderPassDesc::new(&shader)
                .vertex("vs_sky", Some(VertexPos::layout()))
                .fragment("fs_sky")
                .color_target(gpu.surface_format())
                .depth(dss_less_equal(DEPTH_FORMAT))
                .rasterizer(rs_no_cull())
                .samples(gpu.sample_count()),
        );
        helper.set_texture("g_TexCube", sky)?;
        helper.set_sampler("g_Sam", gpu.render_states().linear_wrap())?;
        Ok(Self { helper })
    }

    /// Camera view and projection; the view's translation is dropped.
    pub fn set_view_proj(&mut self, view: &Mat4, proj: &Mat4) -> Result<()> {
        let rotation_only = Mat4::from_mat3(Mat3::from_mat4(*view));
        self.helper.set_mat4("g_ViewProj", &(*proj * rotation_only))
    }

}

impl Effect for SkyboxEffect {
    fn apply(&mut self, gpu: &GpuContext, rpass: &mut wgpu::RenderPass<'_>) -> Result<()> {
        self.helper.get_pass(PASS_SKYBOX)?.apply(gpu, rpass)
    }
}

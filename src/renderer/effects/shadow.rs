// renderer/effects/shadow.rs

use glam::Mat4;

use crate::error::Result;
use crate::renderer::effect_helper::{EffectHelper, RenderPassDesc};
use crate::renderer::effects::{create_shader, Effect, EffectTransforms};
use crate::renderer::gpu::GpuContext;
use crate::renderer::render_states::{dss_default, rs_shadow};
use crate::renderer::shadow_render::SHADOW_FORMAT;
use crate::renderer::vertex::{VertexFormat, VertexPosNormalTex};

pub(crate) const SHADER: &str = include_str!("../../shader/shadow.wgsl");

pub const PASS_DEPTH: &str = "Depth";

/// Constant and slope-scaled bias applied while rendering depth from the light.
pub const DEPTH_BIAS: (i32, f32) = (2, 2.0);

/// Builds the helper shared by every depth-only light pass.
pub(crate) fn depth_helper(gpu: &GpuContext, label: &str, pass: &str) -> Result<EffectHelper> {
    let device = &gpu.device;
    let mut helper = EffectHelper::builder(label)
        .add_constant_buffer("CBChangesEveryObjectDrawing", 0, 64, wgpu::ShaderStages::VERTEX)
        .add_variable("g_World", 0, 0, 64)
        .add_constant_buffer("CBChangesEveryLight", 1, 64, wgpu::ShaderStages::VERTEX)
        .add_variable("g_LightViewProj", 1, 0, 64)
        .build(device)?;

    let shader = create_shader(device, label, SHADER);
    helper.add_render_pass(
        pass,
        RenderPassDesc::new(&shader)
            .vertex("vs_depth", Some(VertexPosNormalTex::layout()))
            .depth_only()
            .depth(dss_default(SHADOW_FORMAT))
            .rasterizer(rs_shadow(DEPTH_BIAS.0, DEPTH_BIAS.1)),
    );
    Ok(helper)
}

/// Renders scene depth from a light into a `ShadowRender` layer.
pub struct ShadowEffect {
    helper: EffectHelper,
    view: Mat4,
    proj: Mat4,
}

impl ShadowEffect {
    pub fn new(gpu: &GpuContext) -> Result<Self> {
        Ok(Self {
            helper: depth_helper(gpu, "ShadowEffect", PASS_DEPTH)?,
            view: Mat4::IDENTITY,
            proj: Mat4::IDENTITY,
        })
    }

    fn write_view_proj(&mut self) -> Result<()> {
        let view_proj = self.proj * self.view;
        self.helper.set_mat4("g_LightViewProj", &view_proj)
    }
}

impl Effect for ShadowEffect {
    fn apply(&mut self, gpu: &GpuContext, rpass: &mut wgpu::RenderPass<'_>) -> Result<()> {
        self.helper.get_pass(PASS_DEPTH)?.apply(gpu, rpass)
    }
}

impl EffectTransforms for ShadowEffect {
    fn set_world(&mut self, world: &Mat4) -> Result<()> {
        self.helper.set_mat4("g_World", world)
    }

    /// Light view matrix.
    fn set_view(&mut self, view: &Mat4) -> Result<()> {
        self.view = *view;
        self.write_view_proj()
    }

    /// Light projection matrix.
    fn set_proj(&mut self, proj: &Mat4) -> Result<()> {
        self.proj = *proj;
        self.write_view_proj()
    }
}

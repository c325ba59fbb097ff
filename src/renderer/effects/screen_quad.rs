// renderer/effects/screen_quad.rs

use crate::error::Result;
use crate::renderer::effect_helper::{EffectHelper, RenderPassDesc, ResourceKind};
use crate::renderer::effects::{create_shader, Effect};
use crate::renderer::gpu::GpuContext;
use crate::renderer::render_states::{dss_no_depth_test, rs_no_cull};
use crate::renderer::vertex::{VertexFormat, VertexPosTex};

pub const PASS_BLIT: &str = "Blit";

/// Copies a texture onto a quad built by `geometry::create_2d_show`.
pub struct ScreenQuadEffect {
    helper: EffectHelper,
}

impl ScreenQuadEffect {
    /// Draws into the main pass: back buffer format, MSAA and the shared depth buffer.
    pub fn new(gpu: &GpuContext) -> Result<Self> {
        Self::for_target(
            gpu,
            gpu.surface_format(),
            gpu.sample_count(),
            Some(gpu.depth_format()),
        )
    }

    /// `depth_format` must match the depth attachment of the pass, if any.
    pub fn for_target(
        gpu: &GpuContext,
        format: wgpu::TextureFormat,
        sample_count: u32,
        depth_format: Option<wgpu::TextureFormat>,
    ) -> Result<Self> {
        let device = &gpu.device;
        let mut helper = EffectHelper::builder("ScreenQuadEffect")
            .add_resource("g_Tex", 0, wgpu::ShaderStages::FRAGMENT, ResourceKind::float_2d())
            .add_resource(
                "g_Sam",
                1,
                wgpu::ShaderStages::FRAGMENT,
                ResourceKind::Sampler(wgpu::SamplerBindingType::Filtering),
            )
            .build(device)?;

        let shader = create_shader(device, "ScreenQuad", include_str!("../../shader/fullscreen.wgsl"));
        let mut desc = RenderPassDesc::new(&shader)
            .vertex("vs_quad", Some(VertexPosTex::layout()))
            .fragment("fs_quad")
            .color_target(format)
            .rasterizer(rs_no_cull())
            .samples(sample_count);
        if let Some(depth_format) = depth_format {
            desc = desc.depth(dss_no_depth_test(depth_format));
        }
        helper.add_render_pass(PASS_BLIT, desc);
        helper.set_sampler("g_Sam", gpu.render_states().linear_clamp())?;
        Ok(Self { helper })
    }

    pub fn set_texture(&mut self, view: &wgpu::TextureView) -> Result<()> {
        self.helper.set_texture("g_Tex", view)
    }

    pub fn set_sampler(&mut self, sampler: &wgpu::Sampler) -> Result<()> {
        self.helper.set_sampler("g_Sam", sampler)
    }
}

impl Effect for ScreenQuadEffect {
    fn apply(&mut self, gpu: &GpuContext, rpass: &mut wgpu::RenderPass<'_>) -> Result<()> {
        self.helper.get_pass(PASS_BLIT)?.apply(gpu, rpass)
    }
}

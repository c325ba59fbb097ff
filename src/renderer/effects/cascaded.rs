// renderer/effects/cascaded.rs
//! Cascaded shadow mapping: a depth pass per cascade into one layer of a
//! `ShadowRender` array, then a forward pass that picks the cascade by view
//! depth and filters it with PCF.

use glam::{Mat4, Vec3, Vec4};

use crate::error::Result;
use crate::renderer::depth::DEPTH_FORMAT;
use crate::renderer::effect_helper::{EffectHelper, RenderPassDesc, ResourceKind};
use crate::renderer::effects::{create_shader, placeholder_depth, shadow, Effect, EffectMaterial, EffectTransforms};
use crate::renderer::gpu::GpuContext;
use crate::renderer::lights::{DirectionalLight, DirectionalLightRaw, Material, MaterialRaw};
use crate::renderer::render_states::dss_default;
use crate::renderer::shadow_render::ShadowRender;
use crate::renderer::texture::Texture;
use crate::renderer::vertex::{VertexFormat, VertexPosNormalTex};
use crate::scene::cascaded_shadow::{CascadedShadowManager, MAX_CASCADES};

const SHADER: &str = concat!(
    include_str!("../../shader/lighting.wgsl"),
    include_str!("../../shader/cascade.wgsl")
);

pub const PASS_CASCADE_DEPTH: &str = "CascadeDepth";
pub const PASS_CASCADE_LIT: &str = "CascadeLit";

pub struct CascadedShadowEffect {
    depth: EffectHelper,
    lit: EffectHelper,
    white: Texture,
    depth_only: bool,
    view: Mat4,
    proj: Mat4,
    cascade_view_proj: Vec<Mat4>,
    // cascade count, pcf radius, depth bias, texel size
    params: Vec4,
}

impl CascadedShadowEffect {
    pub fn new(gpu: &GpuContext) -> Result<Self> {
        let device = &gpu.device;
        let depth = shadow::depth_helper(gpu, "CascadeDepthEffect", PASS_CASCADE_DEPTH)?;

        let stages = wgpu::ShaderStages::VERTEX_FRAGMENT;
        let mut lit = EffectHelper::builder("CascadeLitEffect")
            .add_constant_buffer("CBChangesEveryObjectDrawing", 0, 192, stages)
            .add_variable("g_World", 0, 0, 64)
            .add_variable("g_WorldInvTranspose", 0, 64, 64)
            .add_variable("g_Material", 0, 128, 64)
            .add_constant_buffer("CBChangesEveryFrame", 1, 272, stages)
            .add_variable("g_ViewProj", 1, 0, 64)
            .add_variable("g_View", 1, 64, 64)
            .add_variable("g_LightView", 1, 128, 64)
            .add_variable("g_EyePosW", 1, 192, 12)
            .add_variable("g_DirLight", 1, 208, 64)
            .add_constant_buffer("CBCascades", 2, 320, wgpu::ShaderStages::FRAGMENT)
            .add_variable("g_CascadeOffset", 2, 0, 128)
            .add_variable("g_CascadeScale", 2, 128, 128)
            .add_variable("g_CascadeFrustumsEyeSpaceDepths", 2, 256, 32)
            .add_variable("g_CascadeParams", 2, 288, 16)
            .add_variable("g_VisualizeCascades", 2, 304, 4)
            .add_resource("g_DiffuseMap", 3, wgpu::ShaderStages::FRAGMENT, ResourceKind::float_2d())
            .add_resource(
                "g_Sam",
                4,
                wgpu::ShaderStages::FRAGMENT,
                ResourceKind::Sampler(wgpu::SamplerBindingType::Filtering),
            )
            .add_resource(
                "g_ShadowMap",
                5,
                wgpu::ShaderStages::FRAGMENT,
                ResourceKind::depth(wgpu::TextureViewDimension::D2Array),
            )
            .add_resource(
                "g_SamShadow",
                6,
                wgpu::ShaderStages::FRAGMENT,
                ResourceKind::Sampler(wgpu::SamplerBindingType::Comparison),
            )
            .build(device)?;

        let shader = create_shader(device, "Cascade", SHADER);
        lit.add_render_pass(
            PASS_CASCADE_LIT,
            RenderPassDesc::new(&shader)
                .vertex("vs_cascade", Some(VertexPosNormalTex::layout()))
                .fragment("fs_cascade")
                .color_target(gpu.surface_format())
                .depth(dss_default(DEPTH_FORMAT))
                .samples(gpu.sample_count()),
        );

        let white = Texture::white(device, &gpu.queue);
        lit.set_texture("g_DiffuseMap", &white.view)?;
        lit.set_sampler("g_Sam", gpu.render_states().anisotropic_wrap())?;
        lit.set_texture(
            "g_ShadowMap",
            &placeholder_depth(device, wgpu::TextureViewDimension::D2Array),
        )?;
        lit.set_sampler("g_SamShadow", gpu.render_states().shadow_pcf())?;

        let mut effect = Self {
            depth,
            lit,
            white,
            depth_only: false,
            view: Mat4::IDENTITY,
            proj: Mat4::IDENTITY,
            cascade_view_proj: Vec::new(),
            params: Vec4::new(1.0, 1.0, 0.001, 1.0 / 2048.0),
        };
        effect.set_world(&Mat4::IDENTITY)?;
        effect.set_material(&Material::default())?;
        effect.set_dir_light(&DirectionalLight::default())?;
        effect.set_visualize(false)?;
        effect.write_params()?;
        Ok(effect)
    }

    /// Switches between the per-cascade depth pass and the lit pass.
    pub fn set_depth_only(&mut self, enabled: bool) {
        self.depth_only = enabled;
    }

    /// Selects which cascade the depth pass renders.
    pub fn set_cascade_level(&mut self, level: usize) -> Result<()> {
        let last = self.cascade_view_proj.len().saturating_sub(1);
        let view_proj = self
            .cascade_view_proj
            .get(level.min(last))
            .copied()
            .unwrap_or(Mat4::IDENTITY);
        self.depth.set_mat4("g_LightViewProj", &view_proj)
    }

    /// Copies the current cascade projections out of `manager`.
    pub fn set_cascades(&mut self, manager: &CascadedShadowManager) -> Result<()> {
        let cascades = manager.cascades();
        let mut offsets = [[0.0f32; 4]; MAX_CASCADES];
        let mut scales = [[0.0f32; 4]; MAX_CASCADES];
        let mut splits = [0.0f32; MAX_CASCADES];
        for (i, cascade) in cascades.iter().take(MAX_CASCADES).enumerate() {
            offsets[i] = cascade.texture_offset.extend(0.0).to_array();
            scales[i] = cascade.texture_scale.extend(1.0).to_array();
            splits[i] = cascade.split_far;
        }
        self.cascade_view_proj = cascades.iter().map(|c| c.view_proj).collect();

        self.lit.set_pod("g_CascadeOffset", &offsets)?;
        self.lit.set_pod("g_CascadeScale", &scales)?;
        self.lit
            .set_pod("g_CascadeFrustumsEyeSpaceDepths", &splits)?;
        self.lit.set_mat4("g_LightView", &manager.light_view())?;

        let settings = manager.settings();
        self.params.x = cascades.len().max(1) as f32;
        self.params.y = settings.pcf_blur_size as f32;
        self.params.w = 1.0 / settings.shadow_map_size.max(1) as f32;
        self.write_params()
    }

    pub fn set_shadow_map(&mut self, shadow_map: &ShadowRender) -> Result<()> {
        self.params.w = shadow_map.texel_size();
        self.lit.set_texture("g_ShadowMap", shadow_map.array_view())?;
        self.write_params()
    }

    fn write_params(&mut self) -> Result<()> {
        self.lit.set_vec4("g_CascadeParams", self.params)
    }

    /// Tints each cascade a different color.
    pub fn set_visualize(&mut self, enabled: bool) -> Result<()> {
        self.lit
            .set_float("g_VisualizeCascades", if enabled { 1.0 } else { 0.0 })
    }

    pub fn set_dir_light(&mut self, light: &DirectionalLight) -> Result<()> {
        self.lit.set_pod("g_DirLight", &DirectionalLightRaw::from(light))
    }

    pub fn set_eye_pos(&mut self, eye: Vec3) -> Result<()> {
        self.lit.set_vec3("g_EyePosW", eye)
    }

    fn write_view_proj(&mut self) -> Result<()> {
        self.lit.set_mat4("g_ViewProj", &(self.proj * self.view))
    }
}

impl Effect for CascadedShadowEffect {
    fn apply(&mut self, gpu: &GpuContext, rpass: &mut wgpu::RenderPass<'_>) -> Result<()> {
        if self.depth_only {
            self.depth.get_pass(PASS_CASCADE_DEPTH)?.apply(gpu, rpass)
        } else {
            self.lit.get_pass(PASS_CASCADE_LIT)?.apply(gpu, rpass)
        }
    }
}

impl EffectTransforms for CascadedShadowEffect {
    fn set_world(&mut self, world: &Mat4) -> Result<()> {
        if self.depth_only {
            return self.depth.set_mat4("g_World", world);
        }
        self.lit.set_mat4("g_World", world)?;
        self.lit
            .set_mat4("g_WorldInvTranspose", &world.inverse().transpose())
    }

    fn set_view(&mut self, view: &Mat4) -> Result<()> {
        self.view = *view;
        self.lit.set_mat4("g_View", view)?;
        self.write_view_proj()
    }

    fn set_proj(&mut self, proj: &Mat4) -> Result<()> {
        self.proj = *proj;
        self.write_view_proj()
    }
}

impl EffectMaterial for CascadedShadowEffect {
    fn set_material(&mut self, material: &Material) -> Result<()> {
        self.lit.set_pod("g_Material", &MaterialRaw::from(material))
    }

    fn set_diffuse_texture(&mut self, view: Option<&wgpu::TextureView>) -> Result<()> {
        let view = view.unwrap_or(&self.white.view);
        self.lit.set_texture("g_DiffuseMap", view)
    }
}

// renderer/effects/basic.rs
//! Forward-lit effect: materials, up to five lights of each kind, an optional
//! diffuse texture, linear fog and a single shadow map.

use glam::{Mat4, Vec3, Vec4};

use crate::error::Result;
use crate::renderer::depth::DEPTH_FORMAT;
use crate::renderer::effect_helper::{EffectHelper, RenderPassDesc, ResourceKind};
use crate::renderer::effects::{create_shader, placeholder_depth, Effect, EffectMaterial, EffectTransforms};
use crate::renderer::gpu::GpuContext;
use crate::renderer::lights::{DirectionalLight, LightBlock, Material, MaterialRaw, PointLight, SpotLight};
use crate::renderer::render_states::{self, dss_default, dss_no_depth_write, BlendPreset, RasterizerState};
use crate::renderer::shadow_render::ShadowRender;
use crate::renderer::texture::Texture;
use crate::renderer::vertex::{VertexFormat, VertexPosNormalTex};

const SHADER: &str = concat!(
    include_str!("../../shader/lighting.wgsl"),
    include_str!("../../shader/basic.wgsl")
);

pub const PASS_BASIC: &str = "Basic";
pub const PASS_WIREFRAME: &str = "BasicWireframe";
pub const PASS_TRANSPARENT: &str = "BasicTransparent";

pub struct BasicEffect {
    helper: EffectHelper,
    white: Texture,
    placeholder_shadow: wgpu::TextureView,
    lights: LightBlock,
    // start, range, enabled
    fog: Vec4,
    // enabled, depth bias, texel size
    shadow: Vec4,
    pass: &'static str,
}

impl BasicEffect {
    /// Effect drawing into the swap chain.
    pub fn new(gpu: &GpuContext) -> Result<Self> {
        Self::for_target(gpu, gpu.surface_format(), gpu.sample_count())
    }

    /// Effect drawing into a color target of `format` paired with the standard depth buffer.
    pub fn for_target(gpu: &GpuContext, format: wgpu::TextureFormat, sample_count: u32) -> Result<Self> {
        let device = &gpu.device;
        let stages = wgpu::ShaderStages::VERTEX_FRAGMENT;
        let mut helper = EffectHelper::builder("BasicEffect")
            .add_constant_buffer("CBChangesEveryDrawing", 0, 208, stages)
            .add_variable("g_World", 0, 0, 64)
            .add_variable("g_WorldInvTranspose", 0, 64, 64)
            .add_variable("g_Material", 0, 128, 64)
            .add_variable("g_ObjectFlags", 0, 192, 16)
            .add_constant_buffer("CBChangesEveryFrame", 1, 144, stages)
            .add_variable("g_View", 1, 0, 64)
            .add_variable("g_EyePosW", 1, 64, 12)
            .add_variable("g_ShadowTransform", 1, 80, 64)
            .add_constant_buffer("CBChangesOnResize", 2, 64, stages)
            .add_variable("g_Proj", 2, 0, 64)
            .add_constant_buffer("CBChangesRarely", 3, 1264, stages)
            .add_variable("g_Lights", 3, 0, std::mem::size_of::<LightBlock>())
            .add_variable("g_FogColor", 3, 1216, 16)
            .add_variable("g_FogParams", 3, 1232, 16)
            .add_variable("g_ShadowParams", 3, 1248, 16)
            .add_resource("g_DiffuseMap", 4, wgpu::ShaderStages::FRAGMENT, ResourceKind::float_2d())
            .add_resource(
                "g_Sam",
                5,
                wgpu::ShaderStages::FRAGMENT,
                ResourceKind::Sampler(wgpu::SamplerBindingType::Filtering),
            )
            .add_resource(
                "g_ShadowMap",
                6,
                wgpu::ShaderStages::FRAGMENT,
                ResourceKind::depth(wgpu::TextureViewDimension::D2),
            )
            .add_resource(
                "g_SamShadow",
                7,
                wgpu::ShaderStages::FRAGMENT,
                ResourceKind::Sampler(wgpu::SamplerBindingType::Comparison),
            )
            .build(device)?;

        let shader = create_shader(device, "Basic", SHADER);
        let base = RenderPassDesc::new(&shader)
            .vertex("vs_main", Some(VertexPosNormalTex::layout()))
            .color_target(format)
            .depth(dss_default(DEPTH_FORMAT))
            .samples(sample_count);
        helper.add_render_pass(PASS_BASIC, base.clone());
        helper.add_render_pass(PASS_WIREFRAME, base.clone().rasterizer(render_states::rs_wireframe()));
        helper.add_render_pass(
            PASS_TRANSPARENT,
            base.rasterizer(render_states::rs_no_cull())
                .blend(render_states::bs_transparent())
                .depth(dss_no_depth_write(DEPTH_FORMAT)),
        );

        let white = Texture::white(device, &gpu.queue);
        let placeholder_shadow = placeholder_depth(device, wgpu::TextureViewDimension::D2);

        helper.set_texture("g_DiffuseMap", &white.view)?;
        helper.set_sampler("g_Sam", gpu.render_states().linear_wrap())?;
        helper.set_texture("g_ShadowMap", &placeholder_shadow)?;
        helper.set_sampler("g_SamShadow", gpu.render_states().shadow_pcf())?;

        let mut effect = Self {
            helper,
            white,
            placeholder_shadow,
            lights: LightBlock::new(),
            fog: Vec4::new(5.0, 15.0, 0.0, 0.0),
            shadow: Vec4::new(0.0, 0.0005, 0.0, 0.0),
            pass: PASS_BASIC,
        };
        effect.set_world(&Mat4::IDENTITY)?;
        effect.set_material(&Material::default())?;
        effect.set_shadow_transform(&Mat4::IDENTITY)?;
        effect.set_fog_color(Vec4::new(0.75, 0.75, 0.75, 1.0))?;
        effect.write_fog()?;
        effect.write_shadow()?;
        effect.write_lights()?;
        Ok(effect)
    }

    pub fn set_render_default(&mut self) {
        self.pass = PASS_BASIC;
    }

    pub fn set_render_wireframe(&mut self) {
        self.pass = PASS_WIREFRAME;
    }

    /// Alpha blending with depth writes off; draw after opaque geometry.
    pub fn set_render_transparent(&mut self) {
        self.pass = PASS_TRANSPARENT;
    }

    /// Culls with clockwise front faces in the default pass, exposing inner faces.
    pub fn set_cull_clockwise(&mut self, enabled: bool) -> Result<()> {
        let rasterizer = if enabled {
            render_states::rs_cull_clockwise()
        } else {
            RasterizerState::default()
        };
        self.helper.get_pass(PASS_BASIC)?.set_rasterizer(rasterizer);
        Ok(())
    }

    pub fn set_transparent_blend(&mut self, blend: BlendPreset) -> Result<()> {
        self.helper.get_pass(PASS_TRANSPARENT)?.set_blend(blend);
        Ok(())
    }

    pub fn set_eye_pos(&mut self, eye: Vec3) -> Result<()> {
        self.helper.set_vec3("g_EyePosW", eye)
    }

    pub fn set_dir_light(&mut self, index: usize, light: &DirectionalLight) -> Result<()> {
        self.lights.set_directional(index, light);
        self.write_lights()
    }

    pub fn set_point_light(&mut self, index: usize, light: &PointLight) -> Result<()> {
        self.lights.set_point(index, light);
        self.write_lights()
    }

    pub fn set_spot_light(&mut self, index: usize, light: &SpotLight) -> Result<()> {
        self.lights.set_spot(index, light);
        self.write_lights()
    }

    pub fn set_light_counts(&mut self, directional: usize, point: usize, spot: usize) -> Result<()> {
        self.lights.set_counts(directional, point, spot);
        self.write_lights()
    }

    fn write_lights(&mut self) -> Result<()> {
        self.helper.set_pod("g_Lights", &self.lights)
    }

    pub fn set_fog_state(&mut self, enabled: bool) -> Result<()> {
        self.fog.z = if enabled { 1.0 } else { 0.0 };
        self.write_fog()
    }

    pub fn set_fog_start(&mut self, start: f32) -> Result<()> {
        self.fog.x = start;
        self.write_fog()
    }

    pub fn set_fog_range(&mut self, range: f32) -> Result<()> {
        self.fog.y = range.max(1e-3);
        self.write_fog()
    }

    pub fn set_fog_color(&mut self, color: Vec4) -> Result<()> {
        self.helper.set_vec4("g_FogColor", color)
    }

    fn write_fog(&mut self) -> Result<()> {
        self.helper.set_vec4("g_FogParams", self.fog)
    }

    /// Binds a shadow map rendered by a light, or turns shadowing off with `None`.
    pub fn set_shadow_map(&mut self, shadow_map: Option<&ShadowRender>) -> Result<()> {
        match shadow_map {
            Some(map) => {
                self.helper.set_texture("g_ShadowMap", map.layer_view(0))?;
                self.shadow.x = 1.0;
                self.shadow.z = map.texel_size();
            }
            None => {
                self.helper.set_texture("g_ShadowMap", &self.placeholder_shadow)?;
                self.shadow.x = 0.0;
            }
        }
        self.write_shadow()
    }

    /// World to shadow texture space: light view-projection followed by the NDC-to-texture mapping.
    pub fn set_shadow_transform(&mut self, transform: &Mat4) -> Result<()> {
        self.helper.set_mat4("g_ShadowTransform", transform)
    }

    fn write_shadow(&mut self) -> Result<()> {
        self.helper.set_vec4("g_ShadowParams", self.shadow)
    }

    pub fn set_texture_sampler(&mut self, sampler: &wgpu::Sampler) -> Result<()> {
        self.helper.set_sampler("g_Sam", sampler)
    }
}

impl Effect for BasicEffect {
    fn apply(&mut self, gpu: &GpuContext, rpass: &mut wgpu::RenderPass<'_>) -> Result<()> {
        self.helper.get_pass(self.pass)?.apply(gpu, rpass)
    }
}

impl EffectTransforms for BasicEffect {
    fn set_world(&mut self, world: &Mat4) -> Result<()> {
        self.helper.set_mat4("g_World", world)?;
        self.helper
            .set_mat4("g_WorldInvTranspose", &world.inverse().transpose())
    }

    fn set_view(&mut self, view: &Mat4) -> Result<()> {
        self.helper.set_mat4("g_View", view)
    }

    fn set_proj(&mut self, proj: &Mat4) -> Result<()> {
        self.helper.set_mat4("g_Proj", proj)
    }
}

impl EffectMaterial for BasicEffect {
    fn set_material(&mut self, material: &Material) -> Result<()> {
        self.helper.set_pod("g_Material", &MaterialRaw::from(material))
    }

    fn set_diffuse_texture(&mut self, view: Option<&wgpu::TextureView>) -> Result<()> {
        match view {
            Some(view) => {
                self.helper.set_texture("g_DiffuseMap", view)?;
                self.helper.set_vec4("g_ObjectFlags", Vec4::new(1.0, 0.0, 0.0, 0.0))
            }
            None => {
                self.helper.set_texture("g_DiffuseMap", &self.white.view)?;
                self.helper.set_vec4("g_ObjectFlags", Vec4::ZERO)
            }
        }
    }
}

// renderer/effects/deferred.rs
//! Two-stage deferred shading: a geometry pass fills the G-buffer, then a
//! full-screen pass lights every pixel from it.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};

use crate::error::Result;
use crate::renderer::effect_helper::{EffectHelper, RenderPassDesc, ResourceKind};
use crate::renderer::effects::{create_shader, Effect, EffectTransforms};
use crate::renderer::gpu::GpuContext;
use crate::renderer::render_states::{dss_default, rs_no_cull};
use crate::renderer::texture_render::{GBuffer, GBUFFER_DEPTH_FORMAT};
use crate::renderer::vertex::{VertexFormat, VertexPosNormalTex};

pub const PASS_GBUFFER: &str = "GBuffer";
pub const PASS_LIGHTING: &str = "Lighting";

pub const MAX_DEFERRED_POINT_LIGHTS: usize = 64;

/// What the lighting pass writes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GBufferView {
    #[default]
    Lit,
    Normals,
    Albedo,
    Depth,
}

impl GBufferView {
    fn index(self) -> u32 {
        match self {
            GBufferView::Lit => 0,
            GBufferView::Normals => 1,
            GBufferView::Albedo => 2,
            GBufferView::Depth => 3,
        }
    }

    pub fn next(self) -> Self {
        match self {
            GBufferView::Lit => GBufferView::Normals,
            GBufferView::Normals => GBufferView::Albedo,
            GBufferView::Albedo => GBufferView::Depth,
            GBufferView::Depth => GBufferView::Lit,
        }
    }
}

/// Point light as the lighting pass reads it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DeferredPointLight {
    pub position: Vec3,
    pub range: f32,
    pub color: Vec3,
    pub intensity: f32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct DeferredPointLightRaw {
    position_range: [f32; 4],
    color_intensity: [f32; 4],
}

impl From<&DeferredPointLight> for DeferredPointLightRaw {
    fn from(light: &DeferredPointLight) -> Self {
        Self {
            position_range: light.position.extend(light.range).to_array(),
            color_intensity: light.color.extend(light.intensity).to_array(),
        }
    }
}

pub struct DeferredEffect {
    geometry: EffectHelper,
    lighting: EffectHelper,
    view: Mat4,
    proj: Mat4,
    light_count: usize,
}

impl DeferredEffect {
    /// `output_format` and `sample_count` describe the target of the lighting pass.
    pub fn new(gpu: &GpuContext, output_format: wgpu::TextureFormat, sample_count: u32) -> Result<Self> {
        let device = &gpu.device;

        let mut geometry = EffectHelper::builder("DeferredGeometry")
            .add_constant_buffer("CBChangesEveryObjectDrawing", 0, 160, wgpu::ShaderStages::VERTEX_FRAGMENT)
            .add_variable("g_World", 0, 0, 64)
            .add_variable("g_WorldInvTranspose", 0, 64, 64)
            .add_variable("g_Albedo", 0, 128, 16)
            .add_variable("g_SpecularPower", 0, 144, 4)
            .add_constant_buffer("CBChangesEveryFrame", 1, 64, wgpu::ShaderStages::VERTEX)
            .add_variable("g_ViewProj", 1, 0, 64)
            .build(device)?;
        let geometry_shader = create_shader(
            device,
            "DeferredGeometry",
            include_str!("../../shader/deferred_geometry.wgsl"),
        );
        let [normal_format, albedo_format] = GBuffer::color_formats();
        geometry.add_render_pass(
            PASS_GBUFFER,
            RenderPassDesc::new(&geometry_shader)
                .vertex("vs_geometry", Some(VertexPosNormalTex::layout()))
                .fragment("fs_geometry")
                .color_target(normal_format)
                .color_target(albedo_format)
                .depth(dss_default(GBUFFER_DEPTH_FORMAT)),
        );

        let point_buffer_size = MAX_DEFERRED_POINT_LIGHTS * std::mem::size_of::<DeferredPointLightRaw>();
        let unfilterable = ResourceKind::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: false },
            dimension: wgpu::TextureViewDimension::D2,
        };
        let mut lighting = EffectHelper::builder("DeferredLighting")
            .add_constant_buffer("CBLightingFrame", 0, 160, wgpu::ShaderStages::FRAGMENT)
            .add_variable("g_InvViewProj", 0, 0, 64)
            .add_variable("g_EyePosW", 0, 64, 12)
            .add_variable("g_DirLightDir", 0, 80, 12)
            .add_variable("g_DirLightColor", 0, 96, 16)
            .add_variable("g_Ambient", 0, 112, 16)
            .add_variable("g_Background", 0, 128, 16)
            .add_variable("g_PointLightCount", 0, 144, 4)
            .add_variable("g_DebugView", 0, 148, 4)
            .add_constant_buffer("CBPointLights", 1, point_buffer_size, wgpu::ShaderStages::FRAGMENT)
            .add_variable("g_PointLights", 1, 0, point_buffer_size)
            .add_resource("g_GBufferNormal", 2, wgpu::ShaderStages::FRAGMENT, unfilterable)
            .add_resource("g_GBufferAlbedo", 3, wgpu::ShaderStages::FRAGMENT, unfilterable)
            .add_resource(
                "g_GBufferDepth",
                4,
                wgpu::ShaderStages::FRAGMENT,
                ResourceKind::depth(wgpu::TextureViewDimension::D2),
            )
            .build(device)?;
        let lighting_shader = create_shader(
            device,
            "DeferredLighting",
            include_str!("../../shader/deferred_lighting.wgsl"),
        );
        lighting.add_render_pass(
            PASS_LIGHTING,
            RenderPassDesc::new(&lighting_shader)
                .vertex("vs_fullscreen", None)
                .fragment("fs_lighting")
                .color_target(output_format)
                .rasterizer(rs_no_cull())
                .samples(sample_count),
        );

        let mut effect = Self {
            geometry,
            lighting,
            view: Mat4::IDENTITY,
            proj: Mat4::IDENTITY,
            light_count: 0,
        };
        effect.set_material(Vec3::ONE, 0.5, 32.0)?;
        effect.set_dir_light(Vec3::new(0.57735, -0.57735, 0.57735), Vec3::splat(0.6))?;
        effect.set_ambient(Vec3::splat(0.15))?;
        Ok(effect)
    }

    fn write_matrices(&mut self) -> Result<()> {
        let view_proj = self.proj * self.view;
        self.geometry.set_mat4("g_ViewProj", &view_proj)?;
        self.lighting.set_mat4("g_InvViewProj", &view_proj.inverse())?;
        let eye = self.view.inverse().w_axis.truncate();
        self.lighting.set_vec3("g_EyePosW", eye)
    }

    /// Albedo, specular intensity and power for the next draw.
    pub fn set_material(&mut self, albedo: Vec3, specular_intensity: f32, specular_power: f32) -> Result<()> {
        self.geometry
            .set_vec4("g_Albedo", albedo.extend(specular_intensity))?;
        self.geometry.set_float("g_SpecularPower", specular_power)
    }

    /// `direction` is the way the light travels.
    pub fn set_dir_light(&mut self, direction: Vec3, color: Vec3) -> Result<()> {
        self.lighting
            .set_vec3("g_DirLightDir", direction.normalize_or(Vec3::NEG_Y))?;
        self.lighting.set_vec4("g_DirLightColor", color.extend(1.0))
    }

    pub fn set_ambient(&mut self, color: Vec3) -> Result<()> {
        self.lighting.set_vec4("g_Ambient", color.extend(1.0))
    }

    /// Color written where no geometry was drawn.
    pub fn set_background(&mut self, color: Vec4) -> Result<()> {
        self.lighting.set_vec4("g_Background", color)
    }

    /// Lights beyond the first 64 are ignored.
    pub fn set_point_lights(&mut self, lights: &[DeferredPointLight]) -> Result<()> {
        if lights.len() > MAX_DEFERRED_POINT_LIGHTS {
            log::warn!(
                "{} point lights requested, only {} are shaded",
                lights.len(),
                MAX_DEFERRED_POINT_LIGHTS
            );
        }
        let mut raw = [DeferredPointLightRaw::zeroed(); MAX_DEFERRED_POINT_LIGHTS];
        for (dst, light) in raw.iter_mut().zip(lights) {
            *dst = light.into();
        }
        self.light_count = lights.len().min(MAX_DEFERRED_POINT_LIGHTS);
        self.lighting.set_slice("g_PointLights", &raw)?;
        self.lighting.set_uint("g_PointLightCount", self.light_count as u32)
    }

    pub fn set_debug_view(&mut self, view: GBufferView) -> Result<()> {
        self.lighting.set_uint("g_DebugView", view.index())
    }

    /// Points the lighting pass at the targets of `gbuffer`.
    pub fn set_gbuffer(&mut self, gbuffer: &GBuffer) -> Result<()> {
        self.lighting.set_texture("g_GBufferNormal", &gbuffer.normal_spec)?;
        self.lighting.set_texture("g_GBufferAlbedo", &gbuffer.albedo)?;
        self.lighting.set_texture("g_GBufferDepth", &gbuffer.depth)
    }

    /// Binds the geometry pass; draw into `GBuffer::begin`.
    pub fn apply_geometry(&mut self, gpu: &GpuContext, rpass: &mut wgpu::RenderPass<'_>) -> Result<()> {
        self.geometry.get_pass(PASS_GBUFFER)?.apply(gpu, rpass)
    }

    /// Binds the lighting pass and draws the full-screen triangle.
    pub fn draw_lighting(&mut self, gpu: &GpuContext, rpass: &mut wgpu::RenderPass<'_>) -> Result<()> {
        self.lighting.get_pass(PASS_LIGHTING)?.apply(gpu, rpass)?;
        rpass.draw(0..3, 0..1);
        Ok(())
    }
}

/// Applying the effect as a whole binds the geometry pass.
impl Effect for DeferredEffect {
    fn apply(&mut self, gpu: &GpuContext, rpass: &mut wgpu::RenderPass<'_>) -> Result<()> {
        self.apply_geometry(gpu, rpass)
    }
}

impl EffectTransforms for DeferredEffect {
    fn set_world(&mut self, world: &Mat4) -> Result<()> {
        self.geometry.set_mat4("g_World", world)?;
        self.geometry
            .set_mat4("g_WorldInvTranspose", &world.inverse().transpose())
    }

    fn set_view(&mut self, view: &Mat4) -> Result<()> {
        self.view = *view;
        self.write_matrices()
    }

    fn set_proj(&mut self, proj: &Mat4) -> Result<()> {
        self.proj = *proj;
        self.write_matrices()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_light_packs_range_and_intensity() {
        let light = DeferredPointLight {
            position: Vec3::new(1.0, 2.0, 3.0),
            range: 8.0,
            color: Vec3::new(0.5, 0.25, 1.0),
            intensity: 2.0,
        };
        let raw = DeferredPointLightRaw::from(&light);
        assert_eq!(raw.position_range, [1.0, 2.0, 3.0, 8.0]);
        assert_eq!(raw.color_intensity, [0.5, 0.25, 1.0, 2.0]);
        assert_eq!(std::mem::size_of::<DeferredPointLightRaw>(), 32);
    }

    #[test]
    fn debug_views_cycle() {
        let mut view = GBufferView::Lit;
        for expected in [1, 2, 3, 0] {
            view = view.next();
            assert_eq!(view.index(), expected);
        }
    }
}

// samples/textured.rs
//! Textured scene with a gradient skybox, fog, a transparent box,
//! frustum culling and crosshair picking.
//!
//! WASD/QE fly, right drag looks around, M cycles the texture sampler,
//! F toggles fog, B switches the glass between alpha and additive blending.

use glam::{Vec3, Vec4};
use winit::keyboard::KeyCode;

use crate::app::{FrameContext, Sample};
use crate::error::Result;
use crate::renderer::effects::{BasicEffect, Effect, EffectTransforms, SkyboxEffect};
use crate::renderer::gpu::GpuContext;
use crate::renderer::mesh::Mesh;
use crate::renderer::render_states::{self, SamplerKind};
use crate::renderer::texture::Texture;
use crate::renderer::vertex::VertexPos;
use crate::samples::common::{self, CLEAR_COLOR};
use crate::scene::camera::FirstPersonCamera;
use crate::scene::game_object::{cull_objects, GameObject};
use crate::scene::geometry;

const HORIZON: Vec4 = Vec4::new(0.75, 0.8, 0.85, 1.0);
const ZENITH: Vec4 = Vec4::new(0.2, 0.4, 0.8, 1.0);
/// Optional crate image; a checkerboard stands in when it is missing.
const CRATE_TEXTURE: &str = "assets/crate.png";

/// Samplers usable on a filtering texture slot, in cycling order.
fn texture_samplers() -> Vec<SamplerKind> {
    SamplerKind::ALL
        .into_iter()
        .filter(|kind| !kind.is_comparison())
        .collect()
}

struct TexturedState {
    basic: BasicEffect,
    sky: SkyboxEffect,
    sky_mesh: Mesh,
    objects: Vec<GameObject>,
    names: Vec<&'static str>,
    glass: GameObject,
}

pub struct TexturedSample {
    state: Option<TexturedState>,
    camera: FirstPersonCamera,
    samplers: Vec<SamplerKind>,
    sampler_index: usize,
    fog: bool,
    additive_glass: bool,
    visible: usize,
    picked: Option<&'static str>,
}

impl TexturedSample {
    pub fn new() -> Self {
        let mut camera = FirstPersonCamera::default();
        camera.set_position(Vec3::new(0.0, 2.0, 10.0));
        camera.look_at(Vec3::new(0.0, 1.0, 0.0), Vec3::Y);

        Self {
            state: None,
            camera,
            samplers: texture_samplers(),
            sampler_index: 0,
            fog: false,
            additive_glass: false,
            visible: 0,
            picked: None,
        }
    }

    fn sampler_kind(&self) -> SamplerKind {
        self.samplers
            .get(self.sampler_index)
            .copied()
            .unwrap_or(SamplerKind::LinearWrap)
    }
}

impl Default for TexturedSample {
    fn default() -> Self {
        Self::new()
    }
}

impl Sample for TexturedSample {
    fn title(&self) -> &str {
        "Textures and Samplers"
    }

    fn init(&mut self, gpu: &mut GpuContext) -> Result<()> {
        let device = &gpu.device;
        let queue = &gpu.queue;
        self.camera.camera = {
            let mut camera = common::camera_for(gpu, 0.1, 200.0);
            camera.transform = self.camera.camera.transform;
            camera
        };

        let floor_tex = Texture::checkerboard(
            device,
            queue,
            256,
            32,
            [210, 210, 210, 255],
            [70, 70, 70, 255],
            Some("FloorChecker"),
        );
        let crate_tex = Texture::from_path(device, queue, CRATE_TEXTURE, true).unwrap_or_else(|err| {
            log::info!("Using a generated crate texture ({})", err);
            Texture::checkerboard(
                device,
                queue,
                128,
                16,
                [190, 130, 70, 255],
                [120, 75, 35, 255],
                Some("CrateChecker"),
            )
        });
        let sky_tex = Texture::sky_gradient(device, queue, 128, HORIZON, ZENITH);

        let floor = common::upload(device, &geometry::create_plane(40.0, 40.0, 10.0, 10.0), "Floor");
        let cube = common::upload(device, &geometry::create_box(2.0, 2.0, 2.0), "Crate");
        let pillar = common::upload(device, &geometry::create_cylinder(0.5, 4.0, 24, 1), "Pillar");

        let white = common::material(Vec4::ONE, 16.0);
        let mut objects = vec![common::textured_object(&floor, white, &floor_tex.view, Vec3::ZERO)];
        let mut names = vec!["Floor"];
        for i in 0..6 {
            let angle = i as f32 * std::f32::consts::TAU / 6.0;
            let position = Vec3::new(7.0 * angle.cos(), 1.0, 7.0 * angle.sin());
            let mut crate_obj = common::textured_object(&cube, white, &crate_tex.view, position);
            crate_obj.transform.rotate_axis(Vec3::Y, angle);
            objects.push(crate_obj);
            names.push("Crate");
        }
        for x in [-12.0, 12.0] {
            objects.push(common::object(
                &pillar,
                common::material(Vec4::new(0.8, 0.75, 0.7, 1.0), 32.0),
                Vec3::new(x, 2.0, -4.0),
            ));
            names.push("Pillar");
        }

        let glass = common::object(
            &cube,
            common::material(Vec4::new(0.4, 0.7, 1.0, 0.4), 64.0),
            Vec3::new(0.0, 1.0, 0.0),
        );

        let mut basic = BasicEffect::new(gpu)?;
        basic.set_proj(&self.camera.camera.proj_matrix())?;
        basic.set_dir_light(0, &common::sun(Vec3::new(-0.4, -1.0, -0.6)))?;
        basic.set_fog_color(HORIZON)?;
        basic.set_fog_start(8.0)?;
        basic.set_fog_range(40.0)?;
        basic.set_fog_state(self.fog)?;
        basic.set_texture_sampler(gpu.render_states().sampler(self.sampler_kind()))?;

        let sky = SkyboxEffect::new(gpu, &sky_tex.view)?;
        let sky_mesh = Mesh::new::<VertexPos>(device, &geometry::create_sphere(10.0, 16, 16), "SkySphere");

        self.state = Some(TexturedState {
            basic,
            sky,
            sky_mesh,
            objects,
            names,
            glass,
        });
        Ok(())
    }

    fn on_resize(&mut self, gpu: &mut GpuContext) -> Result<()> {
        common::fit_viewport(&mut self.camera.camera, gpu);
        let proj = self.camera.camera.proj_matrix();
        common::ready(&mut self.state)?.basic.set_proj(&proj)
    }

    fn update_scene(&mut self, ctx: &mut FrameContext<'_>) -> Result<()> {
        common::fly(&mut self.camera, ctx.input, ctx.dt);
        // stay above the floor
        let position = &mut self.camera.camera.transform.position;
        position.y = position.y.max(0.5);

        let sampler_changed = ctx.input.key_pressed(KeyCode::KeyM);
        if sampler_changed {
            self.sampler_index = (self.sampler_index + 1) % self.samplers.len().max(1);
            log::info!("Texture sampler: {:?}", self.sampler_kind());
        }
        if ctx.input.key_pressed(KeyCode::KeyF) {
            self.fog = !self.fog;
        }
        let blend_changed = ctx.input.key_pressed(KeyCode::KeyB);
        if blend_changed {
            self.additive_glass = !self.additive_glass;
        }

        let camera = self.camera.camera;
        let frustum = camera.frustum();
        let viewport = camera.viewport;
        let ray = camera.screen_to_ray(viewport.x + viewport.width * 0.5, viewport.y + viewport.height * 0.5);
        let sampler = ctx.gpu.render_states().sampler(self.sampler_kind());
        let fog = self.fog;
        let glass_blend = if self.additive_glass {
            render_states::bs_additive()
        } else {
            render_states::bs_transparent()
        };

        let state = common::ready(&mut self.state)?;
        self.visible = cull_objects(&mut state.objects, &frustum);
        self.picked = state
            .objects
            .iter()
            .zip(&state.names)
            .filter(|(object, _)| object.visible)
            .filter_map(|(object, name)| {
                ray.hit_oriented_box(&object.bounding_oriented_box())
                    .map(|t| (t, *name))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, name)| name);

        let view = camera.view_matrix();
        state.basic.set_view(&view)?;
        state.basic.set_eye_pos(camera.position())?;
        state.basic.set_fog_state(fog)?;
        if sampler_changed {
            state.basic.set_texture_sampler(sampler)?;
        }
        if blend_changed {
            state.basic.set_transparent_blend(glass_blend)?;
        }
        state.sky.set_view_proj(&view, &camera.proj_matrix())?;
        Ok(())
    }

    fn draw_scene(
        &mut self,
        gpu: &mut GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        frame_view: &wgpu::TextureView,
    ) -> Result<()> {
        let state = common::ready(&mut self.state)?;
        let mut rpass = gpu.begin_main_pass(encoder, frame_view, CLEAR_COLOR);

        state.basic.set_render_default();
        for object in &state.objects {
            object.draw_lit(gpu, &mut rpass, &mut state.basic)?;
        }

        // sky fills whatever the opaque geometry left at the far plane
        state.sky.apply(gpu, &mut rpass)?;
        state.sky_mesh.draw(&mut rpass);

        state.basic.set_render_transparent();
        state.glass.draw_lit(gpu, &mut rpass, &mut state.basic)?;
        state.basic.set_render_default();
        Ok(())
    }

    fn status(&self) -> Option<String> {
        Some(format!(
            "Sampler: {:?}  Fog: {}  Visible: {}  Target: {}",
            self.sampler_kind(),
            if self.fog { "on" } else { "off" },
            self.visible,
            self.picked.unwrap_or("none")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampler_cycle_skips_the_comparison_sampler() {
        let kinds = texture_samplers();
        assert_eq!(kinds.len(), SamplerKind::ALL.len() - 1);
        assert!(kinds.iter().all(|k| !k.is_comparison()));
        assert_eq!(kinds[0], SamplerKind::LinearWrap);
    }

    #[test]
    fn status_reports_the_sampler_and_fog() {
        let sample = TexturedSample::new();
        let status = sample.status().unwrap();
        assert!(status.contains("LinearWrap"));
        assert!(status.contains("Fog: off"));
    }
}

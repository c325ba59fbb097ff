// samples/lighting.rs
//! Phong lighting of a few primitives with a directional, point or spot light.
//! 1/2/3 pick the light, W toggles wireframe, C culls clockwise faces;
//! drag to orbit, scroll to zoom.

use glam::{Vec3, Vec4};
use winit::keyboard::KeyCode;

use crate::app::{FrameContext, Sample};
use crate::error::Result;
use crate::renderer::effects::{BasicEffect, EffectTransforms};
use crate::renderer::gpu::GpuContext;
use crate::renderer::lights::{DirectionalLight, PointLight, SpotLight};
use crate::samples::common::{self, CLEAR_COLOR};
use crate::scene::camera::ThirdPersonCamera;
use crate::scene::game_object::GameObject;
use crate::scene::geometry;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LightKind {
    Directional,
    Point,
    Spot,
}

impl LightKind {
    fn name(self) -> &'static str {
        match self {
            LightKind::Directional => "Directional",
            LightKind::Point => "Point",
            LightKind::Spot => "Spot",
        }
    }
}

struct LightingState {
    effect: BasicEffect,
    objects: Vec<GameObject>,
}

pub struct LightingSample {
    state: Option<LightingState>,
    camera: ThirdPersonCamera,
    light_kind: LightKind,
    wireframe: bool,
    cull_clockwise: bool,
    dir_light: DirectionalLight,
    point_light: PointLight,
    spot_light: SpotLight,
}

impl LightingSample {
    pub fn new() -> Self {
        let mut camera = ThirdPersonCamera::default();
        camera.set_distance_min_max(2.0, 20.0);
        camera.set_distance(8.0);

        Self {
            state: None,
            camera,
            light_kind: LightKind::Directional,
            wireframe: false,
            cull_clockwise: false,
            dir_light: common::sun(Vec3::new(-0.577, -0.577, 0.577)),
            point_light: PointLight {
                ambient: Vec4::new(0.3, 0.3, 0.3, 1.0),
                diffuse: Vec4::new(0.7, 0.7, 0.7, 1.0),
                specular: Vec4::new(0.5, 0.5, 0.5, 1.0),
                position: Vec3::new(0.0, 2.0, -3.0),
                range: 25.0,
                att: Vec3::new(0.0, 0.1, 0.0),
            },
            spot_light: SpotLight {
                ambient: Vec4::new(0.1, 0.1, 0.1, 1.0),
                ..SpotLight::default()
            },
        }
    }

    pub fn light_kind(&self) -> LightKind {
        self.light_kind
    }

    /// Returns true when the cull mode changed.
    fn handle_keys(&mut self, ctx: &FrameContext<'_>) -> bool {
        let input = ctx.input;
        if input.key_pressed(KeyCode::Digit1) {
            self.light_kind = LightKind::Directional;
        } else if input.key_pressed(KeyCode::Digit2) {
            self.light_kind = LightKind::Point;
        } else if input.key_pressed(KeyCode::Digit3) {
            self.light_kind = LightKind::Spot;
        }
        if input.key_pressed(KeyCode::KeyW) {
            self.wireframe = !self.wireframe;
        }
        if input.key_pressed(KeyCode::KeyC) {
            self.cull_clockwise = !self.cull_clockwise;
            return true;
        }
        false
    }
}

impl Default for LightingSample {
    fn default() -> Self {
        Self::new()
    }
}

impl Sample for LightingSample {
    fn title(&self) -> &str {
        "Lighting"
    }

    fn init(&mut self, gpu: &mut GpuContext) -> Result<()> {
        let device = &gpu.device;
        common::fit_viewport(&mut self.camera.camera, gpu);

        let sphere = common::upload(device, &geometry::create_sphere(1.0, 30, 30), "Sphere");
        let cube = common::upload(device, &geometry::create_box(1.5, 1.5, 1.5), "Box");
        let cylinder = common::upload(device, &geometry::create_cylinder(0.6, 2.0, 30, 1), "Cylinder");
        let plane = common::upload(device, &geometry::create_plane(20.0, 20.0, 1.0, 1.0), "Plane");

        let objects = vec![
            common::object(&sphere, common::material(Vec4::new(0.9, 0.3, 0.3, 1.0), 32.0), Vec3::ZERO),
            common::object(
                &cube,
                common::material(Vec4::new(0.3, 0.8, 0.3, 1.0), 16.0),
                Vec3::new(-3.0, -0.25, 0.0),
            ),
            common::object(
                &cylinder,
                common::material(Vec4::new(0.3, 0.4, 0.9, 1.0), 64.0),
                Vec3::new(3.0, 0.0, 0.0),
            ),
            common::object(
                &plane,
                common::material(Vec4::new(0.7, 0.7, 0.7, 1.0), 8.0),
                Vec3::new(0.0, -1.0, 0.0),
            ),
        ];

        let mut effect = BasicEffect::new(gpu)?;
        effect.set_proj(&self.camera.camera.proj_matrix())?;
        effect.set_dir_light(0, &self.dir_light)?;
        effect.set_point_light(0, &self.point_light)?;
        effect.set_spot_light(0, &self.spot_light)?;
        effect.set_light_counts(1, 0, 0)?;

        self.state = Some(LightingState { effect, objects });
        Ok(())
    }

    fn on_resize(&mut self, gpu: &mut GpuContext) -> Result<()> {
        common::fit_viewport(&mut self.camera.camera, gpu);
        let proj = self.camera.camera.proj_matrix();
        common::ready(&mut self.state)?.effect.set_proj(&proj)
    }

    fn update_scene(&mut self, ctx: &mut FrameContext<'_>) -> Result<()> {
        let cull_changed = self.handle_keys(ctx);
        common::orbit(&mut self.camera, ctx.input);

        // point light circles the scene
        let t = ctx.total_time();
        self.point_light.position = Vec3::new(4.0 * t.cos(), 2.0, 4.0 * t.sin());

        // spot light follows the camera like a flashlight
        let camera = &self.camera.camera;
        self.spot_light.position = camera.position();
        self.spot_light.direction = camera.transform.forward_axis();

        let view = camera.view_matrix();
        let eye = camera.position();
        let (kind, wireframe, cull_clockwise) = (self.light_kind, self.wireframe, self.cull_clockwise);
        let (point, spot) = (self.point_light, self.spot_light);

        let state = common::ready(&mut self.state)?;
        let effect = &mut state.effect;
        effect.set_view(&view)?;
        effect.set_eye_pos(eye)?;
        effect.set_point_light(0, &point)?;
        effect.set_spot_light(0, &spot)?;
        match kind {
            LightKind::Directional => effect.set_light_counts(1, 0, 0)?,
            LightKind::Point => effect.set_light_counts(0, 1, 0)?,
            LightKind::Spot => effect.set_light_counts(0, 0, 1)?,
        }
        if cull_changed {
            effect.set_cull_clockwise(cull_clockwise)?;
        }
        if wireframe {
            effect.set_render_wireframe();
        } else {
            effect.set_render_default();
        }
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
        for object in &state.objects {
            object.draw_lit(gpu, &mut rpass, &mut state.effect)?;
        }
        Ok(())
    }

    fn status(&self) -> Option<String> {
        let mode = if self.wireframe { "  Wireframe" } else { "" };
        let cull = if self.cull_clockwise { "  Cull CW" } else { "" };
        Some(format!("Light: {}{}{}", self.light_kind.name(), mode, cull))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_a_directional_light() {
        let sample = LightingSample::new();
        assert_eq!(sample.light_kind(), LightKind::Directional);
        assert_eq!(sample.status().as_deref(), Some("Light: Directional"));
    }

    #[test]
    fn drawing_before_init_is_an_error() {
        let mut sample = LightingSample::new();
        assert!(common::ready(&mut sample.state).is_err());
    }
}

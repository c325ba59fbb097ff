// samples/shadow_mapping.rs
//! Single shadow map from an orbiting directional light.
//! Space pauses the light, drag to orbit the camera, scroll to zoom.

use glam::{Mat4, Vec3};
use winit::keyboard::KeyCode;

use crate::app::{FrameContext, Sample};
use crate::error::Result;
use crate::renderer::effects::{BasicEffect, EffectTransforms, ShadowEffect};
use crate::renderer::gpu::GpuContext;
use crate::renderer::shadow_render::ShadowRender;
use crate::samples::common::{self, CLEAR_COLOR};
use crate::scene::camera::ThirdPersonCamera;
use crate::scene::cascaded_shadow::{directional_light_fit, NDC_TO_TEXTURE};
use crate::scene::collision::{BoundingBox, BoundingSphere};
use crate::scene::game_object::GameObject;

const LIGHT_ELEVATION: f32 = 0.9;

/// Direction of a sun `angle` radians around the Y axis.
fn orbiting_light_dir(angle: f32) -> Vec3 {
    let (sin, cos) = angle.sin_cos();
    Vec3::new(cos, -LIGHT_ELEVATION * 2.0, sin).normalize()
}

/// World to shadow-map texture space for a light fitted around `bounds`.
pub fn shadow_transform(light_dir: Vec3, bounds: &BoundingSphere) -> (Mat4, Mat4, Mat4) {
    let (view, proj) = directional_light_fit(light_dir, bounds);
    (view, proj, NDC_TO_TEXTURE * proj * view)
}

struct ShadowState {
    depth: ShadowEffect,
    basic: BasicEffect,
    shadow_map: ShadowRender,
    objects: Vec<GameObject>,
    bounds: BoundingSphere,
}

pub struct ShadowMappingSample {
    state: Option<ShadowState>,
    camera: ThirdPersonCamera,
    shadow_map_size: u32,
    light_angle: f32,
    light_paused: bool,
}

impl ShadowMappingSample {
    pub fn new(settings: &crate::settings::RenderSettings) -> Self {
        let mut camera = ThirdPersonCamera::default();
        camera.set_distance_min_max(5.0, 60.0);
        camera.set_distance(30.0);
        camera.set_rotation_x(0.5);

        Self {
            state: None,
            camera,
            shadow_map_size: settings.shadow_map_size,
            light_angle: 0.0,
            light_paused: false,
        }
    }
}

impl Sample for ShadowMappingSample {
    fn title(&self) -> &str {
        "Shadow Mapping"
    }

    fn init(&mut self, gpu: &mut GpuContext) -> Result<()> {
        self.camera.camera.far_z = 200.0;
        common::fit_viewport(&mut self.camera.camera, gpu);

        let objects = common::shadow_test_scene(&gpu.device, 40.0);
        let bounds = objects
            .iter()
            .map(GameObject::bounding_box)
            .reduce(|a, b| a.merge(&b))
            .unwrap_or_else(BoundingBox::default)
            .bounding_sphere();

        let shadow_map = ShadowRender::new(&gpu.device, "ShadowMap", self.shadow_map_size, 1);
        let depth = ShadowEffect::new(gpu)?;
        let mut basic = BasicEffect::new(gpu)?;
        basic.set_proj(&self.camera.camera.proj_matrix())?;
        basic.set_shadow_map(Some(&shadow_map))?;

        self.state = Some(ShadowState {
            depth,
            basic,
            shadow_map,
            objects,
            bounds,
        });
        Ok(())
    }

    fn on_resize(&mut self, gpu: &mut GpuContext) -> Result<()> {
        common::fit_viewport(&mut self.camera.camera, gpu);
        let proj = self.camera.camera.proj_matrix();
        common::ready(&mut self.state)?.basic.set_proj(&proj)
    }

    fn update_scene(&mut self, ctx: &mut FrameContext<'_>) -> Result<()> {
        common::orbit(&mut self.camera, ctx.input);
        if ctx.input.key_pressed(KeyCode::Space) {
            self.light_paused = !self.light_paused;
        }
        if !self.light_paused {
            self.light_angle = (self.light_angle + 0.3 * ctx.dt) % std::f32::consts::TAU;
        }
        let light_dir = orbiting_light_dir(self.light_angle);
        let camera = self.camera.camera;

        let state = common::ready(&mut self.state)?;
        let (light_view, light_proj, to_texture) = shadow_transform(light_dir, &state.bounds);
        state.depth.set_view(&light_view)?;
        state.depth.set_proj(&light_proj)?;

        state.basic.set_view(&camera.view_matrix())?;
        state.basic.set_eye_pos(camera.position())?;
        state.basic.set_dir_light(0, &common::sun(light_dir))?;
        state.basic.set_shadow_transform(&to_texture)?;
        Ok(())
    }

    fn draw_scene(
        &mut self,
        gpu: &mut GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        frame_view: &wgpu::TextureView,
    ) -> Result<()> {
        let state = common::ready(&mut self.state)?;
        {
            let mut pass = state.shadow_map.begin(encoder, 0);
            for object in &state.objects {
                object.draw(gpu, &mut pass, &mut state.depth)?;
            }
        }

        let mut rpass = gpu.begin_main_pass(encoder, frame_view, CLEAR_COLOR);
        for object in &state.objects {
            object.draw_lit(gpu, &mut rpass, &mut state.basic)?;
        }
        Ok(())
    }

    fn status(&self) -> Option<String> {
        self.light_paused.then(|| "Light paused".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn light_points_down_at_every_angle() {
        for i in 0..16 {
            let dir = orbiting_light_dir(i as f32 * 0.4);
            assert!(dir.y < -0.8);
            assert!((dir.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn scene_center_maps_inside_the_shadow_map() {
        let bounds = BoundingSphere::new(Vec3::ZERO, 20.0);
        let (_, _, to_texture) = shadow_transform(orbiting_light_dir(1.0), &bounds);
        let uv = to_texture.project_point3(Vec3::ZERO);
        assert!(uv.x > 0.0 && uv.x < 1.0, "u = {}", uv.x);
        assert!(uv.y > 0.0 && uv.y < 1.0, "v = {}", uv.y);
        assert!(uv.z >= 0.0 && uv.z <= 1.0, "depth = {}", uv.z);
    }

    #[test]
    fn sphere_edge_stays_in_texture_range() {
        let bounds = BoundingSphere::new(Vec3::new(3.0, 0.0, -2.0), 10.0);
        let dir = orbiting_light_dir(2.5);
        let (_, _, to_texture) = shadow_transform(dir, &bounds);
        let side = dir.cross(Vec3::Y).normalize();
        let edge = bounds.center + side * 9.9;
        let uv = to_texture.project_point3(edge);
        assert!((0.0..=1.0).contains(&uv.x) && (0.0..=1.0).contains(&uv.y));
    }
}

// samples/compute_blur.rs
//! Renders the scene off-screen, blurs it with separable compute passes and
//! shows the result on a full-screen quad.
//!
//! Up/Down change the blur iterations (0 shows the sharp image),
//! Left/Right change the kernel radius.

use glam::{Vec2, Vec3, Vec4};
use winit::keyboard::KeyCode;

use crate::app::{FrameContext, Sample};
use crate::error::Result;
use crate::renderer::effects::blur::MAX_BLUR_RADIUS;
use crate::renderer::effects::{BasicEffect, BlurEffect, Effect, EffectTransforms, ScreenQuadEffect};
use crate::renderer::gpu::GpuContext;
use crate::renderer::mesh::Mesh;
use crate::renderer::texture::Texture;
use crate::renderer::texture_render::TextureRender;
use crate::renderer::vertex::VertexPosTex;
use crate::samples::common::{self, CLEAR_COLOR};
use crate::scene::camera::ThirdPersonCamera;
use crate::scene::game_object::GameObject;
use crate::scene::geometry;

const SCENE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const MAX_ITERATIONS: u32 = 8;

fn sigma_for(radius: usize) -> f32 {
    (radius as f32 * 0.5).max(0.5)
}

/// Off-screen scene target plus the two blur targets, all window sized.
struct Targets {
    scene: TextureRender,
    ping: Texture,
    pong: Texture,
}

impl Targets {
    fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        Self {
            scene: TextureRender::new(device, width, height, SCENE_FORMAT, "BlurScene"),
            ping: Texture::storage_rgba8(device, width, height, Some("BlurPing")),
            pong: Texture::storage_rgba8(device, width, height, Some("BlurPong")),
        }
    }
}

struct BlurState {
    basic: BasicEffect,
    blur: BlurEffect,
    quad_effect: ScreenQuadEffect,
    quad: Mesh,
    targets: Targets,
    objects: Vec<GameObject>,
}

pub struct ComputeBlurSample {
    state: Option<BlurState>,
    camera: ThirdPersonCamera,
    iterations: u32,
    radius: usize,
    spin: f32,
}

impl ComputeBlurSample {
    pub fn new() -> Self {
        let mut camera = ThirdPersonCamera::default();
        camera.set_distance(12.0);
        Self {
            state: None,
            camera,
            iterations: 2,
            radius: 5,
            spin: 0.0,
        }
    }

    /// Applies arrow keys; returns true when the kernel changed.
    fn handle_keys(&mut self, ctx: &FrameContext<'_>) -> bool {
        let input = ctx.input;
        if input.key_pressed(KeyCode::ArrowUp) {
            self.iterations = (self.iterations + 1).min(MAX_ITERATIONS);
        }
        if input.key_pressed(KeyCode::ArrowDown) {
            self.iterations = self.iterations.saturating_sub(1);
        }
        let old_radius = self.radius;
        if input.key_pressed(KeyCode::ArrowRight) {
            self.radius = (self.radius + 1).min(MAX_BLUR_RADIUS);
        }
        if input.key_pressed(KeyCode::ArrowLeft) {
            self.radius = self.radius.saturating_sub(1).max(1);
        }
        old_radius != self.radius
    }
}

impl Default for ComputeBlurSample {
    fn default() -> Self {
        Self::new()
    }
}

impl Sample for ComputeBlurSample {
    fn title(&self) -> &str {
        "Compute Shader Blur"
    }

    fn init(&mut self, gpu: &mut GpuContext) -> Result<()> {
        let device = &gpu.device;
        common::fit_viewport(&mut self.camera.camera, gpu);
        let size = gpu.size();

        let cube = common::upload(device, &geometry::create_box(2.0, 2.0, 2.0), "Box");
        let sphere = common::upload(device, &geometry::create_sphere(1.2, 24, 24), "Sphere");
        let floor = common::upload(device, &geometry::create_plane(30.0, 30.0, 1.0, 1.0), "Floor");
        let objects = vec![
            common::object(&floor, common::material(Vec4::new(0.6, 0.6, 0.65, 1.0), 8.0), Vec3::new(0.0, -1.5, 0.0)),
            common::object(&cube, common::material(Vec4::new(0.95, 0.5, 0.2, 1.0), 32.0), Vec3::new(-2.5, 0.0, 0.0)),
            common::object(&sphere, common::material(Vec4::new(0.2, 0.6, 0.95, 1.0), 64.0), Vec3::new(2.5, 0.0, 0.0)),
        ];

        let mut basic = BasicEffect::for_target(gpu, SCENE_FORMAT, 1)?;
        basic.set_proj(&self.camera.camera.proj_matrix())?;
        basic.set_dir_light(0, &common::sun(Vec3::new(0.3, -1.0, -0.5)))?;

        let mut blur = BlurEffect::new(gpu)?;
        blur.set_gaussian(self.radius, sigma_for(self.radius))?;

        let quad = Mesh::new::<VertexPosTex>(device, &geometry::create_2d_show(Vec2::ZERO, Vec2::ONE), "ScreenQuad");

        self.state = Some(BlurState {
            basic,
            blur,
            quad_effect: ScreenQuadEffect::new(gpu)?,
            quad,
            targets: Targets::new(device, size.width, size.height),
            objects,
        });
        Ok(())
    }

    fn on_resize(&mut self, gpu: &mut GpuContext) -> Result<()> {
        common::fit_viewport(&mut self.camera.camera, gpu);
        let proj = self.camera.camera.proj_matrix();
        let size = gpu.size();
        let state = common::ready(&mut self.state)?;
        state.targets = Targets::new(&gpu.device, size.width, size.height);
        state.basic.set_proj(&proj)
    }

    fn update_scene(&mut self, ctx: &mut FrameContext<'_>) -> Result<()> {
        common::orbit(&mut self.camera, ctx.input);
        let kernel_changed = self.handle_keys(ctx);
        self.spin = (self.spin + ctx.dt) % std::f32::consts::TAU;

        let camera = self.camera.camera;
        let (radius, spin) = (self.radius, self.spin);
        let state = common::ready(&mut self.state)?;
        if kernel_changed {
            state.blur.set_gaussian(radius, sigma_for(radius))?;
        }
        for object in state.objects.iter_mut().skip(1) {
            object.transform.set_rotation_euler(Vec3::new(spin * 0.5, spin, 0.0));
        }
        state.basic.set_view(&camera.view_matrix())?;
        state.basic.set_eye_pos(camera.position())
    }

    fn draw_scene(
        &mut self,
        gpu: &mut GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        frame_view: &wgpu::TextureView,
    ) -> Result<()> {
        let iterations = self.iterations;
        let state = common::ready(&mut self.state)?;
        {
            let mut pass = state.targets.scene.begin(encoder, CLEAR_COLOR);
            for object in &state.objects {
                object.draw_lit(gpu, &mut pass, &mut state.basic)?;
            }
        }

        let targets = &state.targets;
        if iterations > 0 {
            state.blur.blur(
                gpu,
                encoder,
                targets.scene.color_view(),
                &targets.ping,
                &targets.pong,
                iterations,
            )?;
            state.quad_effect.set_texture(&targets.pong.view)?;
        } else {
            state.quad_effect.set_texture(targets.scene.color_view())?;
        }

        let mut rpass = gpu.begin_main_pass(encoder, frame_view, CLEAR_COLOR);
        state.quad_effect.apply(gpu, &mut rpass)?;
        state.quad.draw(&mut rpass);
        Ok(())
    }

    fn status(&self) -> Option<String> {
        Some(format!(
            "Iterations: {}  Radius: {}",
            self.iterations, self.radius
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigma_grows_with_radius() {
        assert_eq!(sigma_for(0), 0.5);
        assert!(sigma_for(4) < sigma_for(8));
    }

    #[test]
    fn default_status() {
        let sample = ComputeBlurSample::new();
        assert_eq!(sample.status().as_deref(), Some("Iterations: 2  Radius: 5"));
    }
}

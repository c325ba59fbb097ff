// samples/deferred.rs
//! Deferred shading: the scene is rasterized once into a G-buffer, then a
//! full-screen pass shades it with a sun and many moving point lights.
//!
//! G cycles the G-buffer views, +/- change the light count.

use glam::{Vec3, Vec4};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use winit::keyboard::KeyCode;

use crate::app::{FrameContext, Sample};
use crate::error::Result;
use crate::renderer::effects::deferred::{DeferredPointLight, GBufferView, MAX_DEFERRED_POINT_LIGHTS};
use crate::renderer::effects::{DeferredEffect, EffectTransforms};
use crate::renderer::gpu::GpuContext;
use crate::renderer::texture_render::GBuffer;
use crate::samples::common::{self, CLEAR_COLOR};
use crate::scene::camera::FirstPersonCamera;
use crate::scene::game_object::GameObject;

const INITIAL_LIGHTS: usize = 32;
const LIGHT_SEED: u64 = 0x5eed;

/// A point light bobbing around a fixed anchor.
#[derive(Clone, Copy, Debug)]
struct MovingLight {
    anchor: Vec3,
    phase: f32,
    speed: f32,
    light: DeferredPointLight,
}

impl MovingLight {
    fn at(&self, time: f32) -> DeferredPointLight {
        let t = time * self.speed + self.phase;
        DeferredPointLight {
            position: self.anchor + Vec3::new(2.0 * t.cos(), 0.8 * (2.0 * t).sin(), 2.0 * t.sin()),
            ..self.light
        }
    }
}

fn scatter_lights(count: usize, extent: f32, seed: u64) -> Vec<MovingLight> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let color = Vec3::new(
                rng.gen_range(0.2..1.0),
                rng.gen_range(0.2..1.0),
                rng.gen_range(0.2..1.0),
            );
            MovingLight {
                anchor: Vec3::new(
                    rng.gen_range(-extent..extent),
                    rng.gen_range(0.5..3.0),
                    rng.gen_range(-extent..extent),
                ),
                phase: rng.gen_range(0.0..std::f32::consts::TAU),
                speed: rng.gen_range(0.3..1.2),
                light: DeferredPointLight {
                    position: Vec3::ZERO,
                    range: rng.gen_range(4.0..8.0),
                    color,
                    intensity: rng.gen_range(1.0..2.5),
                },
            }
        })
        .collect()
}

struct DeferredState {
    effect: DeferredEffect,
    gbuffer: GBuffer,
    objects: Vec<GameObject>,
}

pub struct DeferredSample {
    state: Option<DeferredState>,
    camera: FirstPersonCamera,
    lights: Vec<MovingLight>,
    light_count: usize,
    debug_view: GBufferView,
}

impl DeferredSample {
    pub fn new() -> Self {
        let mut camera = FirstPersonCamera::default();
        camera.set_position(Vec3::new(0.0, 8.0, 24.0));
        camera.look_at(Vec3::ZERO, Vec3::Y);

        Self {
            state: None,
            camera,
            lights: scatter_lights(MAX_DEFERRED_POINT_LIGHTS, 16.0, LIGHT_SEED),
            light_count: INITIAL_LIGHTS,
            debug_view: GBufferView::Lit,
        }
    }

    fn handle_keys(&mut self, ctx: &FrameContext<'_>) -> bool {
        let input = ctx.input;
        let mut view_changed = false;
        if input.key_pressed(KeyCode::KeyG) {
            self.debug_view = self.debug_view.next();
            view_changed = true;
        }
        if input.key_pressed(KeyCode::Equal) || input.key_pressed(KeyCode::NumpadAdd) {
            self.light_count = (self.light_count * 2).min(MAX_DEFERRED_POINT_LIGHTS);
        }
        if input.key_pressed(KeyCode::Minus) || input.key_pressed(KeyCode::NumpadSubtract) {
            self.light_count = (self.light_count / 2).max(1);
        }
        view_changed
    }
}

impl Default for DeferredSample {
    fn default() -> Self {
        Self::new()
    }
}

impl Sample for DeferredSample {
    fn title(&self) -> &str {
        "Deferred Shading"
    }

    fn init(&mut self, gpu: &mut GpuContext) -> Result<()> {
        let transform = self.camera.camera.transform;
        self.camera.camera = common::camera_for(gpu, 0.5, 150.0);
        self.camera.camera.transform = transform;

        let size = gpu.size();
        let gbuffer = GBuffer::new(&gpu.device, size.width, size.height);
        let objects = common::shadow_test_scene(&gpu.device, 40.0);

        let mut effect = DeferredEffect::new(gpu, gpu.surface_format(), gpu.sample_count())?;
        effect.set_gbuffer(&gbuffer)?;
        effect.set_proj(&self.camera.camera.proj_matrix())?;
        effect.set_dir_light(Vec3::new(-0.3, -1.0, -0.4), Vec3::splat(0.25))?;
        effect.set_ambient(Vec3::splat(0.08))?;
        effect.set_background(Vec4::new(0.02, 0.02, 0.04, 1.0))?;
        effect.set_debug_view(self.debug_view)?;

        self.state = Some(DeferredState {
            effect,
            gbuffer,
            objects,
        });
        Ok(())
    }

    fn on_resize(&mut self, gpu: &mut GpuContext) -> Result<()> {
        common::fit_viewport(&mut self.camera.camera, gpu);
        let proj = self.camera.camera.proj_matrix();
        let size = gpu.size();
        let state = common::ready(&mut self.state)?;
        state.gbuffer.resize(&gpu.device, size.width, size.height);
        state.effect.set_gbuffer(&state.gbuffer)?;
        state.effect.set_proj(&proj)
    }

    fn update_scene(&mut self, ctx: &mut FrameContext<'_>) -> Result<()> {
        common::fly(&mut self.camera, ctx.input, ctx.dt);
        let view_changed = self.handle_keys(ctx);

        let time = ctx.total_time();
        let lights: Vec<DeferredPointLight> = self
            .lights
            .iter()
            .take(self.light_count)
            .map(|l| l.at(time))
            .collect();
        let view = self.camera.camera.view_matrix();
        let debug_view = self.debug_view;

        let state = common::ready(&mut self.state)?;
        state.effect.set_view(&view)?;
        state.effect.set_point_lights(&lights)?;
        if view_changed {
            state.effect.set_debug_view(debug_view)?;
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
        {
            let mut pass = state.gbuffer.begin(encoder);
            for object in &state.objects {
                if let Some(part) = object.model.parts.first() {
                    let material = &part.material;
                    state.effect.set_material(
                        material.diffuse.truncate(),
                        material.specular.x,
                        material.specular.w,
                    )?;
                }
                object.draw(gpu, &mut pass, &mut state.effect)?;
            }
        }

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("DeferredLightingPass"),
            color_attachments: &[Some(
                gpu.color_attachment(frame_view, wgpu::LoadOp::Clear(CLEAR_COLOR)),
            )],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        state.effect.draw_lighting(gpu, &mut pass)?;
        Ok(())
    }

    fn status(&self) -> Option<String> {
        Some(format!("Lights: {}  View: {:?}", self.light_count, self.debug_view))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scattered_lights_are_deterministic_and_in_bounds() {
        let a = scatter_lights(16, 10.0, 7);
        let b = scatter_lights(16, 10.0, 7);
        assert_eq!(a.len(), 16);
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.anchor, y.anchor);
            assert!(x.anchor.x.abs() <= 10.0 && x.anchor.z.abs() <= 10.0);
            assert!(x.light.range >= 4.0 && x.light.range < 8.0);
        }
    }

    #[test]
    fn moving_light_stays_near_its_anchor() {
        let light = scatter_lights(1, 5.0, 1)[0];
        for i in 0..20 {
            let p = light.at(i as f32 * 0.37).position;
            assert!(p.distance(light.anchor) <= 2.2);
        }
    }

    #[test]
    fn status_lists_lights_and_view() {
        let sample = DeferredSample::new();
        assert_eq!(sample.status().as_deref(), Some("Lights: 32  View: Lit"));
    }
}

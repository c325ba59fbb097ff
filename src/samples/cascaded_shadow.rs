// samples/cascaded_shadow.rs
//! Cascaded shadow maps over a large field of objects.
//!
//! WASD/QE fly, right drag looks around. V tints the cascades, 1/2/3 select
//! manual, logarithmic or PSSM splits, F toggles the projection fit, N cycles
//! the near/far fit, T toggles texel snapping, P cycles the PCF kernel.

use glam::Vec3;
use winit::keyboard::KeyCode;

use crate::app::{FrameContext, Sample};
use crate::error::Result;
use crate::renderer::effects::{CascadedShadowEffect, EffectTransforms};
use crate::renderer::gpu::GpuContext;
use crate::renderer::shadow_render::ShadowRender;
use crate::samples::common::{self, CLEAR_COLOR};
use crate::scene::camera::FirstPersonCamera;
use crate::scene::cascaded_shadow::{
    CascadePartition, CascadeSettings, CascadedShadowManager, FitNearFar, FitProjection,
};
use crate::scene::collision::BoundingBox;
use crate::scene::game_object::GameObject;
use crate::settings::RenderSettings;

const SCENE_SIZE: f32 = 120.0;
const MAX_PCF_RADIUS: u32 = 3;

fn manual_partition(count: usize) -> CascadePartition {
    // each cascade covers twice the range of the previous one
    let total = (1u32 << count) as f32 - 1.0;
    CascadePartition::Manual(
        (1..=count)
            .map(|i| ((1u32 << i) as f32 - 1.0) / total)
            .collect(),
    )
}

fn next_near_far(fit: FitNearFar) -> FitNearFar {
    match fit {
        FitNearFar::ZeroOne => FitNearFar::CascadeAabb,
        FitNearFar::CascadeAabb => FitNearFar::SceneAabb,
        FitNearFar::SceneAabb => FitNearFar::ZeroOne,
    }
}

fn partition_name(partition: &CascadePartition) -> &'static str {
    match partition {
        CascadePartition::Manual(_) => "Manual",
        CascadePartition::Logarithmic => "Log",
        CascadePartition::Pssm { .. } => "PSSM",
    }
}

struct CascadeState {
    effect: CascadedShadowEffect,
    shadow_map: ShadowRender,
    objects: Vec<GameObject>,
    bounds: BoundingBox,
}

pub struct CascadedShadowSample {
    state: Option<CascadeState>,
    camera: FirstPersonCamera,
    manager: CascadedShadowManager,
    light_dir: Vec3,
    visualize: bool,
}

impl CascadedShadowSample {
    pub fn new(settings: &RenderSettings) -> Self {
        let mut camera = FirstPersonCamera::default();
        camera.set_position(Vec3::new(-30.0, 12.0, 40.0));
        camera.look_at(Vec3::ZERO, Vec3::Y);

        let manager = CascadedShadowManager::new(CascadeSettings {
            cascade_count: settings.cascade_count as usize,
            shadow_map_size: settings.shadow_map_size,
            ..CascadeSettings::default()
        });

        Self {
            state: None,
            camera,
            manager,
            light_dir: Vec3::new(-0.6, -1.0, -0.4).normalize(),
            visualize: false,
        }
    }

    pub fn manager(&self) -> &CascadedShadowManager {
        &self.manager
    }

    /// Applies key toggles to the cascade settings.
    fn handle_keys(&mut self, ctx: &FrameContext<'_>) {
        let input = ctx.input;
        if input.key_pressed(KeyCode::KeyV) {
            self.visualize = !self.visualize;
        }

        let settings = self.manager.settings_mut();
        let count = settings.cascade_count;
        if input.key_pressed(KeyCode::Digit1) {
            settings.partition = manual_partition(count);
        } else if input.key_pressed(KeyCode::Digit2) {
            settings.partition = CascadePartition::Logarithmic;
        } else if input.key_pressed(KeyCode::Digit3) {
            settings.partition = CascadePartition::Pssm { lambda: 0.75 };
        }
        if input.key_pressed(KeyCode::KeyF) {
            settings.fit_projection = match settings.fit_projection {
                FitProjection::ToCascade => FitProjection::ToScene,
                FitProjection::ToScene => FitProjection::ToCascade,
            };
        }
        if input.key_pressed(KeyCode::KeyN) {
            settings.fit_near_far = next_near_far(settings.fit_near_far);
        }
        if input.key_pressed(KeyCode::KeyT) {
            settings.move_light_texel_size = !settings.move_light_texel_size;
        }
        if input.key_pressed(KeyCode::KeyP) {
            settings.pcf_blur_size = (settings.pcf_blur_size + 1) % (MAX_PCF_RADIUS + 1);
        }
    }
}

impl Sample for CascadedShadowSample {
    fn title(&self) -> &str {
        "Cascaded Shadow Maps"
    }

    fn init(&mut self, gpu: &mut GpuContext) -> Result<()> {
        let transform = self.camera.camera.transform;
        self.camera.camera = common::camera_for(gpu, 0.5, 250.0);
        self.camera.camera.transform = transform;

        let objects = common::shadow_test_scene(&gpu.device, SCENE_SIZE);
        let bounds = objects
            .iter()
            .map(GameObject::bounding_box)
            .reduce(|a, b| a.merge(&b))
            .unwrap_or_default();

        let settings = self.manager.settings();
        let shadow_map = ShadowRender::new(
            &gpu.device,
            "CascadeShadowMap",
            settings.shadow_map_size,
            settings.cascade_count as u32,
        );
        log::info!(
            "{} cascades at {}x{}",
            settings.cascade_count,
            settings.shadow_map_size,
            settings.shadow_map_size
        );

        let mut effect = CascadedShadowEffect::new(gpu)?;
        effect.set_shadow_map(&shadow_map)?;
        effect.set_proj(&self.camera.camera.proj_matrix())?;
        effect.set_dir_light(&common::sun(self.light_dir))?;

        self.state = Some(CascadeState {
            effect,
            shadow_map,
            objects,
            bounds,
        });
        Ok(())
    }

    fn on_resize(&mut self, gpu: &mut GpuContext) -> Result<()> {
        common::fit_viewport(&mut self.camera.camera, gpu);
        let proj = self.camera.camera.proj_matrix();
        common::ready(&mut self.state)?.effect.set_proj(&proj)
    }

    fn update_scene(&mut self, ctx: &mut FrameContext<'_>) -> Result<()> {
        common::fly(&mut self.camera, ctx.input, ctx.dt);
        self.handle_keys(ctx);

        let camera = self.camera.camera;
        let state = common::ready(&mut self.state)?;
        self.manager.update(&camera, self.light_dir, &state.bounds);

        let effect = &mut state.effect;
        effect.set_cascades(&self.manager)?;
        effect.set_visualize(self.visualize)?;
        effect.set_view(&camera.view_matrix())?;
        effect.set_eye_pos(camera.position())
    }

    fn draw_scene(
        &mut self,
        gpu: &mut GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        frame_view: &wgpu::TextureView,
    ) -> Result<()> {
        let state = common::ready(&mut self.state)?;
        let effect = &mut state.effect;

        effect.set_depth_only(true);
        for level in 0..state.shadow_map.layer_count() {
            effect.set_cascade_level(level)?;
            let mut pass = state.shadow_map.begin(encoder, level);
            for object in &state.objects {
                object.draw(gpu, &mut pass, effect)?;
            }
        }
        effect.set_depth_only(false);

        let mut rpass = gpu.begin_main_pass(encoder, frame_view, CLEAR_COLOR);
        for object in &state.objects {
            object.draw_lit(gpu, &mut rpass, effect)?;
        }
        Ok(())
    }

    fn status(&self) -> Option<String> {
        let settings = self.manager.settings();
        Some(format!(
            "{}  {:?}  {:?}  Snap: {}  PCF: {}{}",
            partition_name(&settings.partition),
            settings.fit_projection,
            settings.fit_near_far,
            if settings.move_light_texel_size { "on" } else { "off" },
            settings.pcf_blur_size,
            if self.visualize { "  Visualize" } else { "" }
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_partition_doubles_each_cascade() {
        let CascadePartition::Manual(fractions) = manual_partition(4) else {
            panic!("expected a manual partition");
        };
        assert_eq!(fractions.len(), 4);
        assert!((fractions[3] - 1.0).abs() < 1e-6);
        for pair in fractions.windows(2) {
            assert!(pair[1] > pair[0]);
        }
        assert!((fractions[1] / fractions[0] - 3.0).abs() < 1e-5);
    }

    #[test]
    fn near_far_fit_cycles_through_every_mode() {
        let mut fit = FitNearFar::ZeroOne;
        for _ in 0..3 {
            fit = next_near_far(fit);
        }
        assert_eq!(fit, FitNearFar::ZeroOne);
    }

    #[test]
    fn cascade_count_follows_settings() {
        let settings = RenderSettings {
            cascade_count: 3,
            ..RenderSettings::default()
        };
        let sample = CascadedShadowSample::new(&settings);
        assert_eq!(sample.manager().settings().cascade_count, 3);
        assert!(sample.status().unwrap().starts_with("PSSM"));
    }
}

// renderer/effects/blur.rs

use crate::error::Result;
use crate::renderer::effect_helper::{ComputePassDesc, EffectHelper, ResourceKind};
use crate::renderer::effects::create_shader;
use crate::renderer::gpu::GpuContext;
use crate::renderer::texture::Texture;

pub const PASS_BLUR_HORZ: &str = "BlurHorz";
pub const PASS_BLUR_VERT: &str = "BlurVert";

pub const MAX_BLUR_RADIUS: usize = 15;
const WORKGROUP_SIZE: u32 = 16;

/// Normalized Gaussian kernel with `2 * radius + 1` taps.
/// The radius is clamped to `MAX_BLUR_RADIUS`.
pub fn gaussian_weights(radius: usize, sigma: f32) -> Vec<f32> {
    let radius = radius.min(MAX_BLUR_RADIUS) as i32;
    let two_sigma_sq = 2.0 * sigma.max(1e-3).powi(2);
    let mut weights: Vec<f32> = (-radius..=radius)
        .map(|x| (-((x * x) as f32) / two_sigma_sq).exp())
        .collect();
    let sum: f32 = weights.iter().sum();
    for w in &mut weights {
        *w /= sum;
    }
    weights
}

/// Separable Gaussian blur run as two compute passes.
pub struct BlurEffect {
    helper: EffectHelper,
    radius: usize,
}

impl BlurEffect {
    pub fn new(gpu: &GpuContext) -> Result<Self> {
        let device = &gpu.device;
        let mut helper = EffectHelper::builder("BlurEffect")
            .add_constant_buffer("CBSettings", 0, 144, wgpu::ShaderStages::COMPUTE)
            .add_variable("g_Weights", 0, 0, 128)
            .add_variable("g_BlurRadius", 0, 128, 4)
            .add_resource("g_Input", 1, wgpu::ShaderStages::COMPUTE, ResourceKind::float_2d())
            .add_resource(
                "g_Output",
                2,
                wgpu::ShaderStages::COMPUTE,
                ResourceKind::StorageTexture {
                    format: wgpu::TextureFormat::Rgba8Unorm,
                    dimension: wgpu::TextureViewDimension::D2,
                },
            )
            .build(device)?;

        let shader = create_shader(device, "Blur", include_str!("../../shader/blur.wgsl"));
        helper.add_compute_pass(PASS_BLUR_HORZ, ComputePassDesc::new(&shader, "blur_horz"));
        helper.add_compute_pass(PASS_BLUR_VERT, ComputePassDesc::new(&shader, "blur_vert"));

        let mut effect = Self { helper, radius: 0 };
        effect.set_gaussian(5, 2.5)?;
        Ok(effect)
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    pub fn set_gaussian(&mut self, radius: usize, sigma: f32) -> Result<()> {
        let weights = gaussian_weights(radius, sigma);
        let mut packed = [0.0f32; 32];
        packed[..weights.len()].copy_from_slice(&weights);
        self.radius = weights.len() / 2;
        self.helper.set_slice("g_Weights", &packed)?;
        self.helper.set_raw("g_BlurRadius", &(self.radius as i32).to_ne_bytes())
    }

    fn dispatch(
        &mut self,
        gpu: &GpuContext,
        cpass: &mut wgpu::ComputePass<'_>,
        pass: &str,
        input: &wgpu::TextureView,
        output: &Texture,
    ) -> Result<()> {
        self.helper.set_texture("g_Input", input)?;
        self.helper.set_texture("g_Output", &output.view)?;
        self.helper.apply_compute(pass, gpu, cpass)?;
        let (width, height) = output.size();
        cpass.dispatch_workgroups(
            width.div_ceil(WORKGROUP_SIZE),
            height.div_ceil(WORKGROUP_SIZE),
            1,
        );
        Ok(())
    }

    /// Blurs `source` `iterations` times; the result ends up in `pong`.
    /// `ping` and `pong` are `Texture::storage_rgba8` targets of the source size.
    pub fn blur(
        &mut self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        source: &wgpu::TextureView,
        ping: &Texture,
        pong: &Texture,
        iterations: u32,
    ) -> Result<()> {
        let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("BlurPass"),
            timestamp_writes: None,
        });
        let mut input = source;
        for _ in 0..iterations.max(1) {
            self.dispatch(gpu, &mut cpass, PASS_BLUR_HORZ, input, ping)?;
            self.dispatch(gpu, &mut cpass, PASS_BLUR_VERT, &ping.view, pong)?;
            input = &pong.view;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_sum_to_one() {
        for (radius, sigma) in [(1, 1.0), (5, 2.5), (15, 6.0)] {
            let weights = gaussian_weights(radius, sigma);
            assert_eq!(weights.len(), 2 * radius + 1);
            let sum: f32 = weights.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5, "sum {sum} for radius {radius}");
        }
    }

    #[test]
    fn weights_are_symmetric_and_peak_in_the_middle() {
        let weights = gaussian_weights(6, 3.0);
        let n = weights.len();
        for i in 0..n / 2 {
            assert!((weights[i] - weights[n - 1 - i]).abs() < 1e-6);
            assert!(weights[i] < weights[i + 1]);
        }
    }

    #[test]
    fn radius_is_clamped() {
        assert_eq!(gaussian_weights(40, 8.0).len(), 2 * MAX_BLUR_RADIUS + 1);
        assert_eq!(gaussian_weights(0, 1.0), vec![1.0]);
    }
}

// samples/cube.rs
//! Indexed, vertex-colored cube spinning in front of a perspective camera.
//! World, view and projection share one constant buffer.

use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

use crate::app::{FrameContext, Sample};
use crate::error::Result;
use crate::renderer::depth::DEPTH_FORMAT;
use crate::renderer::effect_helper::{EffectHelper, RenderPassDesc};
use crate::renderer::gpu::GpuContext;
use crate::renderer::render_states::dss_default;
use crate::renderer::vertex::{VertexFormat, VertexPosColor};
use crate::samples::common::{self, CLEAR_COLOR};

const PASS_CUBE: &str = "Cube";

const fn corner(pos: [f32; 3], color: [f32; 3]) -> VertexPosColor {
    VertexPosColor {
        pos,
        color: [color[0], color[1], color[2], 1.0],
    }
}

const VERTICES: [VertexPosColor; 8] = [
    corner([-1.0, -1.0, -1.0], [0.0, 0.0, 0.0]),
    corner([-1.0, 1.0, -1.0], [1.0, 0.0, 0.0]),
    corner([1.0, 1.0, -1.0], [1.0, 1.0, 0.0]),
    corner([1.0, -1.0, -1.0], [0.0, 1.0, 0.0]),
    corner([-1.0, -1.0, 1.0], [0.0, 0.0, 1.0]),
    corner([-1.0, 1.0, 1.0], [1.0, 0.0, 1.0]),
    corner([1.0, 1.0, 1.0], [1.0, 1.0, 1.0]),
    corner([1.0, -1.0, 1.0], [0.0, 1.0, 1.0]),
];

// counter-clockwise seen from outside
const INDICES: [u16; 36] = [
    0, 1, 2, 2, 3, 0, // -z
    4, 6, 5, 6, 4, 7, // +z
    4, 5, 1, 1, 0, 4, // -x
    3, 2, 6, 6, 7, 3, // +x
    1, 5, 6, 6, 2, 1, // +y
    4, 0, 3, 3, 7, 4, // -y
];

struct CubeState {
    effect: EffectHelper,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
}

pub struct CubeSample {
    state: Option<CubeState>,
    angle: Vec3,
}

impl CubeSample {
    pub fn new() -> Self {
        Self {
            state: None,
            angle: Vec3::ZERO,
        }
    }

    fn world(&self) -> Mat4 {
        Mat4::from_rotation_y(self.angle.y) * Mat4::from_rotation_x(self.angle.x)
    }
}

impl Default for CubeSample {
    fn default() -> Self {
        Self::new()
    }
}

impl Sample for CubeSample {
    fn title(&self) -> &str {
        "Rotating Cube"
    }

    fn init(&mut self, gpu: &mut GpuContext) -> Result<()> {
        let device = &gpu.device;
        let mut effect = EffectHelper::builder("CubeEffect")
            .add_constant_buffer("ConstantBuffer", 0, 192, wgpu::ShaderStages::VERTEX)
            .add_variable("g_World", 0, 0, 64)
            .add_variable("g_View", 0, 64, 64)
            .add_variable("g_Proj", 0, 128, 64)
            .build(device)?;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Cube"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader/cube.wgsl").into()),
        });
        effect.add_render_pass(
            PASS_CUBE,
            RenderPassDesc::new(&shader)
                .vertex("vs_main", Some(VertexPosColor::layout()))
                .fragment("fs_main")
                .color_target(gpu.surface_format())
                .depth(dss_default(DEPTH_FORMAT))
                .samples(gpu.sample_count()),
        );

        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
        let proj = Mat4::perspective_rh(std::f32::consts::FRAC_PI_2, gpu.aspect_ratio(), 1.0, 1000.0);
        effect.set_mat4("g_World", &Mat4::IDENTITY)?;
        effect.set_mat4("g_View", &view)?;
        effect.set_mat4("g_Proj", &proj)?;

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("CubeVertexBuffer"),
            contents: bytemuck::cast_slice(&VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("CubeIndexBuffer"),
            contents: bytemuck::cast_slice(&INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        self.state = Some(CubeState {
            effect,
            vertex_buffer,
            index_buffer,
        });
        Ok(())
    }

    fn on_resize(&mut self, gpu: &mut GpuContext) -> Result<()> {
        let aspect = gpu.aspect_ratio();
        let state = common::ready(&mut self.state)?;
        let proj = Mat4::perspective_rh(std::f32::consts::FRAC_PI_2, aspect, 1.0, 1000.0);
        state.effect.set_mat4("g_Proj", &proj)
    }

    fn update_scene(&mut self, ctx: &mut FrameContext<'_>) -> Result<()> {
        self.angle.x = (self.angle.x + 0.3 * ctx.dt) % std::f32::consts::TAU;
        self.angle.y = (self.angle.y + 0.5 * ctx.dt) % std::f32::consts::TAU;
        let world = self.world();
        let state = common::ready(&mut self.state)?;
        state.effect.set_mat4("g_World", &world)
    }

    fn draw_scene(
        &mut self,
        gpu: &mut GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        frame_view: &wgpu::TextureView,
    ) -> Result<()> {
        let state = common::ready(&mut self.state)?;
        let mut rpass = gpu.begin_main_pass(encoder, frame_view, CLEAR_COLOR);
        state.effect.get_pass(PASS_CUBE)?.apply(gpu, &mut rpass)?;
        rpass.set_vertex_buffer(0, state.vertex_buffer.slice(..));
        rpass.set_index_buffer(state.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        rpass.draw_indexed(0..INDICES.len() as u32, 0, 0..1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_faces_wind_outward() {
        for tri in INDICES.chunks(3) {
            let p = |i: u16| Vec3::from_array(VERTICES[i as usize].pos);
            let (a, b, c) = (p(tri[0]), p(tri[1]), p(tri[2]));
            let normal = (b - a).cross(c - a);
            let center = (a + b + c) / 3.0;
            assert!(normal.dot(center) > 0.0, "triangle {tri:?} faces inward");
        }
    }

    #[test]
    fn every_corner_is_referenced() {
        for i in 0..VERTICES.len() as u16 {
            assert!(INDICES.contains(&i));
        }
    }
}

// samples/triangle.rs
//! A single vertex-colored triangle in clip space, drawn with a hand-built pipeline.

use wgpu::util::DeviceExt;

use crate::app::{FrameContext, Sample};
use crate::error::Result;
use crate::renderer::depth::DEPTH_FORMAT;
use crate::renderer::gpu::GpuContext;
use crate::renderer::pipeline_builder::PipelineBuilder;
use crate::renderer::render_states::{dss_default, BlendPreset};
use crate::renderer::vertex::{VertexFormat, VertexPosColor};
use crate::samples::common::{self, CLEAR_COLOR};

const VERTICES: [VertexPosColor; 3] = [
    VertexPosColor {
        pos: [0.0, 0.5, 0.5],
        color: [1.0, 0.0, 0.0, 1.0],
    },
    VertexPosColor {
        pos: [-0.5, -0.5, 0.5],
        color: [0.0, 1.0, 0.0, 1.0],
    },
    VertexPosColor {
        pos: [0.5, -0.5, 0.5],
        color: [0.0, 0.0, 1.0, 1.0],
    },
];

struct TriangleState {
    pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
}

pub struct TriangleSample {
    state: Option<TriangleState>,
}

impl TriangleSample {
    pub fn new() -> Self {
        Self { state: None }
    }
}

impl Default for TriangleSample {
    fn default() -> Self {
        Self::new()
    }
}

impl Sample for TriangleSample {
    fn title(&self) -> &str {
        "Triangle"
    }

    fn init(&mut self, gpu: &mut GpuContext) -> Result<()> {
        let device = &gpu.device;
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Triangle"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader/triangle.wgsl").into()),
        });
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("TrianglePipelineLayout"),
            bind_group_layouts: &[],
            push_constant_ranges: &[],
        });
        let pipeline = PipelineBuilder::new(device, &layout, &shader)
            .with_label("Triangle")
            .with_vertex_buffer(VertexPosColor::layout())
            .with_color_target(gpu.surface_format(), &BlendPreset::default())
            .with_depth_stencil(dss_default(DEPTH_FORMAT))
            .with_multisample(gpu.sample_count())
            .build();

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("TriangleVertexBuffer"),
            contents: bytemuck::cast_slice(&VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        self.state = Some(TriangleState {
            pipeline,
            vertex_buffer,
        });
        Ok(())
    }

    fn update_scene(&mut self, _ctx: &mut FrameContext<'_>) -> Result<()> {
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
        rpass.set_pipeline(&state.pipeline);
        rpass.set_vertex_buffer(0, state.vertex_buffer.slice(..));
        rpass.draw(0..VERTICES.len() as u32, 0..1);
        Ok(())
    }
}

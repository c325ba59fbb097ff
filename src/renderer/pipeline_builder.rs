// src/renderer/pipeline_builder.rs

use crate::renderer::render_states::{BlendPreset, RasterizerState};

/// Builder for render pipelines with the framework's default states
///
/// Starts from back-face culling, no blending and no depth; effects layer
/// render-state presets on top.
pub struct PipelineBuilder<'a> {
    device: &'a wgpu::Device,
    label: Option<&'a str>,
    layout: &'a wgpu::PipelineLayout,
    shader: &'a wgpu::ShaderModule,
    vertex_entry: &'a str,
    fragment_entry: Option<&'a str>,
    vertex_buffers: Vec<wgpu::VertexBufferLayout<'a>>,
    color_targets: Vec<Option<wgpu::ColorTargetState>>,
    depth_stencil: Option<wgpu::DepthStencilState>,
    primitive: wgpu::PrimitiveState,
    depth_bias: wgpu::DepthBiasState,
    multisample: wgpu::MultisampleState,
}

impl<'a> PipelineBuilder<'a> {
    pub fn new(
        device: &'a wgpu::Device,
        layout: &'a wgpu::PipelineLayout,
        shader: &'a wgpu::ShaderModule,
    ) -> Self {
        let rasterizer = RasterizerState::default();
        Self {
            device,
            label: None,
            layout,
            shader,
            vertex_entry: "vs_main",
            fragment_entry: Some("fs_main"),
            vertex_buffers: Vec::new(),
            color_targets: Vec::new(),
            depth_stencil: None,
            primitive: rasterizer.primitive,
            depth_bias: rasterizer.depth_bias,
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
        }
    }

    pub fn with_label(mut self, label: &'a str) -> Self {
        self.label = Some(label);
        self
    }

    /// Vertex shader entry point (default: "vs_main")
    pub fn with_vertex_entry(mut self, entry: &'a str) -> Self {
        self.vertex_entry = entry;
        self
    }

    /// Fragment shader entry point (default: "fs_main"); `None` builds a depth-only pipeline
    pub fn with_fragment_entry(mut self, entry: Option<&'a str>) -> Self {
        self.fragment_entry = entry;
        self
    }

    pub fn with_vertex_buffer(mut self, layout: wgpu::VertexBufferLayout<'a>) -> Self {
        self.vertex_buffers.push(layout);
        self
    }

    pub fn with_color_target(mut self, format: wgpu::TextureFormat, blend: &BlendPreset) -> Self {
        self.color_targets.push(Some(wgpu::ColorTargetState {
            format,
            blend: blend.blend,
            write_mask: blend.write_mask,
        }));
        self.multisample.alpha_to_coverage_enabled |= blend.alpha_to_coverage;
        self
    }

    /// Full depth-stencil state; the rasterizer's bias is merged in at build time
    pub fn with_depth_stencil(mut self, state: wgpu::DepthStencilState) -> Self {
        self.depth_stencil = Some(state);
        self
    }

    pub fn with_rasterizer(mut self, rasterizer: &RasterizerState) -> Self {
        self.primitive = rasterizer.primitive;
        self.depth_bias = rasterizer.depth_bias;
        self
    }

    /// MSAA sample count; alpha-to-coverage is dropped for single-sampled targets
    pub fn with_multisample(mut self, sample_count: u32) -> Self {
        self.multisample.count = sample_count;
        self
    }

    pub fn build(mut self) -> wgpu::RenderPipeline {
        if self.multisample.count <= 1 {
            self.multisample.alpha_to_coverage_enabled = false;
        }
        if self.primitive.polygon_mode == wgpu::PolygonMode::Line
            && !self.device.features().contains(wgpu::Features::POLYGON_MODE_LINE)
        {
            log::warn!("POLYGON_MODE_LINE unavailable, drawing {:?} filled", self.label);
            self.primitive.polygon_mode = wgpu::PolygonMode::Fill;
        }
        let depth_stencil = self.depth_stencil.map(|mut state| {
            state.bias = self.depth_bias;
            state
        });

        self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: self.label,
            layout: Some(self.layout),
            vertex: wgpu::VertexState {
                module: self.shader,
                entry_point: Some(self.vertex_entry),
                buffers: &self.vertex_buffers,
                compilation_options: Default::default(),
            },
            fragment: self.fragment_entry.map(|entry| wgpu::FragmentState {
                module: self.shader,
                entry_point: Some(entry),
                targets: &self.color_targets,
                compilation_options: Default::default(),
            }),
            primitive: self.primitive,
            depth_stencil,
            multisample: self.multisample,
            multiview: None,
            cache: None,
        })
    }
}

// renderer/effect_helper.rs
//! Named constant buffers, resource slots and render passes behind one bind group.
//!
//! Constant buffers live in a CPU byte image per buffer. Writes go through
//! named variables (binding, offset, size) and mark the owning buffer dirty.
//! On `apply` every dirty buffer is copied into the next slot of a ring of
//! uniform blocks and bound with a dynamic offset, so each draw sees the
//! values that were current when it was recorded. The ring restarts whenever
//! the context's frame index changes.

use std::collections::HashMap;
use std::num::NonZeroU64;

use bytemuck::Pod;
use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::error::{RenderError, Result};
use crate::renderer::gpu::GpuContext;
use crate::renderer::pipeline_builder::PipelineBuilder;
use crate::renderer::render_states::{BlendPreset, RasterizerState};

const INITIAL_RING_SLOTS: u32 = 16;

pub fn align_to(value: u64, alignment: u64) -> u64 {
    let alignment = alignment.max(1);
    value.div_ceil(alignment) * alignment
}

/// CPU copy of one constant buffer.
#[derive(Clone, Debug)]
pub struct CBufferData {
    name: String,
    binding: u32,
    data: Vec<u8>,
    dirty: bool,
}

impl CBufferData {
    /// Size is rounded up to a multiple of 16 bytes.
    pub fn new(name: impl Into<String>, binding: u32, size: usize) -> Self {
        let size = align_to(size.max(16) as u64, 16) as usize;
        Self {
            name: name.into(),
            binding,
            data: vec![0; size],
            dirty: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn binding(&self) -> u32 {
        self.binding
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns the image once after each modification.
    pub fn take_dirty(&mut self) -> Option<&[u8]> {
        if !self.dirty {
            return None;
        }
        self.dirty = false;
        Some(&self.data)
    }

    fn write(&mut self, offset: usize, bytes: &[u8]) {
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        self.dirty = true;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Variable {
    binding: u32,
    offset: usize,
    size: usize,
}

/// Constant buffer layouts and the named variables inside them.
#[derive(Clone, Debug, Default)]
pub struct ConstantTable {
    buffers: Vec<CBufferData>,
    variables: HashMap<String, Variable>,
}

impl ConstantTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_constant_buffer(&mut self, name: &str, binding: u32, size: usize) -> Result<()> {
        if self.buffers.iter().any(|b| b.binding == binding || b.name == name) {
            return Err(RenderError::InvalidLayout(format!(
                "constant buffer {name} (binding {binding}) declared twice"
            )));
        }
        self.buffers.push(CBufferData::new(name, binding, size));
        self.buffers.sort_by_key(|b| b.binding);
        Ok(())
    }

    pub fn add_variable(&mut self, name: &str, binding: u32, offset: usize, size: usize) -> Result<()> {
        let buffer = self
            .buffer(binding)
            .ok_or_else(|| RenderError::InvalidLayout(format!("{name}: no constant buffer at binding {binding}")))?;
        if offset + size > buffer.size() {
            return Err(RenderError::InvalidLayout(format!(
                "{name}: bytes {offset}..{} exceed {} ({} bytes)",
                offset + size,
                buffer.name(),
                buffer.size()
            )));
        }
        if self.variables.contains_key(name) {
            return Err(RenderError::InvalidLayout(format!("variable {name} declared twice")));
        }
        self.variables
            .insert(name.to_string(), Variable { binding, offset, size });
        Ok(())
    }

    pub fn buffer(&self, binding: u32) -> Option<&CBufferData> {
        self.buffers.iter().find(|b| b.binding == binding)
    }

    pub fn buffers(&self) -> &[CBufferData] {
        &self.buffers
    }

    pub fn buffers_mut(&mut self) -> &mut [CBufferData] {
        &mut self.buffers
    }

    pub fn set_raw(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        let var = *self
            .variables
            .get(name)
            .ok_or_else(|| RenderError::UnknownVariable(name.to_string()))?;
        if var.size != bytes.len() {
            return Err(RenderError::VariableSize {
                name: name.to_string(),
                expected: var.size,
                actual: bytes.len(),
            });
        }
        let buffer = self
            .buffers
            .iter_mut()
            .find(|b| b.binding == var.binding)
            .ok_or_else(|| RenderError::UnknownVariable(name.to_string()))?;
        buffer.write(var.offset, bytes);
        Ok(())
    }

    pub fn set_pod<T: Pod>(&mut self, name: &str, value: &T) -> Result<()> {
        self.set_raw(name, bytemuck::bytes_of(value))
    }

    pub fn set_slice<T: Pod>(&mut self, name: &str, values: &[T]) -> Result<()> {
        self.set_raw(name, bytemuck::cast_slice(values))
    }

    pub fn set_uint(&mut self, name: &str, value: u32) -> Result<()> {
        self.set_pod(name, &value)
    }

    pub fn set_float(&mut self, name: &str, value: f32) -> Result<()> {
        self.set_pod(name, &value)
    }

    pub fn set_vec2(&mut self, name: &str, value: Vec2) -> Result<()> {
        self.set_pod(name, &value.to_array())
    }

    pub fn set_vec3(&mut self, name: &str, value: Vec3) -> Result<()> {
        self.set_pod(name, &value.to_array())
    }

    pub fn set_vec4(&mut self, name: &str, value: Vec4) -> Result<()> {
        self.set_pod(name, &value.to_array())
    }

    pub fn set_mat4(&mut self, name: &str, value: &Mat4) -> Result<()> {
        self.set_pod(name, &value.to_cols_array())
    }
}

/// Slot allocator for one frame's worth of constant buffer uploads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotRing {
    capacity: u32,
    used: u32,
    frame: u64,
}

impl SlotRing {
    pub fn new(capacity: u32) -> Self {
        Self {
            capacity: capacity.max(1),
            used: 0,
            frame: 0,
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn is_new_frame(&self, frame: u64) -> bool {
        frame != self.frame
    }

    /// Next free slot, and whether capacity had to double to provide it.
    pub fn acquire(&mut self, frame: u64) -> (u32, bool) {
        if self.is_new_frame(frame) {
            self.frame = frame;
            self.used = 0;
        }
        let grew = self.used == self.capacity;
        if grew {
            self.capacity *= 2;
        }
        let slot = self.used;
        self.used += 1;
        (slot, grew)
    }
}

struct ConstantBuffer {
    buffer: wgpu::Buffer,
    stride: u64,
    ring: SlotRing,
    offset: u32,
    label: String,
}

impl ConstantBuffer {
    fn new(device: &wgpu::Device, data: &CBufferData, alignment: u64) -> Self {
        let stride = align_to(data.size() as u64, alignment);
        let ring = SlotRing::new(INITIAL_RING_SLOTS);
        let label = format!("{} ring", data.name());
        Self {
            buffer: create_ring_buffer(device, &label, stride, ring.capacity()),
            stride,
            ring,
            offset: 0,
            label,
        }
    }

    /// Uploads the image into a fresh slot when it changed or a new frame began.
    /// Returns true when the GPU buffer was reallocated.
    fn update(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, data: &mut CBufferData, frame: u64) -> bool {
        let new_frame = self.ring.is_new_frame(frame);
        if data.take_dirty().is_none() && !new_frame {
            return false;
        }
        let (slot, grew) = self.ring.acquire(frame);
        if grew {
            log::info!("Growing {} to {} slots", self.label, self.ring.capacity());
            self.buffer = create_ring_buffer(device, &self.label, self.stride, self.ring.capacity());
        }
        let offset = slot as u64 * self.stride;
        queue.write_buffer(&self.buffer, offset, data.bytes());
        self.offset = offset as u32;
        grew
    }
}

fn create_ring_buffer(device: &wgpu::Device, label: &str, stride: u64, slots: u32) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: stride * slots as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    Texture {
        sample_type: wgpu::TextureSampleType,
        dimension: wgpu::TextureViewDimension,
    },
    /// Write-only storage texture.
    StorageTexture {
        format: wgpu::TextureFormat,
        dimension: wgpu::TextureViewDimension,
    },
    Sampler(wgpu::SamplerBindingType),
}

impl ResourceKind {
    pub fn float_2d() -> Self {
        ResourceKind::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            dimension: wgpu::TextureViewDimension::D2,
        }
    }

    pub fn depth(dimension: wgpu::TextureViewDimension) -> Self {
        ResourceKind::Texture {
            sample_type: wgpu::TextureSampleType::Depth,
            dimension,
        }
    }

    fn binding_type(self) -> wgpu::BindingType {
        match self {
            ResourceKind::Texture {
                sample_type,
                dimension,
            } => wgpu::BindingType::Texture {
                sample_type,
                view_dimension: dimension,
                multisampled: false,
            },
            ResourceKind::StorageTexture { format, dimension } => wgpu::BindingType::StorageTexture {
                access: wgpu::StorageTextureAccess::WriteOnly,
                format,
                view_dimension: dimension,
            },
            ResourceKind::Sampler(ty) => wgpu::BindingType::Sampler(ty),
        }
    }

    fn is_sampler(self) -> bool {
        matches!(self, ResourceKind::Sampler(_))
    }
}

#[derive(Clone)]
enum Bound {
    View(wgpu::TextureView),
    Sampler(wgpu::Sampler),
}

struct ResourceSlot {
    name: String,
    binding: u32,
    visibility: wgpu::ShaderStages,
    kind: ResourceKind,
    bound: Option<Bound>,
}

/// Texture and sampler slots of an effect, looked up by name.
#[derive(Default)]
struct ResourceTable {
    slots: Vec<ResourceSlot>,
}

impl ResourceTable {
    fn add(&mut self, name: &str, binding: u32, visibility: wgpu::ShaderStages, kind: ResourceKind) {
        self.slots.push(ResourceSlot {
            name: name.to_string(),
            binding,
            visibility,
            kind,
            bound: None,
        });
    }

    fn slots(&self) -> &[ResourceSlot] {
        &self.slots
    }

    /// Textures and samplers live in separate namespaces.
    fn slot_mut(&mut self, name: &str, sampler: bool) -> Result<&mut ResourceSlot> {
        self.slots
            .iter_mut()
            .find(|r| r.name == name && r.kind.is_sampler() == sampler)
            .ok_or_else(|| RenderError::UnknownResource(name.to_string()))
    }

    /// Constant buffers and resources share one binding space.
    fn check_bindings(&self, label: &str, constants: &ConstantTable) -> Result<()> {
        let mut bindings: Vec<u32> = constants.buffers().iter().map(|b| b.binding()).collect();
        bindings.extend(self.slots.iter().map(|r| r.binding));
        bindings.sort_unstable();
        if bindings.windows(2).any(|w| w[0] == w[1]) {
            return Err(RenderError::InvalidLayout(format!(
                "{}: duplicate binding in {:?}",
                label, bindings
            )));
        }
        Ok(())
    }

    fn bound(&self) -> Result<Vec<(u32, &Bound)>> {
        self.slots
            .iter()
            .map(|slot| match &slot.bound {
                Some(bound) => Ok((slot.binding, bound)),
                None => Err(RenderError::UnboundResource(slot.name.clone())),
            })
            .collect()
    }
}

fn pass_index<'a>(mut names: impl Iterator<Item = &'a str>, name: &str) -> Result<usize> {
    names
        .position(|n| n == name)
        .ok_or_else(|| RenderError::UnknownPass(name.to_string()))
}

/// Owned description of one render pass: shaders plus fixed-function state.
#[derive(Clone)]
pub struct RenderPassDesc {
    pub shader: wgpu::ShaderModule,
    pub vertex_entry: &'static str,
    pub fragment_entry: Option<&'static str>,
    pub vertex_layout: Option<wgpu::VertexBufferLayout<'static>>,
    pub color_formats: Vec<wgpu::TextureFormat>,
    pub depth_stencil: Option<wgpu::DepthStencilState>,
    pub rasterizer: RasterizerState,
    pub blend: BlendPreset,
    pub sample_count: u32,
}

impl RenderPassDesc {
    pub fn new(shader: &wgpu::ShaderModule) -> Self {
        Self {
            shader: shader.clone(),
            vertex_entry: "vs_main",
            fragment_entry: Some("fs_main"),
            vertex_layout: None,
            color_formats: Vec::new(),
            depth_stencil: None,
            rasterizer: RasterizerState::default(),
            blend: BlendPreset::default(),
            sample_count: 1,
        }
    }

    pub fn vertex(mut self, entry: &'static str, layout: Option<wgpu::VertexBufferLayout<'static>>) -> Self {
        self.vertex_entry = entry;
        self.vertex_layout = layout;
        self
    }

    pub fn fragment(mut self, entry: &'static str) -> Self {
        self.fragment_entry = Some(entry);
        self
    }

    pub fn depth_only(mut self) -> Self {
        self.fragment_entry = None;
        self.color_formats.clear();
        self
    }

    pub fn color_target(mut self, format: wgpu::TextureFormat) -> Self {
        self.color_formats.push(format);
        self
    }

    pub fn depth(mut self, state: wgpu::DepthStencilState) -> Self {
        self.depth_stencil = Some(state);
        self
    }

    pub fn rasterizer(mut self, rasterizer: RasterizerState) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    pub fn blend(mut self, blend: BlendPreset) -> Self {
        self.blend = blend;
        self
    }

    pub fn samples(mut self, count: u32) -> Self {
        self.sample_count = count.max(1);
        self
    }
}

#[derive(Clone)]
pub struct ComputePassDesc {
    pub shader: wgpu::ShaderModule,
    pub entry: &'static str,
}

impl ComputePassDesc {
    pub fn new(shader: &wgpu::ShaderModule, entry: &'static str) -> Self {
        Self {
            shader: shader.clone(),
            entry,
        }
    }
}

struct RenderPassEntry {
    name: String,
    desc: RenderPassDesc,
    pipeline: Option<wgpu::RenderPipeline>,
}

struct ComputePassEntry {
    name: String,
    desc: ComputePassDesc,
    pipeline: Option<wgpu::ComputePipeline>,
}

/// Declares the bind group layout of an effect before it is created.
pub struct EffectHelperBuilder {
    label: String,
    constants: ConstantTable,
    cbuffer_visibility: HashMap<u32, wgpu::ShaderStages>,
    resources: ResourceTable,
    error: Option<RenderError>,
}

impl EffectHelperBuilder {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            constants: ConstantTable::new(),
            cbuffer_visibility: HashMap::new(),
            resources: ResourceTable::default(),
            error: None,
        }
    }

    fn record(&mut self, result: Result<()>) {
        if let Err(err) = result {
            self.error.get_or_insert(err);
        }
    }

    pub fn add_constant_buffer(
        mut self,
        name: &str,
        binding: u32,
        size: usize,
        visibility: wgpu::ShaderStages,
    ) -> Self {
        let result = self.constants.add_constant_buffer(name, binding, size);
        self.record(result);
        self.cbuffer_visibility.insert(binding, visibility);
        self
    }

    pub fn add_variable(mut self, name: &str, binding: u32, offset: usize, size: usize) -> Self {
        let result = self.constants.add_variable(name, binding, offset, size);
        self.record(result);
        self
    }

    pub fn add_resource(
        mut self,
        name: &str,
        binding: u32,
        visibility: wgpu::ShaderStages,
        kind: ResourceKind,
    ) -> Self {
        self.resources.add(name, binding, visibility, kind);
        self
    }

    pub fn build(self, device: &wgpu::Device) -> Result<EffectHelper> {
        if let Some(err) = self.error {
            return Err(err);
        }

        self.resources.check_bindings(&self.label, &self.constants)?;

        let mut entries: Vec<wgpu::BindGroupLayoutEntry> = self
            .constants
            .buffers()
            .iter()
            .map(|b| wgpu::BindGroupLayoutEntry {
                binding: b.binding(),
                visibility: self
                    .cbuffer_visibility
                    .get(&b.binding())
                    .copied()
                    .unwrap_or(wgpu::ShaderStages::VERTEX_FRAGMENT),
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(b.size() as u64),
                },
                count: None,
            })
            .collect();
        entries.extend(self.resources.slots().iter().map(|r| wgpu::BindGroupLayoutEntry {
            binding: r.binding,
            visibility: r.visibility,
            ty: r.kind.binding_type(),
            count: None,
        }));

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&self.label),
            entries: &entries,
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&self.label),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let alignment = device.limits().min_uniform_buffer_offset_alignment as u64;
        let gpu_buffers = self
            .constants
            .buffers()
            .iter()
            .map(|b| ConstantBuffer::new(device, b, alignment))
            .collect();

        log::debug!(
            "Effect {}: {} constant buffers, {} resources",
            self.label,
            self.constants.buffers().len(),
            self.resources.slots().len()
        );

        Ok(EffectHelper {
            label: self.label,
            constants: self.constants,
            gpu_buffers,
            resources: self.resources,
            layout,
            pipeline_layout,
            bind_group: None,
            passes: Vec::new(),
            compute_passes: Vec::new(),
        })
    }
}

/// Shader parameters, resources and named passes of one effect.
pub struct EffectHelper {
    label: String,
    constants: ConstantTable,
    // same order as `constants.buffers()`
    gpu_buffers: Vec<ConstantBuffer>,
    resources: ResourceTable,
    layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    bind_group: Option<wgpu::BindGroup>,
    passes: Vec<RenderPassEntry>,
    compute_passes: Vec<ComputePassEntry>,
}

impl EffectHelper {
    pub fn builder(label: impl Into<String>) -> EffectHelperBuilder {
        EffectHelperBuilder::new(label)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn constants(&self) -> &ConstantTable {
        &self.constants
    }

    pub fn add_render_pass(&mut self, name: &str, desc: RenderPassDesc) {
        if let Some(entry) = self.passes.iter_mut().find(|p| p.name == name) {
            entry.desc = desc;
            entry.pipeline = None;
            return;
        }
        self.passes.push(RenderPassEntry {
            name: name.to_string(),
            desc,
            pipeline: None,
        });
    }

    pub fn add_compute_pass(&mut self, name: &str, desc: ComputePassDesc) {
        if let Some(entry) = self.compute_passes.iter_mut().find(|p| p.name == name) {
            entry.desc = desc;
            entry.pipeline = None;
            return;
        }
        self.compute_passes.push(ComputePassEntry {
            name: name.to_string(),
            desc,
            pipeline: None,
        });
    }

    pub fn get_pass(&mut self, name: &str) -> Result<EffectPass<'_>> {
        let index = pass_index(self.passes.iter().map(|p| p.name.as_str()), name)?;
        Ok(EffectPass { helper: self, index })
    }

    pub fn set_raw(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        self.constants.set_raw(name, bytes)
    }

    pub fn set_pod<T: Pod>(&mut self, name: &str, value: &T) -> Result<()> {
        self.constants.set_pod(name, value)
    }

    pub fn set_slice<T: Pod>(&mut self, name: &str, values: &[T]) -> Result<()> {
        self.constants.set_slice(name, values)
    }

    pub fn set_uint(&mut self, name: &str, value: u32) -> Result<()> {
        self.constants.set_uint(name, value)
    }

    pub fn set_float(&mut self, name: &str, value: f32) -> Result<()> {
        self.constants.set_float(name, value)
    }

    pub fn set_vec2(&mut self, name: &str, value: Vec2) -> Result<()> {
        self.constants.set_vec2(name, value)
    }

    pub fn set_vec3(&mut self, name: &str, value: Vec3) -> Result<()> {
        self.constants.set_vec3(name, value)
    }

    pub fn set_vec4(&mut self, name: &str, value: Vec4) -> Result<()> {
        self.constants.set_vec4(name, value)
    }

    pub fn set_mat4(&mut self, name: &str, value: &Mat4) -> Result<()> {
        self.constants.set_mat4(name, value)
    }

    pub fn set_texture(&mut self, name: &str, view: &wgpu::TextureView) -> Result<()> {
        let slot = self.resources.slot_mut(name, false)?;
        if matches!(&slot.bound, Some(Bound::View(bound)) if bound == view) {
            return Ok(());
        }
        slot.bound = Some(Bound::View(view.clone()));
        self.bind_group = None;
        Ok(())
    }

    pub fn set_sampler(&mut self, name: &str, sampler: &wgpu::Sampler) -> Result<()> {
        let slot = self.resources.slot_mut(name, true)?;
        if matches!(&slot.bound, Some(Bound::Sampler(bound)) if bound == sampler) {
            return Ok(());
        }
        slot.bound = Some(Bound::Sampler(sampler.clone()));
        self.bind_group = None;
        Ok(())
    }

    /// Uploads dirty constant buffers and returns the bind group with its dynamic offsets.
    fn prepare(&mut self, gpu: &GpuContext) -> Result<(wgpu::BindGroup, Vec<u32>)> {
        let frame = gpu.frame_index();
        for (gpu_buffer, data) in self.gpu_buffers.iter_mut().zip(self.constants.buffers_mut()) {
            if gpu_buffer.update(&gpu.device, &gpu.queue, data, frame) {
                self.bind_group = None;
            }
        }

        let bind_group = match &self.bind_group {
            Some(bind_group) => bind_group.clone(),
            None => {
                let bind_group = self.create_bind_group(&gpu.device)?;
                self.bind_group = Some(bind_group.clone());
                bind_group
            }
        };
        let offsets = self.gpu_buffers.iter().map(|b| b.offset).collect();
        Ok((bind_group, offsets))
    }

    fn create_bind_group(&self, device: &wgpu::Device) -> Result<wgpu::BindGroup> {
        let mut entries: Vec<wgpu::BindGroupEntry> = self
            .gpu_buffers
            .iter()
            .zip(self.constants.buffers())
            .map(|(gpu_buffer, data)| wgpu::BindGroupEntry {
                binding: data.binding(),
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &gpu_buffer.buffer,
                    offset: 0,
                    size: NonZeroU64::new(data.size() as u64),
                }),
            })
            .collect();

        for (binding, bound) in self.resources.bound()? {
            let resource = match bound {
                Bound::View(view) => wgpu::BindingResource::TextureView(view),
                Bound::Sampler(sampler) => wgpu::BindingResource::Sampler(sampler),
            };
            entries.push(wgpu::BindGroupEntry { binding, resource });
        }

        log::trace!("Rebuilding bind group for {}", self.label);
        Ok(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&self.label),
            layout: &self.layout,
            entries: &entries,
        }))
    }

    /// Binds a compute pass and its resources.
    pub fn apply_compute(&mut self, name: &str, gpu: &GpuContext, cpass: &mut wgpu::ComputePass<'_>) -> Result<()> {
        let index = pass_index(self.compute_passes.iter().map(|p| p.name.as_str()), name)?;

        let (bind_group, offsets) = self.prepare(gpu)?;

        let entry = &mut self.compute_passes[index];
        let pipeline = match &entry.pipeline {
            Some(pipeline) => pipeline.clone(),
            None => {
                let pipeline = gpu.device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                    label: Some(&entry.name),
                    layout: Some(&self.pipeline_layout),
                    module: &entry.desc.shader,
                    entry_point: Some(entry.desc.entry),
                    compilation_options: Default::default(),
                    cache: None,
                });
                entry.pipeline = Some(pipeline.clone());
                pipeline
            }
        };

        cpass.set_pipeline(&pipeline);
        cpass.set_bind_group(0, &bind_group, &offsets);
        Ok(())
    }
}

/// Handle to one named render pass of an effect.
pub struct EffectPass<'h> {
    helper: &'h mut EffectHelper,
    index: usize,
}

impl EffectPass<'_> {
    pub fn name(&self) -> &str {
        &self.helper.passes[self.index].name
    }

    pub fn desc(&self) -> &RenderPassDesc {
        &self.helper.passes[self.index].desc
    }

    pub fn set_rasterizer(&mut self, rasterizer: RasterizerState) {
        let entry = &mut self.helper.passes[self.index];
        entry.desc.rasterizer = rasterizer;
        entry.pipeline = None;
    }

    pub fn set_blend(&mut self, blend: BlendPreset) {
        let entry = &mut self.helper.passes[self.index];
        entry.desc.blend = blend;
        entry.pipeline = None;
    }

    /// Uploads dirty constants, then binds the pass pipeline and the effect's bind group.
    pub fn apply(&mut self, gpu: &GpuContext, rpass: &mut wgpu::RenderPass<'_>) -> Result<()> {
        let (bind_group, offsets) = self.helper.prepare(gpu)?;

        let pipeline_layout = &self.helper.pipeline_layout;
        let entry = &mut self.helper.passes[self.index];
        let pipeline = match &entry.pipeline {
            Some(pipeline) => pipeline.clone(),
            None => {
                let pipeline = build_render_pipeline(&gpu.device, pipeline_layout, &entry.name, &entry.desc);
                entry.pipeline = Some(pipeline.clone());
                pipeline
            }
        };

        rpass.set_pipeline(&pipeline);
        rpass.set_bind_group(0, &bind_group, &offsets);
        Ok(())
    }
}

fn build_render_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    name: &str,
    desc: &RenderPassDesc,
) -> wgpu::RenderPipeline {
    log::debug!("Creating pipeline for pass {}", name);
    let mut builder = PipelineBuilder::new(device, layout, &desc.shader)
        .with_label(name)
        .with_vertex_entry(desc.vertex_entry)
        .with_fragment_entry(desc.fragment_entry)
        .with_rasterizer(&desc.rasterizer)
        .with_multisample(desc.sample_count);
    if let Some(vertex_layout) = &desc.vertex_layout {
        builder = builder.with_vertex_buffer(vertex_layout.clone());
    }
    for &format in &desc.color_formats {
        builder = builder.with_color_target(format, &desc.blend);
    }
    if let Some(state) = &desc.depth_stencil {
        builder = builder.with_depth_stencil(state.clone());
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ConstantTable {
        let mut table = ConstantTable::new();
        table.add_constant_buffer("PerObject", 0, 128).unwrap();
        table.add_constant_buffer("PerFrame", 1, 80).unwrap();
        table.add_variable("g_World", 0, 0, 64).unwrap();
        table.add_variable("g_WorldInvTranspose", 0, 64, 64).unwrap();
        table.add_variable("g_View", 1, 0, 64).unwrap();
        table.add_variable("g_EyePosW", 1, 64, 12).unwrap();
        table.add_variable("g_Time", 1, 76, 4).unwrap();
        table
    }

    fn clean(table: &mut ConstantTable) {
        for buffer in table.buffers_mut() {
            buffer.take_dirty();
        }
    }

    #[test]
    fn setting_a_variable_dirties_only_its_buffer() {
        let mut table = table();
        clean(&mut table);

        table.set_float("g_Time", 2.5).unwrap();

        assert!(!table.buffer(0).unwrap().is_dirty());
        assert!(table.buffer(1).unwrap().is_dirty());
        let bytes = &table.buffer(1).unwrap().bytes()[76..80];
        assert_eq!(bytes, &2.5f32.to_ne_bytes());
    }

    #[test]
    fn take_dirty_yields_once() {
        let mut table = table();
        clean(&mut table);
        table.set_mat4("g_World", &Mat4::from_translation(Vec3::X)).unwrap();

        let buffer = &mut table.buffers_mut()[0];
        assert!(buffer.take_dirty().is_some());
        assert!(buffer.take_dirty().is_none());
        assert!(!buffer.is_dirty());
    }

    #[test]
    fn new_buffers_start_dirty() {
        let table = table();
        assert!(table.buffers().iter().all(CBufferData::is_dirty));
    }

    #[test]
    fn unknown_variable_is_an_error() {
        let mut table = table();
        let err = table.set_float("g_Missing", 1.0).unwrap_err();
        assert!(matches!(err, RenderError::UnknownVariable(name) if name == "g_Missing"));
    }

    #[test]
    fn size_mismatch_is_an_error() {
        let mut table = table();
        let err = table.set_vec4("g_EyePosW", Vec4::ONE).unwrap_err();
        assert!(matches!(
            err,
            RenderError::VariableSize { expected: 12, actual: 16, .. }
        ));
        // failed writes leave the buffer untouched
        clean(&mut table);
        assert!(table.set_vec4("g_EyePosW", Vec4::ONE).is_err());
        assert!(!table.buffer(1).unwrap().is_dirty());
    }

    #[test]
    fn variables_must_fit_their_buffer() {
        let mut table = table();
        assert!(matches!(
            table.add_variable("g_TooFar", 1, 72, 16),
            Err(RenderError::InvalidLayout(_))
        ));
        assert!(matches!(
            table.add_variable("g_NoBuffer", 7, 0, 4),
            Err(RenderError::InvalidLayout(_))
        ));
        assert!(matches!(
            table.add_constant_buffer("Again", 0, 16),
            Err(RenderError::InvalidLayout(_))
        ));
    }

    #[test]
    fn buffer_sizes_round_to_sixteen() {
        assert_eq!(CBufferData::new("a", 0, 1).size(), 16);
        assert_eq!(CBufferData::new("b", 0, 76).size(), 80);
        assert_eq!(CBufferData::new("c", 0, 1264).size(), 1264);
    }

    #[test]
    fn ring_restarts_each_frame_and_doubles_when_full() {
        let mut ring = SlotRing::new(2);
        assert_eq!(ring.acquire(1), (0, false));
        assert_eq!(ring.acquire(1), (1, false));
        assert_eq!(ring.acquire(1), (2, true));
        assert_eq!(ring.capacity(), 4);
        assert_eq!(ring.acquire(2), (0, false));
        assert!(!ring.is_new_frame(2));
        assert!(ring.is_new_frame(3));
    }

    #[test]
    fn ring_stays_bounded_when_every_frame_advances() {
        // frames that fail after a few draws still get a new index
        let mut ring = SlotRing::new(4);
        for frame in 1..=100 {
            for _ in 0..3 {
                ring.acquire(frame);
            }
        }
        assert_eq!(ring.capacity(), 4);

        // without a new index the same work keeps growing the ring
        let mut stuck = SlotRing::new(4);
        for _ in 0..100 {
            for _ in 0..3 {
                stuck.acquire(1);
            }
        }
        assert!(stuck.capacity() >= 300);
    }

    fn resources() -> ResourceTable {
        let mut resources = ResourceTable::default();
        resources.add("g_DiffuseMap", 2, wgpu::ShaderStages::FRAGMENT, ResourceKind::float_2d());
        resources.add(
            "g_Sam",
            3,
            wgpu::ShaderStages::FRAGMENT,
            ResourceKind::Sampler(wgpu::SamplerBindingType::Filtering),
        );
        resources
    }

    #[test]
    fn resource_lookup_separates_textures_and_samplers() {
        let mut resources = resources();
        assert_eq!(resources.slot_mut("g_DiffuseMap", false).unwrap().binding, 2);
        assert_eq!(resources.slot_mut("g_Sam", true).unwrap().binding, 3);

        let err = resources.slot_mut("g_DiffuseMap", true).err().unwrap();
        assert!(matches!(err, RenderError::UnknownResource(name) if name == "g_DiffuseMap"));
        assert!(matches!(
            resources.slot_mut("g_NormalMap", false),
            Err(RenderError::UnknownResource(_))
        ));
    }

    #[test]
    fn unbound_resources_are_reported_by_name() {
        let resources = resources();
        let err = resources.bound().err().unwrap();
        assert!(matches!(err, RenderError::UnboundResource(name) if name == "g_DiffuseMap"));
        assert!(ResourceTable::default().bound().unwrap().is_empty());
    }

    #[test]
    fn bindings_must_be_unique_across_buffers_and_resources() {
        let table = table();
        assert!(resources().check_bindings("Basic", &table).is_ok());

        let mut clash = resources();
        clash.add("g_ShadowMap", 1, wgpu::ShaderStages::FRAGMENT, ResourceKind::float_2d());
        assert!(matches!(
            clash.check_bindings("Basic", &table),
            Err(RenderError::InvalidLayout(msg)) if msg.starts_with("Basic")
        ));
    }

    #[test]
    fn passes_are_found_by_name() {
        let names = ["Basic", "BasicWireframe", "BasicTransparent"];
        assert_eq!(pass_index(names.iter().copied(), "BasicWireframe").unwrap(), 1);
        let err = pass_index(names.iter().copied(), "Missing").unwrap_err();
        assert!(matches!(err, RenderError::UnknownPass(name) if name == "Missing"));
    }

    #[test]
    fn align_rounds_up() {
        assert_eq!(align_to(192, 256), 256);
        assert_eq!(align_to(256, 256), 256);
        assert_eq!(align_to(257, 256), 512);
        assert_eq!(align_to(5, 0), 5);
    }
}

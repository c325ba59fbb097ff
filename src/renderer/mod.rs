// renderer/mod.rs
//! Device context, GPU resources, render states and effects.

pub mod depth;
pub mod effect_helper;
pub mod effects;
pub mod gpu;
pub mod lights;
pub mod mesh;
pub mod pipeline_builder;
pub mod render_states;
pub mod shadow_render;
pub mod texture;
pub mod texture_render;
pub mod vertex;

pub use depth::Depth;
pub use effect_helper::{EffectHelper, EffectPass, RenderPassDesc};
pub use gpu::GpuContext;
pub use mesh::Mesh;
pub use render_states::RenderStates;
pub use shadow_render::ShadowRender;
pub use texture::Texture;
pub use texture_render::{GBuffer, TextureRender};

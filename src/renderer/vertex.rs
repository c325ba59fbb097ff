use bytemuck::{Pod, Zeroable};
use std::mem;

/// Vertex types that know their own buffer layout.
pub trait VertexFormat: Pod {
    fn layout() -> wgpu::VertexBufferLayout<'static>;
}

macro_rules! vertex_layout {
    ($ty:ty, $attrs:expr) => {
        impl VertexFormat for $ty {
            fn layout() -> wgpu::VertexBufferLayout<'static> {
                wgpu::VertexBufferLayout {
                    array_stride: mem::size_of::<$ty>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: $attrs,
                }
            }
        }
    };
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, PartialEq)]
pub struct VertexPos {
    pub pos: [f32; 3],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, PartialEq)]
pub struct VertexPosColor {
    pub pos: [f32; 3],
    pub color: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, PartialEq)]
pub struct VertexPosTex {
    pub pos: [f32; 3],
    pub uv: [f32; 2],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, PartialEq)]
pub struct VertexPosNormalColor {
    pub pos: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, PartialEq)]
pub struct VertexPosNormalTex {
    pub pos: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// Full vertex produced by the geometry generators.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, PartialEq)]
pub struct VertexPosNormalTangentTex {
    pub pos: [f32; 3],
    pub normal: [f32; 3],
    pub tangent: [f32; 4],
    pub uv: [f32; 2],
}

impl VertexPos {
    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];
}

impl VertexPosColor {
    const ATTRS: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x4];
}

impl VertexPosTex {
    const ATTRS: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2];
}

impl VertexPosNormalColor {
    const ATTRS: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x4];
}

impl VertexPosNormalTex {
    const ATTRS: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];
}

impl VertexPosNormalTangentTex {
    const ATTRS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
        2 => Float32x4,
        3 => Float32x2
    ];
}

vertex_layout!(VertexPos, &VertexPos::ATTRS);
vertex_layout!(VertexPosColor, &VertexPosColor::ATTRS);
vertex_layout!(VertexPosTex, &VertexPosTex::ATTRS);
vertex_layout!(VertexPosNormalColor, &VertexPosNormalColor::ATTRS);
vertex_layout!(VertexPosNormalTex, &VertexPosNormalTex::ATTRS);
vertex_layout!(VertexPosNormalTangentTex, &VertexPosNormalTangentTex::ATTRS);

impl From<VertexPosNormalTangentTex> for VertexPos {
    fn from(v: VertexPosNormalTangentTex) -> Self {
        Self { pos: v.pos }
    }
}

impl From<VertexPosNormalTangentTex> for VertexPosTex {
    fn from(v: VertexPosNormalTangentTex) -> Self {
        Self { pos: v.pos, uv: v.uv }
    }
}

impl From<VertexPosNormalTangentTex> for VertexPosNormalTex {
    fn from(v: VertexPosNormalTangentTex) -> Self {
        Self {
            pos: v.pos,
            normal: v.normal,
            uv: v.uv,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_stride<V: VertexFormat>() {
        assert_eq!(
            V::layout().array_stride,
            std::mem::size_of::<V>() as wgpu::BufferAddress
        );
    }

    #[test]
    fn vertex_stride_matches_struct_size() {
        assert_stride::<VertexPos>();
        assert_stride::<VertexPosColor>();
        assert_stride::<VertexPosTex>();
        assert_stride::<VertexPosNormalColor>();
        assert_stride::<VertexPosNormalTex>();
        assert_stride::<VertexPosNormalTangentTex>();
    }

    #[test]
    fn last_attribute_ends_at_stride() {
        let layout = VertexPosNormalTangentTex::layout();
        let last = layout.attributes.last().unwrap();
        assert_eq!(last.offset + last.format.size(), layout.array_stride);
    }
}

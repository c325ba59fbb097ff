use wgpu::util::DeviceExt;

use crate::renderer::vertex::{VertexFormat, VertexPosNormalTangentTex};
use crate::scene::collision::BoundingBox;
use crate::scene::geometry::MeshData;

/// Vertex and index buffers of one uploaded mesh.
#[derive(Clone, Debug)]
pub struct Mesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    bounding_box: BoundingBox,
}

impl Mesh {
    /// Uploads generated geometry in vertex format `V`.
    pub fn new<V>(device: &wgpu::Device, data: &MeshData<VertexPosNormalTangentTex>, label: &str) -> Self
    where
        V: VertexFormat + From<VertexPosNormalTangentTex>,
    {
        let converted = data.convert::<V>();
        Self::with_bounds(device, &converted.vertices, &converted.indices, data.bounding_box(), label)
    }

    pub fn with_bounds<V: VertexFormat>(
        device: &wgpu::Device,
        vertices: &[V],
        indices: &[u32],
        bounding_box: BoundingBox,
        label: &str,
    ) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}VertexBuffer")),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}IndexBuffer")),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
            bounding_box,
        }
    }

    pub fn vertex_buffer(&self) -> &wgpu::Buffer {
        &self.vertex_buffer
    }

    pub fn index_buffer(&self) -> &wgpu::Buffer {
        &self.index_buffer
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Local-space bounds of the vertices.
    pub fn bounding_box(&self) -> BoundingBox {
        self.bounding_box
    }

    pub fn draw(&self, rpass: &mut wgpu::RenderPass<'_>) {
        rpass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        rpass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        rpass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

use std::f32::consts::{PI, TAU};

use glam::{Vec2, Vec3};

use crate::renderer::vertex::VertexPosNormalTangentTex;
use crate::scene::collision::BoundingBox;

/// CPU-side mesh: vertices plus a triangle-list index buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshData<V> {
    pub vertices: Vec<V>,
    pub indices: Vec<u32>,
}

// no `V: Default` bound, vertex types are plain Pod structs
impl<V> Default for MeshData<V> {
    fn default() -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }
}

impl<V> MeshData<V> {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

impl MeshData<VertexPosNormalTangentTex> {
    pub fn convert<T>(&self) -> MeshData<T>
    where
        T: From<VertexPosNormalTangentTex>,
    {
        MeshData {
            vertices: self.vertices.iter().copied().map(T::from).collect(),
            indices: self.indices.clone(),
        }
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(self.vertices.iter().map(|v| Vec3::from(v.pos)))
    }
}

fn vertex(pos: Vec3, normal: Vec3, tangent: Vec3, uv: Vec2) -> VertexPosNormalTangentTex {
    VertexPosNormalTangentTex {
        pos: pos.to_array(),
        normal: normal.to_array(),
        tangent: tangent.extend(1.0).to_array(),
        uv: uv.to_array(),
    }
}

/// Axis-aligned box centered on the origin, four vertices per face.
pub fn create_box(width: f32, height: f32, depth: f32) -> MeshData<VertexPosNormalTangentTex> {
    let half = Vec3::new(width, height, depth) * 0.5;

    // (normal, u axis, v axis) with u x v == normal
    let faces = [
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
    ];

    let mut mesh = MeshData {
        vertices: Vec::with_capacity(24),
        indices: Vec::with_capacity(36),
    };

    for (normal, u, v) in faces {
        let base = mesh.vertices.len() as u32;
        let corners = [
            (-u - v, Vec2::new(0.0, 1.0)),
            (u - v, Vec2::new(1.0, 1.0)),
            (u + v, Vec2::new(1.0, 0.0)),
            (-u + v, Vec2::new(0.0, 0.0)),
        ];
        for (offset, uv) in corners {
            mesh.vertices
                .push(vertex((normal + offset) * half, normal, u, uv));
        }
        mesh.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    mesh
}

/// UV sphere with single pole vertices. `levels` counts latitude bands.
pub fn create_sphere(radius: f32, levels: u32, slices: u32) -> MeshData<VertexPosNormalTangentTex> {
    let levels = levels.max(2);
    let slices = slices.max(3);
    let mut mesh = MeshData::default();

    mesh.vertices.push(vertex(
        Vec3::new(0.0, radius, 0.0),
        Vec3::Y,
        Vec3::X,
        Vec2::new(0.0, 0.0),
    ));

    for level in 1..levels {
        let phi = PI * level as f32 / levels as f32;
        for slice in 0..=slices {
            let theta = TAU * slice as f32 / slices as f32;
            let normal = Vec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin());
            let tangent = Vec3::new(-theta.sin(), 0.0, theta.cos());
            let uv = Vec2::new(theta / TAU, phi / PI);
            mesh.vertices.push(vertex(normal * radius, normal, tangent, uv));
        }
    }

    mesh.vertices.push(vertex(
        Vec3::new(0.0, -radius, 0.0),
        Vec3::NEG_Y,
        Vec3::X,
        Vec2::new(0.0, 1.0),
    ));

    let ring = slices + 1;
    let south = mesh.vertices.len() as u32 - 1;

    for slice in 0..slices {
        mesh.indices.extend_from_slice(&[0, 1 + slice + 1, 1 + slice]);
    }

    for level in 0..levels - 2 {
        for slice in 0..slices {
            let current = 1 + level * ring + slice;
            let below = current + ring;
            mesh.indices
                .extend_from_slice(&[current, current + 1, below, current + 1, below + 1, below]);
        }
    }

    let last_ring = 1 + (levels - 2) * ring;
    for slice in 0..slices {
        mesh.indices
            .extend_from_slice(&[last_ring + slice, last_ring + slice + 1, south]);
    }

    mesh
}

/// Capped cylinder along Y, centered on the origin.
pub fn create_cylinder(
    radius: f32,
    height: f32,
    slices: u32,
    stacks: u32,
) -> MeshData<VertexPosNormalTangentTex> {
    let slices = slices.max(3);
    let stacks = stacks.max(1);
    let mut mesh = MeshData::default();
    let half_height = height * 0.5;
    let ring = slices + 1;

    for stack in 0..=stacks {
        let y = -half_height + height * stack as f32 / stacks as f32;
        for slice in 0..=slices {
            let theta = TAU * slice as f32 / slices as f32;
            let (sin, cos) = theta.sin_cos();
            let normal = Vec3::new(cos, 0.0, sin);
            let uv = Vec2::new(slice as f32 / slices as f32, 1.0 - stack as f32 / stacks as f32);
            mesh.vertices.push(vertex(
                Vec3::new(radius * cos, y, radius * sin),
                normal,
                Vec3::new(-sin, 0.0, cos),
                uv,
            ));
        }
    }

    for stack in 0..stacks {
        for slice in 0..slices {
            let lower = stack * ring + slice;
            let upper = lower + ring;
            mesh.indices
                .extend_from_slice(&[lower, upper, lower + 1, lower + 1, upper, upper + 1]);
        }
    }

    for (y, normal) in [(half_height, Vec3::Y), (-half_height, Vec3::NEG_Y)] {
        let center = mesh.vertices.len() as u32;
        mesh.vertices
            .push(vertex(Vec3::new(0.0, y, 0.0), normal, Vec3::X, Vec2::splat(0.5)));
        for slice in 0..=slices {
            let theta = TAU * slice as f32 / slices as f32;
            let (sin, cos) = theta.sin_cos();
            mesh.vertices.push(vertex(
                Vec3::new(radius * cos, y, radius * sin),
                normal,
                Vec3::X,
                Vec2::new(cos * 0.5 + 0.5, sin * 0.5 + 0.5),
            ));
        }
        for slice in 0..slices {
            let a = center + 1 + slice;
            if normal.y > 0.0 {
                mesh.indices.extend_from_slice(&[center, a + 1, a]);
            } else {
                mesh.indices.extend_from_slice(&[center, a, a + 1]);
            }
        }
    }

    mesh
}

/// Flat plane on XZ facing +Y. Texture coordinates repeat `tex_u` x `tex_v` times.
pub fn create_plane(width: f32, depth: f32, tex_u: f32, tex_v: f32) -> MeshData<VertexPosNormalTangentTex> {
    create_grid(width, depth, 2, 2, tex_u, tex_v)
}

/// `rows` x `cols` vertex grid on XZ facing +Y.
pub fn create_grid(
    width: f32,
    depth: f32,
    rows: u32,
    cols: u32,
    tex_u: f32,
    tex_v: f32,
) -> MeshData<VertexPosNormalTangentTex> {
    let rows = rows.max(2);
    let cols = cols.max(2);
    let mut mesh = MeshData::default();

    for row in 0..rows {
        let fv = row as f32 / (rows - 1) as f32;
        let z = depth * 0.5 - depth * fv;
        for col in 0..cols {
            let fu = col as f32 / (cols - 1) as f32;
            let x = -width * 0.5 + width * fu;
            mesh.vertices.push(vertex(
                Vec3::new(x, 0.0, z),
                Vec3::Y,
                Vec3::X,
                Vec2::new(fu * tex_u, (1.0 - fv) * tex_v),
            ));
        }
    }

    for row in 0..rows - 1 {
        for col in 0..cols - 1 {
            let p0 = row * cols + col;
            let p1 = p0 + 1;
            let p3 = p0 + cols;
            let p2 = p3 + 1;
            mesh.indices.extend_from_slice(&[p0, p1, p2, p0, p2, p3]);
        }
    }

    mesh
}

/// Screen-space quad in normalized device coordinates.
pub fn create_2d_show(center: Vec2, scale: Vec2) -> MeshData<VertexPosNormalTangentTex> {
    let corners = [
        (Vec2::new(-1.0, -1.0), Vec2::new(0.0, 1.0)),
        (Vec2::new(1.0, -1.0), Vec2::new(1.0, 1.0)),
        (Vec2::new(1.0, 1.0), Vec2::new(1.0, 0.0)),
        (Vec2::new(-1.0, 1.0), Vec2::new(0.0, 0.0)),
    ];
    MeshData {
        vertices: corners
            .iter()
            .map(|&(p, uv)| {
                let p = center + p * scale;
                vertex(Vec3::new(p.x, p.y, 0.0), Vec3::Z, Vec3::X, uv)
            })
            .collect(),
        indices: vec![0, 1, 2, 0, 2, 3],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mesh_is_empty() {
        let mesh = MeshData::<VertexPosNormalTangentTex>::default();
        assert!(mesh.vertices.is_empty());
        assert_eq!(mesh.triangle_count(), 0);
        assert_eq!(mesh.convert::<crate::renderer::vertex::VertexPosNormalTex>().vertices.len(), 0);
    }

    fn position(mesh: &MeshData<VertexPosNormalTangentTex>, index: u32) -> Vec3 {
        Vec3::from(mesh.vertices[index as usize].pos)
    }

    // Every non-degenerate triangle must wind counter-clockwise seen from
    // the side its vertex normals point to.
    fn assert_outward_winding(mesh: &MeshData<VertexPosNormalTangentTex>) {
        for tri in mesh.indices.chunks(3) {
            let (a, b, c) = (position(mesh, tri[0]), position(mesh, tri[1]), position(mesh, tri[2]));
            let face = (b - a).cross(c - a);
            if face.length() < 1e-6 {
                continue;
            }
            let normal: Vec3 = tri
                .iter()
                .map(|&i| Vec3::from(mesh.vertices[i as usize].normal))
                .sum();
            assert!(face.dot(normal) > 0.0, "triangle {:?} winds inward", tri);
        }
    }

    fn assert_valid(mesh: &MeshData<VertexPosNormalTangentTex>) {
        assert_eq!(mesh.indices.len() % 3, 0);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
        for v in &mesh.vertices {
            assert!((Vec3::from(v.normal).length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn box_has_24_vertices_and_12_triangles() {
        let mesh = create_box(2.0, 4.0, 6.0);
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.triangle_count(), 12);
        assert_valid(&mesh);
        assert_outward_winding(&mesh);

        let bounds = mesh.bounding_box();
        assert!(bounds.extents.abs_diff_eq(Vec3::new(1.0, 2.0, 3.0), 1e-6));
    }

    #[test]
    fn sphere_is_closed_and_outward() {
        let mesh = create_sphere(2.0, 10, 12);
        // two poles plus (levels - 1) rings of (slices + 1)
        assert_eq!(mesh.vertices.len(), 2 + 9 * 13);
        assert_eq!(mesh.triangle_count(), 2 * 12 + 8 * 12 * 2);
        assert_valid(&mesh);
        assert_outward_winding(&mesh);
        for v in &mesh.vertices {
            assert!((Vec3::from(v.pos).length() - 2.0).abs() < 1e-5);
        }
    }

    #[test]
    fn cylinder_sides_and_caps_are_outward() {
        let mesh = create_cylinder(1.0, 3.0, 16, 2);
        assert_valid(&mesh);
        assert_outward_winding(&mesh);
        let bounds = mesh.bounding_box();
        assert!((bounds.extents.y - 1.5).abs() < 1e-6);
    }

    #[test]
    fn grid_faces_up() {
        let mesh = create_grid(10.0, 8.0, 5, 4, 2.0, 2.0);
        assert_eq!(mesh.vertices.len(), 20);
        assert_eq!(mesh.triangle_count(), 4 * 3 * 2);
        assert_valid(&mesh);
        assert_outward_winding(&mesh);
    }

    #[test]
    fn plane_uvs_repeat() {
        let mesh = create_plane(4.0, 4.0, 3.0, 5.0);
        let max_u = mesh.vertices.iter().map(|v| v.uv[0]).fold(0.0, f32::max);
        let max_v = mesh.vertices.iter().map(|v| v.uv[1]).fold(0.0, f32::max);
        assert_eq!((max_u, max_v), (3.0, 5.0));
    }

    #[test]
    fn quad_faces_viewer() {
        let mesh = create_2d_show(Vec2::ZERO, Vec2::ONE);
        assert_outward_winding(&mesh);
    }

    #[test]
    fn convert_keeps_topology() {
        let mesh = create_box(1.0, 1.0, 1.0);
        let converted = mesh.convert::<crate::renderer::vertex::VertexPosNormalTex>();
        assert_eq!(converted.vertices.len(), mesh.vertices.len());
        assert_eq!(converted.indices, mesh.indices);
        assert_eq!(converted.vertices[5].uv, mesh.vertices[5].uv);
    }
}

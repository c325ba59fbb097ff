// scene/game_object.rs

use glam::Mat4;

use crate::error::Result;
use crate::renderer::effects::{Effect, EffectMaterial, EffectTransforms};
use crate::renderer::gpu::GpuContext;
use crate::renderer::lights::Material;
use crate::renderer::mesh::Mesh;
use crate::scene::collision::{BoundingBox, BoundingOrientedBox, Containment, Frustum};
use crate::scene::transform::Transform;

/// One mesh with the material and texture it is drawn with.
#[derive(Clone, Debug)]
pub struct ModelPart {
    pub mesh: Mesh,
    pub material: Material,
    pub texture: Option<wgpu::TextureView>,
}

impl ModelPart {
    pub fn new(mesh: Mesh, material: Material) -> Self {
        Self {
            mesh,
            material,
            texture: None,
        }
    }

    pub fn with_texture(mut self, texture: &wgpu::TextureView) -> Self {
        self.texture = Some(texture.clone());
        self
    }
}

#[derive(Clone, Debug)]
pub struct Model {
    pub parts: Vec<ModelPart>,
    bounding_box: BoundingBox,
}

impl Model {
    /// Bounds are the union of the part meshes.
    pub fn new(parts: Vec<ModelPart>) -> Self {
        let bounding_box = parts
            .iter()
            .map(|p| p.mesh.bounding_box())
            .reduce(|a, b| a.merge(&b))
            .unwrap_or_default();
        Self { parts, bounding_box }
    }

    pub fn with_bounds(parts: Vec<ModelPart>, bounding_box: BoundingBox) -> Self {
        Self { parts, bounding_box }
    }

    pub fn from_mesh(mesh: Mesh, material: Material) -> Self {
        Self::new(vec![ModelPart::new(mesh, material)])
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.bounding_box
    }
}

/// A model placed in the world.
#[derive(Clone, Debug)]
pub struct GameObject {
    pub transform: Transform,
    pub model: Model,
    pub visible: bool,
}

impl GameObject {
    pub fn new(model: Model) -> Self {
        Self {
            transform: Transform::default(),
            model,
            visible: true,
        }
    }

    pub fn world_matrix(&self) -> Mat4 {
        self.transform.local_to_world_matrix()
    }

    /// World-space axis-aligned bounds.
    pub fn bounding_box(&self) -> BoundingBox {
        self.model.bounding_box().transform(&self.world_matrix())
    }

    pub fn bounding_oriented_box(&self) -> BoundingOrientedBox {
        BoundingOrientedBox::from_box(&self.model.bounding_box(), &self.world_matrix())
    }

    pub fn in_frustum(&self, frustum: &Frustum) -> bool {
        frustum.contains_oriented_box(&self.bounding_oriented_box()) != Containment::Disjoint
    }

    /// Sets the world matrix and draws every part with `effect`'s current pass.
    /// Invisible objects are skipped.
    pub fn draw<E>(&self, gpu: &GpuContext, rpass: &mut wgpu::RenderPass<'_>, effect: &mut E) -> Result<()>
    where
        E: Effect + EffectTransforms,
    {
        if !self.visible {
            return Ok(());
        }
        effect.set_world(&self.world_matrix())?;
        for part in &self.model.parts {
            effect.apply(gpu, rpass)?;
            part.mesh.draw(rpass);
        }
        Ok(())
    }

    /// Like `draw`, also binding each part's material and texture.
    pub fn draw_lit<E>(&self, gpu: &GpuContext, rpass: &mut wgpu::RenderPass<'_>, effect: &mut E) -> Result<()>
    where
        E: Effect + EffectTransforms + EffectMaterial,
    {
        if !self.visible {
            return Ok(());
        }
        effect.set_world(&self.world_matrix())?;
        for part in &self.model.parts {
            effect.set_material(&part.material)?;
            effect.set_diffuse_texture(part.texture.as_ref())?;
            effect.apply(gpu, rpass)?;
            part.mesh.draw(rpass);
        }
        Ok(())
    }
}

/// Marks every object outside `frustum` invisible and returns how many remain.
pub fn cull_objects(objects: &mut [GameObject], frustum: &Frustum) -> usize {
    let mut visible = 0;
    for object in objects.iter_mut() {
        object.visible = object.in_frustum(frustum);
        if object.visible {
            visible += 1;
        }
    }
    visible
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};

    fn unit_cube_object() -> GameObject {
        let bounds = BoundingBox::new(Vec3::ZERO, Vec3::splat(0.5));
        GameObject::new(Model::with_bounds(Vec::new(), bounds))
    }

    #[test]
    fn world_bounds_follow_the_transform() {
        let mut object = unit_cube_object();
        object.transform.position = Vec3::new(3.0, 0.0, -2.0);
        object.transform.scale = Vec3::splat(2.0);

        let aabb = object.bounding_box();
        assert!(aabb.center.abs_diff_eq(Vec3::new(3.0, 0.0, -2.0), 1e-5));
        assert!(aabb.extents.abs_diff_eq(Vec3::ONE, 1e-5));
    }

    #[test]
    fn rotated_aabb_grows_but_obb_does_not() {
        let mut object = unit_cube_object();
        object.transform.rotation = Quat::from_rotation_y(std::f32::consts::FRAC_PI_4);

        let aabb = object.bounding_box();
        let obb = object.bounding_oriented_box();
        assert!(aabb.extents.x > 0.7);
        assert!(obb.extents.abs_diff_eq(Vec3::splat(0.5), 1e-5));
    }

    #[test]
    fn culling_hides_objects_behind_the_camera() {
        let view = Mat4::look_at_rh(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
        let proj = Mat4::perspective_rh(std::f32::consts::FRAC_PI_3, 1.0, 0.1, 100.0);
        let frustum = Frustum::from_matrix(&(proj * view));

        let mut front = unit_cube_object();
        front.transform.position = Vec3::new(0.0, 0.0, -10.0);
        let mut behind = unit_cube_object();
        behind.transform.position = Vec3::new(0.0, 0.0, 10.0);
        let mut objects = vec![front, behind];

        assert_eq!(cull_objects(&mut objects, &frustum), 1);
        assert!(objects[0].visible);
        assert!(!objects[1].visible);
    }
}

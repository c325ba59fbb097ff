// samples/common.rs
//! Camera controls and scene helpers shared by the samples.

use glam::{Vec3, Vec4};
use winit::keyboard::KeyCode;

use crate::error::{RenderError, Result};
use crate::input::{InputState, MouseButtons};
use crate::renderer::gpu::GpuContext;
use crate::renderer::lights::{DirectionalLight, Material};
use crate::renderer::mesh::Mesh;
use crate::renderer::vertex::{VertexPosNormalTangentTex, VertexPosNormalTex};
use crate::scene::camera::{Camera, FirstPersonCamera, ThirdPersonCamera, Viewport};
use crate::scene::game_object::{GameObject, Model, ModelPart};
use crate::scene::geometry::{self, MeshData};
use crate::scene::transform::Transform;

pub const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.2,
    g: 0.2,
    b: 0.25,
    a: 1.0,
};

const MOUSE_SENSITIVITY: f32 = 0.004;
const MOVE_SPEED: f32 = 6.0;

/// Unwraps per-sample GPU state created in `init`.
pub fn ready<T>(state: &mut Option<T>) -> Result<&mut T> {
    state
        .as_mut()
        .ok_or_else(|| RenderError::InvalidLayout("sample used before init".to_string()))
}

pub fn camera_for(gpu: &GpuContext, near_z: f32, far_z: f32) -> Camera {
    let mut camera = Camera::default();
    fit_viewport(&mut camera, gpu);
    camera.near_z = near_z;
    camera.far_z = far_z;
    camera
}

/// Matches viewport and aspect ratio to the swap chain.
pub fn fit_viewport(camera: &mut Camera, gpu: &GpuContext) {
    let size = gpu.size();
    camera.set_viewport(Viewport::new(size.width as f32, size.height as f32));
}

/// WASD walks, Q/E fly, right mouse drag looks around.
pub fn fly(camera: &mut FirstPersonCamera, input: &InputState, dt: f32) {
    let speed = if input.key_down(KeyCode::ShiftLeft) {
        MOVE_SPEED * 3.0
    } else {
        MOVE_SPEED
    };
    camera.walk(input.axis(KeyCode::KeyS, KeyCode::KeyW) * speed * dt);
    camera.strafe(input.axis(KeyCode::KeyA, KeyCode::KeyD) * speed * dt);
    let rise = input.axis(KeyCode::KeyQ, KeyCode::KeyE) * speed * dt;
    camera.camera.transform.translate(Vec3::Y, rise);

    if input.mouse_down(MouseButtons::RIGHT) {
        let delta = input.mouse_delta();
        camera.pitch(-delta.y * MOUSE_SENSITIVITY);
        camera.rotate_y(-delta.x * MOUSE_SENSITIVITY);
    }
}

/// Left mouse drag orbits, the wheel zooms.
pub fn orbit(camera: &mut ThirdPersonCamera, input: &InputState) {
    if input.mouse_down(MouseButtons::LEFT) {
        let delta = input.mouse_delta();
        camera.rotate_x(delta.y * MOUSE_SENSITIVITY);
        camera.rotate_y(-delta.x * MOUSE_SENSITIVITY);
    }
    let scroll = input.scroll_delta();
    if scroll != 0.0 {
        camera.approach(-scroll * 1.0);
    }
}

pub fn sun(direction: Vec3) -> DirectionalLight {
    DirectionalLight {
        direction: direction.normalize_or(Vec3::NEG_Y),
        ..DirectionalLight::default()
    }
}

pub fn material(color: Vec4, specular_power: f32) -> Material {
    Material {
        ambient: color * 0.4,
        diffuse: color,
        specular: Vec4::new(0.3, 0.3, 0.3, specular_power),
        reflect: Vec4::ZERO,
    }
}

pub fn upload(device: &wgpu::Device, data: &MeshData<VertexPosNormalTangentTex>, label: &str) -> Mesh {
    Mesh::new::<VertexPosNormalTex>(device, data, label)
}

pub fn object(mesh: &Mesh, material: Material, position: Vec3) -> GameObject {
    let mut object = GameObject::new(Model::from_mesh(mesh.clone(), material));
    object.transform = Transform::from_position(position);
    object
}

pub fn textured_object(
    mesh: &Mesh,
    material: Material,
    texture: &wgpu::TextureView,
    position: Vec3,
) -> GameObject {
    let part = ModelPart::new(mesh.clone(), material).with_texture(texture);
    let mut object = GameObject::new(Model::new(vec![part]));
    object.transform = Transform::from_position(position);
    object
}

/// Ground plane plus a field of boxes and cylinders, used by the shadow samples.
pub fn shadow_test_scene(device: &wgpu::Device, ground_size: f32) -> Vec<GameObject> {
    let ground = upload(
        device,
        &geometry::create_plane(ground_size, ground_size, ground_size / 4.0, ground_size / 4.0),
        "Ground",
    );
    let cube = upload(device, &geometry::create_box(1.0, 1.0, 1.0), "Box");
    let cylinder = upload(device, &geometry::create_cylinder(0.5, 3.0, 20, 1), "Cylinder");
    let sphere = upload(device, &geometry::create_sphere(0.8, 20, 20), "Sphere");

    let mut objects = vec![object(
        &ground,
        material(Vec4::new(0.8, 0.8, 0.75, 1.0), 16.0),
        Vec3::ZERO,
    )];

    let half = (ground_size * 0.4) as i32;
    let step = 6;
    for z in (-half..=half).step_by(step as usize) {
        for x in (-half..=half).step_by(step as usize) {
            let position = Vec3::new(x as f32, 0.0, z as f32);
            let kind = ((x / step) + (z / step)).rem_euclid(3);
            let mut obj = match kind {
                0 => {
                    let mut o = object(&cube, material(Vec4::new(0.9, 0.4, 0.3, 1.0), 32.0), position);
                    o.transform.scale = Vec3::new(1.5, 2.0, 1.5);
                    o.transform.position.y = 1.0;
                    o
                }
                1 => {
                    let mut o = object(&cylinder, material(Vec4::new(0.3, 0.6, 0.9, 1.0), 32.0), position);
                    o.transform.position.y = 1.5;
                    o
                }
                _ => {
                    let mut o = object(&sphere, material(Vec4::new(0.4, 0.85, 0.4, 1.0), 64.0), position);
                    o.transform.position.y = 0.8;
                    o
                }
            };
            obj.transform.rotate_axis(Vec3::Y, (x * 7 + z * 13) as f32 * 0.05);
            objects.push(obj);
        }
    }
    objects
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn material_keeps_power_in_specular_w() {
        let m = material(Vec4::new(1.0, 0.5, 0.25, 1.0), 24.0);
        assert_eq!(m.specular.w, 24.0);
        assert_eq!(m.diffuse, Vec4::new(1.0, 0.5, 0.25, 1.0));
    }

    #[test]
    fn sun_direction_is_normalized() {
        let light = sun(Vec3::new(1.0, -2.0, 1.0));
        assert!((light.direction.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn ready_reports_missing_state() {
        let mut state: Option<u32> = None;
        assert!(ready(&mut state).is_err());
        state = Some(3);
        assert_eq!(*ready(&mut state).unwrap(), 3);
    }
}

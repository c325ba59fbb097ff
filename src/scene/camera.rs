use std::f32::consts::{FRAC_PI_3, PI, TAU};

use glam::{Mat4, Vec3};

use crate::scene::collision::{Frustum, Ray};
use crate::scene::transform::Transform;

const MAX_PITCH: f32 = 7.0 * PI / 18.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width,
            height,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }

    pub fn aspect_ratio(&self) -> f32 {
        if self.height <= 0.0 {
            1.0
        } else {
            self.width / self.height
        }
    }
}

/// Perspective camera shared by the first and third person controllers.
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub transform: Transform,
    pub viewport: Viewport,
    pub fov_y: f32,
    pub aspect: f32,
    pub near_z: f32,
    pub far_z: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            transform: Transform::from_position(Vec3::new(0.0, 0.0, 3.0)),
            viewport: Viewport::new(1280.0, 720.0),
            fov_y: 60f32.to_radians(),
            aspect: 16.0 / 9.0,
            near_z: 0.1,
            far_z: 100.0,
        }
    }
}

impl Camera {
    pub fn position(&self) -> Vec3 {
        self.transform.position
    }

    pub fn set_frustum(&mut self, fov_y: f32, aspect: f32, near_z: f32, far_z: f32) {
        self.fov_y = fov_y;
        self.aspect = aspect;
        self.near_z = near_z;
        self.far_z = far_z;
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.aspect = viewport.aspect_ratio();
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.transform.rotation, self.transform.position).inverse()
    }

    pub fn proj_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near_z, self.far_z)
    }

    pub fn view_proj_matrix(&self) -> Mat4 {
        self.proj_matrix() * self.view_matrix()
    }

    /// World-space view frustum.
    pub fn frustum(&self) -> Frustum {
        Frustum::from_matrix(&self.view_proj_matrix())
    }

    /// Picking ray through a point in viewport pixels.
    pub fn screen_to_ray(&self, screen_x: f32, screen_y: f32) -> Ray {
        Ray::from_screen(
            screen_x,
            screen_y,
            &self.viewport,
            &self.view_proj_matrix().inverse(),
        )
    }
}

/// Free-look camera: yaw and clamped pitch, walking on the XZ plane or flying.
#[derive(Clone, Copy, Debug, Default)]
pub struct FirstPersonCamera {
    pub camera: Camera,
}

impl FirstPersonCamera {
    pub fn new(camera: Camera) -> Self {
        Self { camera }
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.camera.transform.position = position;
    }

    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        self.camera.transform.look_at(target, up);
    }

    pub fn look_to(&mut self, direction: Vec3, up: Vec3) {
        self.camera.transform.look_to(direction, up);
    }

    pub fn strafe(&mut self, distance: f32) {
        let right = self.camera.transform.right_axis();
        self.camera.transform.translate(right, distance);
    }

    /// Moves along the forward axis projected onto the ground plane.
    pub fn walk(&mut self, distance: f32) {
        let forward = self.camera.transform.forward_axis();
        let flat = Vec3::new(forward.x, 0.0, forward.z);
        self.camera.transform.translate(flat, distance);
    }

    pub fn move_forward(&mut self, distance: f32) {
        let forward = self.camera.transform.forward_axis();
        self.camera.transform.translate(forward, distance);
    }

    /// Positive radians look up. Total pitch stays within +-70 degrees.
    pub fn pitch(&mut self, radians: f32) {
        let mut euler = self.camera.transform.rotation_euler();
        euler.x = (euler.x + radians).clamp(-MAX_PITCH, MAX_PITCH);
        euler.z = 0.0;
        self.camera.transform.set_rotation_euler(euler);
    }

    pub fn rotate_y(&mut self, radians: f32) {
        let mut euler = self.camera.transform.rotation_euler();
        euler.y = wrap_angle(euler.y + radians);
        euler.z = 0.0;
        self.camera.transform.set_rotation_euler(euler);
    }
}

/// Orbit camera looking at a target from a clamped distance and elevation.
#[derive(Clone, Copy, Debug)]
pub struct ThirdPersonCamera {
    pub camera: Camera,
    target: Vec3,
    distance: f32,
    min_distance: f32,
    max_distance: f32,
    // elevation above the target, in [0, pi/3]
    elevation: f32,
    yaw: f32,
}

impl Default for ThirdPersonCamera {
    fn default() -> Self {
        let mut cam = Self {
            camera: Camera::default(),
            target: Vec3::ZERO,
            distance: 10.0,
            min_distance: 1.0,
            max_distance: 50.0,
            elevation: 0.3,
            yaw: 0.0,
        };
        cam.update_transform();
        cam
    }
}

impl ThirdPersonCamera {
    pub fn new(camera: Camera) -> Self {
        let mut cam = Self {
            camera,
            ..Self::default()
        };
        cam.update_transform();
        cam
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn elevation(&self) -> f32 {
        self.elevation
    }

    pub fn set_target(&mut self, target: Vec3) {
        self.target = target;
        self.update_transform();
    }

    pub fn set_distance(&mut self, distance: f32) {
        self.distance = distance.clamp(self.min_distance, self.max_distance);
        self.update_transform();
    }

    pub fn set_distance_min_max(&mut self, min_distance: f32, max_distance: f32) {
        self.min_distance = min_distance.min(max_distance);
        self.max_distance = max_distance.max(min_distance);
        self.set_distance(self.distance);
    }

    /// Rotates about the camera's right axis. Positive radians raise the camera.
    pub fn rotate_x(&mut self, radians: f32) {
        self.set_rotation_x(self.elevation + radians);
    }

    pub fn rotate_y(&mut self, radians: f32) {
        self.set_rotation_y(self.yaw + radians);
    }

    pub fn set_rotation_x(&mut self, radians: f32) {
        self.elevation = radians.clamp(0.0, FRAC_PI_3);
        self.update_transform();
    }

    pub fn set_rotation_y(&mut self, radians: f32) {
        self.yaw = wrap_angle(radians);
        self.update_transform();
    }

    /// Moves towards (negative) or away from (positive) the target.
    pub fn approach(&mut self, distance: f32) {
        self.set_distance(self.distance + distance);
    }

    fn update_transform(&mut self) {
        let t = &mut self.camera.transform;
        t.set_rotation_euler(Vec3::new(-self.elevation, self.yaw, 0.0));
        t.position = self.target - t.forward_axis() * self.distance;
    }
}

fn wrap_angle(radians: f32) -> f32 {
    let wrapped = (radians + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn view_proj_is_invertible() {
        let cam = Camera::default();
        let vp = cam.view_proj_matrix();
        let id = vp * vp.inverse();
        assert!(id.abs_diff_eq(Mat4::IDENTITY, 1e-4));
    }

    #[test]
    fn set_frustum_drives_the_projection() {
        let mut cam = Camera::default();
        cam.set_frustum(FRAC_PI_2, 2.0, 1.0, 50.0);
        let expected = Mat4::perspective_rh(FRAC_PI_2, 2.0, 1.0, 50.0);
        assert!(cam.proj_matrix().abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn view_matrix_matches_look_at() {
        let mut cam = FirstPersonCamera::default();
        cam.set_position(Vec3::new(2.0, 3.0, 5.0));
        cam.look_at(Vec3::ZERO, Vec3::Y);
        let expected = Mat4::look_at_rh(Vec3::new(2.0, 3.0, 5.0), Vec3::ZERO, Vec3::Y);
        assert!(cam.camera.view_matrix().abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn first_person_pitch_is_clamped() {
        let mut cam = FirstPersonCamera::default();
        cam.pitch(3.0);
        assert!((cam.camera.transform.rotation_euler().x - MAX_PITCH).abs() < 1e-4);
        cam.pitch(-10.0);
        assert!((cam.camera.transform.rotation_euler().x + MAX_PITCH).abs() < 1e-4);
    }

    #[test]
    fn walk_stays_on_ground_plane() {
        let mut cam = FirstPersonCamera::default();
        cam.set_position(Vec3::new(0.0, 2.0, 0.0));
        cam.pitch(0.8);
        cam.walk(5.0);
        assert!((cam.camera.position().y - 2.0).abs() < 1e-5);
        assert!((cam.camera.position().length() - (4.0f32 + 25.0).sqrt()).abs() < 1e-4);
    }

    #[test]
    fn move_forward_follows_pitch() {
        let mut cam = FirstPersonCamera::default();
        cam.set_position(Vec3::ZERO);
        cam.pitch(0.5);
        cam.move_forward(1.0);
        assert!((cam.camera.position().y - 0.5f32.sin()).abs() < 1e-5);
    }

    #[test]
    fn strafe_moves_along_right_axis() {
        let mut cam = FirstPersonCamera::default();
        cam.set_position(Vec3::ZERO);
        cam.rotate_y(FRAC_PI_2);
        cam.strafe(2.0);
        // facing -X after a quarter turn, so right is -Z
        assert!(cam.camera.position().abs_diff_eq(Vec3::new(0.0, 0.0, -2.0), 1e-5));
    }

    #[test]
    fn third_person_orbits_target_at_distance() {
        let mut cam = ThirdPersonCamera::default();
        cam.set_target(Vec3::new(1.0, 2.0, 3.0));
        cam.set_distance(8.0);
        cam.rotate_y(1.0);
        cam.rotate_x(0.4);

        let pos = cam.camera.position();
        assert!(((pos - cam.target()).length() - 8.0).abs() < 1e-4);
        assert!(pos.y > cam.target().y);
        let to_target = (cam.target() - pos).normalize();
        assert!(cam.camera.transform.forward_axis().abs_diff_eq(to_target, 1e-5));
    }

    #[test]
    fn third_person_clamps_elevation_and_distance() {
        let mut cam = ThirdPersonCamera::default();
        cam.set_distance_min_max(2.0, 20.0);

        cam.rotate_x(5.0);
        assert!((cam.elevation() - FRAC_PI_3).abs() < 1e-6);
        cam.rotate_x(-5.0);
        assert_eq!(cam.elevation(), 0.0);

        cam.approach(-100.0);
        assert_eq!(cam.distance(), 2.0);
        cam.approach(100.0);
        assert_eq!(cam.distance(), 20.0);
    }

    #[test]
    fn wrap_angle_keeps_range() {
        // +-pi are the same heading
        assert!((wrap_angle(3.0 * PI).abs() - PI).abs() < 1e-5);
        assert!((wrap_angle(-0.5) + 0.5).abs() < 1e-6);
        assert!((wrap_angle(TAU + 0.25) - 0.25).abs() < 1e-5);
    }
}

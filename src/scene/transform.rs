use glam::{Mat3, Mat4, Quat, Vec3};

/// Object transform: scale, then rotation, then translation.
///
/// Euler angles are (pitch, yaw, roll) about (X, Y, Z), composed as
/// `Ry(yaw) * Rx(pitch) * Rz(roll)`. The local forward axis is -Z.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub scale: Vec3,
    pub rotation: Quat,
    pub position: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            scale: Vec3::ONE,
            rotation: Quat::IDENTITY,
            position: Vec3::ZERO,
        }
    }
}

impl Transform {
    pub fn new(scale: Vec3, rotation: Quat, position: Vec3) -> Self {
        Self {
            scale,
            rotation,
            position,
        }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn local_to_world_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    pub fn world_to_local_matrix(&self) -> Mat4 {
        self.local_to_world_matrix().inverse()
    }

    pub fn right_axis(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    pub fn up_axis(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    pub fn forward_axis(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    /// (pitch, yaw, roll) in radians.
    pub fn rotation_euler(&self) -> Vec3 {
        euler_from_matrix(&Mat3::from_quat(self.rotation))
    }

    pub fn set_rotation_euler(&mut self, euler: Vec3) {
        self.rotation = quat_from_euler(euler);
    }

    /// Adds `delta` to the current Euler angles.
    pub fn rotate(&mut self, delta: Vec3) {
        let euler = self.rotation_euler() + delta;
        self.set_rotation_euler(euler);
    }

    pub fn rotate_axis(&mut self, axis: Vec3, radians: f32) {
        self.rotation = (Quat::from_axis_angle(axis.normalize(), radians) * self.rotation).normalize();
    }

    /// Orbits the transform around `point`, turning it with the orbit.
    pub fn rotate_around(&mut self, point: Vec3, axis: Vec3, radians: f32) {
        let q = Quat::from_axis_angle(axis.normalize(), radians);
        self.position = point + q * (self.position - point);
        self.rotation = (q * self.rotation).normalize();
    }

    pub fn translate(&mut self, direction: Vec3, magnitude: f32) {
        self.position += direction.normalize_or_zero() * magnitude;
    }

    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        self.look_to(target - self.position, up);
    }

    pub fn look_to(&mut self, direction: Vec3, up: Vec3) {
        if let Some(rotation) = look_rotation(direction, up) {
            self.rotation = rotation;
        }
    }
}

/// Quaternion whose forward (-Z) axis points along `direction`.
///
/// Returns `None` when `direction` is zero or parallel to `up`.
pub fn look_rotation(direction: Vec3, up: Vec3) -> Option<Quat> {
    let forward = direction.try_normalize()?;
    let right = forward.cross(up).try_normalize()?;
    let up = right.cross(forward);
    Some(Quat::from_mat3(&Mat3::from_cols(right, up, -forward)).normalize())
}

pub fn quat_from_euler(euler: Vec3) -> Quat {
    Quat::from_rotation_y(euler.y) * Quat::from_rotation_x(euler.x) * Quat::from_rotation_z(euler.z)
}

/// Extracts (pitch, yaw, roll) from a rotation matrix built as `Ry * Rx * Rz`.
///
/// At gimbal lock (pitch at +-90 degrees) roll is folded into yaw and returned as zero.
pub fn euler_from_matrix(m: &Mat3) -> Vec3 {
    let e = |row: usize, col: usize| m.col(col)[row];

    let sin_pitch = (-e(1, 2)).clamp(-1.0, 1.0);
    let pitch = sin_pitch.asin();

    if sin_pitch.abs() < 0.999_999 {
        let yaw = e(0, 2).atan2(e(2, 2));
        let roll = e(1, 0).atan2(e(1, 1));
        Vec3::new(pitch, yaw, roll)
    } else {
        let yaw = (-e(2, 0)).atan2(e(0, 0));
        Vec3::new(pitch, yaw, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

    #[test]
    fn default_is_identity() {
        let m = Transform::default().local_to_world_matrix();
        assert!(m.abs_diff_eq(Mat4::IDENTITY, 1e-6));
    }

    #[test]
    fn scale_rotate_translate_order() {
        let tr = Transform::new(
            Vec3::splat(2.0),
            Quat::from_rotation_y(FRAC_PI_2),
            Vec3::new(1.0, 2.0, 3.0),
        );
        let p = tr.local_to_world_matrix().transform_point3(Vec3::X);
        // (1,0,0) -> (2,0,0) -> (0,0,-2) -> (1,2,1)
        assert!(p.abs_diff_eq(Vec3::new(1.0, 2.0, 1.0), 1e-5));
    }

    #[test]
    fn axes_follow_rotation() {
        let mut tr = Transform::default();
        assert!(tr.up_axis().abs_diff_eq(Vec3::Y, 1e-6));
        assert!(tr.forward_axis().abs_diff_eq(Vec3::NEG_Z, 1e-6));

        tr.rotation = Quat::from_rotation_x(FRAC_PI_2);
        // pitching up 90 degrees tips the up axis backwards
        assert!(tr.up_axis().abs_diff_eq(Vec3::Z, 1e-5));
        assert!(tr.forward_axis().abs_diff_eq(Vec3::Y, 1e-5));
        assert!(tr.right_axis().abs_diff_eq(Vec3::X, 1e-5));
    }

    #[test]
    fn world_to_local_inverts_local_to_world() {
        let tr = Transform::new(
            Vec3::new(1.0, 2.0, 0.5),
            quat_from_euler(Vec3::new(0.3, -1.2, 0.4)),
            Vec3::new(-4.0, 1.0, 7.0),
        );
        let id = tr.local_to_world_matrix() * tr.world_to_local_matrix();
        assert!(id.abs_diff_eq(Mat4::IDENTITY, 1e-5));
    }

    #[test]
    fn euler_roundtrips_away_from_gimbal_lock() {
        let cases = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.3, 0.0, 0.0),
            Vec3::new(0.0, 1.1, 0.0),
            Vec3::new(0.0, 0.0, -0.7),
            Vec3::new(-0.5, 2.0, 0.25),
            Vec3::new(1.2, -2.8, 1.5),
        ];
        for euler in cases {
            let m = Mat3::from_quat(quat_from_euler(euler));
            let back = euler_from_matrix(&m);
            assert!(
                back.abs_diff_eq(euler, 1e-4),
                "euler {:?} came back as {:?}",
                euler,
                back
            );
        }
    }

    #[test]
    fn euler_at_gimbal_lock_reproduces_rotation() {
        let euler = Vec3::new(FRAC_PI_2, 0.6, 0.2);
        let m = Mat3::from_quat(quat_from_euler(euler));
        let back = euler_from_matrix(&m);

        assert!(back.is_finite());
        assert!((back.x - FRAC_PI_2).abs() < 1e-3);
        assert_eq!(back.z, 0.0);

        let rebuilt = Mat3::from_quat(quat_from_euler(back));
        assert!(rebuilt.abs_diff_eq(m, 1e-3));
    }

    #[test]
    fn look_at_points_forward_axis_at_target() {
        let mut tr = Transform::from_position(Vec3::new(3.0, 4.0, -2.0));
        let target = Vec3::new(-1.0, 0.5, 6.0);
        tr.look_at(target, Vec3::Y);

        let expected = (target - tr.position).normalize();
        assert!(tr.forward_axis().abs_diff_eq(expected, 1e-5));
        // no roll: right axis stays horizontal
        assert!(tr.right_axis().y.abs() < 1e-5);
    }

    #[test]
    fn look_at_parallel_to_up_keeps_rotation() {
        let mut tr = Transform::default();
        tr.look_to(Vec3::Y, Vec3::Y);
        assert_eq!(tr.rotation, Quat::IDENTITY);
    }

    #[test]
    fn rotate_around_keeps_distance() {
        let mut tr = Transform::from_position(Vec3::new(5.0, 0.0, 0.0));
        tr.rotate_around(Vec3::ZERO, Vec3::Y, FRAC_PI_2);
        assert!(tr.position.abs_diff_eq(Vec3::new(0.0, 0.0, -5.0), 1e-5));
        assert!((tr.rotation_euler().y - FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn rotate_accumulates_euler_angles() {
        let mut tr = Transform::default();
        tr.rotate(Vec3::new(0.0, FRAC_PI_4, 0.0));
        tr.rotate(Vec3::new(0.2, FRAC_PI_4, 0.0));
        let euler = tr.rotation_euler();
        assert!((euler.x - 0.2).abs() < 1e-5);
        assert!((euler.y - FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn translate_normalizes_direction() {
        let mut tr = Transform::default();
        tr.translate(Vec3::new(0.0, 0.0, 10.0), 2.0);
        assert!(tr.position.abs_diff_eq(Vec3::new(0.0, 0.0, 2.0), 1e-6));
    }
}

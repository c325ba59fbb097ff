use glam::{Mat3, Mat4, Quat, Vec3, Vec4};

use crate::renderer::vertex::VertexPosColor;
use crate::scene::camera::Viewport;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Containment {
    Disjoint,
    Intersects,
    Contains,
}

/// Axis-aligned box stored as center and half extents.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoundingBox {
    pub center: Vec3,
    pub extents: Vec3,
}

impl BoundingBox {
    pub fn new(center: Vec3, extents: Vec3) -> Self {
        Self { center, extents }
    }

    pub fn from_min_max(min: Vec3, max: Vec3) -> Self {
        Self {
            center: (min + max) * 0.5,
            extents: (max - min) * 0.5,
        }
    }

    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = Vec3>,
    {
        let mut iter = points.into_iter();
        let Some(first) = iter.next() else {
            return Self::default();
        };
        let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Self::from_min_max(min, max)
    }

    pub fn min(&self) -> Vec3 {
        self.center - self.extents
    }

    pub fn max(&self) -> Vec3 {
        self.center + self.extents
    }

    /// Corners ordered as the near face (-Z) then the far face (+Z),
    /// each counter-clockwise starting from (-X, -Y).
    pub fn corners(&self) -> [Vec3; 8] {
        let (c, e) = (self.center, self.extents);
        [
            c + Vec3::new(-e.x, -e.y, -e.z),
            c + Vec3::new(e.x, -e.y, -e.z),
            c + Vec3::new(e.x, e.y, -e.z),
            c + Vec3::new(-e.x, e.y, -e.z),
            c + Vec3::new(-e.x, -e.y, e.z),
            c + Vec3::new(e.x, -e.y, e.z),
            c + Vec3::new(e.x, e.y, e.z),
            c + Vec3::new(-e.x, e.y, e.z),
        ]
    }

    /// Smallest axis-aligned box enclosing this box after `m`.
    pub fn transform(&self, m: &Mat4) -> Self {
        let center = m.transform_point3(self.center);
        let abs = Mat3::from_cols(m.x_axis.truncate().abs(), m.y_axis.truncate().abs(), m.z_axis.truncate().abs());
        Self {
            center,
            extents: abs * self.extents,
        }
    }

    pub fn merge(&self, other: &BoundingBox) -> Self {
        Self::from_min_max(self.min().min(other.min()), self.max().max(other.max()))
    }

    pub fn contains_point(&self, p: Vec3) -> bool {
        let d = (p - self.center).abs();
        d.cmple(self.extents).all()
    }

    pub fn bounding_sphere(&self) -> BoundingSphere {
        BoundingSphere {
            center: self.center,
            radius: self.extents.length(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingOrientedBox {
    pub center: Vec3,
    pub extents: Vec3,
    pub orientation: Quat,
}

impl BoundingOrientedBox {
    /// Local box carried through a scale-rotate-translate matrix.
    pub fn from_box(local: &BoundingBox, m: &Mat4) -> Self {
        let (scale, rotation, _) = m.to_scale_rotation_translation();
        Self {
            center: m.transform_point3(local.center),
            extents: local.extents * scale.abs(),
            orientation: rotation,
        }
    }

    pub fn axes(&self) -> [Vec3; 3] {
        [
            self.orientation * Vec3::X,
            self.orientation * Vec3::Y,
            self.orientation * Vec3::Z,
        ]
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let local = BoundingBox::new(Vec3::ZERO, self.extents).corners();
        local.map(|p| self.center + self.orientation * p)
    }
}

/// Plane `normal . p + d = 0` with a unit normal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub d: f32,
}

impl Plane {
    pub fn from_vec4(v: Vec4) -> Self {
        let len = v.truncate().length();
        let inv = if len > 0.0 { 1.0 / len } else { 0.0 };
        Self {
            normal: v.truncate() * inv,
            d: v.w * inv,
        }
    }

    pub fn signed_distance(&self, p: Vec3) -> f32 {
        self.normal.dot(p) + self.d
    }
}

/// Six inward-facing planes: left, right, bottom, top, near, far.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frustum {
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Extracts the planes of a clip-space volume with depth in [0, 1].
    pub fn from_matrix(m: &Mat4) -> Self {
        let (r0, r1, r2, r3) = (m.row(0), m.row(1), m.row(2), m.row(3));
        Self {
            planes: [
                Plane::from_vec4(r3 + r0),
                Plane::from_vec4(r3 - r0),
                Plane::from_vec4(r3 + r1),
                Plane::from_vec4(r3 - r1),
                Plane::from_vec4(r2),
                Plane::from_vec4(r3 - r2),
            ],
        }
    }

    pub fn contains_point(&self, p: Vec3) -> bool {
        self.planes.iter().all(|plane| plane.signed_distance(p) >= 0.0)
    }

    pub fn contains_sphere(&self, sphere: &BoundingSphere) -> Containment {
        self.classify(|plane| (plane.signed_distance(sphere.center), sphere.radius))
    }

    pub fn contains_box(&self, aabb: &BoundingBox) -> Containment {
        self.classify(|plane| {
            let radius = aabb.extents.dot(plane.normal.abs());
            (plane.signed_distance(aabb.center), radius)
        })
    }

    pub fn contains_oriented_box(&self, obb: &BoundingOrientedBox) -> Containment {
        let axes = obb.axes();
        self.classify(|plane| {
            let radius = obb.extents.x * plane.normal.dot(axes[0]).abs()
                + obb.extents.y * plane.normal.dot(axes[1]).abs()
                + obb.extents.z * plane.normal.dot(axes[2]).abs();
            (plane.signed_distance(obb.center), radius)
        })
    }

    pub fn intersects_box(&self, aabb: &BoundingBox) -> bool {
        self.contains_box(aabb) != Containment::Disjoint
    }

    pub fn intersects_oriented_box(&self, obb: &BoundingOrientedBox) -> bool {
        self.contains_oriented_box(obb) != Containment::Disjoint
    }

    fn classify<F>(&self, mut distance_and_radius: F) -> Containment
    where
        F: FnMut(&Plane) -> (f32, f32),
    {
        let mut result = Containment::Contains;
        for plane in &self.planes {
            let (distance, radius) = distance_and_radius(plane);
            if distance < -radius {
                return Containment::Disjoint;
            }
            if distance < radius {
                result = Containment::Intersects;
            }
        }
        result
    }
}

/// Corners of the clip volume of `view_proj`: near face then far face.
pub fn frustum_corners(view_proj: &Mat4) -> [Vec3; 8] {
    let inv = view_proj.inverse();
    let ndc = [
        Vec3::new(-1.0, -1.0, 0.0),
        Vec3::new(1.0, -1.0, 0.0),
        Vec3::new(1.0, 1.0, 0.0),
        Vec3::new(-1.0, 1.0, 0.0),
        Vec3::new(-1.0, -1.0, 1.0),
        Vec3::new(1.0, -1.0, 1.0),
        Vec3::new(1.0, 1.0, 1.0),
        Vec3::new(-1.0, 1.0, 1.0),
    ];
    ndc.map(|p| inv.project_point3(p))
}

/// Indices of the objects whose world bounds touch the frustum.
pub fn frustum_culling(frustum: &Frustum, objects: &[(BoundingBox, Mat4)]) -> Vec<usize> {
    objects
        .iter()
        .enumerate()
        .filter(|(_, (local, world))| {
            let obb = BoundingOrientedBox::from_box(local, world);
            frustum.intersects_oriented_box(&obb)
        })
        .map(|(index, _)| index)
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn from_screen(screen_x: f32, screen_y: f32, viewport: &Viewport, inv_view_proj: &Mat4) -> Self {
        let ndc_x = 2.0 * (screen_x - viewport.x) / viewport.width - 1.0;
        let ndc_y = 1.0 - 2.0 * (screen_y - viewport.y) / viewport.height;
        let near = inv_view_proj.project_point3(Vec3::new(ndc_x, ndc_y, 0.0));
        let far = inv_view_proj.project_point3(Vec3::new(ndc_x, ndc_y, 1.0));
        Self::new(near, far - near)
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Slab test. Distance is zero when the origin is inside.
    pub fn hit_box(&self, aabb: &BoundingBox) -> Option<f32> {
        let (min, max) = (aabb.min(), aabb.max());
        let mut t_near = f32::NEG_INFINITY;
        let mut t_far = f32::INFINITY;

        for axis in 0..3 {
            let o = self.origin[axis];
            let d = self.direction[axis];
            if d.abs() < 1e-8 {
                if o < min[axis] || o > max[axis] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d;
            let mut t0 = (min[axis] - o) * inv;
            let mut t1 = (max[axis] - o) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_near = t_near.max(t0);
            t_far = t_far.min(t1);
            if t_near > t_far || t_far < 0.0 {
                return None;
            }
        }

        Some(t_near.max(0.0))
    }

    pub fn hit_oriented_box(&self, obb: &BoundingOrientedBox) -> Option<f32> {
        let inv = obb.orientation.inverse();
        let local = Ray {
            origin: inv * (self.origin - obb.center),
            direction: inv * self.direction,
        };
        local.hit_box(&BoundingBox::new(Vec3::ZERO, obb.extents))
    }

    pub fn hit_sphere(&self, sphere: &BoundingSphere) -> Option<f32> {
        let oc = self.origin - sphere.center;
        let b = oc.dot(self.direction);
        let c = oc.length_squared() - sphere.radius * sphere.radius;
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }
        let sqrt = discriminant.sqrt();
        let t0 = -b - sqrt;
        let t1 = -b + sqrt;
        if t1 < 0.0 {
            None
        } else {
            Some(t0.max(0.0))
        }
    }

    /// Two-sided Moller-Trumbore test.
    pub fn hit_triangle(&self, v0: Vec3, v1: Vec3, v2: Vec3) -> Option<f32> {
        let e1 = v1 - v0;
        let e2 = v2 - v0;
        let p = self.direction.cross(e2);
        let det = e1.dot(p);
        if det.abs() < 1e-8 {
            return None;
        }
        let inv_det = 1.0 / det;
        let s = self.origin - v0;
        let u = s.dot(p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let q = s.cross(e1);
        let v = self.direction.dot(q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t = e2.dot(q) * inv_det;
        (t >= 0.0).then_some(t)
    }
}

/// Line-list vertices for drawing a box outline.
pub fn create_wireframe_box(corners: &[Vec3; 8], color: [f32; 4]) -> (Vec<VertexPosColor>, Vec<u32>) {
    let vertices = corners
        .iter()
        .map(|p| VertexPosColor {
            pos: p.to_array(),
            color,
        })
        .collect();
    let indices = vec![
        0, 1, 1, 2, 2, 3, 3, 0, // near face
        4, 5, 5, 6, 6, 7, 7, 4, // far face
        0, 4, 1, 5, 2, 6, 3, 7,
    ];
    (vertices, indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_4;

    fn test_frustum() -> Frustum {
        let view = Mat4::look_at_rh(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
        let proj = Mat4::perspective_rh(90f32.to_radians(), 1.0, 1.0, 100.0);
        Frustum::from_matrix(&(proj * view))
    }

    #[test]
    fn frustum_contains_points_in_front() {
        let frustum = test_frustum();
        assert!(frustum.contains_point(Vec3::new(0.0, 0.0, -10.0)));
        assert!(frustum.contains_point(Vec3::new(4.0, -4.0, -5.0)));
        assert!(!frustum.contains_point(Vec3::new(0.0, 0.0, 10.0)));
        assert!(!frustum.contains_point(Vec3::new(0.0, 0.0, -0.5)));
        assert!(!frustum.contains_point(Vec3::new(0.0, 0.0, -150.0)));
        assert!(!frustum.contains_point(Vec3::new(6.0, 0.0, -5.0)));
    }

    #[test]
    fn frustum_classifies_boxes() {
        let frustum = test_frustum();
        let inside = BoundingBox::new(Vec3::new(0.0, 0.0, -10.0), Vec3::ONE);
        let behind = BoundingBox::new(Vec3::new(0.0, 0.0, 10.0), Vec3::ONE);
        let straddling = BoundingBox::new(Vec3::new(0.0, 0.0, -1.0), Vec3::ONE);

        assert_eq!(frustum.contains_box(&inside), Containment::Contains);
        assert_eq!(frustum.contains_box(&behind), Containment::Disjoint);
        assert_eq!(frustum.contains_box(&straddling), Containment::Intersects);
        assert!(frustum.intersects_box(&straddling));
        assert!(!frustum.intersects_box(&behind));
    }

    #[test]
    fn frustum_classifies_spheres() {
        let frustum = test_frustum();
        let near_edge = BoundingSphere::new(Vec3::new(12.0, 0.0, -10.0), 3.0);
        let outside = BoundingSphere::new(Vec3::new(20.0, 0.0, -10.0), 3.0);
        assert_eq!(frustum.contains_sphere(&near_edge), Containment::Intersects);
        assert_eq!(frustum.contains_sphere(&outside), Containment::Disjoint);
    }

    #[test]
    fn oriented_box_matches_aabb_without_rotation() {
        let frustum = test_frustum();
        let boxes = [
            BoundingBox::new(Vec3::new(0.0, 0.0, -10.0), Vec3::ONE),
            BoundingBox::new(Vec3::new(0.0, 0.0, 10.0), Vec3::ONE),
            BoundingBox::new(Vec3::new(0.0, 0.0, -1.0), Vec3::ONE),
        ];
        for aabb in boxes {
            let obb = BoundingOrientedBox::from_box(&aabb, &Mat4::IDENTITY);
            assert_eq!(frustum.contains_box(&aabb), frustum.contains_oriented_box(&obb));
        }
    }

    #[test]
    fn frustum_corners_lie_on_frustum() {
        let view = Mat4::look_at_rh(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
        let proj = Mat4::perspective_rh(90f32.to_radians(), 1.0, 1.0, 100.0);
        let corners = frustum_corners(&(proj * view));
        assert!(corners[0].abs_diff_eq(Vec3::new(-1.0, -1.0, -1.0), 1e-3));
        assert!(corners[6].abs_diff_eq(Vec3::new(100.0, 100.0, -100.0), 1e-1));
    }

    #[test]
    fn culling_keeps_only_visible_objects() {
        let frustum = test_frustum();
        let unit = BoundingBox::new(Vec3::ZERO, Vec3::splat(0.5));
        let objects = [
            (unit, Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0))),
            (unit, Mat4::from_translation(Vec3::new(0.0, 0.0, 5.0))),
            (unit, Mat4::from_translation(Vec3::new(30.0, 0.0, -5.0))),
            (
                unit,
                Mat4::from_scale_rotation_translation(
                    Vec3::splat(4.0),
                    Quat::from_rotation_y(FRAC_PI_4),
                    Vec3::new(7.0, 0.0, -5.0),
                ),
            ),
        ];
        assert_eq!(frustum_culling(&frustum, &objects), vec![0, 3]);
    }

    #[test]
    fn box_transform_encloses_rotated_corners() {
        let local = BoundingBox::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(1.0, 0.5, 0.25));
        let m = Mat4::from_rotation_translation(Quat::from_rotation_z(0.7), Vec3::new(0.0, 3.0, 0.0));
        let world = local.transform(&m);
        for corner in local.corners() {
            let p = m.transform_point3(corner);
            let slack = world.extents + Vec3::splat(1e-5);
            assert!((p - world.center).abs().cmple(slack).all());
        }
    }

    #[test]
    fn from_points_and_merge() {
        let a = BoundingBox::from_points([Vec3::ZERO, Vec3::new(2.0, -1.0, 4.0)]);
        assert!(a.min().abs_diff_eq(Vec3::new(0.0, -1.0, 0.0), 1e-6));
        assert!(a.max().abs_diff_eq(Vec3::new(2.0, 0.0, 4.0), 1e-6));

        let b = BoundingBox::new(Vec3::new(-3.0, 0.0, 0.0), Vec3::ONE);
        let merged = a.merge(&b);
        assert!(merged.min().abs_diff_eq(Vec3::new(-4.0, -1.0, -1.0), 1e-6));
        assert!(merged.max().abs_diff_eq(Vec3::new(2.0, 1.0, 4.0), 1e-6));
        assert!(merged.contains_point(Vec3::new(-3.5, 0.5, 3.0)));

        assert_eq!(BoundingBox::from_points(std::iter::empty()), BoundingBox::default());
    }

    #[test]
    fn ray_hits_box_sphere_and_triangle() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z);

        let aabb = BoundingBox::new(Vec3::ZERO, Vec3::ONE);
        assert!((ray.hit_box(&aabb).unwrap() - 9.0).abs() < 1e-5);

        let sphere = BoundingSphere::new(Vec3::new(0.0, 0.0, -2.0), 2.0);
        assert!((ray.hit_sphere(&sphere).unwrap() - 10.0).abs() < 1e-5);

        let t = ray
            .hit_triangle(
                Vec3::new(-1.0, -1.0, 3.0),
                Vec3::new(1.0, -1.0, 3.0),
                Vec3::new(0.0, 1.0, 3.0),
            )
            .unwrap();
        assert!((t - 7.0).abs() < 1e-5);

        let miss = Ray::new(Vec3::new(5.0, 0.0, 10.0), Vec3::NEG_Z);
        assert!(miss.hit_box(&aabb).is_none());
        assert!(miss.hit_sphere(&sphere).is_none());

        let away = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::Z);
        assert!(away.hit_box(&aabb).is_none());
    }

    #[test]
    fn ray_inside_box_reports_zero() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        assert_eq!(ray.hit_box(&BoundingBox::new(Vec3::ZERO, Vec3::ONE)), Some(0.0));
    }

    #[test]
    fn ray_hits_rotated_box() {
        let obb = BoundingOrientedBox {
            center: Vec3::new(0.0, 0.0, -5.0),
            extents: Vec3::new(1.0, 1.0, 1.0),
            orientation: Quat::from_rotation_y(FRAC_PI_4),
        };
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        let t = ray.hit_oriented_box(&obb).unwrap();
        assert!((t - (5.0 - 2f32.sqrt())).abs() < 1e-4);
    }

    #[test]
    fn screen_center_ray_points_forward() {
        let viewport = Viewport::new(800.0, 600.0);
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
        let proj = Mat4::perspective_rh(1.0, viewport.aspect_ratio(), 0.1, 100.0);
        let ray = Ray::from_screen(400.0, 300.0, &viewport, &(proj * view).inverse());
        assert!(ray.direction.abs_diff_eq(Vec3::NEG_Z, 1e-4));
        assert!((ray.origin.z - 4.9).abs() < 1e-3);
    }

    #[test]
    fn wireframe_box_has_twelve_edges() {
        let aabb = BoundingBox::new(Vec3::ZERO, Vec3::ONE);
        let (vertices, indices) = create_wireframe_box(&aabb.corners(), [1.0; 4]);
        assert_eq!(vertices.len(), 8);
        assert_eq!(indices.len(), 24);
    }
}

use glam::{Mat4, Vec2, Vec3};

use render_tutorials::scene::cascaded_shadow::{directional_light_fit, NDC_TO_TEXTURE};
use render_tutorials::scene::collision::BoundingSphere;

const EPSILON: f32 = 1e-5;
const DEPTH_BIAS: f32 = 0.005;
const MAP_SIZE: usize = 64;

fn approx_eq(a: Vec3, b: Vec3) {
    assert!(a.abs_diff_eq(b, EPSILON), "{a:?} != {b:?}");
}

fn compute_ndc(matrix: Mat4, world_pos: Vec3) -> Vec3 {
    let clip = matrix * world_pos.extend(1.0);
    clip.truncate() / clip.w
}

fn shadow_transform(light_dir: Vec3, sphere: &BoundingSphere) -> Mat4 {
    let (view, proj) = directional_light_fit(light_dir, sphere);
    NDC_TO_TEXTURE * proj * view
}

/// CPU copy of a depth-only shadow map.
struct DepthMap {
    texels: Vec<f32>,
}

impl DepthMap {
    fn cleared() -> Self {
        Self {
            texels: vec![1.0; MAP_SIZE * MAP_SIZE],
        }
    }

    fn texel(uv: Vec2) -> Option<usize> {
        if uv.cmplt(Vec2::ZERO).any() || uv.cmpge(Vec2::ONE).any() {
            return None;
        }
        let x = (uv.x * MAP_SIZE as f32) as usize;
        let y = (uv.y * MAP_SIZE as f32) as usize;
        Some(y * MAP_SIZE + x)
    }

    /// Depth test with a less-equal compare, keeping the closest value.
    fn write(&mut self, p: Vec3) {
        if let Some(i) = Self::texel(p.truncate()) {
            self.texels[i] = self.texels[i].min(p.z);
        }
    }

    fn compare(&self, uv: Vec2, depth: f32) -> f32 {
        match Self::texel(uv) {
            Some(i) if depth <= self.texels[i] => 1.0,
            Some(_) => 0.0,
            None => 1.0,
        }
    }
}

/// Mirrors the forward shader's 3x3 percentage-closer lookup.
fn shadow_factor(map: &DepthMap, p: Vec3) -> f32 {
    if p.x < 0.0 || p.y < 0.0 || p.x > 1.0 || p.y > 1.0 || p.z > 1.0 {
        return 1.0;
    }
    let texel = 1.0 / MAP_SIZE as f32;
    let depth = p.z - DEPTH_BIAS;
    let mut sum = 0.0;
    for y in -1..=1 {
        for x in -1..=1 {
            let offset = Vec2::new(x as f32, y as f32) * texel;
            sum += map.compare(p.truncate() + offset, depth);
        }
    }
    sum / 9.0
}

/// Square occluder of half size `half` at height `height`, splatted into the map.
fn occluder_map(to_texture: Mat4, half: f32, height: f32) -> DepthMap {
    let mut map = DepthMap::cleared();
    let steps = 200;
    for i in 0..=steps {
        for j in 0..=steps {
            let x = -half + 2.0 * half * i as f32 / steps as f32;
            let z = -half + 2.0 * half * j as f32 / steps as f32;
            map.write(to_texture.project_point3(Vec3::new(x, height, z)));
        }
    }
    map
}

#[test]
fn texture_transform_matches_manual_remap() {
    let sphere = BoundingSphere::new(Vec3::new(1.0, 0.0, -2.0), 12.0);
    let light_dir = Vec3::new(0.4, -1.0, 0.2).normalize();
    let (view, proj) = directional_light_fit(light_dir, &sphere);
    let to_texture = shadow_transform(light_dir, &sphere);

    let points = [
        Vec3::new(-3.5, 0.0, -2.0),
        Vec3::new(2.0, 1.0, 4.0),
        Vec3::new(4.5, -0.5, -3.0),
    ];
    for p in points {
        let ndc = compute_ndc(proj * view, p);
        let expected = Vec3::new(ndc.x * 0.5 + 0.5, 0.5 - ndc.y * 0.5, ndc.z);
        approx_eq(to_texture.project_point3(p), expected);
    }
}

#[test]
fn texture_v_axis_is_flipped_from_clip_space() {
    let sphere = BoundingSphere::new(Vec3::ZERO, 10.0);
    // straight down picks +Z as the light's up vector
    let light_dir = Vec3::NEG_Y;
    let (view, proj) = directional_light_fit(light_dir, &sphere);
    let to_texture = shadow_transform(light_dir, &sphere);

    let top = Vec3::Z * 5.0;
    let bottom = Vec3::NEG_Z * 5.0;
    assert!(compute_ndc(proj * view, top).y > compute_ndc(proj * view, bottom).y);
    assert!(to_texture.project_point3(top).y < to_texture.project_point3(bottom).y);
}

#[test]
fn fitted_light_encloses_the_bounding_sphere() {
    let sphere = BoundingSphere::new(Vec3::new(5.0, 2.0, -7.0), 15.0);
    for light_dir in [
        Vec3::new(0.3, -1.0, 0.1),
        Vec3::new(-1.0, -0.2, 0.5),
        Vec3::NEG_Y,
    ] {
        let to_texture = shadow_transform(light_dir.normalize(), &sphere);
        for axis in [Vec3::X, Vec3::Y, Vec3::Z, Vec3::NEG_X, Vec3::NEG_Y, Vec3::NEG_Z] {
            let p = to_texture.project_point3(sphere.center + axis * sphere.radius * 0.999);
            assert!(
                p.cmpge(Vec3::splat(-EPSILON)).all() && p.cmple(Vec3::splat(1.0 + EPSILON)).all(),
                "{light_dir:?}: {p:?}"
            );
        }
        let center = to_texture.project_point3(sphere.center);
        approx_eq(center, Vec3::new(0.5, 0.5, 0.5));
    }
}

#[test]
fn occluder_shadows_the_ground_below_it() {
    let sphere = BoundingSphere::new(Vec3::ZERO, 10.0);
    let to_texture = shadow_transform(Vec3::NEG_Y, &sphere);
    let map = occluder_map(to_texture, 1.5, 2.0);

    let below = to_texture.project_point3(Vec3::ZERO);
    assert_eq!(shadow_factor(&map, below), 0.0);

    let open_ground = to_texture.project_point3(Vec3::new(6.0, 0.0, 6.0));
    assert_eq!(shadow_factor(&map, open_ground), 1.0);

    // the occluder's own surface passes the biased compare
    let top = to_texture.project_point3(Vec3::new(0.0, 2.0, 0.0));
    assert_eq!(shadow_factor(&map, top), 1.0);
}

#[test]
fn shadow_edge_is_filtered() {
    let sphere = BoundingSphere::new(Vec3::ZERO, 10.0);
    let to_texture = shadow_transform(Vec3::NEG_Y, &sphere);
    let map = occluder_map(to_texture, 1.5, 2.0);

    let edge = to_texture.project_point3(Vec3::new(1.5, 0.0, 0.0));
    let factor = shadow_factor(&map, edge);
    assert!(factor > 0.0 && factor < 1.0, "edge factor {factor}");
}

#[test]
fn points_outside_the_map_are_lit() {
    let map = DepthMap {
        texels: vec![0.0; MAP_SIZE * MAP_SIZE],
    };
    assert_eq!(shadow_factor(&map, Vec3::new(-0.1, 0.5, 0.5)), 1.0);
    assert_eq!(shadow_factor(&map, Vec3::new(0.5, 1.2, 0.5)), 1.0);
    assert_eq!(shadow_factor(&map, Vec3::new(0.5, 0.5, 1.5)), 1.0);
    assert_eq!(shadow_factor(&map, Vec3::new(0.5, 0.5, 0.5)), 0.0);
}

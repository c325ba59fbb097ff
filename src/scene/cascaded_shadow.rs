//! Cascaded shadow map partitioning and per-cascade light projections.
//!
//! All cascades share one light view matrix. Each cascade gets its own
//! orthographic projection, plus a scale/offset pair that takes a light
//! view-space position straight to shadow texture space, so the shader needs
//! a single matrix multiply for every cascade.

use glam::{Mat4, Vec3, Vec4};

use crate::scene::camera::Camera;
use crate::scene::collision::{BoundingBox, BoundingSphere};

pub const MAX_CASCADES: usize = 8;

/// Maps NDC x/y in [-1, 1] (y up) to texture uv in [0, 1] (v down); depth unchanged.
pub const NDC_TO_TEXTURE: Mat4 = Mat4::from_cols(
    Vec4::new(0.5, 0.0, 0.0, 0.0),
    Vec4::new(0.0, -0.5, 0.0, 0.0),
    Vec4::new(0.0, 0.0, 1.0, 0.0),
    Vec4::new(0.5, 0.5, 0.0, 1.0),
);

#[derive(Clone, Debug, PartialEq)]
pub enum CascadePartition {
    /// End of each cascade as a fraction of the camera near-far range.
    Manual(Vec<f32>),
    Logarithmic,
    /// Blend of logarithmic (`lambda` = 1) and uniform (`lambda` = 0) splits.
    Pssm { lambda: f32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FitProjection {
    /// Each cascade covers only its own slice of the view frustum.
    ToCascade,
    /// Each cascade covers the frustum from the near plane to its far split.
    ToScene,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FitNearFar {
    /// Whole depth range of the light volume around the scene.
    ZeroOne,
    /// Depth range of the cascade's own frustum slice.
    CascadeAabb,
    /// Depth range of the scene bounds in light space.
    SceneAabb,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CascadeSettings {
    pub cascade_count: usize,
    pub shadow_map_size: u32,
    pub partition: CascadePartition,
    pub fit_projection: FitProjection,
    pub fit_near_far: FitNearFar,
    pub move_light_texel_size: bool,
    pub pcf_blur_size: u32,
}

impl Default for CascadeSettings {
    fn default() -> Self {
        Self {
            cascade_count: 4,
            shadow_map_size: 2048,
            partition: CascadePartition::Pssm { lambda: 0.75 },
            fit_projection: FitProjection::ToCascade,
            fit_near_far: FitNearFar::SceneAabb,
            move_light_texel_size: true,
            pcf_blur_size: 1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cascade {
    pub proj: Mat4,
    pub view_proj: Mat4,
    /// View-space distance where this cascade starts.
    pub split_near: f32,
    /// View-space distance where this cascade ends.
    pub split_far: f32,
    pub texture_scale: Vec3,
    pub texture_offset: Vec3,
    /// Orthographic bounds in light view space.
    pub bounds_min: Vec3,
    pub bounds_max: Vec3,
}

impl Cascade {
    /// Light view space -> shadow texture space for this cascade.
    pub fn light_view_to_texture(&self, light_view_pos: Vec3) -> Vec3 {
        light_view_pos * self.texture_scale + self.texture_offset
    }
}

#[derive(Clone, Debug)]
pub struct CascadedShadowManager {
    settings: CascadeSettings,
    light_view: Mat4,
    cascades: Vec<Cascade>,
}

impl CascadedShadowManager {
    pub fn new(settings: CascadeSettings) -> Self {
        let mut settings = settings;
        settings.cascade_count = settings.cascade_count.clamp(1, MAX_CASCADES);
        settings.shadow_map_size = settings.shadow_map_size.max(2);
        Self {
            settings,
            light_view: Mat4::IDENTITY,
            cascades: Vec::new(),
        }
    }

    pub fn settings(&self) -> &CascadeSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut CascadeSettings {
        &mut self.settings
    }

    pub fn light_view(&self) -> Mat4 {
        self.light_view
    }

    pub fn cascades(&self) -> &[Cascade] {
        &self.cascades
    }

    pub fn update(&mut self, camera: &Camera, light_dir: Vec3, scene: &BoundingBox) {
        let count = self.settings.cascade_count.clamp(1, MAX_CASCADES);
        let size = self.settings.shadow_map_size.max(2) as f32;

        let sphere = scene.bounding_sphere();
        self.light_view = light_view_matrix(light_dir, &sphere);

        let scene_light = BoundingBox::from_points(
            scene
                .corners()
                .iter()
                .map(|&p| self.light_view.transform_point3(p)),
        );

        let splits = compute_splits(&self.settings.partition, count, camera.near_z, camera.far_z);

        self.cascades.clear();
        for (index, &split_far) in splits.iter().enumerate() {
            let split_near = match self.settings.fit_projection {
                FitProjection::ToCascade if index > 0 => splits[index - 1],
                _ => camera.near_z,
            };

            let corners = slice_corners(camera, split_near, split_far)
                .map(|p| self.light_view.transform_point3(p));
            let slice = BoundingBox::from_points(corners);
            let (mut min, mut max) = (slice.min(), slice.max());

            let snap = self.settings.move_light_texel_size;
            if self.settings.fit_projection == FitProjection::ToCascade && snap {
                // constant footprint for every camera orientation
                let bound = (corners[0] - corners[6])
                    .length()
                    .max((corners[4] - corners[6]).length());
                let border = (Vec3::splat(bound) - (max - min)) * 0.5;
                min.x -= border.x;
                min.y -= border.y;
                max.x += border.x;
                max.y += border.y;
            } else {
                let blur = (self.settings.pcf_blur_size * 2 + 1) as f32 / size;
                let border = (max - min) * 0.5 * blur;
                min.x -= border.x;
                min.y -= border.y;
                max.x += border.x;
                max.y += border.y;
            }

            if snap {
                let (snapped_min, snapped_max) = snap_to_texels(min, max, size);
                min.x = snapped_min.x;
                min.y = snapped_min.y;
                max.x = snapped_max.x;
                max.y = snapped_max.y;
            }

            // light space looks down -Z: distances are negated z
            let (near, far) = match self.settings.fit_near_far {
                FitNearFar::ZeroOne => (0.0, sphere.radius * 2.0),
                FitNearFar::CascadeAabb => (-max.z, -min.z),
                FitNearFar::SceneAabb => (-scene_light.max().z, -scene_light.min().z),
            };
            let near = near.max(0.0);
            let far = far.max(near + 1e-3);

            let proj = Mat4::orthographic_rh(min.x, max.x, min.y, max.y, near, far);
            let (texture_scale, texture_offset) = texture_scale_offset(&proj);

            self.cascades.push(Cascade {
                proj,
                view_proj: proj * self.light_view,
                split_near,
                split_far,
                texture_scale,
                texture_offset,
                bounds_min: Vec3::new(min.x, min.y, -far),
                bounds_max: Vec3::new(max.x, max.y, -near),
            });
        }
    }

    /// Index of the cascade covering a view-space distance, clamped to the last one.
    pub fn select_cascade(&self, view_depth: f32) -> usize {
        self.cascades
            .iter()
            .position(|c| view_depth <= c.split_far)
            .unwrap_or(self.cascades.len().saturating_sub(1))
    }
}

/// Far distance of every cascade, increasing, with the last one at `far`.
pub fn compute_splits(partition: &CascadePartition, count: usize, near: f32, far: f32) -> Vec<f32> {
    let count = count.clamp(1, MAX_CASCADES);
    let near = near.max(1e-4);
    let range = far - near;
    let ratio = far / near;

    let mut splits: Vec<f32> = (1..=count)
        .map(|i| {
            let f = i as f32 / count as f32;
            match partition {
                CascadePartition::Manual(fractions) => {
                    let fraction = fractions.get(i - 1).copied().unwrap_or(f);
                    near + range * fraction.clamp(0.0, 1.0)
                }
                CascadePartition::Logarithmic => near * ratio.powf(f),
                CascadePartition::Pssm { lambda } => {
                    let lambda = lambda.clamp(0.0, 1.0);
                    lambda * near * ratio.powf(f) + (1.0 - lambda) * (near + range * f)
                }
            }
        })
        .collect();

    for i in 1..count {
        if splits[i] < splits[i - 1] {
            splits[i] = splits[i - 1];
        }
    }
    splits[count - 1] = far;
    splits
}

/// Light view placed on the bounding sphere, looking along `light_dir` through its center.
pub fn light_view_matrix(light_dir: Vec3, sphere: &BoundingSphere) -> Mat4 {
    let dir = light_dir.try_normalize().unwrap_or(Vec3::NEG_Y);
    let up = if dir.dot(Vec3::Y).abs() > 0.95 {
        Vec3::Z
    } else {
        Vec3::Y
    };
    let eye = sphere.center - dir * sphere.radius;
    Mat4::look_at_rh(eye, sphere.center, up)
}

/// Single orthographic light camera enclosing a bounding sphere.
pub fn directional_light_fit(light_dir: Vec3, sphere: &BoundingSphere) -> (Mat4, Mat4) {
    let view = light_view_matrix(light_dir, sphere);
    let r = sphere.radius.max(1e-3);
    let proj = Mat4::orthographic_rh(-r, r, -r, r, 0.0, 2.0 * r);
    (view, proj)
}

/// Scale and offset equal to `NDC_TO_TEXTURE * proj` for an orthographic `proj`.
pub fn texture_scale_offset(proj: &Mat4) -> (Vec3, Vec3) {
    let m = NDC_TO_TEXTURE * *proj;
    (
        Vec3::new(m.x_axis.x, m.y_axis.y, m.z_axis.z),
        m.w_axis.truncate(),
    )
}

/// Snaps x/y bounds to whole texels. The width becomes exactly `size` texels,
/// and the snapped box always contains the input box.
pub fn snap_to_texels(min: Vec3, max: Vec3, size: f32) -> (Vec3, Vec3) {
    let texel = ((max - min) / (size - 1.0)).max(Vec3::splat(1e-6));
    let snapped_min = (min / texel).floor() * texel;
    let snapped_max = snapped_min + texel * size;
    (snapped_min, snapped_max)
}

/// World-space corners of the camera frustum between two view distances,
/// near face first.
pub fn slice_corners(camera: &Camera, near: f32, far: f32) -> [Vec3; 8] {
    let tan_y = (camera.fov_y * 0.5).tan();
    let tan_x = tan_y * camera.aspect;
    let world = camera.view_matrix().inverse();

    let corner = |d: f32, sx: f32, sy: f32| world.transform_point3(Vec3::new(sx * d * tan_x, sy * d * tan_y, -d));
    [
        corner(near, -1.0, -1.0),
        corner(near, 1.0, -1.0),
        corner(near, 1.0, 1.0),
        corner(near, -1.0, 1.0),
        corner(far, -1.0, -1.0),
        corner(far, 1.0, -1.0),
        corner(far, 1.0, 1.0),
        corner(far, -1.0, 1.0),
    ]
}

use glam::{Mat4, Vec3};

use render_tutorials::scene::camera::Camera;
use render_tutorials::scene::cascaded_shadow::{
    compute_splits, slice_corners, CascadePartition, CascadeSettings, CascadedShadowManager,
    FitNearFar, FitProjection, NDC_TO_TEXTURE,
};
use render_tutorials::scene::collision::BoundingBox;

const EPSILON: f32 = 1e-3;

fn scene_bounds() -> BoundingBox {
    BoundingBox::new(Vec3::ZERO, Vec3::new(60.0, 10.0, 60.0))
}

fn camera_at(position: Vec3, target: Vec3) -> Camera {
    let mut camera = Camera::default();
    camera.transform.position = position;
    camera.transform.look_at(target, Vec3::Y);
    camera.near_z = 0.5;
    camera.far_z = 40.0;
    camera
}

fn light_dir() -> Vec3 {
    Vec3::new(-0.5, -1.0, -0.3).normalize()
}

fn manager(settings: CascadeSettings, camera: &Camera) -> CascadedShadowManager {
    let mut manager = CascadedShadowManager::new(settings);
    manager.update(camera, light_dir(), &scene_bounds());
    manager
}

#[test]
fn splits_increase_and_end_at_the_far_plane() {
    let partitions = [
        CascadePartition::Manual(vec![0.1, 0.25, 0.5, 1.0]),
        CascadePartition::Logarithmic,
        CascadePartition::Pssm { lambda: 0.5 },
        CascadePartition::Pssm { lambda: 0.0 },
    ];
    for partition in &partitions {
        for count in 1..=8 {
            let splits = compute_splits(partition, count, 0.5, 200.0);
            assert_eq!(splits.len(), count);
            assert!((splits[count - 1] - 200.0).abs() < EPSILON, "{partition:?}: {splits:?}");
            for pair in splits.windows(2) {
                assert!(pair[1] >= pair[0], "{partition:?}: {splits:?}");
            }
            assert!(splits[0] > 0.5);
        }
    }
}

#[test]
fn logarithmic_splits_grow_geometrically() {
    let splits = compute_splits(&CascadePartition::Logarithmic, 4, 1.0, 256.0);
    let expected = [4.0, 16.0, 64.0, 256.0];
    for (split, expected) in splits.iter().zip(expected) {
        assert!((split - expected).abs() < 1e-2, "{splits:?}");
    }
}

#[test]
fn uniform_pssm_splits_are_evenly_spaced() {
    let splits = compute_splits(&CascadePartition::Pssm { lambda: 0.0 }, 4, 0.0, 100.0);
    for (i, split) in splits.iter().enumerate() {
        assert!((split - 25.0 * (i + 1) as f32).abs() < 1e-2, "{splits:?}");
    }
}

#[test]
fn every_slice_corner_lies_inside_its_cascade() {
    let camera = camera_at(Vec3::new(5.0, 6.0, 5.0), Vec3::new(-10.0, 0.0, -20.0));
    for fit_projection in [FitProjection::ToCascade, FitProjection::ToScene] {
        for snap in [false, true] {
            let settings = CascadeSettings {
                cascade_count: 4,
                shadow_map_size: 1024,
                fit_projection,
                fit_near_far: FitNearFar::CascadeAabb,
                move_light_texel_size: snap,
                ..CascadeSettings::default()
            };
            let manager = manager(settings, &camera);
            let light_view = manager.light_view();
            assert_eq!(manager.cascades().len(), 4);

            for cascade in manager.cascades() {
                for corner in slice_corners(&camera, cascade.split_near, cascade.split_far) {
                    let p = light_view.transform_point3(corner);
                    assert!(
                        p.cmpge(cascade.bounds_min - Vec3::splat(EPSILON)).all()
                            && p.cmple(cascade.bounds_max + Vec3::splat(EPSILON)).all(),
                        "{fit_projection:?} snap={snap}: {p:?} outside {:?}..{:?}",
                        cascade.bounds_min,
                        cascade.bounds_max
                    );
                }
            }
        }
    }
}

#[test]
fn snapped_cascades_keep_their_size_while_the_camera_turns() {
    let settings = CascadeSettings {
        cascade_count: 3,
        shadow_map_size: 2048,
        fit_projection: FitProjection::ToCascade,
        move_light_texel_size: true,
        ..CascadeSettings::default()
    };
    let position = Vec3::new(0.0, 5.0, 0.0);
    let reference = manager(settings.clone(), &camera_at(position, Vec3::new(0.0, 0.0, -10.0)));

    for target in [Vec3::new(10.0, 0.0, -3.0), Vec3::new(-7.0, 2.0, 8.0), Vec3::new(1.0, -4.0, 10.0)] {
        let turned = manager(settings.clone(), &camera_at(position, target));
        for (a, b) in reference.cascades().iter().zip(turned.cascades()) {
            let width_a = a.bounds_max.x - a.bounds_min.x;
            let width_b = b.bounds_max.x - b.bounds_min.x;
            assert!((width_a - width_b).abs() < 1e-2, "{width_a} vs {width_b}");
        }
    }
}

#[test]
fn snapped_bounds_sit_on_the_texel_grid() {
    let size = 1024;
    let settings = CascadeSettings {
        cascade_count: 4,
        shadow_map_size: size,
        move_light_texel_size: true,
        ..CascadeSettings::default()
    };
    for step in 0..5 {
        // sub-texel camera movement
        let position = Vec3::new(0.013 * step as f32, 5.0, 0.021 * step as f32);
        let manager = manager(settings.clone(), &camera_at(position, Vec3::new(-5.0, 0.0, -20.0)));
        for cascade in manager.cascades() {
            let texel = (cascade.bounds_max.x - cascade.bounds_min.x) / size as f32;
            let cells = cascade.bounds_min.x / texel;
            assert!((cells - cells.round()).abs() < 1e-2, "min.x is {cells} texels");
            let cells = cascade.bounds_min.y / texel;
            assert!((cells - cells.round()).abs() < 1e-2, "min.y is {cells} texels");
        }
    }
}

#[test]
fn scale_offset_matches_the_full_shadow_transform() {
    let camera = camera_at(Vec3::new(3.0, 4.0, 12.0), Vec3::ZERO);
    let manager = manager(CascadeSettings::default(), &camera);
    let light_view = manager.light_view();

    let points = [
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(2.0, 1.0, -3.0),
        Vec3::new(-4.0, 0.5, 6.0),
    ];
    for cascade in manager.cascades() {
        let to_texture: Mat4 = NDC_TO_TEXTURE * cascade.view_proj;
        for p in points {
            let expected = to_texture.project_point3(p);
            let actual = cascade.light_view_to_texture(light_view.transform_point3(p));
            assert!(actual.abs_diff_eq(expected, 1e-4), "{actual:?} != {expected:?}");
        }
    }
}

#[test]
fn scene_near_far_covers_every_caster() {
    let camera = camera_at(Vec3::new(0.0, 5.0, 10.0), Vec3::ZERO);
    let settings = CascadeSettings {
        fit_near_far: FitNearFar::SceneAabb,
        ..CascadeSettings::default()
    };
    let manager = manager(settings, &camera);
    let light_view = manager.light_view();
    for cascade in manager.cascades() {
        for corner in scene_bounds().corners() {
            let z = light_view.transform_point3(corner).z;
            assert!(z >= cascade.bounds_min.z - EPSILON && z <= cascade.bounds_max.z + EPSILON);
        }
    }
}

#[test]
fn view_depth_selects_the_covering_cascade() {
    let camera = camera_at(Vec3::new(0.0, 5.0, 10.0), Vec3::ZERO);
    let manager = manager(CascadeSettings::default(), &camera);
    let cascades = manager.cascades();

    assert_eq!(manager.select_cascade(camera.near_z), 0);
    for (i, cascade) in cascades.iter().enumerate() {
        assert_eq!(manager.select_cascade(cascade.split_far - 1e-3), i);
    }
    assert_eq!(manager.select_cascade(camera.far_z * 2.0), cascades.len() - 1);
}

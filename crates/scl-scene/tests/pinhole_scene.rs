//! Pinhole camera in a vehicle scene: projection idempotence, the forward
//! cuboid scenario and the horizon line.

use std::f64::consts::PI;

use scl_core::{
    cuboid_corners, euler_to_rotation, grid_points3d, EulerSeq, Mat3, PinholeIntrinsics,
    Points3d, Real, StreamIntrinsics, TransformData, Vec3, Vec4,
};
use scl_scene::{CsType, Scene, SceneDescription};

/// Orientation of a camera mounted on the vehicle body: optical axis along
/// vehicle x (then yawed/pitched), x-right, y-down.
fn camera_mount(yaw: Real, pitch: Real) -> Mat3 {
    // Columns: camera x, y, z axes expressed in the vehicle frame.
    let axes = Mat3::new(0.0, 0.0, 1.0, -1.0, 0.0, 0.0, 0.0, -1.0, 0.0);
    euler_to_rotation(&[yaw, pitch, 0.0], EulerSeq::Zyx) * axes
}

fn pinhole_intrinsics() -> StreamIntrinsics {
    StreamIntrinsics::IntrinsicsPinhole(PinholeIntrinsics {
        width_px: 1280,
        height_px: 720,
        camera_matrix_3x4: vec![
            1000.0, 0.0, 640.0, 0.0, //
            0.0, 1000.0, 360.0, 0.0, //
            0.0, 0.0, 1.0, 0.0,
        ],
        distortion_coeffs_1xn: vec![],
    })
}

/// world -> vehicle-iso8855 (identity) -> camera_pinhole (10 deg pitch,
/// mounted at (2.3, 0, 1.3)).
fn forward_camera_scene() -> SceneDescription {
    let mut desc = SceneDescription::new();
    desc.declare_coordinate_system("world", CsType::Custom, "", None);
    desc.declare_coordinate_system(
        "vehicle-iso8855",
        CsType::LocalCs,
        "world",
        Some(TransformData::EulerAndTranslation {
            euler_angles: vec![0.0, 0.0, 0.0],
            translation: vec![0.0, 0.0, 0.0],
            sequence: EulerSeq::Zyx,
        }),
    );
    let pitch_down = 10.0 * PI / 180.0;
    desc.declare_coordinate_system(
        "camera_pinhole",
        CsType::SensorCs,
        "vehicle-iso8855",
        Some(TransformData::from_rt(
            &camera_mount(0.0, pitch_down),
            &Vec3::new(2.3, 0.0, 1.3),
        )),
    );
    desc.add_stream("camera_pinhole", "forward camera", "", Some(pinhole_intrinsics()));
    desc
}

#[test]
fn project_reproject_project_is_idempotent() {
    let desc = forward_camera_scene();
    let scene = Scene::new(&desc);
    let cam = scene.get_camera("camera_pinhole", None).unwrap();

    // 2x2x1 grid in front of the camera, in its own coordinate system.
    let points = grid_points3d((-0.5, 0.5, 2), (-0.5, 0.5, 2), (3.0, 3.0, 1));
    let (pixels, valid) = cam.project_points(&points, true);
    assert!(valid.iter().all(|v| *v));

    let (rays, rays_valid) = cam.reproject_pixels(&pixels);
    assert!(rays_valid.iter().all(|v| *v));

    let mut rays4 = Points3d::zeros(rays.ncols());
    for i in 0..rays.ncols() {
        rays4.set_column(
            i,
            &Vec4::new(rays[(0, i)], rays[(1, i)], rays[(2, i)], 1.0),
        );
    }
    let (pixels2, valid2) = cam.project_points(&rays4, true);
    assert!(valid2.iter().all(|v| *v));
    assert!((&pixels - &pixels2).amax() < 1e-4);
}

#[test]
fn forward_cuboid_lands_in_the_image() {
    let desc = forward_camera_scene();
    let scene = Scene::new(&desc);

    let cuboid = [15.0, 0.0, 0.7, 0.0, 0.0, PI / 12.0, 4.2, 1.8, 1.4];
    let in_cam = scene
        .transform_cuboid(&cuboid, "vehicle-iso8855", "camera_pinhole", None)
        .unwrap();
    assert!(in_cam[2] > 0.0, "cuboid must be in front of the camera");

    // Project the eight corners from the vehicle system.
    let corners = cuboid_corners(&cuboid).unwrap();
    let (_, valid_all) = scene
        .project_points(&corners, "vehicle-iso8855", "camera_pinhole", None, false)
        .unwrap();
    assert!(valid_all.iter().all(|v| *v), "all corners project");

    let (pixels, valid_inside) = scene
        .project_points(&corners, "vehicle-iso8855", "camera_pinhole", None, true)
        .unwrap();
    let inside = valid_inside.iter().filter(|v| **v).count();
    assert!(inside >= 4, "at least the near corners stay inside, got {inside}");
    for i in 0..8 {
        if valid_inside[i] {
            assert!(pixels[(0, i)] >= 0.0 && pixels[(0, i)] < 1280.0);
            assert!(pixels[(1, i)] >= 0.0 && pixels[(1, i)] < 720.0);
        }
    }
}

#[test]
fn horizon_is_level_and_above_center_for_pitched_camera() {
    let desc = forward_camera_scene();
    let scene = Scene::new(&desc);

    let horizon = scene
        .horizon_line("camera_pinhole", "vehicle-iso8855", None)
        .unwrap();
    let line = horizon.line.expect("horizon is visible");
    assert_eq!(horizon.endpoints.len(), 2);

    // No roll: the horizon is a horizontal line at cy - f*tan(pitch).
    let expected_v = 360.0 - 1000.0 * (10.0 * PI / 180.0).tan();
    for p in &horizon.endpoints {
        assert!((p.y - expected_v).abs() < 1e-6, "endpoint at v = {}", p.y);
    }
    // General-form line: a ~ 0 for a level horizon.
    assert!(line.x.abs() < 1e-9);
}

#[test]
fn ground_point_reprojects_through_the_scene() {
    let desc = forward_camera_scene();
    let scene = Scene::new(&desc);

    // A ground point ahead of the vehicle...
    let ground = scl_core::points3d_from_coords(&[(12.0, 1.5, 0.0), (20.0, -3.0, 0.0)]);
    let (pixels, valid) = scene
        .project_points(&ground, "vehicle-iso8855", "camera_pinhole", None, true)
        .unwrap();
    assert!(valid.iter().all(|v| *v));

    // ...comes back from its pixel via the ground-plane intersection.
    let (points, rep_valid) = scene
        .reproject_points_into_plane(
            &pixels,
            &Vec4::new(0.0, 0.0, 1.0, 0.0),
            "camera_pinhole",
            "vehicle-iso8855",
            None,
        )
        .unwrap();
    assert!(rep_valid.iter().all(|v| *v));
    assert!((&points - &ground).amax() < 1e-6);
}

#[test]
fn camera_cache_shares_static_camera_across_frames() {
    let desc = forward_camera_scene();
    let scene = Scene::new(&desc);

    let static_cam = scene.get_camera("camera_pinhole", None).unwrap();
    let frame_cam = scene.get_camera("camera_pinhole", Some(3)).unwrap();
    // No per-frame intrinsics override: same instance.
    assert!(std::sync::Arc::ptr_eq(&static_cam, &frame_cam));
}

#[test]
fn per_frame_intrinsics_rebuild_the_camera() {
    let mut desc = forward_camera_scene();
    desc.set_frame_stream_intrinsics(
        7,
        "camera_pinhole",
        StreamIntrinsics::IntrinsicsPinhole(PinholeIntrinsics {
            width_px: 640,
            height_px: 360,
            camera_matrix_3x4: vec![
                500.0, 0.0, 320.0, 0.0, //
                0.0, 500.0, 180.0, 0.0, //
                0.0, 0.0, 1.0, 0.0,
            ],
            distortion_coeffs_1xn: vec![],
        }),
    );
    let scene = Scene::new(&desc);

    let static_cam = scene.get_camera("camera_pinhole", None).unwrap();
    let frame7 = scene.get_camera("camera_pinhole", Some(7)).unwrap();
    assert!(!std::sync::Arc::ptr_eq(&static_cam, &frame7));
    assert_eq!(frame7.width(), 640);
    assert_eq!(static_cam.width(), 1280);

    // Frames without the override keep the static camera.
    let frame8 = scene.get_camera("camera_pinhole", Some(8)).unwrap();
    assert!(std::sync::Arc::ptr_eq(&static_cam, &frame8));
}

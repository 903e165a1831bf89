//! Scene-level transform properties: round trips, pose/transform duality,
//! plane covariance, cuboid transforms and per-frame overrides.

use std::f64::consts::PI;

use scl_core::{
    euler_to_rotation, inverse_pose, points3d_from_coords, EulerSeq, Mat4, TransformData, Vec3,
    Vec4,
};
use scl_scene::{CsType, FrameTransform, Scene, SceneDescription, SceneError};

fn vehicle_scene() -> SceneDescription {
    let mut desc = SceneDescription::new();
    desc.declare_coordinate_system("world", CsType::Custom, "", None);
    desc.declare_coordinate_system(
        "vehicle-iso8855",
        CsType::LocalCs,
        "world",
        Some(TransformData::EulerAndTranslation {
            euler_angles: vec![0.4, 0.0, 0.0],
            translation: vec![12.0, -3.0, 0.0],
            sequence: EulerSeq::Zyx,
        }),
    );
    let r = euler_to_rotation(&[0.1, -0.05, 0.02], EulerSeq::Zyx);
    desc.declare_coordinate_system(
        "velo_top",
        CsType::SensorCs,
        "vehicle-iso8855",
        Some(TransformData::from_rt(&r, &Vec3::new(0.8, 0.0, 1.7))),
    );
    desc
}

#[test]
fn round_trip_transform_recovers_points() {
    let desc = vehicle_scene();
    let scene = Scene::new(&desc);

    let points = points3d_from_coords(&[(1.0, 2.0, 3.0), (-4.0, 0.5, 10.0), (0.0, 0.0, 0.0)]);
    let there = scene
        .transform_points(&points, "velo_top", "world", None)
        .unwrap();
    let back = scene
        .transform_points(&there, "world", "velo_top", None)
        .unwrap();
    assert!((&back - &points).amax() < 1e-6);
}

#[test]
fn pose_transform_duality() {
    let desc = vehicle_scene();
    let scene = Scene::new(&desc);

    let (fwd, s1) = scene.get_transform("velo_top", "world", None).unwrap();
    let (bwd, s2) = scene.get_transform("world", "velo_top", None).unwrap();
    assert!(s1 && s2);
    assert!((fwd - inverse_pose(&bwd)).amax() < 1e-9);
    assert!((fwd * bwd - Mat4::identity()).amax() < 1e-9);
}

#[test]
fn plane_covariance_law() {
    let desc = vehicle_scene();
    let scene = Scene::new(&desc);

    // Ground plane z = 0 in the vehicle system; a point on it stays on the
    // transformed plane.
    let plane = Vec4::new(0.0, 0.0, 1.0, 0.0);
    let on_plane = points3d_from_coords(&[(5.0, -2.0, 0.0)]);

    let plane_w = scene
        .transform_plane(&plane, "vehicle-iso8855", "world", None)
        .unwrap();
    let point_w = scene
        .transform_points(&on_plane, "vehicle-iso8855", "world", None)
        .unwrap();
    let residual = plane_w.x * point_w[(0, 0)]
        + plane_w.y * point_w[(1, 0)]
        + plane_w.z * point_w[(2, 0)]
        + plane_w.w;
    assert!(residual.abs() < 1e-6, "residual = {residual}");
}

#[test]
fn cuboid_identity_transform_up_to_angle_wrap() {
    let desc = vehicle_scene();
    let scene = Scene::new(&desc);

    let cuboid = [15.0, 0.0, 0.7, 0.0, 0.0, PI / 12.0, 4.2, 1.8, 1.4];
    let out = scene
        .transform_cuboid(&cuboid, "vehicle-iso8855", "vehicle-iso8855", None)
        .unwrap();
    for i in [0usize, 1, 2, 6, 7, 8] {
        assert!((out[i] - cuboid[i]).abs() < 1e-12);
    }
    for i in [3usize, 4, 5] {
        let d = (out[i] - cuboid[i]).rem_euclid(2.0 * PI);
        assert!(d < 1e-9 || 2.0 * PI - d < 1e-9, "angle {i}: {}", out[i]);
    }
}

#[test]
fn quaternion_cuboid_encoding_is_rejected() {
    let desc = vehicle_scene();
    let scene = Scene::new(&desc);
    let err = scene
        .transform_cuboid(&[0.0; 10], "vehicle-iso8855", "world", None)
        .unwrap_err();
    assert!(matches!(err, SceneError::Cuboid(_)));
}

#[test]
fn cuboid_round_trip_across_systems() {
    let desc = vehicle_scene();
    let scene = Scene::new(&desc);

    let cuboid = [8.0, 1.0, 0.7, 0.05, -0.1, 0.6, 4.2, 1.8, 1.4];
    let in_world = scene
        .transform_cuboid(&cuboid, "vehicle-iso8855", "world", None)
        .unwrap();
    let back = scene
        .transform_cuboid(&in_world, "world", "vehicle-iso8855", None)
        .unwrap();
    for i in 0..9 {
        assert!((back[i] - cuboid[i]).abs() < 1e-9, "component {i}");
    }
}

#[test]
fn unknown_destination_reports_error() {
    let desc = vehicle_scene();
    let scene = Scene::new(&desc);
    let err = scene
        .get_transform("vehicle-iso8855", "never-declared", None)
        .unwrap_err();
    match err {
        SceneError::UnknownCoordinateSystem(name) => assert_eq!(name, "never-declared"),
        other => panic!("expected UnknownCoordinateSystem, got {other:?}"),
    }
}

#[test]
fn frame_override_wins_and_marks_chain_dynamic() {
    let mut desc = vehicle_scene();
    // Odometry step at frame 5: the vehicle moved 2 m forward in world.
    desc.add_frame_transform(
        5,
        FrameTransform::new(
            "vehicle-iso8855",
            "world",
            TransformData::EulerAndTranslation {
                euler_angles: vec![0.0, 0.0, 0.0],
                translation: vec![2.0, 0.0, 0.0],
                sequence: EulerSeq::Zyx,
            },
        ),
    );
    let scene = Scene::new(&desc);

    let (t_static, s) = scene.get_transform("vehicle-iso8855", "world", None).unwrap();
    assert!(s);

    // At frame 5 the override replaces the static pose.
    let (t5, s5) = scene.get_transform("vehicle-iso8855", "world", Some(5)).unwrap();
    assert!(!s5);
    assert!((t5[(0, 3)] - 2.0).abs() < 1e-12);
    assert!((t5 - t_static).amax() > 1.0);

    // The inverse direction resolves through the same override, inverted.
    let (t5_inv, s5_inv) = scene.get_transform("world", "vehicle-iso8855", Some(5)).unwrap();
    assert!(!s5_inv);
    assert!((t5 * t5_inv - Mat4::identity()).amax() < 1e-9);

    // Other frames keep the static pose.
    let (t6, s6) = scene.get_transform("vehicle-iso8855", "world", Some(6)).unwrap();
    assert!(s6);
    assert!((t6 - t_static).amax() < 1e-12);
}

#[test]
fn override_on_inner_edge_makes_whole_chain_dynamic() {
    let mut desc = vehicle_scene();
    desc.add_frame_transform(
        2,
        FrameTransform::new(
            "vehicle-iso8855",
            "world",
            TransformData::from_rt(
                &euler_to_rotation(&[0.1, 0.0, 0.0], EulerSeq::Zyx),
                &Vec3::new(13.0, -3.0, 0.0),
            ),
        ),
    );
    let scene = Scene::new(&desc);

    // velo_top -> world crosses the overridden edge.
    let (_, is_static) = scene.get_transform("velo_top", "world", Some(2)).unwrap();
    assert!(!is_static);

    // A chain not crossing it stays static.
    let (_, is_static) = scene
        .get_transform("velo_top", "vehicle-iso8855", Some(2))
        .unwrap();
    assert!(is_static);
}

#[test]
fn resolver_failure_leaves_scene_usable() {
    let desc = vehicle_scene();
    let scene = Scene::new(&desc);
    assert!(scene.get_transform("velo_top", "nope", None).is_err());
    // Subsequent calls still work.
    let (_, is_static) = scene.get_transform("velo_top", "world", None).unwrap();
    assert!(is_static);
}

#[test]
fn malformed_transform_data_surfaces_invalid_kind() {
    let mut desc = SceneDescription::new();
    desc.declare_coordinate_system("world", CsType::SceneCs, "", None);
    desc.declare_coordinate_system(
        "broken",
        CsType::LocalCs,
        "world",
        Some(TransformData::Matrix {
            matrix4x4: vec![1.0; 12], // wrong length
        }),
    );
    let scene = Scene::new(&desc);
    let err = scene.get_transform("broken", "world", None).unwrap_err();
    assert!(matches!(err, SceneError::Transform(_)));
    let _ = err.to_string();
}

#[test]
fn chain_composition_matches_manual_product() -> anyhow::Result<()> {
    let desc = vehicle_scene();
    let scene = Scene::new(&desc);

    let pose_of = |name: &str| -> anyhow::Result<Mat4> {
        let cs = desc
            .coordinate_systems()
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("missing coordinate system {name}"))?;
        let data = cs
            .pose_wrt_parent
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("{name} has no pose"))?;
        Ok(data.matrix()?)
    };
    let p_vehicle = pose_of("vehicle-iso8855")?;
    let p_velo = pose_of("velo_top")?;

    // velo -> world: first into the vehicle, then into the world.
    let expected = p_vehicle * p_velo;
    let (t, _) = scene.get_transform("velo_top", "world", None)?;
    assert!((t - expected).amax() < 1e-12);

    let points = points3d_from_coords(&[(1.0, 0.0, 0.0)]);
    let via_scene = scene.transform_points(&points, "velo_top", "world", None)?;
    let manual = expected * points.column(0).into_owned();
    for r in 0..4 {
        assert!((via_scene[(r, 0)] - manual[r]).abs() < 1e-12);
    }
    Ok(())
}

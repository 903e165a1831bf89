//! High-level entry crate for the `scl-rs` scene geometry toolbox.
//!
//! Everything is re-exported from the two underlying crates:
//!
//! - [`core`] (`scl-core`): math aliases, transform-data normalization,
//!   pose algebra, frame intervals and the four camera models.
//! - [`scene`] (`scl-scene`): the coordinate-system graph, the transform
//!   resolver and the [`Scene`] facade.
//!
//! # Example
//!
//! ```
//! use scl::{CsType, Scene, SceneDescription, TransformData};
//!
//! let mut desc = SceneDescription::new();
//! desc.declare_coordinate_system("world", CsType::SceneCs, "", None);
//! desc.declare_coordinate_system(
//!     "vehicle-iso8855",
//!     CsType::LocalCs,
//!     "world",
//!     Some(TransformData::EulerAndTranslation {
//!         euler_angles: vec![0.0, 0.0, 0.0],
//!         translation: vec![10.0, 0.0, 0.0],
//!         sequence: Default::default(),
//!     }),
//! );
//!
//! let scene = Scene::new(&desc);
//! let (t, is_static) = scene.get_transform("vehicle-iso8855", "world", None)?;
//! assert!(is_static);
//! assert_eq!(t[(0, 3)], 10.0);
//! # Ok::<(), scl::SceneError>(())
//! ```

pub use scl_core as core;
pub use scl_scene as scene;

pub use scl_core::{
    cuboid_corners, euler_to_rotation, fuse_frame_intervals, grid_points3d, inverse_pose,
    points3d_from_coords, pose_from_rotation_translation, rotation_to_euler_zyx, Camera,
    CameraError, CuboidError, CylindricalCamera, Distortion, EulerSeq, FisheyeCamera,
    FisheyeFitOptions, FisheyeModel, FisheyeModelKind, FrameInterval, FrameNum, Mat3, Mat3x4, Mat4,
    PinholeCamera, Points2d, Points3d, Real, StreamIntrinsics, TransformData, TransformError,
    Vec2, Vec3, Vec4,
};
pub use scl_scene::{
    CoordinateSystem, CsGraph, CsType, FrameProperties, FrameTransform, HorizonLine, Scene,
    SceneDescription, SceneError, StreamDescription,
};

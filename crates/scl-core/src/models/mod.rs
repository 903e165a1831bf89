//! Camera models.
//!
//! Four closed variants share one contract:
//!
//! 1. `distort_rays`: map undistorted ray directions (camera frame,
//!    z-forward) to their distorted counterparts; identity for
//!    distortion-free models.
//! 2. `project_points`: homogeneous 3D points (camera frame) to homogeneous
//!    pixels plus a per-point validity mask. Points behind the camera,
//!    outside the distortion domain, or (on request) outside the image are
//!    invalid and their output columns are NaN, never clamped.
//! 3. `reproject_pixels`: pixels back to 3D rays (z normalized to 1 where
//!    finite) plus a validity mask.
//!
//! Extrinsics never live here; a camera's own coordinate system carries its
//! pose in the scene graph.

mod camera;
mod cylindrical;
mod fisheye;
mod orthographic;
mod params;
mod pinhole;

pub use camera::{intersect_rays_with_plane, Camera, CameraError, RemapTable};
pub use cylindrical::CylindricalCamera;
pub use fisheye::{FisheyeCamera, FisheyeFitOptions, FisheyeModel, InversePolynomial};
pub use orthographic::OrthographicCamera;
pub use params::{
    CylindricalIntrinsics, FisheyeIntrinsics, FisheyeModelKind, OrthographicIntrinsics,
    PinholeIntrinsics, StreamIntrinsics,
};
pub use pinhole::{Distortion, PinholeCamera};

use crate::math::Real;

/// Points with camera-frame depth at or below this are behind the camera.
pub const BEHIND_CAMERA_EPS: Real = 1e-8;

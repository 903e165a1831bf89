//! Core geometry primitives for `scl-rs`.
//!
//! This crate contains:
//! - linear algebra type aliases (`Real`, `Vec3`, `Mat4`, `Points3d`, ...),
//! - transform-data normalization (matrix / quaternion / Euler encodings
//!   into canonical 4x4 homogeneous poses) and pose algebra,
//! - frame-interval primitives,
//! - the four camera models (pinhole, fisheye, cylindrical, orthographic)
//!   with their intrinsics parameter structs.
//!
//! Conventions:
//! - All geometric data is homogeneous: 3D points are `4xN` column batches,
//!   image points are `3xN`, poses are 4x4, calibration matrices 3x4.
//! - A pose encodes a child coordinate system expressed in its parent's
//!   frame (alias/passive rotation). Converting points from the parent into
//!   the child applies the *inverse* of the pose.
//! - Camera coordinate systems are X-right, Y-down, Z-forward.

/// Linear algebra type aliases and rotation/transform utilities.
pub mod math;
/// Camera models and intrinsics parameter structs.
pub mod models;

pub use math::*;
pub use models::*;

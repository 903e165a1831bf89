//! Rigid transformation of 9-value cuboids.
//!
//! A cuboid is `(x, y, z, rx, ry, rz, sx, sy, sz)`: center, Z-Y-X Euler
//! orientation and full extents, all expressed in some coordinate system.
//! Transforming composes the cuboid's own pose with the given transform and
//! decomposes back; sizes are invariant under rigid motion.

use log::warn;
use thiserror::Error;

use super::rotation::{euler_to_rotation, rotation_to_euler_zyx, EulerSeq};
use super::transform::{is_rigid_transform, pose_from_rotation_translation};
use super::{Mat4, Real, Vec3};

/// Errors raised while transforming a cuboid.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CuboidError {
    /// 10-value quaternion-encoded cuboids are not transformable here.
    #[error("quaternion-encoded 10-value cuboids are not supported; expected 9 values")]
    UnsupportedCuboidEncoding,
    /// Any other value count is malformed.
    #[error("cuboid must carry 9 values, got {0}")]
    WrongValueCount(usize),
}

/// Transform a 9-value cuboid by a rigid 4x4 transform.
///
/// Quaternion-encoded 10-value cuboids fail with
/// [`CuboidError::UnsupportedCuboidEncoding`]. A non-rigid transform (any
/// scaling in the chain) is logged as a warning; sizes pass through
/// untouched either way.
pub fn transform_cuboid(cuboid: &[Real], t: &Mat4) -> Result<[Real; 9], CuboidError> {
    match cuboid.len() {
        9 => {}
        10 => return Err(CuboidError::UnsupportedCuboidEncoding),
        n => return Err(CuboidError::WrongValueCount(n)),
    }
    if !is_rigid_transform(t, 1e-6) {
        warn!("cuboid transform chain is not rigid; sizes are kept unchanged");
    }

    let center = Vec3::new(cuboid[0], cuboid[1], cuboid[2]);
    let (rx, ry, rz) = (cuboid[3], cuboid[4], cuboid[5]);

    let r = euler_to_rotation(&[rz, ry, rx], EulerSeq::Zyx);
    let pose = pose_from_rotation_translation(&r, &center);
    let new_pose = t * pose;

    let new_r = new_pose.fixed_view::<3, 3>(0, 0).into_owned();
    let [new_rz, new_ry, new_rx] = rotation_to_euler_zyx(&new_r);

    Ok([
        new_pose[(0, 3)],
        new_pose[(1, 3)],
        new_pose[(2, 3)],
        new_rx,
        new_ry,
        new_rz,
        cuboid[6],
        cuboid[7],
        cuboid[8],
    ])
}

/// The eight corner points of a 9-value cuboid, as homogeneous columns in
/// the cuboid's declaring coordinate system.
pub fn cuboid_corners(cuboid: &[Real]) -> Result<super::Points3d, CuboidError> {
    match cuboid.len() {
        9 => {}
        10 => return Err(CuboidError::UnsupportedCuboidEncoding),
        n => return Err(CuboidError::WrongValueCount(n)),
    }
    let center = Vec3::new(cuboid[0], cuboid[1], cuboid[2]);
    let r = euler_to_rotation(&[cuboid[5], cuboid[4], cuboid[3]], EulerSeq::Zyx);
    let half = Vec3::new(cuboid[6] / 2.0, cuboid[7] / 2.0, cuboid[8] / 2.0);

    let mut corners = super::Points3d::zeros(8);
    for (i, (sx, sy, sz)) in [
        (1.0, 1.0, 1.0),
        (1.0, 1.0, -1.0),
        (1.0, -1.0, 1.0),
        (1.0, -1.0, -1.0),
        (-1.0, 1.0, 1.0),
        (-1.0, 1.0, -1.0),
        (-1.0, -1.0, 1.0),
        (-1.0, -1.0, -1.0),
    ]
    .into_iter()
    .enumerate()
    {
        let local = Vec3::new(sx * half.x, sy * half.y, sz * half.z);
        let p = center + r * local;
        corners.set_column(i, &super::Vec4::new(p.x, p.y, p.z, 1.0));
    }
    Ok(corners)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn wrap_angle_close(a: Real, b: Real, tol: Real) -> bool {
        let d = (a - b).rem_euclid(2.0 * PI);
        d < tol || (2.0 * PI - d) < tol
    }

    #[test]
    fn identity_transform_keeps_cuboid() {
        let cuboid = [15.0, 0.0, 0.7, 0.0, 0.0, PI / 12.0, 4.2, 1.8, 1.4];
        let out = transform_cuboid(&cuboid, &Mat4::identity()).unwrap();
        for i in [0, 1, 2, 6, 7, 8] {
            assert!((out[i] - cuboid[i]).abs() < 1e-12, "component {i}");
        }
        for i in [3, 4, 5] {
            assert!(wrap_angle_close(out[i], cuboid[i], 1e-9), "angle {i}");
        }
    }

    #[test]
    fn translation_moves_center_only() {
        let cuboid = [1.0, 2.0, 3.0, 0.1, 0.2, 0.3, 2.0, 1.0, 0.5];
        let t = pose_from_rotation_translation(
            &super::super::Mat3::identity(),
            &Vec3::new(10.0, 0.0, -1.0),
        );
        let out = transform_cuboid(&cuboid, &t).unwrap();
        assert!((out[0] - 11.0).abs() < 1e-12);
        assert!((out[1] - 2.0).abs() < 1e-12);
        assert!((out[2] - 2.0).abs() < 1e-12);
        for i in 3..6 {
            assert!(wrap_angle_close(out[i], cuboid[i], 1e-9));
        }
    }

    #[test]
    fn yaw_composes_with_cuboid_yaw() {
        let cuboid = [2.0, 0.0, 0.0, 0.0, 0.0, 0.2, 1.0, 1.0, 1.0];
        let r = euler_to_rotation(&[0.3, 0.0, 0.0], EulerSeq::Zyx);
        let t = pose_from_rotation_translation(&r, &Vec3::zeros());
        let out = transform_cuboid(&cuboid, &t).unwrap();
        assert!(wrap_angle_close(out[5], 0.5, 1e-9), "rz = {}", out[5]);
        // Center rotates about the origin.
        assert!((out[0] - 2.0 * 0.3f64.cos()).abs() < 1e-9);
        assert!((out[1] - 2.0 * 0.3f64.sin()).abs() < 1e-9);
    }

    #[test]
    fn ten_value_cuboid_is_rejected() {
        let cuboid = [0.0; 10];
        assert_eq!(
            transform_cuboid(&cuboid, &Mat4::identity()),
            Err(CuboidError::UnsupportedCuboidEncoding)
        );
        assert!(matches!(
            transform_cuboid(&[0.0; 7], &Mat4::identity()),
            Err(CuboidError::WrongValueCount(7))
        ));
    }

    #[test]
    fn corners_span_the_extents() {
        let cuboid = [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 4.0, 2.0, 1.0];
        let corners = cuboid_corners(&cuboid).unwrap();
        assert_eq!(corners.ncols(), 8);
        let max_x = (0..8).map(|i| corners[(0, i)]).fold(Real::MIN, Real::max);
        let min_x = (0..8).map(|i| corners[(0, i)]).fold(Real::MAX, Real::min);
        assert!((max_x - 2.0).abs() < 1e-12);
        assert!((min_x + 2.0).abs() < 1e-12);
    }
}

//! Mathematical utilities and type definitions.
//!
//! Everything downstream works on these aliases; scalar precision is `f64`
//! throughout.

use nalgebra::{
    Matrix3, Matrix3x4, Matrix3xX, Matrix4, Matrix4xX, Point2, Point3, Vector2, Vector3, Vector4,
};

pub mod cuboid;
pub mod frame_intervals;
pub mod rotation;
pub mod transform;

pub use cuboid::{cuboid_corners, transform_cuboid, CuboidError};
pub use frame_intervals::{fuse_frame_intervals, FrameInterval};
pub use rotation::{euler_to_rotation, rotation_to_euler_zyx, Axis, EulerSeq};
pub use transform::{
    inverse_pose, is_rigid_transform, pose_from_rotation_translation, transform_plane_matrix,
    TransformData, TransformError,
};

/// Scalar type used throughout the library (currently `f64`).
pub type Real = f64;

/// Frame number of a scene recording.
pub type FrameNum = u32;

/// 2D vector with [`Real`] components.
pub type Vec2 = Vector2<Real>;
/// 3D vector with [`Real`] components.
pub type Vec3 = Vector3<Real>;
/// 4D vector with [`Real`] components (homogeneous points, planes).
pub type Vec4 = Vector4<Real>;
/// 2D point with [`Real`] coordinates.
pub type Pt2 = Point2<Real>;
/// 3D point with [`Real`] coordinates.
pub type Pt3 = Point3<Real>;
/// 3×3 matrix with [`Real`] entries.
pub type Mat3 = Matrix3<Real>;
/// 4×4 matrix with [`Real`] entries.
pub type Mat4 = Matrix4<Real>;
/// 3×4 matrix with [`Real`] entries (calibration matrices).
pub type Mat3x4 = Matrix3x4<Real>;

/// Batch of homogeneous 3D points, one column per point (`4xN`).
pub type Points3d = Matrix4xX<Real>;
/// Batch of homogeneous image points, one column per point (`3xN`).
pub type Points2d = Matrix3xX<Real>;
/// Batch of 3D rays in a camera frame, one column per ray (`3xN`).
pub type Rays3d = Matrix3xX<Real>;

/// Extract the 3x3 left block of a 3x4 calibration matrix.
pub fn k_3x3_from_3x4(k: &Mat3x4) -> Mat3 {
    k.fixed_view::<3, 3>(0, 0).into_owned()
}

/// Extend a 3x3 calibration matrix with a zero fourth column.
pub fn k_3x4_from_3x3(k: &Mat3) -> Mat3x4 {
    let mut out = Mat3x4::zeros();
    out.fixed_view_mut::<3, 3>(0, 0).copy_from(k);
    out
}

/// Build a `4xN` homogeneous batch from Euclidean 3D points.
pub fn points3d_from_coords(coords: &[(Real, Real, Real)]) -> Points3d {
    let mut m = Points3d::zeros(coords.len());
    for (i, (x, y, z)) in coords.iter().enumerate() {
        m.set_column(i, &Vec4::new(*x, *y, *z, 1.0));
    }
    m
}

/// Regular `4xN` grid of homogeneous 3D points over the given inclusive
/// ranges with the given sample counts.
pub fn grid_points3d(
    x: (Real, Real, usize),
    y: (Real, Real, usize),
    z: (Real, Real, usize),
) -> Points3d {
    let axis = |(lo, hi, n): (Real, Real, usize)| -> Vec<Real> {
        if n <= 1 {
            vec![lo]
        } else {
            (0..n)
                .map(|i| lo + (hi - lo) * i as Real / (n - 1) as Real)
                .collect()
        }
    };
    let xs = axis(x);
    let ys = axis(y);
    let zs = axis(z);
    let mut coords = Vec::with_capacity(xs.len() * ys.len() * zs.len());
    for zv in &zs {
        for yv in &ys {
            for xv in &xs {
                coords.push((*xv, *yv, *zv));
            }
        }
    }
    points3d_from_coords(&coords)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn k_matrix_roundtrip() {
        let k = Mat3::new(800.0, 0.0, 640.0, 0.0, 780.0, 360.0, 0.0, 0.0, 1.0);
        let k34 = k_3x4_from_3x3(&k);
        assert_eq!(k34[(0, 3)], 0.0);
        assert_eq!(k_3x3_from_3x4(&k34), k);
    }

    #[test]
    fn grid_has_expected_shape() {
        let g = grid_points3d((-0.5, 0.5, 2), (-0.5, 0.5, 2), (3.0, 3.0, 1));
        assert_eq!(g.ncols(), 4);
        for c in 0..4 {
            assert_eq!(g[(2, c)], 3.0);
            assert_eq!(g[(3, c)], 1.0);
        }
    }
}

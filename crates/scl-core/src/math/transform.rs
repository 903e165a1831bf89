//! Transform-data normalization and pose algebra.
//!
//! A transform between two coordinate systems may be declared in one of
//! three encodings; all of them normalize into a canonical 4x4 homogeneous
//! matrix. Matrices encode the pose of a child coordinate system expressed
//! in its parent's frame (alias/passive convention): the same matrix is the
//! operator converting point coordinates *from the child into the parent*.

use nalgebra::{Quaternion, UnitQuaternion};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::rotation::{euler_to_rotation, EulerSeq};
use super::{Mat3, Mat4, Real, Vec3};

/// Errors raised while normalizing transform data.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// The declared union shape or its vector lengths are wrong.
    #[error("invalid transform data: {0}")]
    InvalidTransformKind(String),
}

/// One transform between two coordinate systems, in any of the accepted
/// encodings. The serde shape is untagged: the field names discriminate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransformData {
    /// Row-major 4x4 homogeneous matrix (16 values).
    Matrix {
        matrix4x4: Vec<Real>,
    },
    /// Unit quaternion `[x, y, z, w]` plus translation `[x, y, z]`.
    QuaternionAndTranslation {
        quaternion: Vec<Real>,
        translation: Vec<Real>,
    },
    /// Euler angles (3, in sequence order) plus translation `[x, y, z]`.
    EulerAndTranslation {
        euler_angles: Vec<Real>,
        translation: Vec<Real>,
        #[serde(default)]
        sequence: EulerSeq,
    },
}

impl TransformData {
    /// Build transform data from a 4x4 matrix.
    pub fn from_matrix(m: &Mat4) -> Self {
        TransformData::Matrix {
            matrix4x4: m.transpose().as_slice().to_vec(), // row-major
        }
    }

    /// Build transform data from rotation + translation.
    pub fn from_rt(r: &Mat3, t: &Vec3) -> Self {
        Self::from_matrix(&pose_from_rotation_translation(r, t))
    }

    /// Normalize into the canonical 4x4 homogeneous matrix.
    ///
    /// Fails with [`TransformError::InvalidTransformKind`] when vector
    /// lengths do not match the declared encoding.
    pub fn matrix(&self) -> Result<Mat4, TransformError> {
        match self {
            TransformData::Matrix { matrix4x4 } => {
                if matrix4x4.len() != 16 {
                    return Err(TransformError::InvalidTransformKind(format!(
                        "matrix4x4 must carry 16 values, got {}",
                        matrix4x4.len()
                    )));
                }
                Ok(Mat4::from_row_slice(matrix4x4))
            }
            TransformData::QuaternionAndTranslation {
                quaternion,
                translation,
            } => {
                if quaternion.len() != 4 {
                    return Err(TransformError::InvalidTransformKind(format!(
                        "quaternion must carry 4 values, got {}",
                        quaternion.len()
                    )));
                }
                let t = translation_vec(translation)?;
                // Stored [x, y, z, w]; nalgebra's constructor takes w first.
                let quat = Quaternion::new(quaternion[3], quaternion[0], quaternion[1], quaternion[2]);
                let rot = UnitQuaternion::from_quaternion(quat);
                Ok(pose_from_rotation_translation(
                    rot.to_rotation_matrix().matrix(),
                    &t,
                ))
            }
            TransformData::EulerAndTranslation {
                euler_angles,
                translation,
                sequence,
            } => {
                if euler_angles.len() != 3 {
                    return Err(TransformError::InvalidTransformKind(format!(
                        "euler_angles must carry 3 values, got {}",
                        euler_angles.len()
                    )));
                }
                let t = translation_vec(translation)?;
                let r = euler_to_rotation(
                    &[euler_angles[0], euler_angles[1], euler_angles[2]],
                    *sequence,
                );
                Ok(pose_from_rotation_translation(&r, &t))
            }
        }
    }
}

fn translation_vec(translation: &[Real]) -> Result<Vec3, TransformError> {
    if translation.len() != 3 {
        return Err(TransformError::InvalidTransformKind(format!(
            "translation must carry 3 values, got {}",
            translation.len()
        )));
    }
    Ok(Vec3::new(translation[0], translation[1], translation[2]))
}

/// Assemble `[[R, t], [0 0 0 1]]`.
pub fn pose_from_rotation_translation(r: &Mat3, t: &Vec3) -> Mat4 {
    let mut m = Mat4::identity();
    m.fixed_view_mut::<3, 3>(0, 0).copy_from(r);
    m.fixed_view_mut::<3, 1>(0, 3).copy_from(t);
    m
}

/// Invert a rigid pose without generic matrix inversion:
/// `P = [R, c] ⇒ P⁻¹ = [Rᵀ, -Rᵀc]`.
pub fn inverse_pose(p: &Mat4) -> Mat4 {
    let r = p.fixed_view::<3, 3>(0, 0);
    let c = p.fixed_view::<3, 1>(0, 3);
    let rt = r.transpose();
    let t = -(rt * c);
    let mut m = Mat4::identity();
    m.fixed_view_mut::<3, 3>(0, 0).copy_from(&rt);
    m.fixed_view_mut::<3, 1>(0, 3).copy_from(&t);
    m
}

/// Whether a 4x4 matrix is a rigid transform: proper orthonormal rotation
/// block and `[0, 0, 0, 1]` bottom row, within `tol`.
pub fn is_rigid_transform(t: &Mat4, tol: Real) -> bool {
    let bottom_ok = (t[(3, 0)]).abs() < tol
        && (t[(3, 1)]).abs() < tol
        && (t[(3, 2)]).abs() < tol
        && (t[(3, 3)] - 1.0).abs() < tol;
    if !bottom_ok {
        return false;
    }
    let r = t.fixed_view::<3, 3>(0, 0).into_owned();
    let orth = (r.transpose() * r - Mat3::identity()).amax() < tol;
    orth && (r.determinant() - 1.0).abs() < tol
}

/// Covariant transform of plane coefficients: for points moved by `T`, the
/// plane `(a, b, c, d)` moves by `(T⁻¹)ᵀ`.
pub fn transform_plane_matrix(t: &Mat4) -> Mat4 {
    inverse_pose(t).transpose()
}

//! Euler-angle and elemental rotation utilities.
//!
//! Rotations built here follow the *passive* pose convention used across the
//! library: a rotation matrix is the orientation of a child coordinate system
//! expressed in its parent's frame. For an angle sequence `[a0, a1, a2]` and
//! sequence `S = (s0, s1, s2)` the composed matrix is
//!
//! `R = R_s0(a0) · R_s1(a1) · R_s2(a2)`
//!
//! which for the default Z-Y-X sequence reads `R = Rz(yaw) · Ry(pitch) ·
//! Rx(roll)`. Note this is the opposite reading order of the usual active
//! point-rotation composition; the unit tests pin the exact numeric behavior.

use serde::{Deserialize, Serialize};

use super::{Mat3, Real};

/// A coordinate axis of an elemental rotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// Supported Euler rotation sequences.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EulerSeq {
    /// Yaw-pitch-roll, the library default.
    #[default]
    Zyx,
    /// Z-X-Z, used by some sensor mounting conventions.
    Zxz,
    /// X-Y-Z.
    Xyz,
}

impl EulerSeq {
    fn axes(self) -> [Axis; 3] {
        match self {
            EulerSeq::Zyx => [Axis::Z, Axis::Y, Axis::X],
            EulerSeq::Zxz => [Axis::Z, Axis::X, Axis::Z],
            EulerSeq::Xyz => [Axis::X, Axis::Y, Axis::Z],
        }
    }
}

/// Elemental rotation of `angle` radians about `axis`.
pub fn elemental_rotation(axis: Axis, angle: Real) -> Mat3 {
    let (s, c) = angle.sin_cos();
    match axis {
        Axis::X => Mat3::new(1.0, 0.0, 0.0, 0.0, c, -s, 0.0, s, c),
        Axis::Y => Mat3::new(c, 0.0, s, 0.0, 1.0, 0.0, -s, 0.0, c),
        Axis::Z => Mat3::new(c, -s, 0.0, s, c, 0.0, 0.0, 0.0, 1.0),
    }
}

/// Compose three Euler angles into a rotation matrix.
///
/// `angles[i]` rotates about the i-th axis of `seq`; the matrices multiply
/// left to right in sequence order (`R = R0 · R1 · R2`).
pub fn euler_to_rotation(angles: &[Real; 3], seq: EulerSeq) -> Mat3 {
    let axes = seq.axes();
    elemental_rotation(axes[0], angles[0])
        * elemental_rotation(axes[1], angles[1])
        * elemental_rotation(axes[2], angles[2])
}

/// Extract Z-Y-X Euler angles `[rz, ry, rx]` from a rotation matrix, so that
/// `euler_to_rotation(&angles, EulerSeq::Zyx)` reproduces the input.
///
/// Near gimbal lock (`|cos(ry)| ≈ 0`) the decomposition is not unique; the
/// representative with `rz = 0` is returned.
pub fn rotation_to_euler_zyx(r: &Mat3) -> [Real; 3] {
    let sy = (r[(0, 0)] * r[(0, 0)] + r[(1, 0)] * r[(1, 0)]).sqrt();
    if sy > 1e-6 {
        let rx = r[(2, 1)].atan2(r[(2, 2)]);
        let ry = (-r[(2, 0)]).atan2(sy);
        let rz = r[(1, 0)].atan2(r[(0, 0)]);
        [rz, ry, rx]
    } else {
        // Singular: ry = ±π/2, rx and rz are coupled.
        let rx = (-r[(1, 2)]).atan2(r[(1, 1)]);
        let ry = (-r[(2, 0)]).atan2(sy);
        [0.0, ry, rx]
    }
}

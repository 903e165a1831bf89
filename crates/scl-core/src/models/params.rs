//! Declared stream intrinsics and camera construction.
//!
//! Each stream declares exactly one intrinsics block; the serde shape is the
//! externally tagged union used by the surrounding annotation document
//! (`intrinsics_pinhole`, `intrinsics_fisheye`, ...). Fields are validated
//! here, at construction time, so a malformed declaration fails with a
//! descriptive error instead of surfacing deep inside projection code.

use serde::{Deserialize, Serialize};

use super::camera::{Camera, CameraError};
use super::{
    CylindricalCamera, Distortion, FisheyeCamera, FisheyeFitOptions, FisheyeModel,
    OrthographicCamera, PinholeCamera,
};
use crate::math::{Mat3x4, Real};

/// Pinhole intrinsics: row-major 3x4 calibration matrix plus 0-14
/// distortion coefficients.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PinholeIntrinsics {
    pub width_px: u32,
    pub height_px: u32,
    pub camera_matrix_3x4: Vec<Real>,
    #[serde(default)]
    pub distortion_coeffs_1xn: Vec<Real>,
}

/// Named fisheye lens polynomial forms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FisheyeModelKind {
    RadialPoly,
    Kannala,
    OpencvFisheye,
}

/// Fisheye intrinsics: principal point, focal lengths and 4 or 5 lens
/// polynomial coefficients for the named model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FisheyeIntrinsics {
    pub width_px: u32,
    pub height_px: u32,
    pub center_x: Real,
    pub center_y: Real,
    pub focal_length_x: Real,
    pub focal_length_y: Real,
    pub lens_coeffs_1xn: Vec<Real>,
    pub model: FisheyeModelKind,
}

/// Cylindrical intrinsics: fields of view in radians.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CylindricalIntrinsics {
    pub width_px: u32,
    pub height_px: u32,
    pub fov_horz_rad: Real,
    pub fov_vert_rad: Real,
}

/// Orthographic intrinsics: world-unit clipping rectangle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrthographicIntrinsics {
    pub width_px: u32,
    pub height_px: u32,
    pub xmin: Real,
    pub xmax: Real,
    pub ymin: Real,
    pub ymax: Real,
}

/// The per-stream intrinsics union.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamIntrinsics {
    IntrinsicsPinhole(PinholeIntrinsics),
    IntrinsicsFisheye(FisheyeIntrinsics),
    IntrinsicsCylindrical(CylindricalIntrinsics),
    IntrinsicsOrthographic(OrthographicIntrinsics),
}

impl StreamIntrinsics {
    /// Declared image size.
    pub fn image_size(&self) -> (u32, u32) {
        match self {
            StreamIntrinsics::IntrinsicsPinhole(p) => (p.width_px, p.height_px),
            StreamIntrinsics::IntrinsicsFisheye(p) => (p.width_px, p.height_px),
            StreamIntrinsics::IntrinsicsCylindrical(p) => (p.width_px, p.height_px),
            StreamIntrinsics::IntrinsicsOrthographic(p) => (p.width_px, p.height_px),
        }
    }

    /// Build a camera for stream `name` from this declaration.
    pub fn build_camera(&self, name: &str) -> Result<Camera, CameraError> {
        match self {
            StreamIntrinsics::IntrinsicsPinhole(p) => {
                if p.camera_matrix_3x4.len() != 12 {
                    return Err(CameraError::InvalidIntrinsics {
                        stream: name.to_string(),
                        reason: format!(
                            "camera_matrix_3x4 must carry 12 values, got {}",
                            p.camera_matrix_3x4.len()
                        ),
                    });
                }
                let k = Mat3x4::from_row_slice(&p.camera_matrix_3x4);
                let dist = Distortion::new(p.distortion_coeffs_1xn.clone()).map_err(|reason| {
                    CameraError::InvalidIntrinsics {
                        stream: name.to_string(),
                        reason,
                    }
                })?;
                Ok(Camera::Pinhole(PinholeCamera::new(
                    name,
                    p.width_px,
                    p.height_px,
                    k,
                    dist,
                    0.0,
                )?))
            }
            StreamIntrinsics::IntrinsicsFisheye(p) => {
                let model = match (p.model, p.lens_coeffs_1xn.as_slice()) {
                    (FisheyeModelKind::RadialPoly, &[k1, k2, k3, k4]) => {
                        FisheyeModel::RadialPoly([k1, k2, k3, k4])
                    }
                    (FisheyeModelKind::Kannala, &[k1, k2, k3, k4, k5]) => {
                        FisheyeModel::Kannala([k1, k2, k3, k4, k5])
                    }
                    (FisheyeModelKind::OpencvFisheye, &[k1, k2, k3, k4]) => {
                        FisheyeModel::OpencvFisheye([k1, k2, k3, k4])
                    }
                    (kind, coeffs) => {
                        return Err(CameraError::InvalidIntrinsics {
                            stream: name.to_string(),
                            reason: format!(
                                "{kind:?} expects {} lens coefficients, got {}",
                                match kind {
                                    FisheyeModelKind::Kannala => 5,
                                    _ => 4,
                                },
                                coeffs.len()
                            ),
                        })
                    }
                };
                Ok(Camera::Fisheye(FisheyeCamera::new(
                    name,
                    p.width_px,
                    p.height_px,
                    p.center_x,
                    p.center_y,
                    p.focal_length_x,
                    p.focal_length_y,
                    model,
                    FisheyeFitOptions::default(),
                )?))
            }
            StreamIntrinsics::IntrinsicsCylindrical(p) => Ok(Camera::Cylindrical(
                CylindricalCamera::new(name, p.width_px, p.height_px, p.fov_horz_rad, p.fov_vert_rad)?,
            )),
            StreamIntrinsics::IntrinsicsOrthographic(p) => Ok(Camera::Orthographic(
                OrthographicCamera::new(
                    name, p.width_px, p.height_px, p.xmin, p.xmax, p.ymin, p.ymax,
                )?,
            )),
        }
    }
}

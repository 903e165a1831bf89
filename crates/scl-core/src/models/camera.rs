//! The closed camera union and shared projection helpers.

use nalgebra::Matrix4;
use thiserror::Error;

use super::{CylindricalCamera, FisheyeCamera, OrthographicCamera, PinholeCamera};
use crate::math::{Mat3, Points2d, Points3d, Rays3d, Real, Vec4};

/// Errors raised while constructing a camera from declared intrinsics.
#[derive(Debug, Error, Clone)]
pub enum CameraError {
    /// The declared intrinsics block is malformed.
    #[error("invalid intrinsics for stream '{stream}': {reason}")]
    InvalidIntrinsics { stream: String, reason: String },
    /// The fisheye inverse polynomial could not be fitted.
    #[error("inverse polynomial fit failed for stream '{stream}': {reason}")]
    InverseFitFailed { stream: String, reason: String },
}

/// Dense pixel remap table from an undistorted output domain into the
/// distorted source domain, row-major, one entry per output pixel.
///
/// Building one costs `O(width × height)` projections; cameras compute it
/// lazily and keep it for their lifetime.
#[derive(Clone, Debug)]
pub struct RemapTable {
    pub width: u32,
    pub height: u32,
    pub map_x: Vec<f32>,
    pub map_y: Vec<f32>,
}

impl RemapTable {
    /// Source coordinate for output pixel `(u, v)`.
    pub fn at(&self, u: u32, v: u32) -> (f32, f32) {
        let idx = (v * self.width + u) as usize;
        (self.map_x[idx], self.map_y[idx])
    }
}

/// A camera: one of the four supported projection models.
///
/// The variant set is closed; everything consuming a camera matches
/// exhaustively.
#[derive(Clone, Debug)]
pub enum Camera {
    Pinhole(PinholeCamera),
    Fisheye(FisheyeCamera),
    Cylindrical(CylindricalCamera),
    Orthographic(OrthographicCamera),
}

impl Camera {
    pub fn name(&self) -> &str {
        match self {
            Camera::Pinhole(c) => c.name(),
            Camera::Fisheye(c) => c.name(),
            Camera::Cylindrical(c) => c.name(),
            Camera::Orthographic(c) => c.name(),
        }
    }

    pub fn width(&self) -> u32 {
        match self {
            Camera::Pinhole(c) => c.width(),
            Camera::Fisheye(c) => c.width(),
            Camera::Cylindrical(c) => c.width(),
            Camera::Orthographic(c) => c.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            Camera::Pinhole(c) => c.height(),
            Camera::Fisheye(c) => c.height(),
            Camera::Cylindrical(c) => c.height(),
            Camera::Orthographic(c) => c.height(),
        }
    }

    /// Apply the model's distortion to undistorted rays; identity for the
    /// distortion-free models.
    pub fn distort_rays(&self, rays: &Rays3d) -> Rays3d {
        match self {
            Camera::Pinhole(c) => c.distort_rays(rays),
            Camera::Fisheye(c) => c.distort_rays(rays),
            Camera::Cylindrical(_) | Camera::Orthographic(_) => rays.clone(),
        }
    }

    /// Project homogeneous camera-frame points to homogeneous pixels.
    pub fn project_points(&self, points: &Points3d, remove_outside: bool) -> (Points2d, Vec<bool>) {
        match self {
            Camera::Pinhole(c) => c.project_points(points, remove_outside),
            Camera::Fisheye(c) => c.project_points(points, remove_outside),
            Camera::Cylindrical(c) => c.project_points(points, remove_outside),
            Camera::Orthographic(c) => c.project_points(points, remove_outside),
        }
    }

    /// Reproject homogeneous pixels to camera-frame rays (z = 1 where
    /// finite). Mask entries are false where the model's inverse is
    /// undefined for that pixel.
    pub fn reproject_pixels(&self, pixels: &Points2d) -> (Rays3d, Vec<bool>) {
        match self {
            Camera::Pinhole(c) => c.reproject_pixels(pixels),
            Camera::Fisheye(c) => c.reproject_pixels(pixels),
            Camera::Cylindrical(c) => c.reproject_pixels(pixels),
            Camera::Orthographic(c) => c.reproject_pixels(pixels),
        }
    }

    /// Reproject pixels onto a plane given in the camera coordinate system.
    ///
    /// The line through each pixel is intersected with the plane using the
    /// Plücker line-plane formulation; lines parallel to the plane yield
    /// the direction vector and a false mask entry. For the perspective
    /// models the line runs through the projection center; for the
    /// orthographic model it runs parallel to the optical axis through the
    /// reprojected point.
    pub fn reproject_pixels_to_plane(
        &self,
        pixels: &Points2d,
        plane: &Vec4,
    ) -> (Points3d, Vec<bool>) {
        let (rays, valid) = self.reproject_pixels(pixels);
        match self {
            Camera::Orthographic(_) => {
                let n = rays.ncols();
                let mut points = Points3d::from_element(n, Real::NAN);
                let mut out_valid = valid.clone();
                for i in 0..n {
                    if !valid[i] {
                        continue;
                    }
                    let p1 = Vec4::new(rays[(0, i)], rays[(1, i)], 0.0, 1.0);
                    let p2 = Vec4::new(rays[(0, i)], rays[(1, i)], 1.0, 1.0);
                    let (x, ok) = plucker_intersection(&p1, &p2, plane);
                    points.set_column(i, &x);
                    out_valid[i] = ok;
                }
                (points, out_valid)
            }
            _ => intersect_rays_with_plane(&rays, &valid, plane),
        }
    }

    /// Linear calibration matrix of the undistorted image domain, for the
    /// models that have one.
    pub fn undistorted_k(&self) -> Option<Mat3> {
        match self {
            Camera::Pinhole(c) => Some(*c.undistorted_k()),
            Camera::Fisheye(c) => Some(*c.undistorted_k()),
            Camera::Cylindrical(_) | Camera::Orthographic(_) => None,
        }
    }

    /// Project into the *undistorted* image domain (through the linear
    /// undistorted calibration matrix, skipping distortion). `None` for
    /// models without one.
    pub fn project_points_linear(
        &self,
        points: &Points3d,
        remove_outside: bool,
    ) -> Option<(Points2d, Vec<bool>)> {
        match self {
            Camera::Pinhole(c) => Some(c.project_points_linear(points, remove_outside)),
            Camera::Fisheye(c) => Some(c.project_points_linear(points, remove_outside)),
            Camera::Cylindrical(_) | Camera::Orthographic(_) => None,
        }
    }

    /// The undistortion remap table, built on first use. `None` for models
    /// that need none (distortion-free pinhole, cylindrical, orthographic).
    pub fn undistortion_map(&self) -> Option<&RemapTable> {
        match self {
            Camera::Pinhole(c) => c.undistortion_map(),
            Camera::Fisheye(c) => Some(c.undistortion_map()),
            Camera::Cylindrical(_) | Camera::Orthographic(_) => None,
        }
    }
}

/// Plücker intersection of the line through `p1` and `p2` with a plane.
///
/// Returns the homogeneous intersection point and whether it is finite;
/// for a line parallel to the plane the unit direction is returned and the
/// flag is false.
fn plucker_intersection(p1: &Vec4, p2: &Vec4, plane: &Vec4) -> (Vec4, bool) {
    // L = P1·P2ᵀ − P2·P1ᵀ, intersection X = L·plane.
    let l: Matrix4<Real> = p1 * p2.transpose() - p2 * p1.transpose();
    let mut x = l * plane;
    if x[3].abs() > 1e-12 {
        x /= x[3];
        (x, true)
    } else {
        let norm = x.fixed_rows::<3>(0).norm();
        if norm > 0.0 {
            x /= norm;
        }
        (x, false)
    }
}

/// Intersect camera-frame rays with a plane `(a, b, c, d)` in the same
/// frame, via Plücker coordinates.
///
/// Each line goes through the camera origin and `origin + ray`. The result
/// column is the homogeneous intersection point; for rays parallel to the
/// plane the unnormalized direction is returned and the mask entry is
/// false. Columns invalid on input stay NaN.
pub fn intersect_rays_with_plane(
    rays: &Rays3d,
    valid_in: &[bool],
    plane: &Vec4,
) -> (Points3d, Vec<bool>) {
    let n = rays.ncols();
    let mut points = Points3d::from_element(n, Real::NAN);
    let mut valid = valid_in.to_vec();

    let origin = Vec4::new(0.0, 0.0, 0.0, 1.0);
    for i in 0..n {
        if !valid[i] {
            continue;
        }
        let through = Vec4::new(rays[(0, i)], rays[(1, i)], rays[(2, i)], 1.0);
        let (x, ok) = plucker_intersection(&origin, &through, plane);
        points.set_column(i, &x);
        valid[i] = ok;
    }
    (points, valid)
}

//! Cylindrical (equirectangular) camera.
//!
//! A ray maps to longitude/latitude, then affinely into pixels; there is no
//! distortion stage and the inverse is exact.

use super::camera::CameraError;
use crate::math::{Points2d, Points3d, Rays3d, Real, Vec3};

/// Cylindrical camera with horizontal/vertical field of view in radians.
#[derive(Clone, Debug)]
pub struct CylindricalCamera {
    name: String,
    width: u32,
    height: u32,
    fov_horz: Real,
    fov_vert: Real,
    // Pixels per radian.
    sx: Real,
    sy: Real,
    cx: Real,
    cy: Real,
}

impl CylindricalCamera {
    pub fn new(
        name: impl Into<String>,
        width: u32,
        height: u32,
        fov_horz: Real,
        fov_vert: Real,
    ) -> Result<Self, CameraError> {
        let name = name.into();
        if !(fov_horz > 0.0) || !(fov_vert > 0.0) {
            return Err(CameraError::InvalidIntrinsics {
                stream: name,
                reason: format!("fields of view must be positive, got ({fov_horz}, {fov_vert})"),
            });
        }
        let sx = width as Real / fov_horz;
        let sy = height as Real / fov_vert;
        Ok(Self {
            cx: width as Real / 2.0,
            cy: height as Real / 2.0,
            name,
            width,
            height,
            fov_horz,
            fov_vert,
            sx,
            sy,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn width(&self) -> u32 {
        self.width
    }
    pub fn height(&self) -> u32 {
        self.height
    }
    pub fn fov(&self) -> (Real, Real) {
        (self.fov_horz, self.fov_vert)
    }

    pub fn project_points(&self, points: &Points3d, remove_outside: bool) -> (Points2d, Vec<bool>) {
        let n = points.ncols();
        let mut pixels = Points2d::from_element(n, Real::NAN);
        let mut valid = vec![false; n];
        for i in 0..n {
            let (x, y, z) = (points[(0, i)], points[(1, i)], points[(2, i)]);
            if !x.is_finite() || !y.is_finite() || !z.is_finite() {
                continue;
            }
            let lon = x.atan2(z);
            let lat = (-y).atan2((x * x + z * z).sqrt());
            // The field-of-view box is the projection domain.
            if lon.abs() > self.fov_horz / 2.0 || lat.abs() > self.fov_vert / 2.0 {
                continue;
            }
            let u = self.cx + self.sx * lon;
            let v = self.cy - self.sy * lat;
            if remove_outside && !super::pinhole::inside_image(u, v, self.width, self.height) {
                continue;
            }
            pixels.set_column(i, &Vec3::new(u, v, 1.0));
            valid[i] = true;
        }
        (pixels, valid)
    }

    pub fn reproject_pixels(&self, pixels: &Points2d) -> (Rays3d, Vec<bool>) {
        let n = pixels.ncols();
        let mut rays = Rays3d::from_element(n, Real::NAN);
        let mut valid = vec![false; n];
        for i in 0..n {
            let w = pixels[(2, i)];
            if !w.is_finite() || w == 0.0 {
                continue;
            }
            let lon = (pixels[(0, i)] / w - self.cx) / self.sx;
            let lat = (self.cy - pixels[(1, i)] / w) / self.sy;
            let (sin_lon, cos_lon) = lon.sin_cos();
            let (sin_lat, cos_lat) = lat.sin_cos();
            let dir = Vec3::new(sin_lon * cos_lat, -sin_lat, cos_lon * cos_lat);
            if dir.z <= super::BEHIND_CAMERA_EPS {
                // |lon| >= pi/2: the ray cannot be scaled to z = 1.
                continue;
            }
            rays.set_column(i, &(dir / dir.z));
            valid[i] = true;
        }
        (rays, valid)
    }
}

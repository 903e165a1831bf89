//! Orthographic camera.
//!
//! Parallel projection of the camera-frame `(x, y)` onto pixels; depth only
//! gates validity. The forward 3x4 matrix drops `z` entirely and is not
//! invertible as a homogeneous transform, so the inverse map is built
//! explicitly.

use super::camera::CameraError;
use super::BEHIND_CAMERA_EPS;
use crate::math::{Mat3, Mat3x4, Points2d, Points3d, Rays3d, Real, Vec3};

/// Orthographic camera over a world-unit clipping rectangle.
#[derive(Clone, Debug)]
pub struct OrthographicCamera {
    name: String,
    width: u32,
    height: u32,
    xmin: Real,
    xmax: Real,
    ymin: Real,
    ymax: Real,
    k_3x4: Mat3x4,
    k_inv: Mat3,
}

impl OrthographicCamera {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        width: u32,
        height: u32,
        xmin: Real,
        xmax: Real,
        ymin: Real,
        ymax: Real,
    ) -> Result<Self, CameraError> {
        let name = name.into();
        if xmax <= xmin || ymax <= ymin {
            return Err(CameraError::InvalidIntrinsics {
                stream: name,
                reason: format!(
                    "clipping rectangle is empty: x [{xmin}, {xmax}], y [{ymin}, {ymax}]"
                ),
            });
        }
        let sx = width as Real / (xmax - xmin);
        let sy = height as Real / (ymax - ymin);

        // Forward: (x, y, z, 1) -> (sx·(x - xmin), sy·(y - ymin), 1).
        let mut k_3x4 = Mat3x4::zeros();
        k_3x4[(0, 0)] = sx;
        k_3x4[(0, 3)] = -xmin * sx;
        k_3x4[(1, 1)] = sy;
        k_3x4[(1, 3)] = -ymin * sy;
        k_3x4[(2, 3)] = 1.0;

        // Explicit inverse of the affine part: (u, v, 1) -> (x, y, 1).
        let k_inv = Mat3::new(
            1.0 / sx,
            0.0,
            xmin,
            0.0,
            1.0 / sy,
            ymin,
            0.0,
            0.0,
            1.0,
        );

        Ok(Self {
            name,
            width,
            height,
            xmin,
            xmax,
            ymin,
            ymax,
            k_3x4,
            k_inv,
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
    pub fn clip_rect(&self) -> (Real, Real, Real, Real) {
        (self.xmin, self.xmax, self.ymin, self.ymax)
    }
    pub fn k_matrix_3x4(&self) -> &Mat3x4 {
        &self.k_3x4
    }

    pub fn project_points(&self, points: &Points3d, remove_outside: bool) -> (Points2d, Vec<bool>) {
        let n = points.ncols();
        let mut pixels = Points2d::from_element(n, Real::NAN);
        let mut valid = vec![false; n];
        for i in 0..n {
            let (x, y, z) = (points[(0, i)], points[(1, i)], points[(2, i)]);
            if !(z > BEHIND_CAMERA_EPS) {
                continue;
            }
            // The clipping rectangle is a hard domain constraint,
            // independent of remove_outside.
            if x < self.xmin || x > self.xmax || y < self.ymin || y > self.ymax {
                continue;
            }
            let p = self.k_3x4 * crate::math::Vec4::new(x, y, z, 1.0);
            if remove_outside && !super::pinhole::inside_image(p.x, p.y, self.width, self.height) {
                continue;
            }
            pixels.set_column(i, &p);
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
            let p = Vec3::new(pixels[(0, i)] / w, pixels[(1, i)] / w, 1.0);
            rays.set_column(i, &(self.k_inv * p));
            valid[i] = true;
        }
        (rays, valid)
    }
}

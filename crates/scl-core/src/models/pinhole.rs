//! Pinhole camera with polynomial radial/tangential distortion.
//!
//! Projection is two-stage: distort the normalized ray `(x/z, y/z)`, then
//! apply the linear 3x4 calibration matrix. Distortion coefficients follow
//! the usual ordering `[k1, k2, p1, p2, k3, k4, k5, k6, s1, s2, s3, s4,
//! taux, tauy]` (rational radial + tangential + thin prism + sensor tilt);
//! any documented prefix length is accepted.

use std::sync::OnceLock;

use nalgebra::Matrix3;

use super::camera::{CameraError, RemapTable};
use super::BEHIND_CAMERA_EPS;
use crate::math::{k_3x3_from_3x4, Mat3, Mat3x4, Points2d, Points3d, Rays3d, Real, Vec2, Vec3};

/// Fraction of the monotonicity radius beyond which points are discarded.
/// Empirical safety margin; changing it changes which pixels are rendered.
const R_LIMIT_MARGIN: Real = 0.8;

const UNDISTORT_ITERS: u32 = 8;

/// Radial/tangential distortion coefficients in OpenCV ordering.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Distortion {
    coeffs: Vec<Real>,
}

impl Distortion {
    /// Accepts 0, 4, 5, 8, 12 or 14 coefficients.
    pub fn new(coeffs: Vec<Real>) -> Result<Self, String> {
        match coeffs.len() {
            0 | 4 | 5 | 8 | 12 | 14 => Ok(Self { coeffs }),
            n => Err(format!(
                "distortion vector must carry 0, 4, 5, 8, 12 or 14 coefficients, got {n}"
            )),
        }
    }

    fn c(&self, i: usize) -> Real {
        self.coeffs.get(i).copied().unwrap_or(0.0)
    }

    pub fn k1(&self) -> Real {
        self.c(0)
    }
    pub fn k2(&self) -> Real {
        self.c(1)
    }
    pub fn p1(&self) -> Real {
        self.c(2)
    }
    pub fn p2(&self) -> Real {
        self.c(3)
    }
    pub fn k3(&self) -> Real {
        self.c(4)
    }

    /// All coefficients zero (or none declared).
    pub fn is_identity(&self) -> bool {
        self.coeffs.iter().all(|c| *c == 0.0)
    }

    pub fn coeffs(&self) -> &[Real] {
        &self.coeffs
    }

    /// Forward distortion of a normalized image-plane point.
    pub fn distort(&self, n: &Vec2) -> Vec2 {
        let (x, y) = (n.x, n.y);
        let r2 = x * x + y * y;
        let r4 = r2 * r2;
        let r6 = r4 * r2;

        let num = 1.0 + self.c(0) * r2 + self.c(1) * r4 + self.c(4) * r6;
        let den = 1.0 + self.c(5) * r2 + self.c(6) * r4 + self.c(7) * r6;
        let radial = num / den;

        let xy = x * y;
        let p1 = self.c(2);
        let p2 = self.c(3);
        let mut xd = x * radial + 2.0 * p1 * xy + p2 * (r2 + 2.0 * x * x);
        let mut yd = y * radial + p1 * (r2 + 2.0 * y * y) + 2.0 * p2 * xy;

        // Thin prism terms.
        xd += self.c(8) * r2 + self.c(9) * r4;
        yd += self.c(10) * r2 + self.c(11) * r4;

        // Sensor tilt.
        let (taux, tauy) = (self.c(12), self.c(13));
        if taux != 0.0 || tauy != 0.0 {
            let h = tilt_projection_matrix(taux, tauy);
            let v = h * Vec3::new(xd, yd, 1.0);
            return Vec2::new(v.x / v.z, v.y / v.z);
        }
        Vec2::new(xd, yd)
    }

    /// Iterative inverse of [`Self::distort`].
    pub fn undistort(&self, n_dist: &Vec2) -> Vec2 {
        let mut p = *n_dist;
        for _ in 0..UNDISTORT_ITERS {
            let d = self.distort(&p);
            p.x -= d.x - n_dist.x;
            p.y -= d.y - n_dist.y;
        }
        p
    }

    /// Radius where the radial polynomial stops being monotonic, if any.
    ///
    /// Solves `d/dr [r·(1 + k1·r² + k2·r⁴ + k3·r⁶)] = 0` for the smallest
    /// positive root via the substitution `t = r²`, closed form (Cardano
    /// for the cubic case).
    pub fn radial_r_limit(&self) -> Option<Real> {
        let (k1, k2, k3) = (self.k1(), self.k2(), self.k3());
        // 1 + 3k1·t + 5k2·t² + 7k3·t³ = 0
        let roots = if k3 != 0.0 {
            solve_cubic(7.0 * k3, 5.0 * k2, 3.0 * k1, 1.0)
        } else if k2 != 0.0 {
            solve_quadratic(5.0 * k2, 3.0 * k1, 1.0)
        } else if k1 < 0.0 {
            vec![-1.0 / (3.0 * k1)]
        } else {
            return None;
        };
        roots
            .into_iter()
            .filter(|t| *t > 0.0)
            .fold(None, |acc: Option<Real>, t| match acc {
                Some(best) if best <= t => Some(best),
                _ => Some(t),
            })
            .map(Real::sqrt)
    }
}

fn solve_quadratic(a: Real, b: Real, c: Real) -> Vec<Real> {
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return Vec::new();
    }
    let s = disc.sqrt();
    vec![(-b + s) / (2.0 * a), (-b - s) / (2.0 * a)]
}

/// Real roots of `a·t³ + b·t² + c·t + d = 0`, `a != 0`.
fn solve_cubic(a: Real, b: Real, c: Real, d: Real) -> Vec<Real> {
    let b = b / a;
    let c = c / a;
    let d = d / a;
    // Depressed form s³ + p·s + q with t = s - b/3.
    let p = c - b * b / 3.0;
    let q = 2.0 * b * b * b / 27.0 - b * c / 3.0 + d;
    let shift = -b / 3.0;
    let disc = (q / 2.0) * (q / 2.0) + (p / 3.0) * (p / 3.0) * (p / 3.0);

    if disc > 0.0 {
        let sd = disc.sqrt();
        let s = (-q / 2.0 + sd).cbrt() + (-q / 2.0 - sd).cbrt();
        vec![s + shift]
    } else if p == 0.0 {
        vec![shift]
    } else {
        // Three real roots: trigonometric form.
        let m = 2.0 * (-p / 3.0).sqrt();
        let arg = (3.0 * q / (p * m)).clamp(-1.0, 1.0);
        let theta = arg.acos() / 3.0;
        (0..3)
            .map(|k| m * (theta - 2.0 * std::f64::consts::PI * k as Real / 3.0).cos() + shift)
            .collect()
    }
}

/// Tilted-sensor projection homography (Scheimpflug model).
fn tilt_projection_matrix(taux: Real, tauy: Real) -> Mat3 {
    let (s_tx, c_tx) = taux.sin_cos();
    let (s_ty, c_ty) = tauy.sin_cos();

    let rot_x = Matrix3::new(1.0, 0.0, 0.0, 0.0, c_tx, s_tx, 0.0, -s_tx, c_tx);
    let rot_y = Matrix3::new(c_ty, 0.0, -s_ty, 0.0, 1.0, 0.0, s_ty, 0.0, c_ty);
    let rot_xy = rot_y * rot_x;

    let proj_z = Matrix3::new(
        rot_xy[(2, 2)],
        0.0,
        -rot_xy[(0, 2)],
        0.0,
        rot_xy[(2, 2)],
        -rot_xy[(1, 2)],
        0.0,
        0.0,
        1.0,
    );
    proj_z * rot_xy
}

/// Pinhole camera model.
#[derive(Clone, Debug)]
pub struct PinholeCamera {
    name: String,
    width: u32,
    height: u32,
    k_3x4: Mat3x4,
    k: Mat3,
    k_inv: Mat3,
    dist: Distortion,
    r_limit: Option<Real>,
    k_und: Mat3,
    k_und_inv: Mat3,
    remap: OnceLock<RemapTable>,
}

impl PinholeCamera {
    /// Build a pinhole camera; `alpha` blends the undistorted calibration
    /// matrix between no-black-border (0) and all-pixels-visible (1).
    pub fn new(
        name: impl Into<String>,
        width: u32,
        height: u32,
        k_3x4: Mat3x4,
        dist: Distortion,
        alpha: Real,
    ) -> Result<Self, CameraError> {
        let name = name.into();
        let k = k_3x3_from_3x4(&k_3x4);
        let k_inv = k.try_inverse().ok_or_else(|| CameraError::InvalidIntrinsics {
            stream: name.clone(),
            reason: "calibration matrix is singular".into(),
        })?;

        let r_limit = if dist.is_identity() {
            None
        } else {
            dist.radial_r_limit()
        };

        let k_und = if dist.is_identity() {
            k
        } else {
            optimal_new_k(&k_inv, &dist, width, height, alpha)
        };
        let k_und_inv = k_und
            .try_inverse()
            .ok_or_else(|| CameraError::InvalidIntrinsics {
                stream: name.clone(),
                reason: "undistorted calibration matrix is singular".into(),
            })?;

        Ok(Self {
            name,
            width,
            height,
            k_3x4,
            k,
            k_inv,
            dist,
            r_limit,
            k_und,
            k_und_inv,
            remap: OnceLock::new(),
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
    pub fn k_matrix(&self) -> &Mat3 {
        &self.k
    }
    pub fn k_matrix_3x4(&self) -> &Mat3x4 {
        &self.k_3x4
    }
    pub fn distortion(&self) -> &Distortion {
        &self.dist
    }
    pub fn undistorted_k(&self) -> &Mat3 {
        &self.k_und
    }

    pub fn is_distorted(&self) -> bool {
        !self.dist.is_identity()
    }

    /// Radius cutoff actually applied during projection, if any.
    pub fn r_limit(&self) -> Option<Real> {
        self.r_limit
    }

    /// Distort normalized rays; columns must already be scaled to z = 1.
    pub fn distort_rays(&self, rays: &Rays3d) -> Rays3d {
        if !self.is_distorted() {
            return rays.clone();
        }
        let mut out = rays.clone();
        for i in 0..rays.ncols() {
            let z = rays[(2, i)];
            if !z.is_finite() || z.abs() < BEHIND_CAMERA_EPS {
                continue;
            }
            let d = self
                .dist
                .distort(&Vec2::new(rays[(0, i)] / z, rays[(1, i)] / z));
            out.set_column(i, &Vec3::new(d.x, d.y, 1.0));
        }
        out
    }

    pub fn project_points(&self, points: &Points3d, remove_outside: bool) -> (Points2d, Vec<bool>) {
        self.project_impl(points, remove_outside, true)
    }

    /// Projection into the undistorted domain (through `k_und`, skipping
    /// the distortion stage; the r-limit domain cutoff still applies).
    pub fn project_points_linear(
        &self,
        points: &Points3d,
        remove_outside: bool,
    ) -> (Points2d, Vec<bool>) {
        self.project_impl(points, remove_outside, false)
    }

    fn project_impl(
        &self,
        points: &Points3d,
        remove_outside: bool,
        apply_distortion: bool,
    ) -> (Points2d, Vec<bool>) {
        let n = points.ncols();
        let mut pixels = Points2d::from_element(n, Real::NAN);
        let mut valid = vec![false; n];

        let k = if apply_distortion { &self.k } else { &self.k_und };
        let limit = self.r_limit.map(|r| r * R_LIMIT_MARGIN);

        for i in 0..n {
            let z = points[(2, i)];
            if !(z > BEHIND_CAMERA_EPS) {
                continue;
            }
            let xp = points[(0, i)] / z;
            let yp = points[(1, i)] / z;

            if self.is_distorted() {
                if let Some(limit) = limit {
                    if (xp * xp + yp * yp).sqrt() >= limit {
                        continue;
                    }
                }
            }

            let ray = if apply_distortion && self.is_distorted() {
                let d = self.dist.distort(&Vec2::new(xp, yp));
                Vec3::new(d.x, d.y, 1.0)
            } else {
                Vec3::new(xp, yp, 1.0)
            };

            let p = k * ray;
            if remove_outside && !inside_image(p.x, p.y, self.width, self.height) {
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
            let nrm = self.k_inv * p;
            let und = if self.is_distorted() {
                self.dist.undistort(&Vec2::new(nrm.x / nrm.z, nrm.y / nrm.z))
            } else {
                Vec2::new(nrm.x / nrm.z, nrm.y / nrm.z)
            };
            rays.set_column(i, &Vec3::new(und.x, und.y, 1.0));
            valid[i] = true;
        }
        (rays, valid)
    }

    /// Transfer pixels from the distorted to the undistorted domain.
    pub fn undistort_pixels(&self, pixels: &Points2d) -> Points2d {
        if !self.is_distorted() {
            return pixels.clone();
        }
        let mut out = Points2d::from_element(pixels.ncols(), Real::NAN);
        for i in 0..pixels.ncols() {
            let w = pixels[(2, i)];
            if !w.is_finite() || w == 0.0 {
                continue;
            }
            let p = Vec3::new(pixels[(0, i)] / w, pixels[(1, i)] / w, 1.0);
            let nrm = self.k_inv * p;
            let und = self.dist.undistort(&Vec2::new(nrm.x / nrm.z, nrm.y / nrm.z));
            out.set_column(i, &(self.k_und * Vec3::new(und.x, und.y, 1.0)));
        }
        out
    }

    /// Transfer pixels from the undistorted to the distorted domain.
    pub fn distort_pixels(&self, pixels: &Points2d) -> Points2d {
        if !self.is_distorted() {
            return pixels.clone();
        }
        let mut out = Points2d::from_element(pixels.ncols(), Real::NAN);
        for i in 0..pixels.ncols() {
            let w = pixels[(2, i)];
            if !w.is_finite() || w == 0.0 {
                continue;
            }
            let p = Vec3::new(pixels[(0, i)] / w, pixels[(1, i)] / w, 1.0);
            let nrm = self.k_und_inv * p;
            let d = self.dist.distort(&Vec2::new(nrm.x / nrm.z, nrm.y / nrm.z));
            out.set_column(i, &(self.k * Vec3::new(d.x, d.y, 1.0)));
        }
        out
    }

    /// Remap table from the undistorted output domain into the distorted
    /// source domain; `None` when the camera carries no distortion.
    /// Built on first use and cached for the camera's lifetime.
    pub fn undistortion_map(&self) -> Option<&RemapTable> {
        if !self.is_distorted() {
            return None;
        }
        Some(self.remap.get_or_init(|| {
            build_remap(self.width, self.height, &self.k_und_inv, |n| {
                let d = self.dist.distort(n);
                let p = self.k * Vec3::new(d.x, d.y, 1.0);
                (p.x, p.y)
            })
        }))
    }
}

pub(crate) fn inside_image(x: Real, y: Real, width: u32, height: u32) -> bool {
    x >= 0.0 && x < width as Real && y >= 0.0 && y < height as Real
}

/// Dense remap: for every output pixel, unproject through `k_out_inv` and
/// chase the distorted source coordinate through `distort_and_project`.
pub(crate) fn build_remap(
    width: u32,
    height: u32,
    k_out_inv: &Mat3,
    distort_and_project: impl Fn(&Vec2) -> (Real, Real),
) -> RemapTable {
    let size = (width as usize) * (height as usize);
    let mut map_x = vec![0.0f32; size];
    let mut map_y = vec![0.0f32; size];
    for v in 0..height {
        for u in 0..width {
            let nrm = k_out_inv * Vec3::new(u as Real, v as Real, 1.0);
            let (sx, sy) = distort_and_project(&Vec2::new(nrm.x / nrm.z, nrm.y / nrm.z));
            let idx = (v * width + u) as usize;
            map_x[idx] = sx as f32;
            map_y[idx] = sy as f32;
        }
    }
    RemapTable {
        width,
        height,
        map_x,
        map_y,
    }
}

/// Undistorted calibration matrix: undistort a 9x9 pixel grid, take the
/// inner (alpha = 0) and outer (alpha = 1) rectangles of the result in the
/// normalized plane and map the blended rectangle onto the full image.
fn optimal_new_k(k_inv: &Mat3, dist: &Distortion, width: u32, height: u32, alpha: Real) -> Mat3 {
    const N: usize = 9;
    let (mut o_x0, mut o_x1) = (Real::INFINITY, Real::NEG_INFINITY);
    let (mut o_y0, mut o_y1) = (Real::INFINITY, Real::NEG_INFINITY);
    let (mut i_x0, mut i_x1) = (Real::NEG_INFINITY, Real::INFINITY);
    let (mut i_y0, mut i_y1) = (Real::NEG_INFINITY, Real::INFINITY);

    for gy in 0..N {
        for gx in 0..N {
            let u = (width - 1) as Real * gx as Real / (N - 1) as Real;
            let v = (height - 1) as Real * gy as Real / (N - 1) as Real;
            let nrm = k_inv * Vec3::new(u, v, 1.0);
            let p = dist.undistort(&Vec2::new(nrm.x / nrm.z, nrm.y / nrm.z));

            o_x0 = o_x0.min(p.x);
            o_x1 = o_x1.max(p.x);
            o_y0 = o_y0.min(p.y);
            o_y1 = o_y1.max(p.y);
            if gx == 0 {
                i_x0 = i_x0.max(p.x);
            }
            if gx == N - 1 {
                i_x1 = i_x1.min(p.x);
            }
            if gy == 0 {
                i_y0 = i_y0.max(p.y);
            }
            if gy == N - 1 {
                i_y1 = i_y1.min(p.y);
            }
        }
    }

    let w = (width - 1) as Real;
    let h = (height - 1) as Real;
    let fx0 = w / (i_x1 - i_x0);
    let fy0 = h / (i_y1 - i_y0);
    let cx0 = -fx0 * i_x0;
    let cy0 = -fy0 * i_y0;
    let fx1 = w / (o_x1 - o_x0);
    let fy1 = h / (o_y1 - o_y0);
    let cx1 = -fx1 * o_x0;
    let cy1 = -fy1 * o_y0;

    let blend = |inner: Real, outer: Real| inner * (1.0 - alpha) + outer * alpha;
    Mat3::new(
        blend(fx0, fx1),
        0.0,
        blend(cx0, cx1),
        0.0,
        blend(fy0, fy1),
        blend(cy0, cy1),
        0.0,
        0.0,
        1.0,
    )
}

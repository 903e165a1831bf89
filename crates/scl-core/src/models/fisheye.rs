//! Fisheye camera: polynomial mapping between the angle of incidence and
//! the image radius.
//!
//! The forward polynomial has no closed-form inverse, so a fixed 9-term
//! inverse polynomial is fitted once at construction (least squares over
//! uniformly sampled angles). The fit residual is recorded in degrees;
//! angle errors amplify into large metric errors when reprojecting onto a
//! distant ground plane, so residuals above the configured threshold are
//! logged as warnings.

use std::f64::consts::FRAC_PI_2;
use std::sync::OnceLock;

use log::warn;
use nalgebra::{DMatrix, DVector};

use super::camera::{CameraError, RemapTable};
use super::pinhole::{build_remap, inside_image};
use super::BEHIND_CAMERA_EPS;
use crate::math::{Mat3, Points2d, Points3d, Rays3d, Real, Vec2, Vec3};

/// Lens polynomial relating incidence angle `a` to image radius `rp`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FisheyeModel {
    /// `rp = k1·a + k2·a² + k3·a³ + k4·a⁴`
    RadialPoly([Real; 4]),
    /// `rp = k1·a + k2·a³ + k3·a⁵ + k4·a⁷ + k5·a⁹`
    Kannala([Real; 5]),
    /// `rp = a + k1·a³ + k2·a⁵ + k3·a⁷ + k4·a⁹` (implicit unit first term)
    OpencvFisheye([Real; 4]),
}

impl FisheyeModel {
    /// Evaluate the forward polynomial at incidence angle `a`.
    pub fn forward(&self, a: Real) -> Real {
        match self {
            FisheyeModel::RadialPoly(k) => {
                let a2 = a * a;
                k[0] * a + k[1] * a2 + k[2] * a2 * a + k[3] * a2 * a2
            }
            FisheyeModel::Kannala(k) => {
                let a2 = a * a;
                a * (k[0] + a2 * (k[1] + a2 * (k[2] + a2 * (k[3] + a2 * k[4]))))
            }
            FisheyeModel::OpencvFisheye(k) => {
                let a2 = a * a;
                a * (1.0 + a2 * (k[0] + a2 * (k[1] + a2 * (k[2] + a2 * k[3]))))
            }
        }
    }

    /// `d rp / d a` at `a = 0`; relates the fisheye to an equivalent
    /// pinhole focal length near the optical axis.
    fn slope_at_zero(&self) -> Real {
        match self {
            FisheyeModel::RadialPoly(k) => k[0],
            FisheyeModel::Kannala(k) => k[0],
            FisheyeModel::OpencvFisheye(_) => 1.0,
        }
    }
}

/// Knobs for the construction-time inverse fit.
#[derive(Clone, Copy, Debug)]
pub struct FisheyeFitOptions {
    /// Number of uniform angle samples over `[0, π/2]`.
    pub samples: usize,
    /// Mean residual (degrees) above which a warning is logged.
    pub warn_threshold_deg: Real,
}

impl Default for FisheyeFitOptions {
    fn default() -> Self {
        Self {
            samples: 100,
            warn_threshold_deg: 0.1,
        }
    }
}

/// 9-term inverse polynomial `a ≈ f(rp)`, fitted in a normalized radius
/// variable to keep the least-squares system well conditioned.
#[derive(Clone, Debug)]
pub struct InversePolynomial {
    coeffs: [Real; 9],
    scale: Real,
    rp_max: Real,
    /// Mean fit residual in degrees.
    pub residual_deg: Real,
}

impl InversePolynomial {
    fn fit(
        model: &FisheyeModel,
        opts: &FisheyeFitOptions,
        stream: &str,
    ) -> Result<Self, CameraError> {
        let n = opts.samples.max(9);
        let rp_max = model.forward(FRAC_PI_2);
        if !(rp_max > 0.0) || !rp_max.is_finite() {
            return Err(CameraError::InverseFitFailed {
                stream: stream.to_string(),
                reason: format!("lens polynomial is non-positive at pi/2 (rp_max = {rp_max})"),
            });
        }
        let scale = 1.0 / rp_max;

        let mut a_mat = DMatrix::<Real>::zeros(n, 9);
        let mut b = DVector::<Real>::zeros(n);
        let mut angles = Vec::with_capacity(n);
        let mut radii = Vec::with_capacity(n);
        for i in 0..n {
            let a = FRAC_PI_2 * i as Real / (n - 1) as Real;
            let s = model.forward(a) * scale;
            let mut pow = 1.0;
            for j in 0..9 {
                a_mat[(i, j)] = pow;
                pow *= s;
            }
            b[i] = a;
            angles.push(a);
            radii.push(s / scale);
        }

        let svd = a_mat.svd(true, true);
        let x = svd
            .solve(&b, 1e-14)
            .map_err(|e| CameraError::InverseFitFailed {
                stream: stream.to_string(),
                reason: e.to_string(),
            })?;
        let mut coeffs = [0.0; 9];
        for j in 0..9 {
            coeffs[j] = x[j];
        }

        let fitted = Self {
            coeffs,
            scale,
            rp_max,
            residual_deg: 0.0,
        };
        let residual_deg = angles
            .iter()
            .zip(&radii)
            .map(|(a, rp)| (a - fitted.eval(*rp)).abs())
            .sum::<Real>()
            / n as Real
            * 180.0
            / std::f64::consts::PI;

        if residual_deg > opts.warn_threshold_deg {
            warn!(
                "fisheye inverse polynomial for '{stream}' has mean residual {residual_deg:.4} deg \
                 (threshold {:.4} deg); reprojection accuracy is reduced",
                opts.warn_threshold_deg
            );
        }
        Ok(Self {
            residual_deg,
            ..fitted
        })
    }

    /// Incidence angle for image radius `rp`.
    pub fn eval(&self, rp: Real) -> Real {
        let s = rp * self.scale;
        let mut acc = 0.0;
        for c in self.coeffs.iter().rev() {
            acc = acc * s + c;
        }
        acc
    }

    /// Largest image radius the forward polynomial reaches at π/2.
    pub fn rp_max(&self) -> Real {
        self.rp_max
    }
}

/// Fisheye camera model.
#[derive(Clone, Debug)]
pub struct FisheyeCamera {
    name: String,
    width: u32,
    height: u32,
    cx: Real,
    cy: Real,
    fx: Real,
    fy: Real,
    model: FisheyeModel,
    inverse: InversePolynomial,
    k_und: Mat3,
    k_und_inv: Mat3,
    remap: OnceLock<RemapTable>,
}

impl FisheyeCamera {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        width: u32,
        height: u32,
        cx: Real,
        cy: Real,
        fx: Real,
        fy: Real,
        model: FisheyeModel,
        fit_opts: FisheyeFitOptions,
    ) -> Result<Self, CameraError> {
        let name = name.into();
        if fx == 0.0 || fy == 0.0 {
            return Err(CameraError::InvalidIntrinsics {
                stream: name,
                reason: "focal lengths must be non-zero".into(),
            });
        }
        let inverse = InversePolynomial::fit(&model, &fit_opts, &name)?;

        // Equivalent linear calibration of the undistorted domain: the lens
        // behaves like a pinhole of focal `f·slope(0)` near the axis.
        let s0 = model.slope_at_zero();
        if s0 <= 0.0 {
            return Err(CameraError::InvalidIntrinsics {
                stream: name,
                reason: format!("lens polynomial slope at zero must be positive, got {s0}"),
            });
        }
        let k_und = Mat3::new(fx * s0, 0.0, cx, 0.0, fy * s0, cy, 0.0, 0.0, 1.0);
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
            cx,
            cy,
            fx,
            fy,
            model,
            inverse,
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
    pub fn model(&self) -> &FisheyeModel {
        &self.model
    }
    pub fn inverse_polynomial(&self) -> &InversePolynomial {
        &self.inverse
    }
    pub fn undistorted_k(&self) -> &Mat3 {
        &self.k_und
    }

    /// Distorted lens-plane coordinates `(dx, dy)` for a camera-frame
    /// direction, or `None` when the incidence angle leaves the hemisphere.
    fn distort_dir(&self, x: Real, y: Real, z: Real) -> Option<Vec2> {
        let r = (x * x + y * y).sqrt();
        let a = r.atan2(z);
        if a >= FRAC_PI_2 {
            return None;
        }
        if r < 1e-9 {
            return Some(Vec2::new(0.0, 0.0));
        }
        let rp = self.model.forward(a);
        Some(Vec2::new(x * rp / r, y * rp / r))
    }

    pub fn distort_rays(&self, rays: &Rays3d) -> Rays3d {
        let mut out = Rays3d::from_element(rays.ncols(), Real::NAN);
        for i in 0..rays.ncols() {
            if let Some(d) = self.distort_dir(rays[(0, i)], rays[(1, i)], rays[(2, i)]) {
                out.set_column(i, &Vec3::new(d.x, d.y, 1.0));
            }
        }
        out
    }

    pub fn project_points(&self, points: &Points3d, remove_outside: bool) -> (Points2d, Vec<bool>) {
        let n = points.ncols();
        let mut pixels = Points2d::from_element(n, Real::NAN);
        let mut valid = vec![false; n];
        for i in 0..n {
            let d = match self.distort_dir(points[(0, i)], points[(1, i)], points[(2, i)]) {
                Some(d) => d,
                None => continue,
            };
            let u = self.cx + self.fx * d.x;
            let v = self.cy + self.fy * d.y;
            if remove_outside && !inside_image(u, v, self.width, self.height) {
                continue;
            }
            pixels.set_column(i, &Vec3::new(u, v, 1.0));
            valid[i] = true;
        }
        (pixels, valid)
    }

    /// Projection through the equivalent linear calibration (undistorted
    /// domain).
    pub fn project_points_linear(
        &self,
        points: &Points3d,
        remove_outside: bool,
    ) -> (Points2d, Vec<bool>) {
        let n = points.ncols();
        let mut pixels = Points2d::from_element(n, Real::NAN);
        let mut valid = vec![false; n];
        for i in 0..n {
            let z = points[(2, i)];
            if !(z > BEHIND_CAMERA_EPS) {
                continue;
            }
            let p = self.k_und * Vec3::new(points[(0, i)] / z, points[(1, i)] / z, 1.0);
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
            let dx = (pixels[(0, i)] / w - self.cx) / self.fx;
            let dy = (pixels[(1, i)] / w - self.cy) / self.fy;
            let rp = (dx * dx + dy * dy).sqrt();
            if rp < 1e-12 {
                rays.set_column(i, &Vec3::new(0.0, 0.0, 1.0));
                valid[i] = true;
                continue;
            }
            if rp > self.inverse.rp_max() {
                continue; // outside the calibrated lens domain
            }
            let a = self.inverse.eval(rp);
            if !(0.0..FRAC_PI_2).contains(&a) {
                continue;
            }
            let t = a.tan();
            rays.set_column(i, &Vec3::new(t * dx / rp, t * dy / rp, 1.0));
            valid[i] = true;
        }
        (rays, valid)
    }

    /// Dense remap from the undistorted domain into the fisheye image,
    /// built by brute force over the full output grid on first use.
    pub fn undistortion_map(&self) -> &RemapTable {
        self.remap.get_or_init(|| {
            build_remap(self.width, self.height, &self.k_und_inv, |nrm| {
                match self.distort_dir(nrm.x, nrm.y, 1.0) {
                    Some(d) => (self.cx + self.fx * d.x, self.cy + self.fy * d.y),
                    None => (Real::NAN, Real::NAN),
                }
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ideal_equidistant() -> FisheyeCamera {
        FisheyeCamera::new(
            "CAM_FRONT",
            1280,
            800,
            640.0,
            400.0,
            300.0,
            300.0,
            FisheyeModel::Kannala([1.0, 0.0, 0.0, 0.0, 0.0]),
            FisheyeFitOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn linear_lens_inverse_fit_is_exact() {
        let cam = ideal_equidistant();
        assert!(cam.inverse_polynomial().residual_deg < 1e-9);
        // a = rp for the unit equidistant lens.
        let a = cam.inverse_polynomial().eval(0.7);
        assert!((a - 0.7).abs() < 1e-9);
    }

    #[test]
    fn forward_polynomials_match_formulas() {
        let a: Real = 0.4;
        let rp = FisheyeModel::RadialPoly([2.0, 0.5, -0.1, 0.02]).forward(a);
        let expect = 2.0 * a + 0.5 * a * a - 0.1 * a.powi(3) + 0.02 * a.powi(4);
        assert!((rp - expect).abs() < 1e-12);

        let rp = FisheyeModel::Kannala([1.0, 0.1, 0.01, 0.0, 0.0]).forward(a);
        let expect = a + 0.1 * a.powi(3) + 0.01 * a.powi(5);
        assert!((rp - expect).abs() < 1e-12);

        let rp = FisheyeModel::OpencvFisheye([0.1, 0.01, 0.0, 0.0]).forward(a);
        let expect = a + 0.1 * a.powi(3) + 0.01 * a.powi(5);
        assert!((rp - expect).abs() < 1e-12);
    }

    #[test]
    fn project_reproject_recovers_direction() {
        let cam = FisheyeCamera::new(
            "fish",
            1280,
            800,
            640.0,
            400.0,
            320.0,
            320.0,
            FisheyeModel::OpencvFisheye([0.05, 0.0, 0.0, 0.0]),
            FisheyeFitOptions::default(),
        )
        .unwrap();
        assert!(cam.inverse_polynomial().residual_deg < 0.1);

        let points = crate::math::points3d_from_coords(&[(1.0, 0.5, 2.0), (-0.4, 0.3, 1.5)]);
        let (pixels, valid) = cam.project_points(&points, false);
        assert!(valid.iter().all(|v| *v));

        let (rays, rvalid) = cam.reproject_pixels(&pixels);
        assert!(rvalid.iter().all(|v| *v));
        for i in 0..points.ncols() {
            // Same direction scaled to z = 1.
            let gx = points[(0, i)] / points[(2, i)];
            let gy = points[(1, i)] / points[(2, i)];
            assert!((rays[(0, i)] - gx).abs() < 1e-3, "x dir");
            assert!((rays[(1, i)] - gy).abs() < 1e-3, "y dir");
            assert!((rays[(2, i)] - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn behind_camera_and_axis_cases() {
        let cam = ideal_equidistant();
        let points = crate::math::points3d_from_coords(&[
            (0.0, 0.0, 3.0),  // on axis
            (0.0, 0.0, -1.0), // behind
            (2.0, 0.0, 0.0),  // exactly sideways: a = pi/2
        ]);
        let (pixels, valid) = cam.project_points(&points, false);
        assert!(valid[0]);
        assert!((pixels[(0, 0)] - 640.0).abs() < 1e-9);
        assert!((pixels[(1, 0)] - 400.0).abs() < 1e-9);
        assert!(!valid[1]);
        assert!(!valid[2]);
        assert!(pixels[(0, 2)].is_nan());
    }

    #[test]
    fn pixels_outside_lens_domain_are_invalid() {
        let cam = ideal_equidistant();
        // rp_max = pi/2 in lens units, i.e. ~471 px from center; a corner
        // pixel at ~755 px radial distance lies outside the lens image.
        let pixels = Points2d::from_columns(&[Vec3::new(0.0, 0.0, 1.0)]);
        let (_, valid) = cam.reproject_pixels(&pixels);
        assert!(!valid[0]);
    }

    #[test]
    fn remap_center_is_identity() {
        let cam = ideal_equidistant();
        let map = cam.undistortion_map();
        let (sx, sy) = map.at(640, 400);
        assert!((sx as Real - 640.0).abs() < 1e-3);
        assert!((sy as Real - 400.0).abs() < 1e-3);
    }
}

//! Horizon line: the projection of the `z = 0` plane's line at infinity.
//!
//! Works in the undistorted image domain (in the distorted domain the
//! horizon is a curve, not a line), so it is only defined for cameras with
//! a linear undistorted calibration matrix.

use scl_core::{FrameNum, Points3d, Pt2, Real, Vec3};

use crate::scene::{Scene, SceneError};

/// Number of in-plane directions sampled at infinity.
const HORIZON_STEPS: usize = 60;

/// Horizon line in the undistorted image domain.
#[derive(Clone, Debug)]
pub struct HorizonLine {
    /// Normalized general-form line `(a, b, c)` with `a·u + b·v + c = 0`,
    /// or `None` when fewer than two infinite points project into the
    /// camera (e.g. a camera pointing at the sky).
    pub line: Option<Vec3>,
    /// Intersections of the line with the image rectangle; empty when the
    /// horizon does not cross the visible image.
    pub endpoints: Vec<Pt2>,
}

impl<'a> Scene<'a> {
    /// Compute the horizon of the `z = 0` plane of `cs` as seen by
    /// `camera_name`, in undistorted image coordinates.
    ///
    /// Infinite in-plane points (direction vectors with `w = 0`) are
    /// transformed into the camera and projected through the undistorted
    /// calibration matrix; the line through them is clipped against the
    /// image rectangle.
    pub fn horizon_line(
        &self,
        camera_name: &str,
        cs: &str,
        frame: Option<FrameNum>,
    ) -> Result<HorizonLine, SceneError> {
        let cam = self.get_camera(camera_name, frame)?;
        if cam.undistorted_k().is_none() {
            return Err(SceneError::UnsupportedOperation(format!(
                "horizon line needs a linear undistorted calibration; '{camera_name}' has none"
            )));
        }

        // Directions in the z = 0 plane, all around the compass, as
        // homogeneous points at infinity (w = 0: translation drops out).
        let mut dirs = Points3d::zeros(HORIZON_STEPS);
        for s in 0..HORIZON_STEPS {
            let angle = 2.0 * std::f64::consts::PI * s as Real / HORIZON_STEPS as Real;
            dirs[(0, s)] = angle.cos();
            dirs[(1, s)] = angle.sin();
        }
        let dirs_cam = self.transform_points(&dirs, cs, camera_name, frame)?;

        let (pixels, valid) = cam
            .project_points_linear(&dirs_cam, false)
            .expect("checked undistorted calibration above");
        let projected: Vec<Vec3> = (0..pixels.ncols())
            .filter(|i| valid[*i])
            .map(|i| Vec3::new(pixels[(0, i)], pixels[(1, i)], pixels[(2, i)]))
            .collect();
        if projected.len() < 2 {
            return Ok(HorizonLine {
                line: None,
                endpoints: Vec::new(),
            });
        }

        // All projected infinite points are collinear; two define the line.
        let line = projected[0].cross(&projected[projected.len() - 1]);
        let line = line / line.norm();

        let width = cam.width() as Real;
        let height = cam.height() as Real;
        let endpoints = clip_line_to_image(&line, width, height);
        Ok(HorizonLine {
            line: Some(line),
            endpoints,
        })
    }
}

/// Intersections of `a·u + b·v + c = 0` with the `[0,w) x [0,h)` rectangle.
fn clip_line_to_image(line: &Vec3, width: Real, height: Real) -> Vec<Pt2> {
    let (a, b, c) = (line.x, line.y, line.z);
    let mut points = Vec::new();

    if a.abs() < 1e-8 {
        // Horizontal line v = -c/b.
        let v = -c / b;
        if (0.0..height).contains(&v) {
            points.push(Pt2::new(0.0, v));
            points.push(Pt2::new(width, v));
        }
    } else if b.abs() < 1e-8 {
        // Vertical line u = -c/a.
        let u = -c / a;
        if (0.0..width).contains(&u) {
            points.push(Pt2::new(u, 0.0));
            points.push(Pt2::new(u, height));
        }
    } else {
        let p1 = Pt2::new(0.0, -c / b);
        if (0.0..height).contains(&p1.y) {
            points.push(p1);
        }
        let p2 = Pt2::new(width, -(c + a * width) / b);
        if (0.0..height).contains(&p2.y) {
            points.push(p2);
        }
        let p3 = Pt2::new(-c / a, 0.0);
        if (0.0..width).contains(&p3.x) {
            points.push(p3);
        }
        let p4 = Pt2::new(-(c + b * height) / a, height);
        if (0.0..width).contains(&p4.x) {
            points.push(p4);
        }
    }
    points
}

//! The scene facade.
//!
//! [`Scene`] borrows a read-only [`SceneDescription`] and owns the camera
//! cache. All geometry operations resolve their transform chain per call;
//! hard errors (unknown system, malformed transform, disconnected graph)
//! abort the single call and leave the graph and cache intact, while
//! per-element validity travels in the returned masks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use thiserror::Error;

use scl_core::{
    cuboid, Camera, CameraError, CuboidError, FrameNum, Mat4, Points2d, Points3d, Real,
    TransformError, Vec4,
};

use crate::description::SceneDescription;
use crate::resolver;

/// Errors raised by scene-level operations.
#[derive(Debug, Error)]
pub enum SceneError {
    /// An operation referenced a coordinate system that was never declared.
    #[error("unknown coordinate system '{0}'")]
    UnknownCoordinateSystem(String),
    /// The two systems are not connected in the graph.
    #[error("no transform path from '{src}' to '{dst}'")]
    NoPathFound { src: String, dst: String },
    /// An operation referenced a stream that was never declared.
    #[error("unknown stream '{0}'")]
    UnknownStream(String),
    /// The stream declares no intrinsics block.
    #[error("stream '{0}' declares no intrinsics")]
    MissingIntrinsics(String),
    /// The requested operation is not defined for this camera model.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error(transparent)]
    Camera(#[from] CameraError),
    #[error(transparent)]
    Cuboid(#[from] CuboidError),
}

type CameraKey = (String, Option<FrameNum>);

/// Facade binding the coordinate-system graph, the transform resolver and
/// the camera models.
pub struct Scene<'a> {
    desc: &'a SceneDescription,
    cameras: Mutex<HashMap<CameraKey, Arc<Camera>>>,
}

impl<'a> Scene<'a> {
    pub fn new(desc: &'a SceneDescription) -> Self {
        Self {
            desc,
            cameras: Mutex::new(HashMap::new()),
        }
    }

    pub fn description(&self) -> &SceneDescription {
        self.desc
    }

    /// Camera for `name`, built lazily and memoized.
    ///
    /// Static intrinsics are built once under the `None` slot; a frame with
    /// its own intrinsics override gets its own rebuild, while frames
    /// without one share the static camera.
    pub fn get_camera(&self, name: &str, frame: Option<FrameNum>) -> Result<Arc<Camera>, SceneError> {
        let key: CameraKey = (name.to_string(), frame);
        let mut cache = self.cameras.lock().expect("camera cache poisoned");
        if let Some(cam) = cache.get(&key) {
            return Ok(cam.clone());
        }

        // Frame-specific intrinsics, else fall back to the static block.
        let frame_intrinsics =
            frame.and_then(|f| self.desc.frame(f).and_then(|p| p.streams.get(name)));
        let intrinsics = match frame_intrinsics {
            Some(intr) => intr,
            None => {
                let stream = self
                    .desc
                    .stream(name)
                    .ok_or_else(|| SceneError::UnknownStream(name.to_string()))?;
                let intr = stream
                    .intrinsics
                    .as_ref()
                    .ok_or_else(|| SceneError::MissingIntrinsics(name.to_string()))?;
                // A frame without an override shares the static camera.
                if frame.is_some() {
                    if let Some(cam) = cache.get(&(name.to_string(), None)) {
                        let cam = cam.clone();
                        cache.insert(key, cam.clone());
                        return Ok(cam);
                    }
                }
                intr
            }
        };

        let cam = Arc::new(intrinsics.build_camera(name)?);
        if frame.is_some() && frame_intrinsics.is_none() {
            cache.insert((name.to_string(), None), cam.clone());
        }
        cache.insert(key, cam.clone());
        Ok(cam)
    }

    /// Resolve the 4x4 transform from `cs_src` into `cs_dst` and whether
    /// the chain is static. Not memoized across calls.
    pub fn get_transform(
        &self,
        cs_src: &str,
        cs_dst: &str,
        frame: Option<FrameNum>,
    ) -> Result<(Mat4, bool), SceneError> {
        resolver::resolve_transform(self.desc, cs_src, cs_dst, frame)
    }

    /// Transform a `4xN` homogeneous point batch between systems.
    pub fn transform_points(
        &self,
        points: &Points3d,
        cs_src: &str,
        cs_dst: &str,
        frame: Option<FrameNum>,
    ) -> Result<Points3d, SceneError> {
        let (t, _) = self.get_transform(cs_src, cs_dst, frame)?;
        Ok(&t * points)
    }

    /// Transform plane coefficients `(a, b, c, d)` between systems.
    pub fn transform_plane(
        &self,
        plane: &Vec4,
        cs_src: &str,
        cs_dst: &str,
        frame: Option<FrameNum>,
    ) -> Result<Vec4, SceneError> {
        let (t, _) = self.get_transform(cs_src, cs_dst, frame)?;
        Ok(scl_core::transform_plane_matrix(&t) * plane)
    }

    /// Transform a 9-value cuboid between systems; sizes are invariant.
    pub fn transform_cuboid(
        &self,
        cuboid_vals: &[Real],
        cs_src: &str,
        cs_dst: &str,
        frame: Option<FrameNum>,
    ) -> Result<[Real; 9], SceneError> {
        let (t, _) = self.get_transform(cs_src, cs_dst, frame)?;
        Ok(cuboid::transform_cuboid(cuboid_vals, &t)?)
    }

    /// Project 3D points declared in `cs_src` into the camera `camera_name`.
    pub fn project_points(
        &self,
        points: &Points3d,
        cs_src: &str,
        camera_name: &str,
        frame: Option<FrameNum>,
        remove_outside: bool,
    ) -> Result<(Points2d, Vec<bool>), SceneError> {
        let points_cam = self.transform_points(points, cs_src, camera_name, frame)?;
        let cam = self.get_camera(camera_name, frame)?;
        Ok(cam.project_points(&points_cam, remove_outside))
    }

    /// Reproject image points onto a plane declared in `cs_dst`.
    ///
    /// The plane converts into the camera frame, rays through the pixels
    /// intersect it there, and the finite intersections convert into
    /// `cs_dst`. Mask entries are false for pixels outside the camera's
    /// inverse domain and for rays parallel to the plane.
    pub fn reproject_points_into_plane(
        &self,
        points2d: &Points2d,
        plane: &Vec4,
        camera_name: &str,
        cs_dst: &str,
        frame: Option<FrameNum>,
    ) -> Result<(Points3d, Vec<bool>), SceneError> {
        let cam = self.get_camera(camera_name, frame)?;
        let plane_cam = self.transform_plane(plane, cs_dst, camera_name, frame)?;
        let (points_cam, valid) = cam.reproject_pixels_to_plane(points2d, &plane_cam);

        let (t, _) = self.get_transform(camera_name, cs_dst, frame)?;
        let mut out = Points3d::from_element(points_cam.ncols(), Real::NAN);
        for i in 0..points_cam.ncols() {
            if valid[i] {
                out.set_column(i, &(t * points_cam.column(i)));
            }
        }
        Ok((out, valid))
    }
}

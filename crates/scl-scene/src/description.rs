//! Read-only scene declarations consumed by the [`crate::Scene`] facade.
//!
//! The description mirrors the declaration side of the annotation document:
//! coordinate systems, camera streams with their intrinsics, and per-frame
//! properties (transform overrides and intrinsics overrides). It is built
//! once through the declaration API (or deserialized) and only read
//! afterwards.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use scl_core::{FrameNum, StreamIntrinsics, TransformData};

use crate::graph::{CsGraph, CsType};

/// A declared sensor stream.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StreamDescription {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub uri: String,
    /// Static intrinsics; exactly one block per stream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intrinsics: Option<StreamIntrinsics>,
}

/// One per-frame transform override for the edge `src -> dst`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FrameTransform {
    pub src: String,
    pub dst: String,
    pub data: TransformData,
    /// Free-form payload (raw odometry readings, status strings, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl FrameTransform {
    pub fn new(src: impl Into<String>, dst: impl Into<String>, data: TransformData) -> Self {
        Self {
            src: src.into(),
            dst: dst.into(),
            data,
            metadata: BTreeMap::new(),
        }
    }

    /// Key under which this override is stored for its frame.
    pub fn key(&self) -> String {
        format!("{}_to_{}", self.src, self.dst)
    }
}

/// Properties attached to a single frame.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FrameProperties {
    /// Transform overrides keyed `"{src}_to_{dst}"`.
    #[serde(default)]
    pub transforms: BTreeMap<String, FrameTransform>,
    /// Per-frame intrinsics overrides keyed by stream name.
    #[serde(default)]
    pub streams: BTreeMap<String, StreamIntrinsics>,
}

/// The complete declaration set a scene operates on.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SceneDescription {
    #[serde(default)]
    coordinate_systems: CsGraph,
    #[serde(default)]
    streams: BTreeMap<String, StreamDescription>,
    #[serde(default)]
    frames: BTreeMap<FrameNum, FrameProperties>,
}

impl SceneDescription {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a coordinate system; see [`CsGraph::declare`].
    pub fn declare_coordinate_system(
        &mut self,
        name: impl Into<String>,
        cs_type: CsType,
        parent: impl Into<String>,
        pose_wrt_parent: Option<TransformData>,
    ) {
        self.coordinate_systems
            .declare(name, cs_type, parent, pose_wrt_parent);
    }

    /// Declare a camera stream with optional static intrinsics.
    pub fn add_stream(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        uri: impl Into<String>,
        intrinsics: Option<StreamIntrinsics>,
    ) {
        self.streams.insert(
            name.into(),
            StreamDescription {
                description: description.into(),
                uri: uri.into(),
                intrinsics,
            },
        );
    }

    /// Attach a transform override to a frame.
    pub fn add_frame_transform(&mut self, frame: FrameNum, transform: FrameTransform) {
        self.frames
            .entry(frame)
            .or_default()
            .transforms
            .insert(transform.key(), transform);
    }

    /// Override a stream's intrinsics for one frame.
    pub fn set_frame_stream_intrinsics(
        &mut self,
        frame: FrameNum,
        stream: impl Into<String>,
        intrinsics: StreamIntrinsics,
    ) {
        self.frames
            .entry(frame)
            .or_default()
            .streams
            .insert(stream.into(), intrinsics);
    }

    pub fn coordinate_systems(&self) -> &CsGraph {
        &self.coordinate_systems
    }

    pub fn stream(&self, name: &str) -> Option<&StreamDescription> {
        self.streams.get(name)
    }

    pub fn frame(&self, frame: FrameNum) -> Option<&FrameProperties> {
        self.frames.get(&frame)
    }

    /// Transform override for `src -> dst` at `frame`, if declared.
    pub fn frame_transform(
        &self,
        frame: FrameNum,
        src: &str,
        dst: &str,
    ) -> Option<&FrameTransform> {
        self.frames
            .get(&frame)?
            .transforms
            .get(&format!("{src}_to_{dst}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_transform_key_shape() {
        let ft = FrameTransform::new(
            "vehicle-iso8855",
            "world",
            TransformData::Matrix {
                matrix4x4: vec![0.0; 16],
            },
        );
        assert_eq!(ft.key(), "vehicle-iso8855_to_world");
    }

    #[test]
    fn frame_lookup_both_ways() {
        let mut desc = SceneDescription::new();
        desc.add_frame_transform(
            3,
            FrameTransform::new(
                "a",
                "b",
                TransformData::EulerAndTranslation {
                    euler_angles: vec![0.0, 0.0, 0.0],
                    translation: vec![1.0, 0.0, 0.0],
                    sequence: Default::default(),
                },
            ),
        );
        assert!(desc.frame_transform(3, "a", "b").is_some());
        assert!(desc.frame_transform(3, "b", "a").is_none());
        assert!(desc.frame_transform(4, "a", "b").is_none());
    }

    #[test]
    fn description_roundtrips_through_json() {
        let mut desc = SceneDescription::new();
        desc.declare_coordinate_system("world", CsType::SceneCs, "", None);
        desc.add_stream("cam", "front camera", "", None);
        let json = serde_json::to_string(&desc).unwrap();
        let back: SceneDescription = serde_json::from_str(&json).unwrap();
        assert!(back.coordinate_systems().has("world"));
        assert!(back.stream("cam").is_some());
    }
}

//! Scene layer for `scl-rs`.
//!
//! Binds the coordinate-system graph, the transform resolver and the camera
//! models into a [`Scene`] facade over a read-only [`SceneDescription`]:
//!
//! - declare coordinate systems (a parent/child tree with static poses and
//!   per-frame transform overrides) and camera streams,
//! - resolve the 4x4 transform between any two declared systems at any
//!   frame,
//! - transform points, planes and cuboids across systems,
//! - project 3D points into any declared camera and reproject image points
//!   onto a plane.
//!
//! The description is owned by the caller (typically the enclosing
//! annotation document); the facade only borrows it and owns the camera
//! cache.

/// Scene declarations: coordinate systems, streams, per-frame properties.
pub mod description;
/// The coordinate-system tree.
pub mod graph;
/// Horizon-line computation.
pub mod horizon;
/// Shortest-path transform resolution.
pub mod resolver;
/// The scene facade and its geometry operations.
pub mod scene;

pub use description::{FrameProperties, FrameTransform, SceneDescription, StreamDescription};
pub use graph::{CoordinateSystem, CsGraph, CsType};
pub use horizon::HorizonLine;
pub use scene::{Scene, SceneError};

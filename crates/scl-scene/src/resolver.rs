//! Transform resolution across the coordinate-system tree.
//!
//! The resolver rebuilds the undirected edge set and runs Dijkstra on every
//! call. That is a known inefficiency kept on purpose: resolution happens
//! per request and callers needing throughput should cache per
//! `(src, dst, frame)` themselves. Per-frame override lookup must stay per
//! call either way.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use log::debug;

use scl_core::{inverse_pose, FrameNum, Mat4};

use crate::description::SceneDescription;
use crate::graph::CsGraph;
use crate::scene::SceneError;

/// Shortest path between two declared systems over parent/child edges,
/// both directions, unit cost. `None` when disconnected.
pub(crate) fn shortest_path(graph: &CsGraph, src: &str, dst: &str) -> Option<Vec<String>> {
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    for cs in graph.iter() {
        if cs.parent.is_empty() || !graph.has(&cs.parent) {
            continue;
        }
        adjacency.entry(cs.parent.as_str()).or_default().push(&cs.name);
        adjacency.entry(cs.name.as_str()).or_default().push(&cs.parent);
    }

    let mut dist: HashMap<&str, u32> = HashMap::new();
    let mut prev: HashMap<&str, &str> = HashMap::new();
    let mut heap = BinaryHeap::new();
    dist.insert(src, 0);
    heap.push(Reverse((0u32, src)));

    while let Some(Reverse((d, node))) = heap.pop() {
        if node == dst {
            break;
        }
        if d > dist.get(node).copied().unwrap_or(u32::MAX) {
            continue;
        }
        for next in adjacency.get(node).into_iter().flatten().copied() {
            let nd = d + 1;
            if nd < dist.get(next).copied().unwrap_or(u32::MAX) {
                dist.insert(next, nd);
                prev.insert(next, node);
                heap.push(Reverse((nd, next)));
            }
        }
    }

    if !dist.contains_key(dst) {
        return None;
    }
    let mut path = vec![dst.to_string()];
    let mut cursor = dst;
    while cursor != src {
        cursor = prev.get(cursor).copied()?;
        path.push(cursor.to_string());
    }
    path.reverse();
    Some(path)
}

/// Resolve the 4x4 transform converting coordinates from `cs_src` into
/// `cs_dst`, honoring per-frame overrides when `frame` is given.
///
/// Returns the matrix and whether every step of the chain was static.
pub(crate) fn resolve_transform(
    desc: &SceneDescription,
    cs_src: &str,
    cs_dst: &str,
    frame: Option<FrameNum>,
) -> Result<(Mat4, bool), SceneError> {
    let graph = desc.coordinate_systems();
    for name in [cs_src, cs_dst] {
        if !graph.has(name) {
            return Err(SceneError::UnknownCoordinateSystem(name.to_string()));
        }
    }
    if cs_src == cs_dst {
        return Ok((Mat4::identity(), true));
    }

    let chain = shortest_path(graph, cs_src, cs_dst).ok_or_else(|| SceneError::NoPathFound {
        src: cs_src.to_string(),
        dst: cs_dst.to_string(),
    })?;
    debug!("transform chain {cs_src} -> {cs_dst}: {chain:?}");

    let mut total = Mat4::identity();
    let mut is_static = true;
    for step in chain.windows(2) {
        let (cs_1, cs_2) = (step[0].as_str(), step[1].as_str());

        // Frame-specific overrides win over the static pose; one dynamic
        // step makes the whole chain non-static.
        let mut step_t = None;
        if let Some(f) = frame {
            if let Some(ft) = desc.frame_transform(f, cs_1, cs_2) {
                step_t = Some(ft.data.matrix()?);
                is_static = false;
            } else if let Some(ft) = desc.frame_transform(f, cs_2, cs_1) {
                step_t = Some(inverse_pose(&ft.data.matrix()?));
                is_static = false;
            }
        }
        let step_t = match step_t {
            Some(m) => m,
            None => static_edge_transform(graph, cs_1, cs_2)?,
        };

        // Accumulate by left-multiplication: each step converts from its
        // own source into its own destination.
        total = step_t * total;
    }
    Ok((total, is_static))
}

/// Static transform across one tree edge, from `cs_1` into `cs_2`.
///
/// A child's `pose_wrt_parent` doubles as the transform from the child
/// into the parent (pose/transform duality of the alias convention); an
/// edge with no declared pose is the identity.
fn static_edge_transform(graph: &CsGraph, cs_1: &str, cs_2: &str) -> Result<Mat4, SceneError> {
    let c1 = graph
        .get(cs_1)
        .ok_or_else(|| SceneError::UnknownCoordinateSystem(cs_1.to_string()))?;
    let c2 = graph
        .get(cs_2)
        .ok_or_else(|| SceneError::UnknownCoordinateSystem(cs_2.to_string()))?;

    if c1.parent == cs_2 {
        Ok(match &c1.pose_wrt_parent {
            Some(data) => data.matrix()?,
            None => Mat4::identity(),
        })
    } else if c2.parent == cs_1 {
        Ok(match &c2.pose_wrt_parent {
            Some(data) => inverse_pose(&data.matrix()?),
            None => Mat4::identity(),
        })
    } else {
        // Paths only walk declared parent/child edges.
        Err(SceneError::NoPathFound {
            src: cs_1.to_string(),
            dst: cs_2.to_string(),
        })
    }
}

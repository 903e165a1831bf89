//! The coordinate-system tree.
//!
//! Coordinate systems declare their parent at creation time, so the graph
//! grows in dependency order and stays a tree (roots have an empty parent
//! name). Declarations are append-only; per-frame transform overrides live
//! with the frame properties and never alter the static tree.

use std::collections::BTreeMap;

use log::warn;
use serde::{Deserialize, Serialize};

use scl_core::TransformData;

/// Kind of a declared coordinate system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CsType {
    SensorCs,
    LocalCs,
    SceneCs,
    GeoUtm,
    GeoWgs84,
    Custom,
}

/// One declared coordinate system.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CoordinateSystem {
    pub name: String,
    #[serde(rename = "type")]
    pub cs_type: CsType,
    /// Parent name; empty for roots.
    #[serde(default)]
    pub parent: String,
    #[serde(default)]
    pub children: Vec<String>,
    /// Static pose of this system expressed in the parent's frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pose_wrt_parent: Option<TransformData>,
}

/// The set of declared coordinate systems, keyed by name.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CsGraph {
    systems: BTreeMap<String, CoordinateSystem>,
}

impl CsGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a coordinate system.
    ///
    /// A non-empty parent that was never declared is tolerated with a
    /// warning; the resolver will simply find no path across that edge.
    pub fn declare(
        &mut self,
        name: impl Into<String>,
        cs_type: CsType,
        parent: impl Into<String>,
        pose_wrt_parent: Option<TransformData>,
    ) {
        let name = name.into();
        let parent = parent.into();
        if self.systems.contains_key(&name) {
            warn!("coordinate system '{name}' is already declared; replacing it");
        }
        if !parent.is_empty() {
            match self.systems.get_mut(&parent) {
                Some(p) => {
                    if !p.children.contains(&name) {
                        p.children.push(name.clone());
                    }
                }
                None => {
                    warn!("coordinate system '{name}' declares unknown parent '{parent}'");
                }
            }
        }
        self.systems.insert(
            name.clone(),
            CoordinateSystem {
                name,
                cs_type,
                parent,
                children: Vec::new(),
                pose_wrt_parent,
            },
        );
    }

    pub fn has(&self, name: &str) -> bool {
        self.systems.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&CoordinateSystem> {
        self.systems.get(name)
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CoordinateSystem> {
        self.systems.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declaring_children_updates_parent() {
        let mut graph = CsGraph::new();
        graph.declare("world", CsType::SceneCs, "", None);
        graph.declare("vehicle-iso8855", CsType::LocalCs, "world", None);
        graph.declare("cam", CsType::SensorCs, "vehicle-iso8855", None);

        assert!(graph.has("cam"));
        assert_eq!(
            graph.get("world").unwrap().children,
            vec!["vehicle-iso8855".to_string()]
        );
        assert_eq!(graph.get("vehicle-iso8855").unwrap().parent, "world");
        assert!(graph.get("nope").is_none());
    }

    #[test]
    fn unknown_parent_is_tolerated() {
        let mut graph = CsGraph::new();
        graph.declare("orphan", CsType::Custom, "missing", None);
        assert!(graph.has("orphan"));
        assert_eq!(graph.get("orphan").unwrap().parent, "missing");
    }
}

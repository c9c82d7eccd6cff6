//! JSON stage documents.
//!
//! ```json
//! {"prims": [
//!   {"path": "/Skel1", "kind": "skeleton"},
//!   {"path": "/Root", "kind": "root",
//!    "relationships": {"skel:skeleton": ["/Skel1"]},
//!    "attributes": {"skel:joints": null}}
//! ]}
//! ```
//!
//! A `null` relationship or attribute is authored as a block, a missing key
//! stays unauthored. An empty relationship target list is also a block.
//!
//! Attribute values take the first array type their elements fit: `[]` is an
//! empty integer array and `[1, 0]` an integer array. [`AttrValue::as_tokens`]
//! and the other slice views accept an empty array of any type, and
//! [`AttrValue::to_floats`] widens integer arrays.

use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::StageError;
use crate::path::ScenePath;
use crate::prim::{AttrValue, Authored, NodeKind};
use crate::stage::Stage;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StageDocument {
    #[serde(default)]
    pub prims: Vec<PrimSpec>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrimSpec {
    pub path: ScenePath,
    #[serde(default)]
    pub kind: NodeKind,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Prototype this prim instances, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<ScenePath>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub relationships: BTreeMap<String, Option<Vec<ScenePath>>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Option<AttrValue>>,
}

fn default_active() -> bool {
    true
}

impl PrimSpec {
    pub fn new(path: ScenePath, kind: NodeKind) -> Self {
        Self {
            path,
            kind,
            active: true,
            instance: None,
            relationships: BTreeMap::new(),
            attributes: BTreeMap::new(),
        }
    }
}

impl Stage {
    /// Build a stage from a document. Prims are defined in document order
    /// (parents first), instance links are applied once every prim exists.
    pub fn from_document(doc: &StageDocument) -> Result<Stage, StageError> {
        let mut stage = Stage::new();
        for spec in &doc.prims {
            let path = spec.path.as_str();
            stage.define(path, spec.kind)?;
            if !spec.active {
                stage.set_active(path, false)?;
            }
            for (name, targets) in &spec.relationships {
                let state = match targets {
                    Some(t) if !t.is_empty() => Authored::Authored(t.clone()),
                    _ => Authored::Blocked,
                };
                stage.set_relationship_state(path, name, state)?;
            }
            for (name, value) in &spec.attributes {
                match value {
                    Some(v) => stage.set_attribute(path, name, v.clone())?,
                    None => stage.block_attribute(path, name)?,
                }
            }
        }
        for spec in &doc.prims {
            if let Some(prototype) = &spec.instance {
                stage.set_instance(spec.path.as_str(), prototype.as_str())?;
            }
        }
        debug!("loaded stage with {} prims", stage.len());
        Ok(stage)
    }

    pub fn from_json_str(json: &str) -> Result<Stage, StageError> {
        let doc: StageDocument =
            serde_json::from_str(json).map_err(|e| StageError::Parse(e.to_string()))?;
        Stage::from_document(&doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::SceneGraph;

    #[test]
    fn null_means_blocked_and_missing_means_unauthored() {
        let json = r#"{"prims": [
            {"path": "/A", "kind": "skeleton",
             "relationships": {"skel:animationSource": null, "empty": []},
             "attributes": {"skel:joints": null, "joints": ["a", "b"]}}
        ]}"#;
        let stage = Stage::from_json_str(json).unwrap();
        let node = stage.node_at(&ScenePath::parse("/A").unwrap()).unwrap();
        assert_eq!(stage.kind(&node), NodeKind::Skeleton);
        assert!(stage.relationship(&node, "skel:animationSource").is_blocked());
        assert!(stage.relationship(&node, "empty").is_blocked());
        assert!(stage.relationship(&node, "skel:skeleton").is_unauthored());
        assert!(stage.attribute(&node, "skel:joints").is_blocked());
        assert_eq!(
            stage.attribute(&node, "joints"),
            Authored::Authored(AttrValue::tokens(["a", "b"]))
        );
    }

    #[test]
    fn instances_may_reference_later_prototypes() {
        let json = r#"{"prims": [
            {"path": "/Root", "kind": "root"},
            {"path": "/Root/I", "instance": "/Proto"},
            {"path": "/Proto"},
            {"path": "/Proto/Skel", "kind": "skeleton", "active": false}
        ]}"#;
        let stage = Stage::from_json_str(json).unwrap();
        let node = stage
            .node_at(&ScenePath::parse("/Root/I/Skel").unwrap())
            .unwrap();
        assert!(node.is_instance_proxy());
        assert!(!stage.is_active(&node));
    }

    #[test]
    fn malformed_documents_report_parse_errors() {
        assert!(matches!(
            Stage::from_json_str("{\"prims\": [{\"path\": \"relative\"}]}"),
            Err(StageError::Parse(_))
        ));
        assert!(matches!(
            Stage::from_json_str("{\"prims\": [{\"path\": \"/A/B\"}]}"),
            Err(StageError::MissingParent(_))
        ));
    }
}

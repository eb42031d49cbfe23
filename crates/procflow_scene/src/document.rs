// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-node sections of the persisted graph document.
//!
//! Each stateful node contributes one section holding its flattened cache
//! (as an embedded JSON string) and the captured target names. A node that
//! cannot be saved is reported and skipped; it never aborts the rest of the
//! document or corrupts a previously written section.

use crate::capture::{CacheRegistry, KEEP_IMPORTED_CACHE_PARAM, TARGETS_PARAM};
use crate::codec::{flatten, unflatten, CodecError, FlatCache};
use indexmap::IndexMap;
use procflow_graph::node::{Node, ParamValue};
use serde::{Deserialize, Serialize};

/// Parameters stored alongside a node's flattened cache
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SectionParams {
    /// Captured object names
    pub obj_name: Vec<String>,
}

/// One node's slice of the graph document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSection {
    /// Flattened cache, encoded as a JSON string
    pub curv: String,
    /// Node parameters
    pub params: SectionParams,
}

/// Error while saving or loading a node section
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// Node has no populated cache to serialize
    #[error("{node}: no captured data to serialize")]
    MissingCache {
        /// Node display name
        node: String,
    },

    /// JSON encoding/decoding failed
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Embedded flat cache is malformed
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Build the document section for one stateful node
pub fn save_node_section(
    node: &Node,
    registry: &CacheRegistry,
) -> Result<NodeSection, DocumentError> {
    let entry = registry.get(node.id).ok_or_else(|| DocumentError::MissingCache {
        node: node.name.clone(),
    })?;
    let curv = serde_json::to_string(&flatten(&entry))?;
    let obj_name = node
        .param(TARGETS_PARAM)
        .and_then(ParamValue::as_str_list)
        .map(<[String]>::to_vec)
        .unwrap_or_default();
    Ok(NodeSection {
        curv,
        params: SectionParams { obj_name },
    })
}

/// Restore a node from its document section
///
/// Target names are always restored. With the node's
/// `keep_imported_cache` flag set, the cache is rehydrated directly from
/// the section so the node serves data even when the named objects do not
/// exist in the loading context; otherwise the node is left Empty and the
/// next evaluation re-resolves the names through its scene provider.
pub fn load_node_section(
    node: &mut Node,
    section: &NodeSection,
    registry: &CacheRegistry,
) -> Result<(), DocumentError> {
    node.set_param(
        TARGETS_PARAM,
        ParamValue::StrList(section.params.obj_name.clone()),
    );

    let keep = node
        .param(KEEP_IMPORTED_CACHE_PARAM)
        .and_then(ParamValue::as_bool)
        .unwrap_or(false);
    if keep {
        let flat: FlatCache = serde_json::from_str(&section.curv)?;
        registry.store(node.id, unflatten(&flat)?);
        tracing::info!(node = %node.name, "restored cache from document");
    }
    Ok(())
}

/// The persisted graph document: one section per stateful node, by name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphDocument {
    /// Node sections keyed by node display name
    pub nodes: IndexMap<String, NodeSection>,
}

impl GraphDocument {
    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Save one node into the document
    ///
    /// On failure the node's previous section, if any, is left in place.
    pub fn save_node(
        &mut self,
        node: &Node,
        registry: &CacheRegistry,
    ) -> Result<(), DocumentError> {
        let section = save_node_section(node, registry)?;
        self.nodes.insert(node.name.clone(), section);
        Ok(())
    }

    /// Save many nodes, collecting per-node failures instead of aborting
    pub fn save_nodes<'a>(
        &mut self,
        nodes: impl IntoIterator<Item = &'a Node>,
        registry: &CacheRegistry,
    ) -> Vec<(String, DocumentError)> {
        let mut failures = Vec::new();
        for node in nodes {
            if let Err(error) = self.save_node(node, registry) {
                tracing::error!(node = %node.name, "failed to save node section: {error}");
                failures.push((node.name.clone(), error));
            }
        }
        failures
    }

    /// Get a node's section by display name
    pub fn section(&self, name: &str) -> Option<&NodeSection> {
        self.nodes.get(name)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the graph engine.

use crate::socket::{Socket, SocketDirection, SocketId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a node instance
///
/// Assigned at creation, preserved across serialization, and regenerated on
/// duplication so no two live nodes ever share an identity. Process-wide
/// caches are keyed by this ID, never by a runtime address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// Internal parameter state of a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    /// Boolean flag
    Bool(bool),
    /// Integer
    Int(i64),
    /// Float
    Float(f64),
    /// String
    Str(String),
    /// List of strings (e.g. captured object names)
    StrList(Vec<String>),
}

impl ParamValue {
    /// Read as a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Read as a float
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            Self::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    /// Read as a string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            _ => None,
        }
    }

    /// Read as a list of strings
    pub fn as_str_list(&self) -> Option<&[String]> {
        match self {
            Self::StrList(values) => Some(values),
            _ => None,
        }
    }
}

/// Node type definition: the template a node instance is stamped from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeType {
    /// Unique type identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Description
    pub description: String,
    /// Input socket templates
    pub inputs: Vec<Socket>,
    /// Output socket templates
    pub outputs: Vec<Socket>,
    /// Default parameter state
    pub params: IndexMap<String, ParamValue>,
}

/// A node instance in the graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique instance ID
    pub id: NodeId,
    /// Node type ID
    pub node_type: String,
    /// Display name (can be customized)
    pub name: String,
    /// Input sockets
    pub inputs: Vec<Socket>,
    /// Output sockets
    pub outputs: Vec<Socket>,
    /// Parameter state
    pub params: IndexMap<String, ParamValue>,
}

impl Node {
    /// Create a new node from a type definition
    ///
    /// Sockets get fresh IDs; templates only contribute names, kinds and
    /// defaults.
    pub fn new(node_type: &NodeType) -> Self {
        Self {
            id: NodeId::new(),
            node_type: node_type.id.clone(),
            name: node_type.name.clone(),
            inputs: node_type.inputs.iter().map(Self::fresh_socket).collect(),
            outputs: node_type.outputs.iter().map(Self::fresh_socket).collect(),
            params: node_type.params.clone(),
        }
    }

    fn fresh_socket(template: &Socket) -> Socket {
        let mut socket = template.clone();
        socket.id = SocketId::new();
        socket
    }

    /// Copy this node under a fresh identity
    ///
    /// Socket IDs are regenerated along with the node ID, so links and cache
    /// entries of the original never alias the copy.
    pub fn duplicate(&self) -> Self {
        let mut copy = self.clone();
        copy.id = NodeId::new();
        for socket in copy.inputs.iter_mut().chain(copy.outputs.iter_mut()) {
            socket.id = SocketId::new();
        }
        copy
    }

    /// Get an input socket by index
    pub fn input(&self, index: usize) -> Option<&Socket> {
        self.inputs.get(index)
    }

    /// Get an output socket by index
    pub fn output(&self, index: usize) -> Option<&Socket> {
        self.outputs.get(index)
    }

    /// Get an input socket by name
    pub fn input_named(&self, name: &str) -> Option<&Socket> {
        self.inputs.iter().find(|s| s.name == name)
    }

    /// Get an output socket by name
    pub fn output_named(&self, name: &str) -> Option<&Socket> {
        self.outputs.iter().find(|s| s.name == name)
    }

    /// Get a socket by ID
    pub fn socket(&self, socket_id: SocketId) -> Option<&Socket> {
        self.sockets().find(|s| s.id == socket_id)
    }

    /// Get all sockets
    pub fn sockets(&self) -> impl Iterator<Item = &Socket> {
        self.inputs.iter().chain(self.outputs.iter())
    }

    /// True if this node has no output sockets (a sink)
    pub fn is_sink(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Read a parameter
    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }

    /// Write a parameter
    pub fn set_param(&mut self, name: impl Into<String>, value: ParamValue) {
        self.params.insert(name.into(), value);
    }
}

/// Registry of available node types
pub struct NodeRegistry {
    /// Registered node types by ID
    types: IndexMap<String, NodeType>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            types: IndexMap::new(),
        }
    }

    /// Register a node type
    pub fn register(&mut self, node_type: NodeType) {
        self.types.insert(node_type.id.clone(), node_type);
    }

    /// Get a node type by ID
    pub fn get(&self, id: &str) -> Option<&NodeType> {
        self.types.get(id)
    }

    /// Get all registered types
    pub fn types(&self) -> impl Iterator<Item = &NodeType> {
        self.types.values()
    }

    /// Create a node from a type ID
    pub fn create_node(&self, type_id: &str) -> Option<Node> {
        self.get(type_id).map(Node::new)
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::SeriesKind;

    fn probe_type() -> NodeType {
        NodeType {
            id: "probe".to_string(),
            name: "Probe".to_string(),
            description: "Test node".to_string(),
            inputs: vec![Socket::input("X", SeriesKind::Scalar)],
            outputs: vec![Socket::output("Out", SeriesKind::Scalar)],
            params: IndexMap::from([("flag".to_string(), ParamValue::Bool(true))]),
        }
    }

    #[test]
    fn test_instances_do_not_share_socket_ids() {
        let template = probe_type();
        let a = Node::new(&template);
        let b = Node::new(&template);
        assert_ne!(a.id, b.id);
        assert_ne!(a.inputs[0].id, b.inputs[0].id);
        assert_ne!(a.outputs[0].id, b.outputs[0].id);
    }

    #[test]
    fn test_duplicate_regenerates_identity() {
        let node = Node::new(&probe_type());
        let copy = node.duplicate();
        assert_ne!(node.id, copy.id);
        assert_ne!(node.inputs[0].id, copy.inputs[0].id);
        assert_eq!(node.name, copy.name);
        assert_eq!(node.params, copy.params);
    }

    #[test]
    fn test_socket_lookup_by_name() {
        let node = Node::new(&probe_type());
        assert!(node.input_named("X").is_some());
        assert!(node.input_named("Out").is_none());
        assert!(node.output_named("Out").is_some());
        let id = node.outputs[0].id;
        assert_eq!(node.socket(id).map(|s| s.name.as_str()), Some("Out"));
    }

    #[test]
    fn test_registry_create_node() {
        let mut registry = NodeRegistry::new();
        registry.register(probe_type());
        let node = registry.create_node("probe").unwrap();
        assert_eq!(node.node_type, "probe");
        assert_eq!(node.param("flag"), Some(&ParamValue::Bool(true)));
        assert!(registry.create_node("missing").is_none());
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure containing nodes and links.
//!
//! The link set is constrained to a DAG: [`Graph::connect`] rejects any link
//! that would close a cycle, so evaluation never has to break one.

use crate::link::{Link, LinkId};
use crate::node::{Node, NodeId};
use crate::series::SeriesKind;
use crate::socket::{SocketDirection, SocketId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A node graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Graph {
    /// Graph name
    pub name: String,
    /// Nodes in the graph
    nodes: IndexMap<NodeId, Node>,
    /// Links between sockets
    links: IndexMap<LinkId, Link>,
}

impl Graph {
    /// Create a new empty graph
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: IndexMap::new(),
            links: IndexMap::new(),
        }
    }

    /// Add a node to the graph
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = node.id;
        self.nodes.insert(id, node);
        id
    }

    /// Remove a node and its links
    ///
    /// Callers holding per-node state keyed by [`NodeId`] (e.g. a capture
    /// cache registry) must release that entry when this returns `Some`.
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        self.links.retain(|_, l| !l.involves_node(node_id));
        self.nodes.swap_remove(&node_id)
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    /// Get all nodes
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get all node IDs
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Link an output socket to an input socket
    ///
    /// Validates that both endpoints exist, directions and series kinds
    /// match, the input is still free, and the new link keeps the graph
    /// acyclic.
    pub fn connect(
        &mut self,
        from_node: NodeId,
        from_socket: SocketId,
        to_node: NodeId,
        to_socket: SocketId,
    ) -> Result<LinkId, LinkError> {
        let source_node = self
            .nodes
            .get(&from_node)
            .ok_or(LinkError::NodeNotFound(from_node))?;
        let target_node = self
            .nodes
            .get(&to_node)
            .ok_or(LinkError::NodeNotFound(to_node))?;

        let source = source_node
            .socket(from_socket)
            .ok_or(LinkError::SocketNotFound(from_socket))?;
        let target = target_node
            .socket(to_socket)
            .ok_or(LinkError::SocketNotFound(to_socket))?;

        if source.direction != SocketDirection::Output
            || target.direction != SocketDirection::Input
        {
            return Err(LinkError::DirectionMismatch);
        }
        if source.kind != target.kind {
            return Err(LinkError::KindMismatch {
                from: source.kind,
                to: target.kind,
            });
        }

        // An input accepts at most one incoming link
        if self.link_into(to_socket).is_some() {
            return Err(LinkError::InputOccupied(to_socket));
        }

        if from_node == to_node {
            return Err(LinkError::SelfLoop);
        }

        // from -> to closes a cycle iff `to` already reaches `from`
        if self.reaches(to_node, from_node) {
            return Err(LinkError::WouldCycle);
        }

        let link = Link::new(from_node, from_socket, to_node, to_socket);
        let id = link.id;
        self.links.insert(id, link);
        Ok(id)
    }

    /// Remove a link
    pub fn disconnect(&mut self, link_id: LinkId) -> Option<Link> {
        self.links.swap_remove(&link_id)
    }

    /// Get a link by ID
    pub fn link(&self, link_id: LinkId) -> Option<&Link> {
        self.links.get(&link_id)
    }

    /// Get all links
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    /// Get the links leaving a specific output socket
    pub fn links_from(&self, socket_id: SocketId) -> impl Iterator<Item = &Link> {
        self.links
            .values()
            .filter(move |l| l.from_socket == socket_id)
    }

    /// Get the single link into an input socket, if any
    pub fn link_into(&self, socket_id: SocketId) -> Option<&Link> {
        self.links.values().find(|l| l.to_socket == socket_id)
    }

    /// Get links involving a node
    pub fn links_for_node(&self, node_id: NodeId) -> impl Iterator<Item = &Link> {
        self.links.values().filter(move |l| l.involves_node(node_id))
    }

    /// Get the number of links
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// True if `target` is reachable from `start` along link direction
    fn reaches(&self, start: NodeId, target: NodeId) -> bool {
        let mut stack = vec![start];
        let mut seen = std::collections::HashSet::new();
        while let Some(current) = stack.pop() {
            if current == target {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            for link in self.links.values().filter(|l| l.from_node == current) {
                stack.push(link.to_node);
            }
        }
        false
    }

    /// Get nodes in topological order (producers before consumers)
    ///
    /// Defensive: a graph built through [`Graph::connect`] cannot cycle, but
    /// deserialized link sets are re-checked here.
    pub fn topological_order(&self) -> Result<Vec<NodeId>, CycleError> {
        let mut visited = std::collections::HashSet::new();
        let mut temp_mark = std::collections::HashSet::new();
        let mut order = Vec::new();

        for node_id in self.nodes.keys() {
            if !visited.contains(node_id) {
                self.visit(*node_id, &mut visited, &mut temp_mark, &mut order)?;
            }
        }

        order.reverse();
        Ok(order)
    }

    fn visit(
        &self,
        node_id: NodeId,
        visited: &mut std::collections::HashSet<NodeId>,
        temp_mark: &mut std::collections::HashSet<NodeId>,
        order: &mut Vec<NodeId>,
    ) -> Result<(), CycleError> {
        if temp_mark.contains(&node_id) {
            return Err(CycleError);
        }
        if visited.contains(&node_id) {
            return Ok(());
        }

        temp_mark.insert(node_id);

        // Visit all nodes that this node depends on
        for link in self.links_for_node(node_id) {
            if link.to_node == node_id {
                self.visit(link.from_node, visited, temp_mark, order)?;
            }
        }

        temp_mark.remove(&node_id);
        visited.insert(node_id);
        order.push(node_id);

        Ok(())
    }

    /// Serialize to a pretty RON string
    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    /// Deserialize from a RON string
    pub fn from_ron(text: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(text)
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

/// Error when creating a link
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Node not found
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// Socket not found
    #[error("Socket not found: {0:?}")]
    SocketNotFound(SocketId),

    /// Source must be an output and target an input
    #[error("Links run from an output socket to an input socket")]
    DirectionMismatch,

    /// Series kinds differ
    #[error("Cannot link {from:?} output to {to:?} input")]
    KindMismatch {
        /// Kind of the producing socket
        from: SeriesKind,
        /// Kind of the consuming socket
        to: SeriesKind,
    },

    /// Input already has an incoming link
    #[error("Input socket already connected: {0:?}")]
    InputOccupied(SocketId),

    /// Self-loop not allowed
    #[error("Self-loop not allowed")]
    SelfLoop,

    /// Link would close a cycle
    #[error("Link would create a cycle")]
    WouldCycle,
}

/// Error when graph contains a cycle
#[derive(Debug, thiserror::Error)]
#[error("Graph contains a cycle")]
pub struct CycleError;

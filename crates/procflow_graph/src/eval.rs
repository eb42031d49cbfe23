// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph evaluation: demand-driven, single-threaded, memoized per pass.
//!
//! The pull-based update protocol is run as an explicit pass over the
//! topological order of the DAG. Liveness is decided first: a node runs only
//! if it is a sink, is externally demanded (see [`Evaluator::pull`]), or
//! feeds a live node. Results are memoized per pass keyed by [`NodeId`], so
//! an output shared by several consumers is computed once. Behaviors must
//! not compute outputs that are not live; outputs left unset are recorded as
//! skipped so callers can observe the optimization took place.

use crate::graph::{CycleError, Graph};
use crate::node::{Node, NodeId};
use crate::series::{EmptyBroadcastError, SeriesData, SeriesKind};
use crate::socket::SocketId;
use std::collections::{HashMap, HashSet};

/// Result of evaluating a single node
#[derive(Debug, Clone, Default)]
pub struct NodeOutput {
    /// Output values by socket ID
    values: HashMap<SocketId, SeriesData>,
    /// Output sockets the behavior skipped (not live this pass)
    skipped: HashSet<SocketId>,
}

impl NodeOutput {
    /// Create a new empty output
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an output value
    pub fn set(&mut self, socket_id: SocketId, value: SeriesData) {
        self.values.insert(socket_id, value);
    }

    /// Get an output value
    pub fn get(&self, socket_id: &SocketId) -> Option<&SeriesData> {
        self.values.get(socket_id)
    }

    /// True if the socket was left uncomputed this pass
    pub fn is_skipped(&self, socket_id: &SocketId) -> bool {
        self.skipped.contains(socket_id)
    }
}

/// Per-node view of a running evaluation pass
pub struct EvalScope<'a> {
    graph: &'a Graph,
    node: &'a Node,
    upstream: &'a HashMap<NodeId, NodeOutput>,
    live: &'a HashSet<NodeId>,
    demanded: bool,
    current: NodeOutput,
}

impl EvalScope<'_> {
    /// Pull the value of an input socket by name
    ///
    /// A linked input reads the producing node's memoized output; an
    /// unlinked input falls back to the socket's registered default. An
    /// input with neither is an error, never a silent absence.
    pub fn input(&self, name: &str) -> Result<SeriesData, EvalError> {
        let socket = self
            .node
            .input_named(name)
            .ok_or_else(|| EvalError::SocketNotFound {
                node: self.node.name.clone(),
                socket: name.to_string(),
            })?;

        if let Some(link) = self.graph.link_into(socket.id) {
            return self
                .upstream
                .get(&link.from_node)
                .and_then(|output| output.get(&link.from_socket))
                .cloned()
                .ok_or_else(|| EvalError::MissingUpstream {
                    node: self.node.name.clone(),
                    socket: name.to_string(),
                });
        }

        socket
            .default_value
            .clone()
            .ok_or_else(|| EvalError::MissingInput {
                node: self.node.name.clone(),
                socket: name.to_string(),
            })
    }

    /// True if the named output has a consumer this pass
    ///
    /// Behaviors must skip computing outputs for which this returns false.
    /// Always true for every output of an externally demanded node.
    pub fn output_live(&self, name: &str) -> bool {
        let Some(socket) = self.node.output_named(name) else {
            return false;
        };
        if self.demanded {
            return true;
        }
        self.graph
            .links_from(socket.id)
            .any(|link| self.live.contains(&link.to_node))
    }

    /// Store a value on the named output socket
    pub fn set_output(&mut self, name: &str, value: SeriesData) -> Result<(), EvalError> {
        let socket = self
            .node
            .output_named(name)
            .ok_or_else(|| EvalError::SocketNotFound {
                node: self.node.name.clone(),
                socket: name.to_string(),
            })?;
        if value.kind() != socket.kind {
            return Err(EvalError::KindMismatch {
                node: self.node.name.clone(),
                socket: name.to_string(),
                expected: socket.kind,
                found: value.kind(),
            });
        }
        self.current.set(socket.id, value);
        Ok(())
    }
}

/// Behavior of one node type: pull inputs, compute live outputs
pub trait NodeBehavior {
    /// Evaluate a node instance within a pass
    fn eval(&self, node: &Node, scope: &mut EvalScope<'_>) -> Result<(), EvalError>;
}

/// Completed evaluation pass: memoized outputs and per-node compute flags
#[derive(Debug, Default)]
pub struct EvalReport {
    outputs: HashMap<NodeId, NodeOutput>,
    computed: HashSet<NodeId>,
}

impl EvalReport {
    /// Get a node's full output
    pub fn node_output(&self, node_id: NodeId) -> Option<&NodeOutput> {
        self.outputs.get(&node_id)
    }

    /// Get the value a node stored on one of its output sockets
    pub fn value(&self, node_id: NodeId, socket_id: SocketId) -> Option<&SeriesData> {
        self.outputs.get(&node_id).and_then(|o| o.get(&socket_id))
    }

    /// True if the node ran this pass
    pub fn did_compute(&self, node_id: NodeId) -> bool {
        self.computed.contains(&node_id)
    }

    /// True if the node ran but left this output uncomputed
    pub fn output_skipped(&self, node_id: NodeId, socket_id: SocketId) -> bool {
        self.outputs
            .get(&node_id)
            .is_some_and(|o| o.is_skipped(&socket_id))
    }
}

/// Runs evaluation passes over a graph using registered behaviors
#[derive(Default)]
pub struct Evaluator {
    behaviors: HashMap<String, Box<dyn NodeBehavior>>,
}

impl Evaluator {
    /// Create a new evaluator with no registered behaviors
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the behavior for a node type
    pub fn register(&mut self, type_id: impl Into<String>, behavior: impl NodeBehavior + 'static) {
        self.behaviors.insert(type_id.into(), Box::new(behavior));
    }

    /// Full evaluation pass: runs every node with a live consumer
    ///
    /// Sinks (nodes without output sockets) anchor liveness; a node none of
    /// whose outputs reach a sink is skipped entirely.
    pub fn evaluate(&self, graph: &Graph) -> Result<EvalReport, EvalError> {
        self.run(graph, None)
    }

    /// Demand-driven pass: evaluate one node and its upstream closure
    ///
    /// The demanded node's outputs are all treated as live, as if an
    /// external consumer were linked to each of them.
    pub fn pull(&self, graph: &Graph, target: NodeId) -> Result<EvalReport, EvalError> {
        if graph.node(target).is_none() {
            return Err(EvalError::NodeNotFound(target));
        }
        self.run(graph, Some(target))
    }

    fn run(&self, graph: &Graph, demanded: Option<NodeId>) -> Result<EvalReport, EvalError> {
        let order = graph.topological_order()?;

        // Liveness propagates upstream: consumers are decided before the
        // nodes that feed them.
        let mut live: HashSet<NodeId> = HashSet::new();
        for node_id in order.iter().rev() {
            let Some(node) = graph.node(*node_id) else {
                continue;
            };
            let seeded = match demanded {
                Some(target) => target == *node_id,
                None => node.is_sink(),
            };
            let feeds_live = graph
                .links_for_node(*node_id)
                .any(|link| link.from_node == *node_id && live.contains(&link.to_node));
            if seeded || feeds_live {
                live.insert(*node_id);
            }
        }

        let mut report = EvalReport::default();
        for node_id in &order {
            if !live.contains(node_id) {
                continue;
            }
            let node = graph
                .node(*node_id)
                .ok_or(EvalError::NodeNotFound(*node_id))?;
            let behavior = self
                .behaviors
                .get(&node.node_type)
                .ok_or_else(|| EvalError::UnknownBehavior(node.node_type.clone()))?;

            let mut scope = EvalScope {
                graph,
                node,
                upstream: &report.outputs,
                live: &live,
                demanded: demanded == Some(*node_id),
                current: NodeOutput::new(),
            };
            behavior.eval(node, &mut scope)?;

            let mut output = scope.current;
            for socket in &node.outputs {
                if output.get(&socket.id).is_none() {
                    output.skipped.insert(socket.id);
                }
            }
            report.outputs.insert(*node_id, output);
            report.computed.insert(*node_id);
        }

        tracing::debug!(
            graph = %graph.name,
            nodes = graph.node_count(),
            computed = report.computed.len(),
            "evaluation pass finished"
        );
        Ok(report)
    }
}

/// Error during evaluation
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    /// Graph contains a cycle
    #[error(transparent)]
    Cycle(#[from] CycleError),

    /// No behavior registered for the node's type
    #[error("No behavior registered for node type '{0}'")]
    UnknownBehavior(String),

    /// Node not found
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// Socket name does not exist on the node
    #[error("{node}: no socket named '{socket}'")]
    SocketNotFound {
        /// Node display name
        node: String,
        /// Requested socket name
        socket: String,
    },

    /// Unlinked input without a registered default
    #[error("{node}: input '{socket}' has no link and no default value")]
    MissingInput {
        /// Node display name
        node: String,
        /// Input socket name
        socket: String,
    },

    /// Linked producer did not store a value for the consumed socket
    #[error("{node}: upstream value for input '{socket}' was not computed")]
    MissingUpstream {
        /// Node display name
        node: String,
        /// Input socket name
        socket: String,
    },

    /// Payload category does not match the socket's declared kind
    #[error("{node}: expected {expected:?} on '{socket}', got {found:?}")]
    KindMismatch {
        /// Node display name
        node: String,
        /// Socket name
        socket: String,
        /// Declared socket kind
        expected: SeriesKind,
        /// Kind of the offending payload
        found: SeriesKind,
    },

    /// Broadcast over an empty series
    #[error(transparent)]
    Broadcast(#[from] EmptyBroadcastError),

    /// Behavior-specific failure
    #[error("{0}")]
    Behavior(String),
}

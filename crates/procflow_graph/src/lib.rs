// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node graph dataflow engine for Procflow.
//!
//! This crate provides the host-agnostic core of a procedural-geometry
//! node system:
//! - Typed sockets carrying nested series (scalars, vectors, matrices,
//!   poly-Bezier splines)
//! - A DAG-only link model validated at connect time
//! - Demand-driven evaluation with per-pass memoization and dead-output
//!   skipping
//! - The list-broadcast rule that reconciles mismatched series lengths
//!
//! ## Architecture
//!
//! [`Graph`] owns nodes and links; behaviors are registered per node type on
//! an [`eval::Evaluator`], which runs passes over the topological order.
//! Host integrations (scene capture, persistence of captured state) live in
//! companion crates.

pub mod eval;
pub mod graph;
pub mod link;
pub mod node;
pub mod nodes;
pub mod series;
pub mod socket;

pub use eval::{EvalReport, Evaluator, NodeBehavior};
pub use graph::Graph;
pub use link::{Link, LinkId};
pub use node::{Node, NodeId, NodeRegistry, NodeType, ParamValue};
pub use series::{BezierSpline, CubicSegment, Mat4, SeriesData, SeriesKind, Vec3};
pub use socket::{Socket, SocketDirection, SocketId};

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Socket definitions for node inputs/outputs.

use crate::series::{SeriesData, SeriesKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a socket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SocketId(pub Uuid);

impl SocketId {
    /// Create a new random socket ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SocketId {
    fn default() -> Self {
        Self::new()
    }
}

/// Socket direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SocketDirection {
    /// Input socket; accepts at most one incoming link
    Input,
    /// Output socket; fans out to any number of inputs
    Output,
}

/// A typed, directional data slot on a node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Socket {
    /// Unique socket ID
    pub id: SocketId,
    /// Socket name, unique within its direction on the owning node
    pub name: String,
    /// Socket direction
    pub direction: SocketDirection,
    /// Category of series this socket carries
    pub kind: SeriesKind,
    /// Value supplied when an input socket has no incoming link
    pub default_value: Option<SeriesData>,
}

impl Socket {
    /// Create a new input socket
    pub fn input(name: impl Into<String>, kind: SeriesKind) -> Self {
        Self {
            id: SocketId::new(),
            name: name.into(),
            direction: SocketDirection::Input,
            kind,
            default_value: None,
        }
    }

    /// Create a new output socket
    pub fn output(name: impl Into<String>, kind: SeriesKind) -> Self {
        Self {
            id: SocketId::new(),
            name: name.into(),
            direction: SocketDirection::Output,
            kind,
            default_value: None,
        }
    }

    /// Set the fallback value served while the socket is unlinked
    pub fn with_default(mut self, value: SeriesData) -> Self {
        debug_assert_eq!(value.kind(), self.kind);
        self.default_value = Some(value);
        self
    }

    /// Check if a link to another socket is valid
    ///
    /// Directions must be opposite and the series kinds equal; there is no
    /// implicit cross-kind coercion.
    pub fn can_connect(&self, other: &Socket) -> bool {
        self.direction != other.direction && self.kind == other.kind
    }
}

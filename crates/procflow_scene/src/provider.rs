// SPDX-License-Identifier: MIT OR Apache-2.0
//! The scene provider boundary.
//!
//! Capture nodes never talk to a host application directly; they consume
//! this narrow interface. [`MemoryScene`] is the built-in implementation,
//! loadable from JSON, used by the CLI and by tests.

use procflow_graph::series::{Mat4, Vec3, MAT4_IDENTITY};
use serde::{Deserialize, Serialize};

/// One control point of a Bezier subpath
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    /// Anchor position
    pub position: Vec3,
    /// Incoming handle
    pub handle_left: Vec3,
    /// Outgoing handle
    pub handle_right: Vec3,
}

/// Kind of a subpath inside a curve object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubpathKind {
    /// Cubic Bezier control points
    Bezier,
    /// Straight polyline
    Poly,
    /// NURBS
    Nurbs,
}

impl std::fmt::Display for SubpathKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bezier => write!(f, "bezier"),
            Self::Poly => write!(f, "poly"),
            Self::Nurbs => write!(f, "nurbs"),
        }
    }
}

/// One subpath of a curve object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subpath {
    /// Subpath kind
    pub kind: SubpathKind,
    /// Ordered control points
    pub points: Vec<ControlPoint>,
    /// True if the subpath closes back onto its first point
    #[serde(default)]
    pub cyclic: bool,
}

/// Kind of a scene object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Curve object with subpaths
    Curve,
    /// Mesh object
    Mesh,
    /// Anything else the host knows about
    Other(String),
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Curve => write!(f, "curve"),
            Self::Mesh => write!(f, "mesh"),
            Self::Other(name) => write!(f, "{name}"),
        }
    }
}

fn identity() -> Mat4 {
    MAT4_IDENTITY
}

/// A named object in the external scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    /// Object name, unique within the scene
    pub name: String,
    /// Object kind
    pub kind: ObjectKind,
    /// World transform
    #[serde(default = "identity")]
    pub world_transform: Mat4,
    /// Subpath geometry (curve objects)
    #[serde(default)]
    pub subpaths: Vec<Subpath>,
}

/// Read access to an external scene
pub trait SceneProvider {
    /// The currently selected objects, in selection order
    fn selected(&self) -> Vec<SceneObject>;

    /// Resolve an object by name
    fn find(&self, name: &str) -> Option<SceneObject>;
}

/// In-process scene: a flat object list plus a selection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryScene {
    /// All objects in the scene
    #[serde(default)]
    pub objects: Vec<SceneObject>,
    /// Names of the selected objects, in selection order
    #[serde(default)]
    pub selection: Vec<String>,
}

impl MemoryScene {
    /// Create an empty scene
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a scene from JSON
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Add an object to the scene
    pub fn add_object(&mut self, object: SceneObject) {
        self.objects.push(object);
    }

    /// Replace the selection
    pub fn select(&mut self, names: impl IntoIterator<Item = String>) {
        self.selection = names.into_iter().collect();
    }

    /// Select every object in the scene
    pub fn select_all(&mut self) {
        self.selection = self.objects.iter().map(|o| o.name.clone()).collect();
    }
}

impl SceneProvider for MemoryScene {
    fn selected(&self) -> Vec<SceneObject> {
        self.selection
            .iter()
            .filter_map(|name| self.find(name))
            .collect()
    }

    fn find(&self, name: &str) -> Option<SceneObject> {
        self.objects.iter().find(|o| o.name == name).cloned()
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scene capture for Procflow.
//!
//! Builds on `procflow_graph` with the host-facing half of the system:
//! - The [`provider::SceneProvider`] boundary and an in-process
//!   [`provider::MemoryScene`]
//! - The Bezier capture node: snapshot selected curve objects into a
//!   process-wide cache, replay the snapshot on every evaluation
//! - The flatten/unflatten codec and per-node document sections used to
//!   persist captured state

pub mod bezier;
pub mod capture;
pub mod codec;
pub mod document;
pub mod provider;

pub use capture::{BezierInBehavior, CacheEntry, CacheRegistry, CaptureReport, CaptureWarning};
pub use codec::{flatten, unflatten, FlatCache};
pub use document::{GraphDocument, NodeSection};
pub use provider::{MemoryScene, SceneObject, SceneProvider};

#[cfg(test)]
mod tests {
    use super::*;
    use capture::{bezier_in_type, BEZIER_IN, CURVES, KEEP_IMPORTED_CACHE_PARAM};
    use document::load_node_section;
    use procflow_graph::node::{Node, ParamValue};
    use procflow_graph::series::MAT4_IDENTITY;
    use procflow_graph::{Evaluator, Graph};
    use provider::{ControlPoint, ObjectKind, Subpath, SubpathKind};
    use std::sync::Arc;

    fn scene() -> MemoryScene {
        let mut scene = MemoryScene::new();
        scene.add_object(SceneObject {
            name: "arc".to_string(),
            kind: ObjectKind::Curve,
            world_transform: MAT4_IDENTITY,
            subpaths: vec![Subpath {
                kind: SubpathKind::Bezier,
                points: vec![
                    ControlPoint {
                        position: [0.0, 0.0, 0.0],
                        handle_left: [-1.0, 0.0, 0.0],
                        handle_right: [1.0, 1.0, 0.0],
                    },
                    ControlPoint {
                        position: [4.0, 0.0, 0.0],
                        handle_left: [3.0, 1.0, 0.0],
                        handle_right: [5.0, 0.0, 0.0],
                    },
                ],
                cyclic: false,
            }],
        });
        scene.select_all();
        scene
    }

    #[test]
    fn test_capture_save_load_replay() {
        // Session one: capture from the live scene and save the document
        let registry = CacheRegistry::new();
        let behavior = BezierInBehavior::new(Arc::new(scene()), registry.clone());
        let mut graph = Graph::new("session one");
        let id = graph.add_node(Node::new(&bezier_in_type()));
        let report = behavior.capture(graph.node_mut(id).unwrap());
        assert_eq!(report.stored, 1);

        let mut evaluator = Evaluator::new();
        evaluator.register(BEZIER_IN, behavior);
        let pass = evaluator.pull(&graph, id).unwrap();
        let curves_socket = graph.node(id).unwrap().output_named(CURVES).unwrap().id;
        let captured = pass.value(id, curves_socket).cloned().unwrap();

        let mut document = GraphDocument::new();
        document.save_node(graph.node(id).unwrap(), &registry).unwrap();
        let text = document.to_json().unwrap();

        // Session two: the named object no longer exists; the cache is
        // rehydrated from the document and replayed as-is
        let loaded = GraphDocument::from_json(&text).unwrap();
        let registry = CacheRegistry::new();
        let behavior = BezierInBehavior::new(Arc::new(MemoryScene::new()), registry.clone());
        let mut graph = Graph::new("session two");
        let id = graph.add_node(Node::new(&bezier_in_type()));
        let node = graph.node_mut(id).unwrap();
        node.set_param(KEEP_IMPORTED_CACHE_PARAM, ParamValue::Bool(true));
        load_node_section(node, loaded.section("Bezier In").unwrap(), &registry).unwrap();

        let mut evaluator = Evaluator::new();
        evaluator.register(BEZIER_IN, behavior);
        let pass = evaluator.pull(&graph, id).unwrap();
        let curves_socket = graph.node(id).unwrap().output_named(CURVES).unwrap().id;
        assert_eq!(pass.value(id, curves_socket), Some(&captured));
    }
}

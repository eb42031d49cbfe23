// SPDX-License-Identifier: MIT OR Apache-2.0
//! The capture-and-cache node pattern.
//!
//! A capture node snapshots external scene state on an explicit user
//! trigger, stores it in the process-wide [`CacheRegistry`] keyed by the
//! node's stable identity, and replays the snapshot on every evaluation
//! instead of touching the scene again. Dropping the capture clears both the
//! target list and the cache entry.

use crate::bezier::spline_segments;
use crate::provider::{ObjectKind, SceneObject, SceneProvider, SubpathKind};
use indexmap::IndexMap;
use parking_lot::Mutex;
use procflow_graph::eval::{EvalError, EvalScope, NodeBehavior};
use procflow_graph::node::{Node, NodeId, NodeType, ParamValue};
use procflow_graph::series::{BezierSpline, SeriesData, SeriesKind, Vec3};
use procflow_graph::socket::Socket;
use std::sync::Arc;

/// Type ID of the Bezier capture node
pub const BEZIER_IN: &str = "bezier_in";

/// Output socket: captured splines
pub const CURVES: &str = "Curves";
/// Output socket: per-spline control points
pub const CONTROL_POINTS: &str = "ControlPoints";
/// Output socket: per-spline object transforms
pub const MATRICES: &str = "Matrices";

/// Param: pre-multiply control points by the object's world transform
pub const APPLY_TRANSFORM_PARAM: &str = "apply_transform";
/// Param: names of the captured objects
pub const TARGETS_PARAM: &str = "targets";
/// Param: on load, rehydrate the cache instead of re-resolving objects
pub const KEEP_IMPORTED_CACHE_PARAM: &str = "keep_imported_cache";

/// Snapshot of one node's captured series, keyed by output socket name
pub type CacheEntry = IndexMap<String, SeriesData>;

/// Process-wide store of capture snapshots, keyed by node identity
///
/// Entries are created on capture, replaced atomically (whole-entry swap
/// under one lock), and removed on drop and on node destruction. Cloning the
/// registry clones the handle, not the entries.
#[derive(Clone, Default)]
pub struct CacheRegistry {
    entries: Arc<Mutex<IndexMap<NodeId, CacheEntry>>>,
}

impl CacheRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Store (or replace) a node's snapshot
    pub fn store(&self, node_id: NodeId, entry: CacheEntry) {
        self.entries.lock().insert(node_id, entry);
    }

    /// Get a copy of a node's snapshot
    pub fn get(&self, node_id: NodeId) -> Option<CacheEntry> {
        self.entries.lock().get(&node_id).cloned()
    }

    /// True if the node has a snapshot
    pub fn is_captured(&self, node_id: NodeId) -> bool {
        self.entries.lock().contains_key(&node_id)
    }

    /// Remove a node's snapshot
    ///
    /// Must also be called when a node is removed from its graph, so a
    /// later node reusing nothing of the old identity can never alias it.
    pub fn release(&self, node_id: NodeId) -> Option<CacheEntry> {
        self.entries.lock().swap_remove(&node_id)
    }

    /// Number of stored snapshots
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True if no snapshots are stored
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// Non-fatal condition recorded while capturing
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CaptureWarning {
    /// Selected object is not a curve; it was skipped
    #[error("{name}: not supported object type: {kind}")]
    UnsupportedObjectKind {
        /// Object name
        name: String,
        /// Offending kind
        kind: ObjectKind,
    },

    /// Subpath is not Bezier; it was skipped
    #[error("{object}: subpath {index}: not supported subpath type: {kind}")]
    UnsupportedSubpathKind {
        /// Owning object name
        object: String,
        /// Subpath index within the object
        index: usize,
        /// Offending kind
        kind: SubpathKind,
    },

    /// Capture was triggered with nothing selected; prior state is untouched
    #[error("no selected objects in the scene")]
    NoSelection,
}

/// Outcome of a capture operation
#[derive(Debug, Clone, Default)]
pub struct CaptureReport {
    /// Number of splines stored
    pub stored: usize,
    /// Warnings raised along the way
    pub warnings: Vec<CaptureWarning>,
}

/// Node type: captures selected Bezier curve objects from the scene
pub fn bezier_in_type() -> NodeType {
    NodeType {
        id: BEZIER_IN.to_string(),
        name: "Bezier In".to_string(),
        description: "Capture selected Bezier curve objects from the scene".to_string(),
        inputs: vec![],
        outputs: vec![
            Socket::output(CURVES, SeriesKind::Curve),
            Socket::output(CONTROL_POINTS, SeriesKind::Vector),
            Socket::output(MATRICES, SeriesKind::Matrix),
        ],
        params: IndexMap::from([
            (APPLY_TRANSFORM_PARAM.to_string(), ParamValue::Bool(true)),
            (TARGETS_PARAM.to_string(), ParamValue::StrList(Vec::new())),
            (KEEP_IMPORTED_CACHE_PARAM.to_string(), ParamValue::Bool(false)),
        ]),
    }
}

/// Behavior of the Bezier capture node
///
/// Evaluation replays the cached series; the scene is only read inside
/// [`BezierInBehavior::capture`] or when a freshly loaded node still has
/// target names but no cache.
pub struct BezierInBehavior {
    provider: Arc<dyn SceneProvider>,
    registry: CacheRegistry,
}

impl BezierInBehavior {
    /// Create a behavior bound to a scene provider and cache registry
    pub fn new(provider: Arc<dyn SceneProvider>, registry: CacheRegistry) -> Self {
        Self { provider, registry }
    }

    /// The registry this behavior stores snapshots in
    pub fn registry(&self) -> &CacheRegistry {
        &self.registry
    }

    /// Snapshot the current scene selection into the node's cache
    ///
    /// Per-item problems (non-curve objects, non-Bezier subpaths) are
    /// skipped with a warning and never abort the capture. An empty
    /// selection leaves the node's previous state untouched.
    pub fn capture(&self, node: &mut Node) -> CaptureReport {
        let objects = self.provider.selected();
        if objects.is_empty() {
            let warning = CaptureWarning::NoSelection;
            tracing::warn!(node = %node.name, "{warning}");
            return CaptureReport {
                stored: 0,
                warnings: vec![warning],
            };
        }

        let names: Vec<String> = objects.iter().map(|o| o.name.clone()).collect();
        let (entry, warnings, stored) = build_entry(&objects, apply_transform(node));

        self.registry.store(node.id, entry);
        node.set_param(TARGETS_PARAM, ParamValue::StrList(names));
        tracing::info!(node = %node.name, stored, "captured scene selection");

        CaptureReport { stored, warnings }
    }

    /// Forget the captured targets and release the cache entry
    pub fn drop_capture(&self, node: &mut Node) {
        node.set_param(TARGETS_PARAM, ParamValue::StrList(Vec::new()));
        self.registry.release(node.id);
        tracing::info!(node = %node.name, "dropped captured data");
    }

    fn recapture_from_targets(&self, node: &Node, targets: &[String]) -> CacheEntry {
        let objects: Vec<SceneObject> = targets
            .iter()
            .filter_map(|name| {
                let found = self.provider.find(name);
                if found.is_none() {
                    tracing::debug!(node = %node.name, name = %name, "capture target not in scene");
                }
                found
            })
            .collect();

        let (entry, _, stored) = build_entry(&objects, apply_transform(node));
        self.registry.store(node.id, entry.clone());
        tracing::info!(node = %node.name, stored, "re-captured from stored target names");
        entry
    }
}

impl NodeBehavior for BezierInBehavior {
    fn eval(&self, node: &Node, scope: &mut EvalScope<'_>) -> Result<(), EvalError> {
        let entry = match self.registry.get(node.id) {
            Some(entry) => entry,
            None => {
                let targets: Vec<String> = node
                    .param(TARGETS_PARAM)
                    .and_then(ParamValue::as_str_list)
                    .map(<[String]>::to_vec)
                    .unwrap_or_default();
                if targets.is_empty() {
                    return Ok(());
                }
                self.recapture_from_targets(node, &targets)
            }
        };

        for (name, series) in &entry {
            if scope.output_live(name) {
                scope.set_output(name, series.clone())?;
            }
        }
        Ok(())
    }
}

fn apply_transform(node: &Node) -> bool {
    node.param(APPLY_TRANSFORM_PARAM)
        .and_then(ParamValue::as_bool)
        .unwrap_or(true)
}

fn build_entry(
    objects: &[SceneObject],
    apply_transform: bool,
) -> (CacheEntry, Vec<CaptureWarning>, usize) {
    let mut curves = Vec::new();
    let mut controls: Vec<Vec<Vec3>> = Vec::new();
    let mut matrices = Vec::new();
    let mut warnings = Vec::new();

    for object in objects {
        if object.kind != ObjectKind::Curve {
            let warning = CaptureWarning::UnsupportedObjectKind {
                name: object.name.clone(),
                kind: object.kind.clone(),
            };
            tracing::warn!("{warning}");
            warnings.push(warning);
            continue;
        }

        for (index, subpath) in object.subpaths.iter().enumerate() {
            if subpath.kind != SubpathKind::Bezier {
                let warning = CaptureWarning::UnsupportedSubpathKind {
                    object: object.name.clone(),
                    index,
                    kind: subpath.kind,
                };
                tracing::warn!("{warning}");
                warnings.push(warning);
                continue;
            }

            let transform = apply_transform.then_some(&object.world_transform);
            let segments = spline_segments(subpath, transform);
            let points: Vec<Vec3> = segments.iter().flat_map(|s| s.points).collect();
            curves.push(BezierSpline::new(segments));
            controls.push(points);
            matrices.push(object.world_transform);
        }
    }

    let stored = curves.len();
    let mut entry = CacheEntry::new();
    entry.insert(CURVES.to_string(), SeriesData::Curve(curves));
    entry.insert(CONTROL_POINTS.to_string(), SeriesData::Vector(controls));
    entry.insert(MATRICES.to_string(), SeriesData::Matrix(matrices));
    (entry, warnings, stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ControlPoint, MemoryScene, Subpath};
    use procflow_graph::eval::Evaluator;
    use procflow_graph::graph::Graph;
    use procflow_graph::series::{Mat4, MAT4_IDENTITY};

    fn bezier_subpath() -> Subpath {
        Subpath {
            kind: SubpathKind::Bezier,
            points: vec![
                ControlPoint {
                    position: [0.0, 0.0, 0.0],
                    handle_left: [-1.0, 0.0, 0.0],
                    handle_right: [1.0, 0.0, 0.0],
                },
                ControlPoint {
                    position: [3.0, 0.0, 0.0],
                    handle_left: [2.0, 0.0, 0.0],
                    handle_right: [4.0, 0.0, 0.0],
                },
            ],
            cyclic: false,
        }
    }

    fn curve_object(name: &str, transform: Mat4) -> SceneObject {
        SceneObject {
            name: name.to_string(),
            kind: ObjectKind::Curve,
            world_transform: transform,
            subpaths: vec![bezier_subpath()],
        }
    }

    fn mesh_object(name: &str) -> SceneObject {
        SceneObject {
            name: name.to_string(),
            kind: ObjectKind::Mesh,
            world_transform: MAT4_IDENTITY,
            subpaths: vec![],
        }
    }

    fn setup(scene: MemoryScene) -> (BezierInBehavior, Graph, procflow_graph::node::NodeId) {
        let behavior = BezierInBehavior::new(Arc::new(scene), CacheRegistry::new());
        let mut graph = Graph::new("test");
        let id = graph.add_node(Node::new(&bezier_in_type()));
        (behavior, graph, id)
    }

    fn evaluator_with(behavior: BezierInBehavior) -> Evaluator {
        let mut evaluator = Evaluator::new();
        evaluator.register(BEZIER_IN, behavior);
        evaluator
    }

    #[test]
    fn test_capture_then_replay() {
        let mut scene = MemoryScene::new();
        scene.add_object(curve_object("spiral", MAT4_IDENTITY));
        scene.select_all();
        let (behavior, mut graph, id) = setup(scene);
        let registry = behavior.registry().clone();

        let report = behavior.capture(graph.node_mut(id).unwrap());
        assert_eq!(report.stored, 1);
        assert!(report.warnings.is_empty());
        assert!(registry.is_captured(id));

        let evaluator = evaluator_with(behavior);
        let report = evaluator.pull(&graph, id).unwrap();
        let node = graph.node(id).unwrap();
        let curves = report.value(id, node.output_named(CURVES).unwrap().id).unwrap();
        assert_eq!(curves.len(), 1);
        let points = report
            .value(id, node.output_named(CONTROL_POINTS).unwrap().id)
            .unwrap();
        // One segment, four control points in tuple order
        assert_eq!(
            points,
            &SeriesData::Vector(vec![vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [2.0, 0.0, 0.0],
                [3.0, 0.0, 0.0],
            ]])
        );
        let matrices = report.value(id, node.output_named(MATRICES).unwrap().id).unwrap();
        assert_eq!(matrices, &SeriesData::Matrix(vec![MAT4_IDENTITY]));
    }

    #[test]
    fn test_capture_drop_process() {
        let mut scene = MemoryScene::new();
        scene.add_object(curve_object("spiral", MAT4_IDENTITY));
        scene.select_all();
        let (behavior, mut graph, id) = setup(scene);
        let registry = behavior.registry().clone();

        behavior.capture(graph.node_mut(id).unwrap());
        behavior.drop_capture(graph.node_mut(id).unwrap());
        assert!(!registry.is_captured(id));
        assert_eq!(
            graph.node(id).unwrap().param(TARGETS_PARAM),
            Some(&ParamValue::StrList(Vec::new()))
        );

        // Processing after drop yields no output and does not fail
        let evaluator = evaluator_with(behavior);
        let report = evaluator.pull(&graph, id).unwrap();
        let node = graph.node(id).unwrap();
        for socket in &node.outputs {
            assert_eq!(report.value(id, socket.id), None);
        }
    }

    #[test]
    fn test_mixed_selection_skips_and_warns() {
        let mut scene = MemoryScene::new();
        scene.add_object(curve_object("good", MAT4_IDENTITY));
        scene.add_object(mesh_object("bad"));
        let mut poly_curve = curve_object("half", MAT4_IDENTITY);
        poly_curve.subpaths.push(Subpath {
            kind: SubpathKind::Poly,
            points: vec![],
            cyclic: false,
        });
        scene.add_object(poly_curve);
        scene.select_all();
        let (behavior, mut graph, id) = setup(scene);

        let report = behavior.capture(graph.node_mut(id).unwrap());
        // "good" and the Bezier subpath of "half" survive
        assert_eq!(report.stored, 2);
        assert_eq!(report.warnings.len(), 2);
        assert!(report.warnings.iter().any(|w| matches!(
            w,
            CaptureWarning::UnsupportedObjectKind { name, .. } if name == "bad"
        )));
        assert!(report.warnings.iter().any(|w| matches!(
            w,
            CaptureWarning::UnsupportedSubpathKind { object, index: 1, .. } if object == "half"
        )));
    }

    #[test]
    fn test_empty_selection_preserves_cache() {
        let mut scene = MemoryScene::new();
        scene.add_object(curve_object("spiral", MAT4_IDENTITY));
        scene.select_all();
        let (behavior, mut graph, id) = setup(scene);
        let registry = behavior.registry().clone();
        behavior.capture(graph.node_mut(id).unwrap());

        // Same registry, nothing selected now
        let rearmed = BezierInBehavior::new(Arc::new(MemoryScene::new()), registry.clone());
        let report = rearmed.capture(graph.node_mut(id).unwrap());
        assert_eq!(report.warnings, vec![CaptureWarning::NoSelection]);
        assert!(registry.is_captured(id));
        assert_eq!(
            graph.node(id).unwrap().param(TARGETS_PARAM),
            Some(&ParamValue::StrList(vec!["spiral".to_string()]))
        );
    }

    #[test]
    fn test_released_when_node_removed() {
        let mut scene = MemoryScene::new();
        scene.add_object(curve_object("spiral", MAT4_IDENTITY));
        scene.select_all();
        let (behavior, mut graph, id) = setup(scene);
        let registry = behavior.registry().clone();
        behavior.capture(graph.node_mut(id).unwrap());
        assert_eq!(registry.len(), 1);

        let removed = graph.remove_node(id).unwrap();
        registry.release(removed.id);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_recapture_from_stored_targets() {
        let mut scene = MemoryScene::new();
        scene.add_object(curve_object("spiral", MAT4_IDENTITY));
        let (behavior, mut graph, id) = setup(scene);
        let registry = behavior.registry().clone();

        // Simulate a freshly deserialized node: targets set, cache empty
        graph
            .node_mut(id)
            .unwrap()
            .set_param(TARGETS_PARAM, ParamValue::StrList(vec!["spiral".to_string()]));
        assert!(!registry.is_captured(id));

        let evaluator = evaluator_with(behavior);
        let report = evaluator.pull(&graph, id).unwrap();
        let node = graph.node(id).unwrap();
        assert!(report.value(id, node.output_named(CURVES).unwrap().id).is_some());
        assert!(registry.is_captured(id));
    }

    #[test]
    fn test_apply_transform_flag() {
        let translate: Mat4 = [
            [1.0, 0.0, 0.0, 5.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ];
        let mut scene = MemoryScene::new();
        scene.add_object(curve_object("moved", translate));
        scene.select_all();

        let (behavior, mut graph, id) = setup(scene.clone());
        behavior.capture(graph.node_mut(id).unwrap());
        let entry = behavior.registry().get(id).unwrap();
        let SeriesData::Vector(points) = &entry[CONTROL_POINTS] else {
            panic!("control points must be a vector series");
        };
        assert_eq!(points[0][0], [5.0, 0.0, 0.0]);

        // With the flag off, raw coordinates are stored and the matrix is
        // still available on its own output
        let (behavior, mut graph, id) = setup(scene);
        graph
            .node_mut(id)
            .unwrap()
            .set_param(APPLY_TRANSFORM_PARAM, ParamValue::Bool(false));
        behavior.capture(graph.node_mut(id).unwrap());
        let entry = behavior.registry().get(id).unwrap();
        let SeriesData::Vector(points) = &entry[CONTROL_POINTS] else {
            panic!("control points must be a vector series");
        };
        assert_eq!(points[0][0], [0.0, 0.0, 0.0]);
        assert_eq!(entry[MATRICES], SeriesData::Matrix(vec![translate]));
    }

    #[test]
    fn test_dead_outputs_not_replayed() {
        struct CurveSink;
        impl NodeBehavior for CurveSink {
            fn eval(&self, _node: &Node, scope: &mut EvalScope<'_>) -> Result<(), EvalError> {
                scope.input("In")?;
                Ok(())
            }
        }

        let mut scene = MemoryScene::new();
        scene.add_object(curve_object("spiral", MAT4_IDENTITY));
        scene.select_all();
        let (behavior, mut graph, id) = setup(scene);
        behavior.capture(graph.node_mut(id).unwrap());

        let sink_type = NodeType {
            id: "curve_sink".to_string(),
            name: "Curve Sink".to_string(),
            description: String::new(),
            inputs: vec![Socket::input("In", SeriesKind::Curve)],
            outputs: vec![],
            params: IndexMap::new(),
        };
        let sink = graph.add_node(Node::new(&sink_type));
        let curves_out = graph.node(id).unwrap().output_named(CURVES).unwrap().id;
        let sink_in = graph.node(sink).unwrap().inputs[0].id;
        graph.connect(id, curves_out, sink, sink_in).unwrap();

        let mut evaluator = evaluator_with(behavior);
        evaluator.register("curve_sink", CurveSink);
        let report = evaluator.evaluate(&graph).unwrap();

        let node = graph.node(id).unwrap();
        assert!(report.did_compute(id));
        assert!(!report.output_skipped(id, curves_out));
        assert!(report.output_skipped(id, node.output_named(CONTROL_POINTS).unwrap().id));
        assert!(report.output_skipped(id, node.output_named(MATRICES).unwrap().id));
    }
}

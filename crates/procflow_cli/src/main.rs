// SPDX-License-Identifier: MIT OR Apache-2.0
//! Procflow command-line driver.
//!
//! Loads a scene (JSON path as first argument, or a built-in demo scene),
//! captures its selected Bezier curves into a small graph, evaluates the
//! graph on demand, and prints a summary. With an output directory as
//! second argument, the graph topology (RON) and the captured state (JSON
//! document) are written there.

use procflow_graph::nodes::{self, number, vectors};
use procflow_graph::{Evaluator, Graph, NodeId, NodeRegistry, ParamValue, SeriesData};
use procflow_scene::capture::{self, BezierInBehavior, CacheRegistry};
use procflow_scene::provider::{ControlPoint, MemoryScene, ObjectKind, SceneObject, Subpath, SubpathKind};
use procflow_scene::GraphDocument;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn main() {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("procflow_cli=info".parse().unwrap())
        .add_directive("procflow_graph=info".parse().unwrap())
        .add_directive("procflow_scene=info".parse().unwrap());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(error) = run() {
        tracing::error!("{error}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let scene = match args.next() {
        Some(path) => {
            tracing::info!(path = %path, "loading scene");
            MemoryScene::from_json(&std::fs::read_to_string(path)?)?
        }
        None => demo_scene(),
    };
    let out_dir = args.next();

    let cache = CacheRegistry::new();
    let behavior = BezierInBehavior::new(Arc::new(scene), cache.clone());

    let mut types = NodeRegistry::new();
    nodes::register_builtin_types(&mut types);
    types.register(capture::bezier_in_type());

    let mut graph = Graph::new("demo");
    let bezier = graph.add_node(types.create_node(capture::BEZIER_IN).expect("registered"));
    let vectors_node = build_vector_chain(&mut graph, &types)?;

    // Explicit user trigger: snapshot the scene selection
    let report = behavior.capture(graph.node_mut(bezier).expect("node exists"));
    for warning in &report.warnings {
        tracing::warn!("capture: {warning}");
    }

    let mut evaluator = Evaluator::new();
    nodes::register_builtin_behaviors(&mut evaluator);
    evaluator.register(capture::BEZIER_IN, behavior);

    // Demand each terminal node; the capture node replays its snapshot
    let pass = evaluator.pull(&graph, bezier)?;
    summarize(&graph, bezier, &pass);
    let pass = evaluator.pull(&graph, vectors_node)?;
    summarize(&graph, vectors_node, &pass);

    if let Some(dir) = out_dir {
        persist(&graph, &cache, Path::new(&dir))?;
    }
    Ok(())
}

/// Two number sources wired into a vector assembly node
fn build_vector_chain(
    graph: &mut Graph,
    types: &NodeRegistry,
) -> Result<NodeId, Box<dyn std::error::Error>> {
    let mut x_source = types.create_node(number::NUMBER).expect("registered");
    x_source.set_param("value", ParamValue::Float(1.0));
    let mut y_source = types.create_node(number::NUMBER).expect("registered");
    y_source.set_param("value", ParamValue::Float(2.0));
    let assembly = types.create_node(vectors::VECTORS_IN).expect("registered");

    let x_out = x_source.outputs[0].id;
    let y_out = y_source.outputs[0].id;
    let x_in = assembly.input_named("X").expect("socket").id;
    let y_in = assembly.input_named("Y").expect("socket").id;

    let x_source = graph.add_node(x_source);
    let y_source = graph.add_node(y_source);
    let assembly = graph.add_node(assembly);
    graph.connect(x_source, x_out, assembly, x_in)?;
    graph.connect(y_source, y_out, assembly, y_in)?;
    Ok(assembly)
}

fn summarize(graph: &Graph, node_id: NodeId, pass: &procflow_graph::EvalReport) {
    let Some(node) = graph.node(node_id) else {
        return;
    };
    for socket in &node.outputs {
        match pass.value(node_id, socket.id) {
            Some(series) => println!(
                "{} / {}: {} object(s) of {:?}",
                node.name,
                socket.name,
                series.len(),
                series.kind()
            ),
            None => println!("{} / {}: <no data>", node.name, socket.name),
        }
        if let Some(SeriesData::Vector(objects)) = pass.value(node_id, socket.id) {
            for points in objects {
                println!("    {points:?}");
            }
        }
    }
}

fn persist(
    graph: &Graph,
    cache: &CacheRegistry,
    dir: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(dir)?;

    let mut document = GraphDocument::new();
    let stateful = graph.nodes().filter(|n| n.node_type == capture::BEZIER_IN);
    for (name, error) in document.save_nodes(stateful, cache) {
        tracing::warn!(node = %name, "section not saved: {error}");
    }
    std::fs::write(dir.join("capture.json"), document.to_json()?)?;
    std::fs::write(dir.join("graph.ron"), graph.to_ron()?)?;
    tracing::info!(dir = %dir.display(), "wrote graph and captured state");
    Ok(())
}

/// Fallback scene: one closed Bezier loop, translated off the origin
fn demo_scene() -> MemoryScene {
    let anchor = |position: [f64; 3], left: [f64; 3], right: [f64; 3]| ControlPoint {
        position,
        handle_left: left,
        handle_right: right,
    };

    let mut scene = MemoryScene::new();
    scene.add_object(SceneObject {
        name: "loop".to_string(),
        kind: ObjectKind::Curve,
        world_transform: [
            [1.0, 0.0, 0.0, 2.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
        subpaths: vec![Subpath {
            kind: SubpathKind::Bezier,
            points: vec![
                anchor([0.0, 0.0, 0.0], [-0.5, -0.5, 0.0], [0.5, 0.5, 0.0]),
                anchor([1.0, 0.0, 0.0], [0.5, 0.5, 0.0], [1.5, -0.5, 0.0]),
            ],
            cyclic: true,
        }],
    });
    scene.select_all();
    scene
}

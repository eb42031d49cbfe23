// SPDX-License-Identifier: MIT OR Apache-2.0
//! Vector assembly node: zips three scalar series into a vector series.

use crate::eval::{EvalError, EvalScope, NodeBehavior};
use crate::node::{Node, NodeType};
use crate::series::{full_list, SeriesData, SeriesKind, Vec3};
use crate::socket::Socket;
use indexmap::IndexMap;

/// Type ID of the vector assembly node
pub const VECTORS_IN: &str = "vectors_in";

fn scalar_input(name: &str) -> Socket {
    Socket::input(name, SeriesKind::Scalar).with_default(SeriesData::Scalar(vec![vec![0.0]]))
}

/// Node type: inputs `X`/`Y`/`Z`, output `Vectors`
pub fn vectors_in_type() -> NodeType {
    NodeType {
        id: VECTORS_IN.to_string(),
        name: "Vectors In".to_string(),
        description: "Assemble X/Y/Z scalar series into vectors".to_string(),
        inputs: vec![scalar_input("X"), scalar_input("Y"), scalar_input("Z")],
        outputs: vec![Socket::output("Vectors", SeriesKind::Vector)],
        params: IndexMap::new(),
    }
}

/// Behavior of the vector assembly node
///
/// Mismatched series lengths are reconciled by repeating the last element,
/// first across objects, then across each object's values.
pub struct VectorsInBehavior;

impl NodeBehavior for VectorsInBehavior {
    fn eval(&self, node: &Node, scope: &mut EvalScope<'_>) -> Result<(), EvalError> {
        let mut xs = scalar_series(node, "X", scope.input("X")?)?;
        let mut ys = scalar_series(node, "Y", scope.input("Y")?)?;
        let mut zs = scalar_series(node, "Z", scope.input("Z")?)?;

        if !scope.output_live("Vectors") {
            return Ok(());
        }

        let max_obj = xs.len().max(ys.len()).max(zs.len());
        full_list(&mut xs, max_obj)?;
        full_list(&mut ys, max_obj)?;
        full_list(&mut zs, max_obj)?;

        let mut series = Vec::with_capacity(max_obj);
        for index in 0..max_obj {
            let mut x = std::mem::take(&mut xs[index]);
            let mut y = std::mem::take(&mut ys[index]);
            let mut z = std::mem::take(&mut zs[index]);

            let max_num = x.len().max(y.len()).max(z.len());
            full_list(&mut x, max_num)?;
            full_list(&mut y, max_num)?;
            full_list(&mut z, max_num)?;

            let points: Vec<Vec3> = x
                .iter()
                .zip(&y)
                .zip(&z)
                .map(|((x, y), z)| [*x, *y, *z])
                .collect();
            series.push(points);
        }

        scope.set_output("Vectors", SeriesData::Vector(series))
    }
}

fn scalar_series(node: &Node, name: &str, data: SeriesData) -> Result<Vec<Vec<f64>>, EvalError> {
    match data {
        SeriesData::Scalar(values) => Ok(values),
        other => Err(EvalError::KindMismatch {
            node: node.name.clone(),
            socket: name.to_string(),
            expected: SeriesKind::Scalar,
            found: other.kind(),
        }),
    }
}

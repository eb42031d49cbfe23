// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scalar constant source node.

use crate::eval::{EvalError, EvalScope, NodeBehavior};
use crate::node::{Node, NodeType, ParamValue};
use crate::series::{SeriesData, SeriesKind};
use crate::socket::Socket;
use indexmap::IndexMap;

/// Type ID of the number node
pub const NUMBER: &str = "number";

/// Node type: emits its `value` parameter as a one-element scalar series
pub fn number_type() -> NodeType {
    NodeType {
        id: NUMBER.to_string(),
        name: "Number".to_string(),
        description: "Constant scalar value".to_string(),
        inputs: vec![],
        outputs: vec![Socket::output("Value", SeriesKind::Scalar)],
        params: IndexMap::from([("value".to_string(), ParamValue::Float(0.0))]),
    }
}

/// Behavior of the number node
pub struct NumberBehavior;

impl NodeBehavior for NumberBehavior {
    fn eval(&self, node: &Node, scope: &mut EvalScope<'_>) -> Result<(), EvalError> {
        if !scope.output_live("Value") {
            return Ok(());
        }
        let value = node.param("value").and_then(ParamValue::as_f64).unwrap_or(0.0);
        scope.set_output("Value", SeriesData::Scalar(vec![vec![value]]))
    }
}

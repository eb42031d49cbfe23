// SPDX-License-Identifier: MIT OR Apache-2.0
//! Built-in node types and their behaviors.

pub mod number;
pub mod vectors;

pub use number::NumberBehavior;
pub use vectors::VectorsInBehavior;

use crate::eval::Evaluator;
use crate::node::NodeRegistry;

/// Register the built-in node types
pub fn register_builtin_types(registry: &mut NodeRegistry) {
    registry.register(number::number_type());
    registry.register(vectors::vectors_in_type());
}

/// Register the built-in behaviors
pub fn register_builtin_behaviors(evaluator: &mut Evaluator) {
    evaluator.register(number::NUMBER, NumberBehavior);
    evaluator.register(vectors::VECTORS_IN, VectorsInBehavior);
}

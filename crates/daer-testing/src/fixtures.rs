// SPDX-License-Identifier: MIT

//! Small builders for the graph and step shapes every DAG/engine test
//! ends up constructing by hand otherwise.

use daer_adapters::{AdapterError, StepResult};
use daer_core::ids::NodeId;
use daer_dag::{TaskGraph, TaskNode};
use serde_json::Value;

/// A step that finishes immediately, echoing `output`.
pub fn echo_step(output: Value, tokens: u64) -> Result<StepResult, AdapterError> {
    Ok(StepResult { output, tokens, done: true, tools_called: Vec::new() })
}

/// A step that fails fatally with `message`.
pub fn fatal_step(message: impl Into<String>) -> Result<StepResult, AdapterError> {
    Err(AdapterError::fatal(message))
}

/// A step that fails with a retryable error.
pub fn retryable_step(message: impl Into<String>) -> Result<StepResult, AdapterError> {
    Err(AdapterError::retryable(message))
}

/// A diamond graph: `a` runs first, `b` and `c` both depend only on `a`,
/// `d` depends on both `b` and `c`. The shape every fan-out/fan-in DAG
/// test reaches for.
pub fn diamond_graph() -> (TaskGraph, [NodeId; 4]) {
    let a = NodeId::new();
    let b = NodeId::new();
    let c = NodeId::new();
    let d = NodeId::new();

    let mut graph = TaskGraph::new();
    graph.add_node(TaskNode::new(a, "echo", Value::String("a".into())));
    graph.add_node(TaskNode::new(b, "echo", Value::String("b".into())).depends_on(a));
    graph.add_node(TaskNode::new(c, "echo", Value::String("c".into())).depends_on(a));
    graph.add_node(TaskNode::new(d, "echo", Value::String("d".into())).depends_on(b).depends_on(c));

    (graph, [a, b, c, d])
}

/// A straight chain of `len` nodes, each depending on the one before it.
pub fn linear_graph(len: usize) -> (TaskGraph, Vec<NodeId>) {
    let mut graph = TaskGraph::new();
    let mut ids = Vec::with_capacity(len);
    let mut previous: Option<NodeId> = None;

    for index in 0..len {
        let id = NodeId::new();
        let mut node = TaskNode::new(id, "echo", Value::String(index.to_string()));
        if let Some(parent) = previous {
            node = node.depends_on(parent);
        }
        graph.add_node(node);
        ids.push(id);
        previous = Some(id);
    }

    (graph, ids)
}

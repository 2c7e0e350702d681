use super::*;
use serde_json::json;

#[test]
fn linear_chain_orders_dependencies_before_dependents() {
    let a = NodeId::new();
    let b = NodeId::new();
    let c = NodeId::new();
    let mut graph = TaskGraph::new();
    graph.add_node(TaskNode::new(a, "agent", json!("a")));
    graph.add_node(TaskNode::new(b, "agent", json!("b")).depends_on(a));
    graph.add_node(TaskNode::new(c, "agent", json!("c")).depends_on(b));

    let order = graph.topo_order().unwrap();
    let pos = |id: NodeId| order.iter().position(|&n| n == id).unwrap();
    assert!(pos(a) < pos(b));
    assert!(pos(b) < pos(c));
}

#[test]
fn diamond_fan_out_orders_a_before_b_and_c_and_both_before_d() {
    let a = NodeId::new();
    let b = NodeId::new();
    let c = NodeId::new();
    let d = NodeId::new();
    let mut graph = TaskGraph::new();
    graph.add_node(TaskNode::new(a, "agent", json!(null)));
    graph.add_node(TaskNode::new(b, "agent", json!(null)).depends_on(a));
    graph.add_node(TaskNode::new(c, "agent", json!(null)).depends_on(a));
    graph.add_node(TaskNode::new(d, "agent", json!(null)).depends_on(b).depends_on(c));

    let order = graph.topo_order().unwrap();
    let pos = |id: NodeId| order.iter().position(|&n| n == id).unwrap();
    assert!(pos(a) < pos(b));
    assert!(pos(a) < pos(c));
    assert!(pos(b) < pos(d));
    assert!(pos(c) < pos(d));
}

#[test]
fn direct_cycle_is_rejected() {
    let a = NodeId::new();
    let b = NodeId::new();
    let mut graph = TaskGraph::new();
    graph.add_node(TaskNode::new(a, "agent", json!(null)).depends_on(b));
    graph.add_node(TaskNode::new(b, "agent", json!(null)).depends_on(a));

    assert!(matches!(graph.topo_order(), Err(DagError::Cycle)));
}

#[test]
fn self_dependency_is_a_cycle() {
    let a = NodeId::new();
    let mut graph = TaskGraph::new();
    graph.add_node(TaskNode::new(a, "agent", json!(null)).depends_on(a));

    assert!(matches!(graph.topo_order(), Err(DagError::Cycle)));
}

#[test]
fn dependency_on_unknown_node_is_rejected() {
    let a = NodeId::new();
    let ghost = NodeId::new();
    let mut graph = TaskGraph::new();
    graph.add_node(TaskNode::new(a, "agent", json!(null)).depends_on(ghost));

    let err = graph.topo_order().unwrap_err();
    assert!(matches!(err, DagError::UnknownDependency { .. }));
}

#[test]
fn empty_graph_has_empty_order() {
    let graph = TaskGraph::new();
    assert_eq!(graph.topo_order().unwrap(), Vec::new());
    assert!(graph.is_empty());
}

use super::*;
use async_trait::async_trait;
use daer_adapters::{AdapterError, AgentAdapter, StepContext, StepResult};
use daer_core::execution::PolicyConfig;
use daer_core::FakeClock;
use daer_interception::{NoopSleeper, ToolCallError, ToolExecutor};
use daer_storage::MemoryStore;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

struct StubToolExecutor;
#[async_trait]
impl ToolExecutor for StubToolExecutor {
    async fn call(&self, _tool_name: &str, _args: &[Value], _kwargs: &Value) -> Result<Value, ToolCallError> {
        Ok(json!({"tool": "ok"}))
    }
}

/// Fails when the task (or a dependent node's wrapped `{"task": ..}`)
/// carries the literal string `"fail"`; otherwise echoes the task back.
struct MarkedFailureAdapter;

fn wants_failure(task: &Value) -> bool {
    match task {
        Value::String(s) => s == "fail",
        Value::Object(map) => map.get("task").map(wants_failure).unwrap_or(false),
        _ => false,
    }
}

#[async_trait]
impl AgentAdapter for MarkedFailureAdapter {
    async fn invoke(&self, context: StepContext) -> Result<StepResult, AdapterError> {
        if wants_failure(&context.task) {
            return Err(AdapterError::fatal("node marked to fail"));
        }
        Ok(StepResult { output: context.task, tokens: 1, done: true, tools_called: Vec::new() })
    }

    fn name(&self) -> &str {
        "marked-failure-adapter"
    }

    fn version(&self) -> &str {
        "0.0.0"
    }
}

/// Panics instead of erroring when the task is the literal string `"panic"`.
struct PanickingAdapter;

#[async_trait]
impl AgentAdapter for PanickingAdapter {
    async fn invoke(&self, context: StepContext) -> Result<StepResult, AdapterError> {
        if context.task == json!("panic") {
            panic!("node adapter panicked");
        }
        Ok(StepResult { output: context.task, tokens: 1, done: true, tools_called: Vec::new() })
    }

    fn name(&self) -> &str {
        "panicking-adapter"
    }

    fn version(&self) -> &str {
        "0.0.0"
    }
}

struct ConcurrencyTrackingAdapter {
    current: Arc<AtomicU32>,
    peak: Arc<AtomicU32>,
}

#[async_trait]
impl AgentAdapter for ConcurrencyTrackingAdapter {
    async fn invoke(&self, _context: StepContext) -> Result<StepResult, AdapterError> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(StepResult { output: json!("done"), tokens: 1, done: true, tools_called: Vec::new() })
    }

    fn name(&self) -> &str {
        "concurrency-tracker"
    }

    fn version(&self) -> &str {
        "0.0.0"
    }
}

fn test_engine<A: AgentAdapter>(adapter: A) -> Engine<A, FakeClock> {
    Engine::new(
        adapter,
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryStore::new()),
        Arc::new(StubToolExecutor),
        Arc::new(NoopSleeper),
        FakeClock::new(),
        "0.1.0",
        "tools-v1",
    )
}

#[tokio::test]
async fn diamond_graph_runs_all_nodes_and_passes_dependency_outputs_forward() {
    let a = NodeId::new();
    let b = NodeId::new();
    let c = NodeId::new();
    let d = NodeId::new();
    let mut graph = TaskGraph::new();
    graph.add_node(TaskNode::new(a, "agent", json!("a-output")));
    graph.add_node(TaskNode::new(b, "agent", json!("b-output")).depends_on(a));
    graph.add_node(TaskNode::new(c, "agent", json!("c-output")).depends_on(a));
    graph.add_node(TaskNode::new(d, "agent", json!("d-output")).depends_on(b).depends_on(c));

    let executor = DagExecutor::new(test_engine(MarkedFailureAdapter), 4, FailurePolicy::default());
    let report = executor.submit(&graph, PolicyConfig::default()).await.unwrap();

    assert_eq!(report.status, ReportStatus::Success);
    assert!(report.skipped.is_empty());
    assert_eq!(report.node_reports.len(), 4);

    // D depends on B and C, so its echoed output is the composed
    // `{"task": .., "dependencies": {..}}` envelope, carrying both
    // upstream outputs forward.
    let d_report = &report.node_reports[&d];
    let dependencies = d_report.final_output.get("dependencies").expect("d's output carries a dependencies map");
    assert_eq!(dependencies.get(&b.to_string()).unwrap(), "b-output");
    assert_eq!(dependencies.get(&c.to_string()).unwrap(), "c-output");

    // A is a root node, so its output is the plain echoed task_input.
    assert_eq!(report.node_reports[&a].final_output, json!("a-output"));
}

#[tokio::test]
async fn failed_node_blocks_its_descendant_but_not_a_finished_sibling() {
    let a = NodeId::new();
    let b = NodeId::new();
    let c = NodeId::new();
    let d = NodeId::new();
    let mut graph = TaskGraph::new();
    graph.add_node(TaskNode::new(a, "agent", json!("a")));
    graph.add_node(TaskNode::new(b, "agent", json!("fail")).depends_on(a));
    graph.add_node(TaskNode::new(c, "agent", json!("c")).depends_on(a));
    graph.add_node(TaskNode::new(d, "agent", json!("d")).depends_on(b).depends_on(c));

    let executor = DagExecutor::new(test_engine(MarkedFailureAdapter), 4, FailurePolicy::default());
    let report = executor.submit(&graph, PolicyConfig::default()).await.unwrap();

    assert_eq!(report.status, ReportStatus::Failed);
    assert_eq!(report.node_reports[&a].status, ReportStatus::Success);
    assert_eq!(report.node_reports[&b].status, ReportStatus::Failed);
    assert_eq!(report.node_reports[&c].status, ReportStatus::Success);
    assert!(!report.node_reports.contains_key(&d));
    assert_eq!(report.skipped, vec![d]);
}

#[tokio::test]
async fn a_panicking_node_is_reported_as_failed_and_never_left_out_of_skipped() {
    let a = NodeId::new();
    let b = NodeId::new();
    let c = NodeId::new();
    let mut graph = TaskGraph::new();
    graph.add_node(TaskNode::new(a, "agent", json!("a")));
    graph.add_node(TaskNode::new(b, "agent", json!("panic")).depends_on(a));
    graph.add_node(TaskNode::new(c, "agent", json!("c")).depends_on(a));

    let executor = DagExecutor::new(test_engine(PanickingAdapter), 4, FailurePolicy::IsolateBranch);
    let report = executor.submit(&graph, PolicyConfig::default()).await.unwrap();

    assert_eq!(report.status, ReportStatus::Failed);
    assert_eq!(report.node_reports[&a].status, ReportStatus::Success);
    assert_eq!(report.node_reports[&c].status, ReportStatus::Success);
    assert!(!report.node_reports.contains_key(&b));
    assert!(report.skipped.contains(&b));
}

#[tokio::test]
async fn cyclic_graph_is_rejected_before_any_node_runs() {
    let a = NodeId::new();
    let b = NodeId::new();
    let mut graph = TaskGraph::new();
    graph.add_node(TaskNode::new(a, "agent", json!(null)).depends_on(b));
    graph.add_node(TaskNode::new(b, "agent", json!(null)).depends_on(a));

    let executor = DagExecutor::new(test_engine(MarkedFailureAdapter), 4, FailurePolicy::default());
    let err = executor.submit(&graph, PolicyConfig::default()).await.unwrap_err();
    assert!(matches!(err, DagError::Cycle));
}

#[tokio::test]
async fn concurrency_never_exceeds_max_concurrency() {
    let mut graph = TaskGraph::new();
    for _ in 0..5 {
        graph.add_node(TaskNode::new(NodeId::new(), "agent", json!(null)));
    }

    let current = Arc::new(AtomicU32::new(0));
    let peak = Arc::new(AtomicU32::new(0));
    let adapter = ConcurrencyTrackingAdapter { current: Arc::clone(&current), peak: Arc::clone(&peak) };
    let executor = DagExecutor::new(test_engine(adapter), 2, FailurePolicy::default());
    let report = executor.submit(&graph, PolicyConfig::default()).await.unwrap();

    assert_eq!(report.status, ReportStatus::Success);
    assert_eq!(report.node_reports.len(), 5);
    let observed_peak = peak.load(Ordering::SeqCst);
    assert!(observed_peak <= 2, "observed peak concurrency {observed_peak} exceeds the configured bound");
    assert_eq!(observed_peak, 2, "five independent nodes over a bound of two should have saturated it");
}

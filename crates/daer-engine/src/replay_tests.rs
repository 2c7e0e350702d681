use super::*;
use crate::report::ReportStatus;
use crate::RunOptions;
use async_trait::async_trait;
use daer_adapters::fake::FakeAgentAdapter;
use daer_core::execution::{AgentIdentity, PolicyConfig};
use daer_core::{ExecutionSnapshot, FakeClock};
use daer_interception::{NoopSleeper, ToolCallError, ToolExecutor};
use serde_json::{json, Value};
use std::sync::Arc;

struct StubToolExecutor;

#[async_trait]
impl ToolExecutor for StubToolExecutor {
    async fn call(&self, _tool_name: &str, _args: &[Value], _kwargs: &Value) -> Result<Value, ToolCallError> {
        Ok(json!({"tool": "ok"}))
    }
}

#[tokio::test]
async fn safe_replay_returns_the_recorded_outcome() {
    let event_log = Arc::new(MemoryStore::new());
    let snapshots = Arc::new(MemoryStore::new());
    let adapter = FakeAgentAdapter::echo_once(json!("first run"), 7);
    let engine = Engine::new(
        adapter,
        event_log,
        snapshots,
        Arc::new(StubToolExecutor),
        Arc::new(NoopSleeper),
        FakeClock::new(),
        "0.1.0",
        "tools-v1",
    );

    let original = engine.run(json!("task"), PolicyConfig::default(), RunOptions::default()).await.unwrap();
    let replayed = engine.replay(original.execution_id, ReplayMode::Safe).await.unwrap();

    assert_eq!(replayed.status, ReportStatus::Success);
    assert_eq!(replayed.final_output, json!("first run"));
}

#[tokio::test]
async fn safe_replay_of_non_terminal_execution_reports_internal_failure() {
    let event_log = Arc::new(MemoryStore::new());
    let snapshots = Arc::new(MemoryStore::new());
    let adapter = FakeAgentAdapter::echo_once(json!("x"), 1);
    let engine = Engine::new(
        adapter,
        event_log.clone(),
        snapshots.clone(),
        Arc::new(StubToolExecutor),
        Arc::new(NoopSleeper),
        FakeClock::new(),
        "0.1.0",
        "tools-v1",
    );

    let execution_id = ExecutionId::new();
    let snapshot = ExecutionSnapshot::new(
        execution_id,
        json!("task"),
        PolicyConfig::default(),
        AgentIdentity { name: "fake-agent".into(), version: "0.0.0".into() },
        "tools-v1".into(),
        "0.1.0".into(),
        chrono::Utc::now(),
    );
    snapshots.put_snapshot(&snapshot).unwrap();
    event_log
        .append(daer_core::event::EventDraft::new(
            execution_id,
            chrono::Utc::now(),
            daer_core::event::EventPayload::ExecutionStarted { task: json!("task") },
        ))
        .unwrap();

    let report = engine.replay(execution_id, ReplayMode::Safe).await.unwrap();

    assert_eq!(report.status, ReportStatus::Failed);
    assert_eq!(report.failure.unwrap().kind, FailureKind::Internal);
}

#[tokio::test]
async fn forced_replay_of_a_deterministic_execution_matches_history() {
    let event_log = Arc::new(MemoryStore::new());
    let snapshots = Arc::new(MemoryStore::new());
    let adapter = FakeAgentAdapter::echo_once(json!("stable"), 4);
    let engine = Engine::new(
        adapter,
        event_log,
        snapshots,
        Arc::new(StubToolExecutor),
        Arc::new(NoopSleeper),
        FakeClock::new(),
        "0.1.0",
        "tools-v1",
    );

    let original = engine.run(json!("task"), PolicyConfig::default(), RunOptions::default()).await.unwrap();
    let replayed = engine
        .replay(original.execution_id, ReplayMode::Forced { idempotent_tools: Default::default() })
        .await
        .unwrap();

    assert_eq!(replayed.status, ReportStatus::Success);
    assert_eq!(replayed.final_output, json!("stable"));
}

#[tokio::test]
async fn forced_replay_detects_a_divergent_adapter() {
    let event_log = Arc::new(MemoryStore::new());
    let snapshots = Arc::new(MemoryStore::new());

    // First run: adapter produces "v1".
    let adapter = FakeAgentAdapter::echo_once(json!("v1"), 1);
    let engine = Engine::new(
        adapter,
        event_log.clone(),
        snapshots.clone(),
        Arc::new(StubToolExecutor),
        Arc::new(NoopSleeper),
        FakeClock::new(),
        "0.1.0",
        "tools-v1",
    );
    let original = engine.run(json!("task"), PolicyConfig::default(), RunOptions::default()).await.unwrap();

    // A second engine, same log/snapshot store, but a differently-behaving
    // adapter standing in for a redeployed agent that now produces "v2" for
    // the same task — the determinism the forced audit is meant to catch.
    let drifted_adapter = FakeAgentAdapter::echo_once(json!("v2"), 1);
    let drifted_engine = Engine::new(
        drifted_adapter,
        event_log,
        snapshots,
        Arc::new(StubToolExecutor),
        Arc::new(NoopSleeper),
        FakeClock::new(),
        "0.1.0",
        "tools-v1",
    );

    let replayed = drifted_engine
        .replay(original.execution_id, ReplayMode::Forced { idempotent_tools: Default::default() })
        .await
        .unwrap();

    assert_eq!(replayed.status, ReportStatus::Failed);
    assert_eq!(replayed.failure.unwrap().kind, FailureKind::DeterminismViolation);
}

#[tokio::test]
async fn forced_replay_refuses_non_idempotent_tool_without_override() {
    let event_log = Arc::new(MemoryStore::new());
    let snapshots = Arc::new(MemoryStore::new());
    let adapter = FakeAgentAdapter::with_tool_call("charge_card", vec![json!(100)]);
    let engine = Engine::new(
        adapter,
        event_log,
        snapshots,
        Arc::new(StubToolExecutor),
        Arc::new(NoopSleeper),
        FakeClock::new(),
        "0.1.0",
        "tools-v1",
    );

    let policy = PolicyConfig { max_steps: Some(1), ..PolicyConfig::default() };
    let original = engine.run(json!("task"), policy, RunOptions::default()).await.unwrap();

    let err = engine
        .replay(original.execution_id, ReplayMode::Forced { idempotent_tools: Default::default() })
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::NonIdempotentTool { .. }));
}

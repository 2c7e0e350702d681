use super::*;
use daer_core::execution::RetryConfig;
use serde_json::json;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use tempfile::tempdir;

struct AlwaysOk;

#[async_trait]
impl ToolExecutor for AlwaysOk {
    async fn call(&self, _tool_name: &str, _args: &[Value], _kwargs: &Value) -> Result<Value, ToolCallError> {
        Ok(json!({"ok": true}))
    }
}

struct FailsNTimes {
    remaining: AtomicU32,
    retryable: bool,
}

#[async_trait]
impl ToolExecutor for FailsNTimes {
    async fn call(&self, _tool_name: &str, _args: &[Value], _kwargs: &Value) -> Result<Value, ToolCallError> {
        let remaining = self.remaining.load(Ordering::SeqCst);
        if remaining == 0 {
            return Ok(json!("recovered"));
        }
        self.remaining.store(remaining - 1, Ordering::SeqCst);
        Err(ToolCallError::Failed { message: "boom".to_string(), retryable: self.retryable })
    }
}

fn policy_with_retries(max_retries: u32) -> PolicyConfig {
    PolicyConfig {
        retry_config: RetryConfig { max_retries, initial_delay_ms: 1, backoff_multiplier: 1.0 },
        ..PolicyConfig::default()
    }
}

#[tokio::test]
async fn first_call_executes_and_records_success() {
    let dir = tempdir().unwrap();
    let log = EventLog::open(dir.path()).unwrap();
    let execution_id = ExecutionId::new();

    let result = intercept(
        &AlwaysOk,
        &NoopSleeper,
        &log,
        execution_id,
        0,
        &HashSet::new(),
        &PolicyConfig::default(),
        "search",
        &[json!("q")],
        &json!({}),
    )
    .await
    .unwrap();

    assert_eq!(result, json!({"ok": true}));
    let events = log.read(execution_id).unwrap();
    assert!(events.iter().any(|e| matches!(e.payload, EventPayload::ToolCallStarted { .. })));
    assert!(events.iter().any(|e| matches!(e.payload, EventPayload::ToolCallSuccess { .. })));
}

#[tokio::test]
async fn duplicate_call_is_served_from_cache_without_reinvoking() {
    let dir = tempdir().unwrap();
    let log = EventLog::open(dir.path()).unwrap();
    let execution_id = ExecutionId::new();
    let hash = arg_hash("search", &[json!("q")], &json!({}));

    log.append(EventDraft::new(
        execution_id,
        chrono::Utc::now(),
        EventPayload::ToolCallSuccess {
            tool_name: "search".into(),
            arg_hash: hash.clone(),
            result: json!("cached"),
            token_cost: None,
        },
    ))
    .unwrap();

    let mut completed = HashSet::new();
    completed.insert(hash);

    struct Panics;
    #[async_trait]
    impl ToolExecutor for Panics {
        async fn call(&self, _: &str, _: &[Value], _: &Value) -> Result<Value, ToolCallError> {
            Err(ToolCallError::Failed { message: "should never be called".into(), retryable: false })
        }
    }

    let result = intercept(
        &Panics,
        &NoopSleeper,
        &log,
        execution_id,
        0,
        &completed,
        &PolicyConfig::default(),
        "search",
        &[json!("q")],
        &json!({}),
    )
    .await
    .unwrap();

    assert_eq!(result, json!("cached"));
}

#[tokio::test]
async fn retryable_failure_retries_and_eventually_succeeds() {
    let dir = tempdir().unwrap();
    let log = EventLog::open(dir.path()).unwrap();
    let execution_id = ExecutionId::new();
    let executor = FailsNTimes { remaining: AtomicU32::new(2), retryable: true };

    let result = intercept(
        &executor,
        &NoopSleeper,
        &log,
        execution_id,
        0,
        &HashSet::new(),
        &policy_with_retries(3),
        "flaky",
        &[],
        &json!({}),
    )
    .await
    .unwrap();

    assert_eq!(result, json!("recovered"));
    let retries = log
        .read(execution_id)
        .unwrap()
        .into_iter()
        .filter(|e| matches!(e.payload, EventPayload::RetryAttempted { .. }))
        .count();
    assert_eq!(retries, 2);
}

#[tokio::test]
async fn retryable_failure_exhausts_after_max_retries() {
    let dir = tempdir().unwrap();
    let log = EventLog::open(dir.path()).unwrap();
    let execution_id = ExecutionId::new();
    let executor = FailsNTimes { remaining: AtomicU32::new(10), retryable: true };

    let err = intercept(
        &executor,
        &NoopSleeper,
        &log,
        execution_id,
        0,
        &HashSet::new(),
        &policy_with_retries(2),
        "flaky",
        &[],
        &json!({}),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, InterceptionError::Exhausted { .. }));
}

#[tokio::test]
async fn fatal_failure_never_retries() {
    let dir = tempdir().unwrap();
    let log = EventLog::open(dir.path()).unwrap();
    let execution_id = ExecutionId::new();
    let executor = FailsNTimes { remaining: AtomicU32::new(10), retryable: false };

    let err = intercept(
        &executor,
        &NoopSleeper,
        &log,
        execution_id,
        0,
        &HashSet::new(),
        &policy_with_retries(5),
        "flaky",
        &[],
        &json!({}),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, InterceptionError::Fatal { .. }));
    let retries = log
        .read(execution_id)
        .unwrap()
        .into_iter()
        .filter(|e| matches!(e.payload, EventPayload::RetryAttempted { .. }))
        .count();
    assert_eq!(retries, 0);
}

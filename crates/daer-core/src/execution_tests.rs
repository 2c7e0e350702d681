use super::*;
use serde_json::json;

fn identity() -> AgentIdentity {
    AgentIdentity { name: "planner".into(), version: "1.0.0".into() }
}

#[test]
fn same_inputs_produce_same_hash() {
    let snap1 = ExecutionSnapshot::new(
        ExecutionId::new(),
        json!("echo"),
        PolicyConfig::default(),
        identity(),
        "tools-v1".into(),
        "0.1.0".into(),
        Utc::now(),
    );
    let snap2 = ExecutionSnapshot::new(
        ExecutionId::new(),
        json!("echo"),
        PolicyConfig::default(),
        identity(),
        "tools-v1".into(),
        "0.1.0".into(),
        Utc::now(),
    );
    // execution_id and created_at differ, but the hash only covers
    // task/policy/identity/runtime — so it must still match.
    assert_eq!(snap1.execution_hash, snap2.execution_hash);
}

#[test]
fn different_policy_changes_the_hash() {
    let mut policy_a = PolicyConfig::default();
    policy_a.max_tokens = Some(100);
    let mut policy_b = PolicyConfig::default();
    policy_b.max_tokens = Some(200);

    let snap_a = ExecutionSnapshot::new(
        ExecutionId::new(),
        json!("echo"),
        policy_a,
        identity(),
        "tools-v1".into(),
        "0.1.0".into(),
        Utc::now(),
    );
    let snap_b = ExecutionSnapshot::new(
        ExecutionId::new(),
        json!("echo"),
        policy_b,
        identity(),
        "tools-v1".into(),
        "0.1.0".into(),
        Utc::now(),
    );

    assert_ne!(snap_a.execution_hash, snap_b.execution_hash);
    assert!(snap_a.hash_matches_current_config());
}

#[test]
fn hash_matches_current_config_detects_tamper() {
    let mut snap = ExecutionSnapshot::new(
        ExecutionId::new(),
        json!("echo"),
        PolicyConfig::default(),
        identity(),
        "tools-v1".into(),
        "0.1.0".into(),
        Utc::now(),
    );
    assert!(snap.hash_matches_current_config());

    snap.policy_config.max_tokens = Some(999);
    assert!(!snap.hash_matches_current_config());
}

#[test]
fn hash_matches_detects_tool_registry_drift() {
    let snap = ExecutionSnapshot::new(
        ExecutionId::new(),
        json!("echo"),
        PolicyConfig::default(),
        identity(),
        "tools-v1".into(),
        "0.1.0".into(),
        Utc::now(),
    );
    assert!(snap.hash_matches("0.1.0", "tools-v1"));
    assert!(!snap.hash_matches("0.1.0", "tools-v2"));
    assert!(!snap.hash_matches("0.2.0", "tools-v1"));
}

#[test]
fn allows_tool_defaults_to_allow_all() {
    let policy = PolicyConfig::default();
    assert!(policy.allows_tool("search"));
    assert!(policy.allows_tool("anything"));
}

#[test]
fn allows_tool_respects_allowlist() {
    let mut policy = PolicyConfig::default();
    policy.allowed_tools = Some(vec!["search".into()]);
    assert!(policy.allows_tool("search"));
    assert!(!policy.allows_tool("fetch"));
}

#[test]
fn retry_config_backoff_grows_exponentially() {
    let retry = RetryConfig { max_retries: 5, initial_delay_ms: 100, backoff_multiplier: 2.0 };
    assert_eq!(retry.delay_for_attempt(0).as_millis(), 100);
    assert_eq!(retry.delay_for_attempt(1).as_millis(), 200);
    assert_eq!(retry.delay_for_attempt(2).as_millis(), 400);
}

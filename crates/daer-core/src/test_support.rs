// SPDX-License-Identifier: MIT

//! Shared test builders, available to other crates via `test-support`.

use crate::execution::{AgentIdentity, ExecutionSnapshot, PolicyConfig};
use crate::ids::ExecutionId;
use chrono::Utc;
use serde_json::{json, Value};

/// Build a minimal valid snapshot for an "echo" task, with default policy.
pub fn sample_snapshot() -> ExecutionSnapshot {
    sample_snapshot_with(json!("echo"), PolicyConfig::default())
}

pub fn sample_snapshot_with(task: Value, policy_config: PolicyConfig) -> ExecutionSnapshot {
    ExecutionSnapshot::new(
        ExecutionId::new(),
        task,
        policy_config,
        AgentIdentity { name: "test-agent".into(), version: "0.0.0".into() },
        "test-tools".into(),
        "0.0.0".into(),
        Utc::now(),
    )
}

// SPDX-License-Identifier: MIT

//! `ExecutionSnapshot` — the immutable configuration captured once at the
//! start of an execution (spec §3).

use crate::canonical::canonical_json;
use crate::ids::ExecutionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// The frozen governance parameters for one execution (spec §4.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default)]
    pub max_steps: Option<u32>,
    #[serde(default)]
    pub max_tokens: Option<u64>,
    #[serde(default)]
    pub max_tool_calls: Option<u64>,
    /// Wall-clock bound from `EXECUTION_STARTED`, in seconds.
    #[serde(default)]
    pub execution_timeout_secs: Option<u64>,
    /// Permitted tool names. `None` means allow-all (spec §9 open question (a):
    /// "Specification assumes allow-all; a deployment may override").
    #[serde(default)]
    pub allowed_tools: Option<Vec<String>>,
    #[serde(default)]
    pub retry_config: RetryConfig,
    /// How long the Event Log retains this execution's events after it
    /// reaches a terminal state, in seconds. `None` means the backend's
    /// own default (the Redis reference encoding defaults to 7 days).
    #[serde(default)]
    pub event_retention_seconds: Option<u64>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            max_steps: None,
            max_tokens: None,
            max_tool_calls: None,
            execution_timeout_secs: None,
            allowed_tools: None,
            retry_config: RetryConfig::default(),
            event_retention_seconds: None,
        }
    }
}

impl PolicyConfig {
    pub fn allows_tool(&self, tool_name: &str) -> bool {
        match &self.allowed_tools {
            None => true,
            Some(allowed) => allowed.iter().any(|t| t == tool_name),
        }
    }
}

/// Retry/backoff parameters for the Tool Interception layer (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_retries: 3, initial_delay_ms: 100, backoff_multiplier: 2.0 }
    }
}

impl RetryConfig {
    /// `delay_i = initial_delay * backoff_multiplier^i` (spec §4.4).
    pub fn delay_for_attempt(&self, attempt: u32) -> std::time::Duration {
        let millis = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        std::time::Duration::from_millis(millis.round() as u64)
    }
}

/// Identity of the adapter driving an execution: name + version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentIdentity {
    pub name: String,
    pub version: String,
}

/// The immutable configuration captured once per execution (spec §3).
///
/// Never mutated after creation. Resuming with a snapshot whose
/// recomputed `execution_hash` differs from the stored one fails with
/// `ExecutionHashMismatch` (spec §4.6 "Hash continuity").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSnapshot {
    pub execution_id: ExecutionId,
    pub execution_hash: String,
    pub task: Value,
    pub policy_config: PolicyConfig,
    pub agent_identity: AgentIdentity,
    pub tool_registry_identity: String,
    pub runtime_version: String,
    pub created_at: DateTime<Utc>,
}

impl ExecutionSnapshot {
    /// Build a new snapshot, computing its `execution_hash` from the inputs.
    pub fn new(
        execution_id: ExecutionId,
        task: Value,
        policy_config: PolicyConfig,
        agent_identity: AgentIdentity,
        tool_registry_identity: String,
        runtime_version: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        let execution_hash = compute_execution_hash(
            &task,
            &policy_config,
            &agent_identity,
            &tool_registry_identity,
            &runtime_version,
        );
        Self {
            execution_id,
            execution_hash,
            task,
            policy_config,
            agent_identity,
            tool_registry_identity,
            runtime_version,
            created_at,
        }
    }

    /// Recompute the hash from this snapshot's own stored fields and
    /// compare against the stored hash. Detects a corrupted/tampered
    /// snapshot record; always true for a snapshot nobody has touched
    /// since [`ExecutionSnapshot::new`].
    pub fn hash_matches_current_config(&self) -> bool {
        let recomputed = compute_execution_hash(
            &self.task,
            &self.policy_config,
            &self.agent_identity,
            &self.tool_registry_identity,
            &self.runtime_version,
        );
        recomputed == self.execution_hash
    }

    /// Recompute the hash substituting the *resuming process's* current
    /// `runtime_version`/`tool_registry_identity` for the stored ones, and
    /// compare against the stored hash. This is the real continuity check
    /// (spec §4.6 "Hash continuity"): it catches a resume landing on a
    /// redeployed runtime or a changed tool registry, which
    /// [`Self::hash_matches_current_config`] cannot since it only ever
    /// compares a snapshot against itself.
    pub fn hash_matches(&self, runtime_version: &str, tool_registry_identity: &str) -> bool {
        let recomputed = compute_execution_hash(
            &self.task,
            &self.policy_config,
            &self.agent_identity,
            tool_registry_identity,
            runtime_version,
        );
        recomputed == self.execution_hash
    }
}

/// SHA-256 over `{task, policy_config, agent_identity+version, tool_registry_identity, runtime_version}`.
///
/// Stable across equivalent inputs (spec §3): identical task/policy/identity
/// always produce the same hash regardless of field insertion order, via
/// [`canonical_json`].
fn compute_execution_hash(
    task: &Value,
    policy_config: &PolicyConfig,
    agent_identity: &AgentIdentity,
    tool_registry_identity: &str,
    runtime_version: &str,
) -> String {
    let policy_value = serde_json::to_value(policy_config).unwrap_or(Value::Null);
    let identity_value = serde_json::to_value(agent_identity).unwrap_or(Value::Null);
    let envelope = serde_json::json!({
        "task": task,
        "policy_config": policy_value,
        "agent_identity": identity_value,
        "tool_registry_identity": tool_registry_identity,
        "runtime_version": runtime_version,
    });
    let text = canonical_json(&envelope);
    let digest = Sha256::digest(text.as_bytes());
    crate::canonical::to_hex(&digest)
}

#[cfg(test)]
#[path = "execution_tests.rs"]
mod tests;

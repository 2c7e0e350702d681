// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! daer-adapters: the `AgentAdapter` capability set (spec §6).
//!
//! The Runtime treats an agent as an opaque computation; `AgentAdapter` is
//! the one contract every agent implementation is required to satisfy —
//! "a small capability set (one method plus metadata)" by design (spec
//! §9). Adapters are polymorphic over this trait the way the teacher's
//! agents are polymorphic over `AgentAdapter` in
//! `daemon/src/adapters/agent/mod.rs`, just with a much smaller surface.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

/// Errors an adapter can surface from `invoke`. Carries its own
/// retryable/fatal classification (spec §7 "AdapterError: classified by
/// adapter as retryable/fatal") — the Policy Engine trusts this rather
/// than inspecting the adapter's internals.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct AdapterError {
    pub message: String,
    pub retryable: bool,
}

impl AdapterError {
    pub fn retryable(message: impl Into<String>) -> Self {
        Self { message: message.into(), retryable: true }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self { message: message.into(), retryable: false }
    }
}

/// Everything the adapter needs to produce the next step: the task, the
/// accumulated output so far, and the step index about to run.
#[derive(Debug, Clone)]
pub struct StepContext {
    pub task: Value,
    pub step_number: u32,
    pub last_output: Option<Value>,
}

/// A tool call the adapter wants run, surfaced back to the Engine so it
/// can be routed through `daer-interception` instead of the adapter
/// calling tools directly (keeps the idempotency boundary in one place).
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub tool_name: String,
    pub args: Vec<Value>,
    pub kwargs: Value,
}

/// What one `invoke` call produced (spec §6's
/// `step_result{output, tokens, done, tools_called?}`).
#[derive(Debug, Clone)]
pub struct StepResult {
    pub output: Value,
    pub tokens: u64,
    pub done: bool,
    pub tools_called: Vec<ToolInvocation>,
}

/// The one contract the Engine requires of an agent (spec §6).
#[async_trait]
pub trait AgentAdapter: Send + Sync {
    async fn invoke(&self, context: StepContext) -> Result<StepResult, AdapterError>;

    /// Name reported in `ExecutionSnapshot.agent_identity` (spec §3).
    fn name(&self) -> &str;

    /// Version reported in `ExecutionSnapshot.agent_identity` (spec §3).
    fn version(&self) -> &str;
}

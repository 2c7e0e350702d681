// SPDX-License-Identifier: MIT

//! A shared event log / snapshot pair plus a fake clock, reused across
//! every crate's integration-style tests so a crash-and-resume scenario
//! can be built by constructing a second `Engine` over the same backing
//! store rather than hand-wiring `MemoryStore` in every test module.

use std::sync::Arc;

use daer_adapters::AgentAdapter;
use daer_core::clock::FakeClock;
use daer_core::ids::ExecutionId;
use daer_engine::Engine;
use daer_interception::{NoopSleeper, Sleeper, ToolCallError, ToolExecutor};
use daer_storage::MemoryStore;
use serde_json::Value;

/// A `ToolExecutor` that fails every call; the default for tests that
/// never expect a tool invocation to actually run.
pub struct UnreachableToolExecutor;

#[async_trait::async_trait]
impl ToolExecutor for UnreachableToolExecutor {
    async fn call(&self, tool_name: &str, _args: &[Value], _kwargs: &Value) -> Result<Value, ToolCallError> {
        Err(ToolCallError::Failed { message: format!("unexpected tool call: {tool_name}"), retryable: false })
    }
}

/// One in-memory event log + snapshot store + fake clock, shared by every
/// `Engine` built against it so that rehydrating a second `Engine` for the
/// same `execution_id` sees the first one's events (the crash/resume
/// shape every replay test needs).
pub struct TestHarness {
    pub event_log: Arc<MemoryStore>,
    pub snapshots: Arc<MemoryStore>,
    pub clock: FakeClock,
    pub tool_executor: Arc<dyn ToolExecutor>,
    pub sleeper: Arc<dyn Sleeper>,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    pub fn new() -> Self {
        Self {
            event_log: Arc::new(MemoryStore::new()),
            snapshots: Arc::new(MemoryStore::new()),
            clock: FakeClock::new(),
            tool_executor: Arc::new(UnreachableToolExecutor),
            sleeper: Arc::new(NoopSleeper),
        }
    }

    /// Swap in a tool executor, for scenarios that do expect a call.
    pub fn with_tool_executor(mut self, tool_executor: Arc<dyn ToolExecutor>) -> Self {
        self.tool_executor = tool_executor;
        self
    }

    /// Build an `Engine` over this harness's shared backing store. Call
    /// this again with the same `A` to simulate a process restart:
    /// the new `Engine` has no in-memory state of its own, only what it
    /// can read back from `event_log`/`snapshots`.
    pub fn engine<A: AgentAdapter>(&self, adapter: A) -> Engine<A, FakeClock> {
        Engine::new(
            adapter,
            self.event_log.clone(),
            self.snapshots.clone(),
            self.tool_executor.clone(),
            self.sleeper.clone(),
            self.clock.clone(),
            "test-runtime",
            "test-tools-v1",
        )
    }

    /// The raw event stream recorded for `execution_id`, in append order.
    pub fn events(&self, execution_id: ExecutionId) -> Vec<daer_core::event::Event> {
        self.event_log.read(execution_id)
    }
}

#[cfg(test)]
#[path = "harness_tests.rs"]
mod tests;

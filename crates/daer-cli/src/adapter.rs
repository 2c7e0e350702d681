// SPDX-License-Identifier: MIT

//! A minimal concrete `AgentAdapter`/`ToolExecutor` pair for the CLI demo
//! commands. `daer-adapters::fake::FakeAgentAdapter` is gated behind
//! `test-support` and scripted for unit tests; this is the release-mode
//! equivalent a real deployment would replace with its own agent binding.

use async_trait::async_trait;
use daer_adapters::{AdapterError, AgentAdapter, StepContext, StepResult};
use daer_interception::ToolCallError;
use serde_json::{json, Value};

/// Finishes in one step, echoing the task back as the final output.
pub struct EchoAdapter;

#[async_trait]
impl AgentAdapter for EchoAdapter {
    async fn invoke(&self, context: StepContext) -> Result<StepResult, AdapterError> {
        Ok(StepResult { output: context.task, tokens: 1, done: true, tools_called: Vec::new() })
    }

    fn name(&self) -> &str {
        "echo-adapter"
    }

    fn version(&self) -> &str {
        "0.1.0"
    }
}

/// Reports every call back to the caller instead of touching anything
/// external; used by `daer dag` so a demo graph runs without real tools.
pub struct EchoToolExecutor;

#[async_trait]
impl daer_interception::ToolExecutor for EchoToolExecutor {
    async fn call(&self, tool_name: &str, args: &[Value], kwargs: &Value) -> Result<Value, ToolCallError> {
        Ok(json!({ "tool": tool_name, "args": args, "kwargs": kwargs }))
    }
}

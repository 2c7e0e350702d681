// SPDX-License-Identifier: MIT

//! A scriptable `AgentAdapter` for tests, recording every `invoke` call it
//! receives. Gated behind `test-support` so other crates' tests can depend
//! on it without pulling it into release builds.

use crate::{AdapterError, AgentAdapter, StepContext, StepResult, ToolInvocation};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

/// One recorded call to [`FakeAgentAdapter::invoke`].
#[derive(Debug, Clone)]
pub struct AgentCall {
    pub step_number: u32,
    pub last_output: Option<Value>,
}

/// A scripted sequence of responses, one per `invoke` call; the last
/// scripted response repeats once the script is exhausted.
pub struct FakeAgentAdapter {
    name: String,
    version: String,
    script: Vec<Result<StepResult, AdapterError>>,
    calls: Mutex<Vec<AgentCall>>,
}

impl FakeAgentAdapter {
    pub fn new(script: Vec<Result<StepResult, AdapterError>>) -> Self {
        Self { name: "fake-agent".to_string(), version: "0.0.0".to_string(), script, calls: Mutex::new(Vec::new()) }
    }

    /// Convenience for the common case: every step echoes `output` and
    /// finishes immediately.
    pub fn echo_once(output: Value, tokens: u64) -> Self {
        Self::new(vec![Ok(StepResult { output, tokens, done: true, tools_called: Vec::new() })])
    }

    pub fn with_tool_call(tool_name: impl Into<String>, args: Vec<Value>) -> Self {
        Self::new(vec![Ok(StepResult {
            output: Value::Null,
            tokens: 1,
            done: false,
            tools_called: vec![ToolInvocation { tool_name: tool_name.into(), args, kwargs: Value::Null }],
        })])
    }

    pub fn calls(&self) -> Vec<AgentCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl AgentAdapter for FakeAgentAdapter {
    async fn invoke(&self, context: StepContext) -> Result<StepResult, AdapterError> {
        self.calls.lock().push(AgentCall { step_number: context.step_number, last_output: context.last_output });
        let index = (self.calls.lock().len() - 1).min(self.script.len().saturating_sub(1));
        match self.script.get(index) {
            Some(Ok(result)) => Ok(result.clone()),
            Some(Err(err)) => Err(AdapterError { message: err.message.clone(), retryable: err.retryable }),
            None => Err(AdapterError::fatal("FakeAgentAdapter has no scripted response")),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }
}

// SPDX-License-Identifier: MIT

//! Event types for the Runtime (spec §3).
//!
//! Serializes with `{"event_type": "EVENT_NAME", ...fields}` format, mirroring
//! the teacher's `#[serde(tag = "type")]` events but using the literal
//! `event_type` tag and `SCREAMING_SNAKE_CASE` names the spec's wire contract
//! (§6) names explicitly.

use crate::error::FailureKind;
use crate::ids::{EventId, ExecutionId, TraceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The five states of the Execution Engine's lifecycle state machine (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    Init,
    Plan,
    Execute,
    Review,
    Terminate,
}

crate::simple_display! {
    LifecycleState {
        Init => "INIT",
        Plan => "PLAN",
        Execute => "EXECUTE",
        Review => "REVIEW",
        Terminate => "TERMINATE",
    }
}

/// Optional span/trace identifiers carried on every event (spec §3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceContext {
    pub trace_id: TraceId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span_id: Option<String>,
}

/// Event-type-specific payload (spec §3's `payload` field).
///
/// Unknown `event_type` tags deserialize to `Custom`, so the Event Log can
/// tolerate forward-compatible additions without failing replay of older logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum EventPayload {
    #[serde(rename = "EXECUTION_STARTED")]
    ExecutionStarted { task: Value },

    #[serde(rename = "STATE_ENTER")]
    StateEnter { state: LifecycleState },

    #[serde(rename = "STEP_STARTED")]
    StepStarted {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        agent_name: Option<String>,
    },

    #[serde(rename = "STEP_COMPLETED")]
    StepCompleted {
        output: Value,
        tokens: u64,
        /// Cumulative token usage *after* this step (spec's `token_usage` accumulator).
        cumulative_tokens: u64,
    },

    #[serde(rename = "TOOL_CALL_STARTED")]
    ToolCallStarted { tool_name: String, arg_hash: String },

    #[serde(rename = "TOOL_CALL_SUCCESS")]
    ToolCallSuccess {
        tool_name: String,
        arg_hash: String,
        result: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token_cost: Option<u64>,
    },

    #[serde(rename = "TOOL_CALL_FAILED")]
    ToolCallFailed { tool_name: String, arg_hash: String, error_kind: String },

    #[serde(rename = "RETRY_ATTEMPTED")]
    RetryAttempted { attempt: u32, delay_ms: u64 },

    #[serde(rename = "POLICY_VIOLATION")]
    PolicyViolation { rule: crate::error::PolicyRule },

    #[serde(rename = "EXECUTION_COMPLETED")]
    ExecutionCompleted { total_steps: u32, token_usage: u64, final_output: Value },

    #[serde(rename = "EXECUTION_FAILED")]
    ExecutionFailed { kind: FailureKind, detail: String },

    #[serde(other, skip_serializing)]
    Custom,
}

impl EventPayload {
    /// The literal `event_type` string, for logging and the wire contract.
    pub fn type_name(&self) -> &'static str {
        match self {
            EventPayload::ExecutionStarted { .. } => "EXECUTION_STARTED",
            EventPayload::StateEnter { .. } => "STATE_ENTER",
            EventPayload::StepStarted { .. } => "STEP_STARTED",
            EventPayload::StepCompleted { .. } => "STEP_COMPLETED",
            EventPayload::ToolCallStarted { .. } => "TOOL_CALL_STARTED",
            EventPayload::ToolCallSuccess { .. } => "TOOL_CALL_SUCCESS",
            EventPayload::ToolCallFailed { .. } => "TOOL_CALL_FAILED",
            EventPayload::RetryAttempted { .. } => "RETRY_ATTEMPTED",
            EventPayload::PolicyViolation { .. } => "POLICY_VIOLATION",
            EventPayload::ExecutionCompleted { .. } => "EXECUTION_COMPLETED",
            EventPayload::ExecutionFailed { .. } => "EXECUTION_FAILED",
            EventPayload::Custom => "CUSTOM",
        }
    }

    /// True for `EXECUTION_COMPLETED` / `EXECUTION_FAILED` (spec's "at most one terminal").
    pub fn is_terminal(&self) -> bool {
        matches!(self, EventPayload::ExecutionCompleted { .. } | EventPayload::ExecutionFailed { .. })
    }
}

/// One immutable, totally-ordered record in the Event Log (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: EventId,
    pub execution_id: ExecutionId,
    /// Monotonic, dense (0, 1, 2, …) — assigned by the Event Log on append.
    pub sequence: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_number: Option<u32>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_context: Option<TraceContext>,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl Event {
    pub fn event_type(&self) -> &'static str {
        self.payload.type_name()
    }

    pub fn is_terminal(&self) -> bool {
        self.payload.is_terminal()
    }
}

/// A not-yet-sequenced event, as constructed by callers before `append()`
/// assigns the `event_id` and `sequence` (spec §4.1's `append(execution_id, event_draft)`).
#[derive(Debug, Clone, PartialEq)]
pub struct EventDraft {
    pub execution_id: ExecutionId,
    pub step_number: Option<u32>,
    pub timestamp: DateTime<Utc>,
    pub trace_context: Option<TraceContext>,
    pub payload: EventPayload,
}

impl EventDraft {
    pub fn new(execution_id: ExecutionId, timestamp: DateTime<Utc>, payload: EventPayload) -> Self {
        Self { execution_id, step_number: None, timestamp, trace_context: None, payload }
    }

    pub fn with_step(mut self, step_number: u32) -> Self {
        self.step_number = Some(step_number);
        self
    }

    pub fn with_trace(mut self, trace: TraceContext) -> Self {
        self.trace_context = Some(trace);
        self
    }

    /// Materialize into a full [`Event`] once the Event Log has assigned
    /// `event_id`/`sequence`. Kept internal to storage in practice, but
    /// exposed so in-process callers (e.g. tests) can build events directly.
    pub fn into_event(self, event_id: EventId, sequence: u64) -> Event {
        Event {
            event_id,
            execution_id: self.execution_id,
            sequence,
            step_number: self.step_number,
            timestamp: self.timestamp,
            trace_context: self.trace_context,
            payload: self.payload,
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;

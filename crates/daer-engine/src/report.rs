// SPDX-License-Identifier: MIT

//! `ExecutionReport` — the terminal summary returned by every Submission
//! API call (spec §6).

use daer_core::error::FailureKind;
use daer_core::event::LifecycleState;
use daer_core::ids::ExecutionId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Success,
    Failed,
}

/// `{kind, detail}` attached to a failed report (spec §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureSummary {
    pub kind: FailureKind,
    pub detail: String,
}

/// The terminal summary of one execution (spec §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub execution_id: ExecutionId,
    pub status: ReportStatus,
    pub agent_name: String,
    pub total_steps: u32,
    pub token_usage: u64,
    pub tool_calls: u64,
    pub state_history: Vec<LifecycleState>,
    pub execution_time_seconds: f64,
    pub final_output: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureSummary>,
}

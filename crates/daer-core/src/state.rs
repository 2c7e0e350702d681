// SPDX-License-Identifier: MIT

//! Derived execution state (spec §3: "`ExecutionState` ... Defined as a pure
//! function `fold(events) → state`").
//!
//! `ExecutionState` is never stored directly — it is always the result of
//! folding an [`Event`] stream. The Engine caches one instance in memory as
//! an optimization, but the cache is never the source of truth; the Log is
//! (spec §9 "Event-sourcing vs. in-place state").

use crate::event::{Event, EventPayload, LifecycleState};
use crate::error::FailureKind;
use serde_json::Value;

/// Terminal outcome recorded once `fold` observes `EXECUTION_COMPLETED` or
/// `EXECUTION_FAILED`.
#[derive(Debug, Clone, PartialEq)]
pub enum Terminal {
    Completed { total_steps: u32, token_usage: u64, final_output: Value },
    Failed { kind: FailureKind, detail: String },
}

/// Pure, derived state of one execution (spec §3).
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionState {
    pub lifecycle: LifecycleState,
    pub state_history: Vec<LifecycleState>,
    /// Number of steps completed so far (`STEP_COMPLETED` count).
    pub step_number: u32,
    pub token_usage: u64,
    pub tool_call_count: u64,
    pub last_output: Option<Value>,
    pub terminal: Option<Terminal>,
    /// The smallest `n` with `STEP_STARTED(n)` but no matching `STEP_COMPLETED(n)`,
    /// i.e. the resume point (spec §4.6 "Resume").
    pub open_step: Option<u32>,
    /// `arg_hash` of every `TOOL_CALL_SUCCESS` seen so far, for the
    /// "tool idempotency" invariant (spec §8) and for callers who want a
    /// cheap in-memory check before going to the Event Log.
    pub completed_tool_hashes: std::collections::HashSet<String>,
}

impl Default for ExecutionState {
    fn default() -> Self {
        Self {
            lifecycle: LifecycleState::Init,
            state_history: Vec::new(),
            step_number: 0,
            token_usage: 0,
            tool_call_count: 0,
            last_output: None,
            terminal: None,
            open_step: None,
            completed_tool_hashes: std::collections::HashSet::new(),
        }
    }
}

impl ExecutionState {
    /// Fold an ordered event stream into the derived state. `events` must
    /// already be ordered by `sequence` (the Event Log guarantees this).
    pub fn fold<'a>(events: impl IntoIterator<Item = &'a Event>) -> Self {
        let mut state = Self::default();
        for event in events {
            state.apply(event);
        }
        state
    }

    /// Apply one event in place. Applying the same event twice is *not*
    /// guaranteed idempotent by this function alone — callers fold a
    /// deduplicated, sequence-ordered stream exactly once.
    pub fn apply(&mut self, event: &Event) {
        match &event.payload {
            EventPayload::ExecutionStarted { .. } => {}
            EventPayload::StateEnter { state } => {
                self.lifecycle = *state;
                self.state_history.push(*state);
            }
            EventPayload::StepStarted { .. } => {
                self.open_step = event.step_number;
            }
            EventPayload::StepCompleted { output, tokens: _, cumulative_tokens } => {
                self.step_number += 1;
                self.token_usage = *cumulative_tokens;
                self.last_output = Some(output.clone());
                if self.open_step == event.step_number {
                    self.open_step = None;
                }
            }
            EventPayload::ToolCallStarted { .. } => {}
            EventPayload::ToolCallSuccess { arg_hash, .. } => {
                self.tool_call_count += 1;
                self.completed_tool_hashes.insert(arg_hash.clone());
            }
            EventPayload::ToolCallFailed { .. } => {}
            EventPayload::RetryAttempted { .. } => {}
            EventPayload::PolicyViolation { .. } => {}
            EventPayload::ExecutionCompleted { total_steps, token_usage, final_output } => {
                self.terminal = Some(Terminal::Completed {
                    total_steps: *total_steps,
                    token_usage: *token_usage,
                    final_output: final_output.clone(),
                });
            }
            EventPayload::ExecutionFailed { kind, detail } => {
                self.terminal =
                    Some(Terminal::Failed { kind: kind.clone(), detail: detail.clone() });
            }
            EventPayload::Custom => {}
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal.is_some()
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;

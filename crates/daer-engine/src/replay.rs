// SPDX-License-Identifier: MIT

//! Replay modes (spec §4.6): safe rehydration and forced re-execution.
//!
//! Safe replay folds the stored log with no side effects and is exposed as
//! [`Engine::rehydrate`]; this module adds the audit-grade mode that
//! actually re-runs the adapter and tool calls against a scratch log and
//! diffs the resulting event fingerprints against history.

use std::collections::HashSet;

use daer_adapters::AgentAdapter;
use daer_core::error::FailureKind;
use daer_core::event::Event;
use daer_core::ids::ExecutionId;
use daer_core::state::ExecutionState;
use daer_core::Clock;
use daer_storage::MemoryStore;
use serde::{Deserialize, Serialize};

use crate::engine::Engine;
use crate::error::EngineError;
use crate::report::{ExecutionReport, FailureSummary, ReportStatus};

/// How [`Engine::replay`] should treat a historical execution.
#[derive(Debug, Clone)]
pub enum ReplayMode {
    /// Fold the stored log with no side effects; report the recorded
    /// outcome as-is. Always safe, never touches the adapter or tools.
    Safe,
    /// Re-run the full step sequence against a scratch, in-memory log and
    /// compare the resulting event fingerprints against history. Refused
    /// by default if the historical log touched a tool not named in
    /// `idempotent_tools`, since re-invoking a non-idempotent tool during
    /// an audit would have a real side effect the first run already had.
    Forced { idempotent_tools: HashSet<String> },
}

/// One event reduced to the fields that matter for determinism comparison:
/// everything that isn't a timestamp, event id, or sequence number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFingerprint {
    pub event_type: &'static str,
    pub step_number: Option<u32>,
    pub detail: String,
}

impl EventFingerprint {
    fn of(event: &Event) -> Self {
        Self { event_type: event.event_type(), step_number: event.step_number, detail: fingerprint_detail(event) }
    }
}

/// The parts of a payload that must match byte-for-byte across a forced
/// re-execution: tool arg hashes and token counts, not wall-clock timing.
fn fingerprint_detail(event: &Event) -> String {
    use daer_core::event::EventPayload::*;
    match &event.payload {
        ExecutionStarted { task } => task.to_string(),
        StateEnter { state } => state.to_string(),
        StepStarted { agent_name } => agent_name.clone().unwrap_or_default(),
        StepCompleted { output, tokens, cumulative_tokens } => {
            format!("{output}|{tokens}|{cumulative_tokens}")
        }
        ToolCallStarted { tool_name, arg_hash } => format!("{tool_name}|{arg_hash}"),
        ToolCallSuccess { tool_name, arg_hash, result, token_cost } => {
            format!("{tool_name}|{arg_hash}|{result}|{token_cost:?}")
        }
        ToolCallFailed { tool_name, arg_hash, error_kind } => format!("{tool_name}|{arg_hash}|{error_kind}"),
        RetryAttempted { attempt, .. } => attempt.to_string(),
        PolicyViolation { rule } => rule.to_string(),
        ExecutionCompleted { total_steps, token_usage, final_output } => {
            format!("{total_steps}|{token_usage}|{final_output}")
        }
        ExecutionFailed { kind, detail } => format!("{kind}|{detail}"),
        Custom => String::new(),
    }
}

/// The first point of divergence found between the historical log and a
/// forced re-execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeterminismViolation {
    pub index: usize,
    pub historical: Option<EventFingerprint>,
    pub replayed: Option<EventFingerprint>,
}

fn fingerprints(events: &[Event]) -> Vec<EventFingerprint> {
    events.iter().map(EventFingerprint::of).collect()
}

/// Compare two fingerprint sequences and return the first divergence, if any.
pub fn diff_fingerprints(historical: &[EventFingerprint], replayed: &[EventFingerprint]) -> Option<DeterminismViolation> {
    let len = historical.len().max(replayed.len());
    for index in 0..len {
        let h = historical.get(index).cloned();
        let r = replayed.get(index).cloned();
        if h != r {
            return Some(DeterminismViolation { index, historical: h, replayed: r });
        }
    }
    None
}

impl<A, C> Engine<A, C>
where
    A: AgentAdapter,
    C: Clock,
{
    /// Replay a completed execution (spec §4.6).
    ///
    /// `Safe` folds the historical log and returns its recorded outcome,
    /// exactly as [`Engine::rehydrate`] would derive it, with no adapter or
    /// tool invocation. `Forced` re-drives the full lifecycle loop against
    /// a scratch [`MemoryStore`] under the same `execution_id` and diffs
    /// the resulting fingerprints against history, surfacing any mismatch
    /// as a `FailureKind::DeterminismViolation` in a `Failed` report.
    pub async fn replay(&self, execution_id: ExecutionId, mode: ReplayMode) -> Result<ExecutionReport, EngineError> {
        let (snapshot, state, historical) = self.rehydrate(execution_id)?;

        match mode {
            ReplayMode::Safe => {
                let started_at = self.clock.now();
                let report = match &state.terminal {
                    Some(terminal) => self.report_from_terminal(&snapshot, &state, terminal.clone()),
                    None => self.report(
                        &snapshot,
                        &state,
                        started_at,
                        ReportStatus::Failed,
                        Some(FailureSummary {
                            kind: FailureKind::Internal,
                            detail: "safe replay of a non-terminal execution has no recorded outcome to report"
                                .to_string(),
                        }),
                    ),
                };
                Ok(report)
            }
            ReplayMode::Forced { idempotent_tools } => {
                if let Some(tool_name) = first_non_idempotent_tool_call(&historical, &idempotent_tools) {
                    return Err(EngineError::NonIdempotentTool { execution_id, tool_name });
                }

                let scratch = std::sync::Arc::new(MemoryStore::new());
                scratch.put_snapshot(&snapshot)?;

                tracing::info!(execution_id = %execution_id, "starting forced re-execution for audit");
                let replayed_report =
                    self.drive(scratch.as_ref(), &snapshot, ExecutionState::default(), None, 0).await?;
                let replayed = scratch.read(execution_id);

                let historical_fp = fingerprints(&historical);
                let replayed_fp = fingerprints(&replayed);

                match diff_fingerprints(&historical_fp, &replayed_fp) {
                    None => Ok(replayed_report),
                    Some(violation) => {
                        tracing::warn!(execution_id = %execution_id, index = violation.index, "determinism violation detected during forced replay");
                        let started_at = self.clock.now();
                        Ok(self.report(
                            &snapshot,
                            &state,
                            started_at,
                            ReportStatus::Failed,
                            Some(FailureSummary {
                                kind: FailureKind::DeterminismViolation,
                                detail: format!(
                                    "events diverge at index {}: historical={:?} replayed={:?}",
                                    violation.index, violation.historical, violation.replayed
                                ),
                            }),
                        ))
                    }
                }
            }
        }
    }
}

fn first_non_idempotent_tool_call(historical: &[Event], idempotent_tools: &HashSet<String>) -> Option<String> {
    historical.iter().find_map(|event| match &event.payload {
        daer_core::event::EventPayload::ToolCallSuccess { tool_name, .. }
            if !idempotent_tools.contains(tool_name) =>
        {
            Some(tool_name.clone())
        }
        _ => None,
    })
}

#[cfg(test)]
#[path = "replay_tests.rs"]
mod tests;

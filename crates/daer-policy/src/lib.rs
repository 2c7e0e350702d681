// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! daer-policy: pre-step and pre-tool validation (spec §4.3).
//!
//! Pure functions over [`ExecutionState`]/[`PolicyConfig`] — the Policy
//! Engine itself holds no state of its own, mirroring the teacher's
//! `gate`/`decision` modules, which also reduce to pure checks over data
//! the Engine already owns.

use daer_core::error::{Classification, FailureKind, PolicyRule};
use daer_core::execution::PolicyConfig;
use daer_core::state::ExecutionState;

/// Outcome of a pre-step or pre-tool check.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Ok,
    Violation(PolicyRule),
}

impl Verdict {
    pub fn is_ok(&self) -> bool {
        matches!(self, Verdict::Ok)
    }
}

/// Run every hard-stop check against the state as of right before a new
/// step begins (spec §4.3's "pre-step check"). Checked in a fixed order so
/// logs are deterministic about which rule fired first.
pub fn validate_pre_step(state: &ExecutionState, policy: &PolicyConfig) -> Verdict {
    if let Some(max_steps) = policy.max_steps {
        if state.step_number >= max_steps {
            return Verdict::Violation(PolicyRule::MaxSteps);
        }
    }
    // Spec §9 open question (b): max_tokens is enforced pre-step against the
    // cumulative total already recorded, not mid-step against a running
    // estimate — an in-flight step is never aborted partway through.
    if let Some(max_tokens) = policy.max_tokens {
        if state.token_usage >= max_tokens {
            return Verdict::Violation(PolicyRule::MaxTokens);
        }
    }
    Verdict::Ok
}

/// Checked immediately before a tool call is dispatched (spec §4.3's
/// "pre-tool check").
pub fn validate_pre_tool(tool_name: &str, state: &ExecutionState, policy: &PolicyConfig) -> Verdict {
    if !policy.allows_tool(tool_name) {
        return Verdict::Violation(PolicyRule::DisallowedTool);
    }
    if let Some(max_tool_calls) = policy.max_tool_calls {
        if state.tool_call_count >= max_tool_calls {
            return Verdict::Violation(PolicyRule::MaxToolCalls);
        }
    }
    Verdict::Ok
}

/// Checked against the wall-clock elapsed since `EXECUTION_STARTED` (spec
/// §4.3's `execution_timeout`), taken out of the per-step checks above
/// since it depends on time rather than accumulated state.
pub fn validate_timeout(elapsed_secs: u64, policy: &PolicyConfig) -> Verdict {
    match policy.execution_timeout_secs {
        Some(limit) if elapsed_secs >= limit => Verdict::Violation(PolicyRule::ExecutionTimeout),
        _ => Verdict::Ok,
    }
}

/// Classify a failure as retryable (subject to `retry_config`) or fatal
/// (terminates the execution immediately) (spec §4.3's "classify error").
///
/// Policy violations and hash/determinism failures are always fatal —
/// retrying them would just fail identically. Tool and adapter errors are
/// retryable by default; timeouts and cancellation are never retried.
pub fn classify(kind: &FailureKind) -> Classification {
    match kind {
        FailureKind::ToolFailure { .. } | FailureKind::AdapterError => Classification::Retryable,
        FailureKind::PolicyViolation { .. }
        | FailureKind::ExecutionHashMismatch
        | FailureKind::DeterminismViolation
        | FailureKind::InvalidTransition
        | FailureKind::EventLogError
        | FailureKind::Cancelled
        | FailureKind::TimedOut
        | FailureKind::Internal => Classification::Fatal,
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

// SPDX-License-Identifier: MIT

//! Shared error taxonomy (spec §7).
//!
//! Every terminal failure in the Runtime surfaces as one of these kinds.
//! Individual crates define their own `thiserror` error enums for
//! operational detail; `FailureKind` is the flattened tag that ends up in
//! `EXECUTION_FAILED.payload.kind` and in [`crate::execution::ExecutionReport`].

use serde::{Deserialize, Serialize};

/// The taxonomy of terminal execution failures.
///
/// `PolicyViolation` and `DeterminismViolation` are never retried.
/// `ToolFailure` with `retryable: false` and `AdapterError` with
/// `retryable: false` are also terminal; the retryable forms are handled
/// internally by the interceptor/engine and never reach this enum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureKind {
    PolicyViolation { rule: PolicyRule },
    ToolFailure { tool_name: String },
    AdapterError,
    ExecutionHashMismatch,
    DeterminismViolation,
    InvalidTransition,
    EventLogError,
    Cancelled,
    TimedOut,
    Internal,
}

crate::simple_display! {
    FailureKind {
        PolicyViolation(..) => "policy_violation",
        ToolFailure(..) => "tool_failure",
        AdapterError => "adapter_error",
        ExecutionHashMismatch => "execution_hash_mismatch",
        DeterminismViolation => "determinism_violation",
        InvalidTransition => "invalid_transition",
        EventLogError => "event_log_error",
        Cancelled => "cancelled",
        TimedOut => "timed_out",
        Internal => "internal",
    }
}

/// Which budget or allowlist a [`FailureKind::PolicyViolation`] breached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyRule {
    MaxSteps,
    MaxTokens,
    MaxToolCalls,
    ExecutionTimeout,
    DisallowedTool,
}

crate::simple_display! {
    PolicyRule {
        MaxSteps => "max_steps",
        MaxTokens => "max_tokens",
        MaxToolCalls => "max_tool_calls",
        ExecutionTimeout => "execution_timeout",
        DisallowedTool => "disallowed_tool",
    }
}

/// Whether an error observed mid-step should be retried or propagated as a
/// step failure (spec §4.3 "Retry classification").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Retryable,
    Fatal,
}

impl Classification {
    pub fn is_retryable(self) -> bool {
        matches!(self, Classification::Retryable)
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;

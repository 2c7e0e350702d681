// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! daer-interception: tool call idempotency and retry (spec §4.4).
//!
//! Every tool call goes through [`intercept`], which hashes the call's
//! arguments, checks whether an identical call already succeeded earlier
//! in this execution's log (dedup across retries/resumes/replays), and
//! otherwise drives the call through [`ToolExecutor`] with exponential
//! backoff, logging `TOOL_CALL_STARTED`/`_SUCCESS`/`_FAILED` and
//! `RETRY_ATTEMPTED` along the way — the same "effect in, event out"
//! shape as the teacher's executor (`daemon/src/engine/executor.rs`).

use async_trait::async_trait;
use daer_core::canonical::arg_hash;
use daer_core::event::{EventDraft, EventPayload};
use daer_core::execution::PolicyConfig;
use daer_core::ids::ExecutionId;
use daer_storage::{EventLogBackend, EventLogError};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolCallError {
    #[error("{message}")]
    Failed { message: String, retryable: bool },
}

/// The caller-supplied tool implementation. Opaque to the Runtime beyond
/// its name, argument shape, and result — it is never introspected, the
/// same way the teacher treats the agent process over `AgentAdapter`.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn call(&self, tool_name: &str, args: &[Value], kwargs: &Value) -> Result<Value, ToolCallError>;
}

/// Injected delay point so tests never actually wait out a backoff.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// A sleeper that returns immediately; used in tests and in forced replay
/// contexts where backoff delay has no meaning.
#[derive(Default)]
pub struct NoopSleeper;

#[async_trait]
impl Sleeper for NoopSleeper {
    async fn sleep(&self, _duration: Duration) {}
}

#[derive(Debug, Error)]
pub enum InterceptionError {
    #[error("event log error: {0}")]
    EventLog(#[from] EventLogError),
    #[error("tool `{tool_name}` failed after exhausting retries: {message}")]
    Exhausted { tool_name: String, message: String },
    #[error("tool `{tool_name}` failed fatally: {message}")]
    Fatal { tool_name: String, message: String },
    #[error("arg_hash {arg_hash} marked complete in state but no TOOL_CALL_SUCCESS found in log")]
    MissingCachedResult { arg_hash: String },
}

/// Drive one tool call through idempotency dedup, then (if needed)
/// execution + retry, appending every event the spec's Event Log schema
/// requires along the way.
#[allow(clippy::too_many_arguments)]
pub async fn intercept(
    executor: &dyn ToolExecutor,
    sleeper: &dyn Sleeper,
    event_log: &dyn EventLogBackend,
    execution_id: ExecutionId,
    step_number: u32,
    already_completed: &std::collections::HashSet<String>,
    policy: &PolicyConfig,
    tool_name: &str,
    args: &[Value],
    kwargs: &Value,
) -> Result<Value, InterceptionError> {
    let hash = arg_hash(tool_name, args, kwargs);

    if already_completed.contains(&hash) {
        return find_cached_result(event_log, execution_id, &hash);
    }

    event_log.append(
        EventDraft::new(
            execution_id,
            chrono::Utc::now(),
            EventPayload::ToolCallStarted { tool_name: tool_name.to_string(), arg_hash: hash.clone() },
        )
        .with_step(step_number),
    )?;

    let retry_config = policy.retry_config;
    let mut attempt = 0u32;
    loop {
        match executor.call(tool_name, args, kwargs).await {
            Ok(result) => {
                event_log.append(
                    EventDraft::new(
                        execution_id,
                        chrono::Utc::now(),
                        EventPayload::ToolCallSuccess {
                            tool_name: tool_name.to_string(),
                            arg_hash: hash,
                            result: result.clone(),
                            token_cost: None,
                        },
                    )
                    .with_step(step_number),
                )?;
                return Ok(result);
            }
            Err(ToolCallError::Failed { message, retryable }) => {
                if retryable && attempt < retry_config.max_retries {
                    let delay = retry_config.delay_for_attempt(attempt);
                    event_log.append(
                        EventDraft::new(
                            execution_id,
                            chrono::Utc::now(),
                            EventPayload::RetryAttempted { attempt, delay_ms: delay.as_millis() as u64 },
                        )
                        .with_step(step_number),
                    )?;
                    tracing::warn!(tool_name, attempt, delay_ms = delay.as_millis() as u64, "retrying tool call");
                    sleeper.sleep(delay).await;
                    attempt += 1;
                    continue;
                }

                event_log.append(
                    EventDraft::new(
                        execution_id,
                        chrono::Utc::now(),
                        EventPayload::ToolCallFailed {
                            tool_name: tool_name.to_string(),
                            arg_hash: hash,
                            error_kind: message.clone(),
                        },
                    )
                    .with_step(step_number),
                )?;

                return if retryable {
                    Err(InterceptionError::Exhausted { tool_name: tool_name.to_string(), message })
                } else {
                    Err(InterceptionError::Fatal { tool_name: tool_name.to_string(), message })
                };
            }
        }
    }
}

/// Recover the result of a `TOOL_CALL_SUCCESS` already recorded for
/// `arg_hash`, for the case where `already_completed` says the call
/// happened but the caller (e.g. a replay) needs the actual payload back.
fn find_cached_result(
    event_log: &dyn EventLogBackend,
    execution_id: ExecutionId,
    hash: &str,
) -> Result<Value, InterceptionError> {
    let events = event_log.read(execution_id)?;
    events
        .into_iter()
        .rev()
        .find_map(|event| match event.payload {
            EventPayload::ToolCallSuccess { arg_hash, result, .. } if arg_hash == hash => Some(result),
            _ => None,
        })
        .ok_or_else(|| InterceptionError::MissingCachedResult { arg_hash: hash.to_string() })
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

// SPDX-License-Identifier: MIT

//! The Execution Engine (spec §4.5): constructs around an immutable
//! `ExecutionSnapshot`, appends `EXECUTION_STARTED`, then loops
//! `PLAN → EXECUTE → REVIEW` once per step until the adapter signals it is
//! done, checking policy before each step and routing every declared tool
//! call through `daer-interception`. On crash, a new `Engine` for the same
//! `execution_id` rehydrates by replaying the log and continues from the
//! first incomplete step — the same "apply effect, derive event, fold into
//! state" shape as the teacher's `Executor`/`MaterializedState` pair.

use crate::error::EngineError;
use crate::report::{ExecutionReport, FailureSummary, ReportStatus};
use daer_adapters::{AgentAdapter, StepContext};
use daer_core::error::{FailureKind, PolicyRule};
use daer_core::event::{Event, EventDraft, EventPayload, LifecycleState, TraceContext};
use daer_core::execution::{AgentIdentity, ExecutionSnapshot, PolicyConfig};
use daer_core::ids::{ExecutionId, TraceId};
use daer_core::state::ExecutionState;
use daer_core::Clock;
use daer_interception::{intercept, InterceptionError, Sleeper, ToolExecutor};
use daer_storage::{EventLogBackend, SnapshotBackend};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use parking_lot::Mutex;

/// Options accepted by [`Engine::run`] (spec §6's Submission API).
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Distributed trace identifier, carried unchanged across replay
    /// (spec §4.6). Generated if not supplied.
    pub trace_id: Option<TraceId>,
}

/// Drives one execution end-to-end against an `A: AgentAdapter`.
///
/// `ToolExecutor`/`Sleeper`/the storage backends are injected as trait
/// objects rather than further type parameters — the Engine is already
/// generic over the one axis the spec calls out as polymorphic (the
/// adapter); the rest are configuration, not identity.
pub struct Engine<A, C>
where
    A: AgentAdapter,
    C: Clock,
{
    adapter: Arc<A>,
    event_log: Arc<dyn EventLogBackend>,
    snapshots: Arc<dyn SnapshotBackend>,
    tool_executor: Arc<dyn ToolExecutor>,
    sleeper: Arc<dyn Sleeper>,
    pub(crate) clock: C,
    runtime_version: String,
    tool_registry_identity: String,
    cancelled: Arc<Mutex<HashSet<ExecutionId>>>,
}

impl<A, C> Clone for Engine<A, C>
where
    A: AgentAdapter,
    C: Clock,
{
    fn clone(&self) -> Self {
        Self {
            adapter: Arc::clone(&self.adapter),
            event_log: Arc::clone(&self.event_log),
            snapshots: Arc::clone(&self.snapshots),
            tool_executor: Arc::clone(&self.tool_executor),
            sleeper: Arc::clone(&self.sleeper),
            clock: self.clock.clone(),
            runtime_version: self.runtime_version.clone(),
            tool_registry_identity: self.tool_registry_identity.clone(),
            cancelled: Arc::clone(&self.cancelled),
        }
    }
}

/// What one `invoke` + its declared tool calls produced.
struct StepOutcome {
    output: Value,
    tokens: u64,
    done: bool,
}

/// Why a step did not produce an outcome; distinguishes "retry this step"
/// from "the execution is over" from "something is actually broken".
enum StepFailure {
    Retryable(String),
    Fatal(FailureKind, String),
    Policy(PolicyRule),
    Infra(EngineError),
}

impl<A, C> Engine<A, C>
where
    A: AgentAdapter,
    C: Clock,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        adapter: A,
        event_log: Arc<dyn EventLogBackend>,
        snapshots: Arc<dyn SnapshotBackend>,
        tool_executor: Arc<dyn ToolExecutor>,
        sleeper: Arc<dyn Sleeper>,
        clock: C,
        runtime_version: impl Into<String>,
        tool_registry_identity: impl Into<String>,
    ) -> Self {
        Self {
            adapter: Arc::new(adapter),
            event_log,
            snapshots,
            tool_executor,
            sleeper,
            clock,
            runtime_version: runtime_version.into(),
            tool_registry_identity: tool_registry_identity.into(),
            cancelled: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Request cancellation of a running execution. Takes effect at the
    /// next step boundary (one of the Runtime's suspension points), not
    /// mid-step.
    pub fn cancel(&self, execution_id: ExecutionId) {
        self.cancelled.lock().insert(execution_id);
    }

    fn is_cancelled(&self, execution_id: ExecutionId) -> bool {
        self.cancelled.lock().contains(&execution_id)
    }

    /// Submit a new task for execution (spec §6's `run`).
    pub async fn run(
        &self,
        task: Value,
        policy: PolicyConfig,
        options: RunOptions,
    ) -> Result<ExecutionReport, EngineError> {
        let execution_id = ExecutionId::new();
        let agent_identity =
            AgentIdentity { name: self.adapter.name().to_string(), version: self.adapter.version().to_string() };
        let snapshot = ExecutionSnapshot::new(
            execution_id,
            task,
            policy,
            agent_identity,
            self.tool_registry_identity.clone(),
            self.runtime_version.clone(),
            Utc::now(),
        );
        let snapshot = self.snapshots.put(&snapshot)?;
        if let Some(secs) = snapshot.policy_config.event_retention_seconds {
            if let Err(e) = self.event_log.set_retention(execution_id, std::time::Duration::from_secs(secs)) {
                tracing::warn!(execution_id = %execution_id, error = %e, "failed to set event retention");
            }
        }
        let trace = Some(TraceContext {
            trace_id: options.trace_id.unwrap_or_else(TraceId::new),
            span_id: None,
        });

        let mut state = ExecutionState::default();
        let event = self.event_log.append(self.draft(
            execution_id,
            EventPayload::ExecutionStarted { task: snapshot.task.clone() },
            None,
            &trace,
        ))?;
        state.apply(&event);
        let event =
            self.event_log
                .append(self.draft(execution_id, EventPayload::StateEnter { state: LifecycleState::Init }, None, &trace))?;
        state.apply(&event);

        tracing::info!(execution_id = %execution_id, "execution started");
        self.drive(self.event_log.as_ref(), &snapshot, state, trace, 0).await
    }

    /// Fire off [`Engine::run`] as a background task (spec §6's
    /// `run_async`). Requires `A` and `C` to outlive the task.
    pub fn run_async(
        &self,
        task: Value,
        policy: PolicyConfig,
        options: RunOptions,
    ) -> tokio::task::JoinHandle<Result<ExecutionReport, EngineError>>
    where
        A: 'static,
        C: 'static,
    {
        let engine = self.clone();
        tokio::spawn(async move { engine.run(task, policy, options).await })
    }

    /// Rehydrate: rebuild state by folding the stored event stream without
    /// invoking the adapter or any tool (spec §4.6 "Rehydration (safe)").
    /// Idempotent and side-effect-free.
    pub fn rehydrate(
        &self,
        execution_id: ExecutionId,
    ) -> Result<(ExecutionSnapshot, ExecutionState, Vec<Event>), EngineError> {
        let snapshot = self.snapshots.get(execution_id)?;
        let events = self.event_log.read(execution_id)?;
        let state = ExecutionState::fold(&events);
        Ok((snapshot, state, events))
    }

    /// Resume an incomplete execution (spec §4.6 "Resume"): rehydrate,
    /// find the smallest `n` with `STEP_STARTED(n)` but no
    /// `STEP_COMPLETED(n)`, and continue from there. Tool interception
    /// prevents re-executing tool calls already completed.
    pub async fn resume(&self, execution_id: ExecutionId) -> Result<ExecutionReport, EngineError> {
        let (snapshot, state, events) = self.rehydrate(execution_id)?;

        if !snapshot.hash_matches(&self.runtime_version, &self.tool_registry_identity) {
            return Err(EngineError::ExecutionHashMismatch(execution_id));
        }

        if let Some(terminal) = &state.terminal {
            tracing::info!(execution_id = %execution_id, "resume found already-terminal execution; returning recorded outcome");
            return Ok(self.report_from_terminal(&snapshot, &state, terminal.clone()));
        }

        let trace = events.iter().find_map(|e| e.trace_context.clone());
        let resume_step = state.open_step.unwrap_or(state.step_number);
        tracing::info!(execution_id = %execution_id, resume_step, "resuming execution");
        self.drive(self.event_log.as_ref(), &snapshot, state, trace, resume_step).await
    }

    fn draft(
        &self,
        execution_id: ExecutionId,
        payload: EventPayload,
        step: Option<u32>,
        trace: &Option<TraceContext>,
    ) -> EventDraft {
        let mut draft = EventDraft::new(execution_id, Utc::now(), payload);
        if let Some(step) = step {
            draft = draft.with_step(step);
        }
        if let Some(trace) = trace {
            draft = draft.with_trace(trace.clone());
        }
        draft
    }

    /// The `PLAN → EXECUTE → REVIEW` loop (spec §4.5), entered fresh from
    /// `run` or partway through from `resume`. Takes `log` explicitly
    /// rather than always reading `self.event_log` so [`Engine::replay`]
    /// can drive the same loop against a scratch, ephemeral log when
    /// auditing a forced re-execution.
    pub(crate) async fn drive(
        &self,
        log: &dyn EventLogBackend,
        snapshot: &ExecutionSnapshot,
        mut state: ExecutionState,
        trace: Option<TraceContext>,
        mut step_number: u32,
    ) -> Result<ExecutionReport, EngineError> {
        let execution_id = snapshot.execution_id;
        let policy = &snapshot.policy_config;
        let started_at = self.clock.now();

        'steps: loop {
            if self.is_cancelled(execution_id) {
                return self.finish_fatal(log, snapshot, &mut state, &trace, started_at, FailureKind::Cancelled, "cancelled by request".to_string());
            }

            let event = log.append(self.draft(execution_id, EventPayload::StateEnter { state: LifecycleState::Plan }, None, &trace))?;
            state.apply(&event);

            let elapsed_secs = (Utc::now() - snapshot.created_at).num_seconds().max(0) as u64;
            if let daer_policy::Verdict::Violation(rule) = daer_policy::validate_timeout(elapsed_secs, policy) {
                return self.finish_policy_violation(log, snapshot, &mut state, &trace, started_at, rule);
            }
            if let daer_policy::Verdict::Violation(rule) = daer_policy::validate_pre_step(&state, policy) {
                return self.finish_policy_violation(log, snapshot, &mut state, &trace, started_at, rule);
            }

            let event = log.append(self.draft(execution_id, EventPayload::StateEnter { state: LifecycleState::Execute }, None, &trace))?;
            state.apply(&event);
            let event = log.append(self.draft(
                execution_id,
                EventPayload::StepStarted { agent_name: Some(self.adapter.name().to_string()) },
                Some(step_number),
                &trace,
            ))?;
            state.apply(&event);

            let mut attempt = 0u32;
            let outcome = loop {
                match self.run_step(log, execution_id, step_number, &snapshot.task, state.last_output.clone(), policy, &mut state).await {
                    Ok(outcome) => break outcome,
                    Err(StepFailure::Infra(err)) => return Err(err),
                    Err(StepFailure::Policy(rule)) => {
                        return self.finish_policy_violation(log, snapshot, &mut state, &trace, started_at, rule);
                    }
                    Err(StepFailure::Fatal(kind, detail)) => {
                        return self.finish_fatal(log, snapshot, &mut state, &trace, started_at, kind, detail);
                    }
                    Err(StepFailure::Retryable(message)) => {
                        if attempt >= policy.retry_config.max_retries {
                            return self.finish_fatal(
                                log,
                                snapshot,
                                &mut state,
                                &trace,
                                started_at,
                                FailureKind::AdapterError,
                                message,
                            );
                        }
                        let delay = policy.retry_config.delay_for_attempt(attempt);
                        let event = log.append(self.draft(
                            execution_id,
                            EventPayload::RetryAttempted { attempt, delay_ms: delay.as_millis() as u64 },
                            Some(step_number),
                            &trace,
                        ))?;
                        state.apply(&event);
                        tracing::warn!(execution_id = %execution_id, step_number, attempt, "retrying step after adapter error");
                        self.sleeper.sleep(delay).await;
                        attempt += 1;
                    }
                }
            };

            let cumulative_tokens = state.token_usage + outcome.tokens;
            let event = log.append(self.draft(
                execution_id,
                EventPayload::StepCompleted { output: outcome.output.clone(), tokens: outcome.tokens, cumulative_tokens },
                Some(step_number),
                &trace,
            ))?;
            state.apply(&event);

            let event = log.append(self.draft(execution_id, EventPayload::StateEnter { state: LifecycleState::Review }, None, &trace))?;
            state.apply(&event);

            if outcome.done {
                let event = log.append(self.draft(
                    execution_id,
                    EventPayload::ExecutionCompleted {
                        total_steps: state.step_number,
                        token_usage: state.token_usage,
                        final_output: outcome.output.clone(),
                    },
                    None,
                    &trace,
                ))?;
                state.apply(&event);
                let event = log.append(self.draft(
                    execution_id,
                    EventPayload::StateEnter { state: LifecycleState::Terminate },
                    None,
                    &trace,
                ))?;
                state.apply(&event);
                tracing::info!(execution_id = %execution_id, total_steps = state.step_number, "execution completed");
                break 'steps;
            }

            step_number += 1;
        }

        Ok(self.report(snapshot, &state, started_at, ReportStatus::Success, None))
    }

    /// Run one `invoke` plus its declared tool calls. Tool results become
    /// available to the adapter as `last_output` on the *next* step, not
    /// mid-step — keeps one `STEP_STARTED`/`STEP_COMPLETED` pair per
    /// adapter invocation, matching the spec's per-step granularity.
    async fn run_step(
        &self,
        log: &dyn EventLogBackend,
        execution_id: ExecutionId,
        step_number: u32,
        task: &Value,
        last_output: Option<Value>,
        policy: &PolicyConfig,
        state: &mut ExecutionState,
    ) -> Result<StepOutcome, StepFailure> {
        let context = StepContext { task: task.clone(), step_number, last_output };
        let result = self
            .adapter
            .invoke(context)
            .await
            .map_err(|err| match err.retryable {
                true => StepFailure::Retryable(err.message),
                false => StepFailure::Fatal(FailureKind::AdapterError, err.message),
            })?;

        let mut tool_results = Vec::with_capacity(result.tools_called.len());
        for invocation in &result.tools_called {
            if self.is_cancelled(execution_id) {
                return Err(StepFailure::Fatal(FailureKind::Cancelled, "cancelled by request".to_string()));
            }
            if let daer_policy::Verdict::Violation(rule) = daer_policy::validate_pre_tool(&invocation.tool_name, state, policy) {
                return Err(StepFailure::Policy(rule));
            }
            let hash = daer_core::canonical::arg_hash(&invocation.tool_name, &invocation.args, &invocation.kwargs);
            match intercept(
                self.tool_executor.as_ref(),
                self.sleeper.as_ref(),
                log,
                execution_id,
                step_number,
                &state.completed_tool_hashes,
                policy,
                &invocation.tool_name,
                &invocation.args,
                &invocation.kwargs,
            )
            .await
            {
                Ok(value) => {
                    if state.completed_tool_hashes.insert(hash) {
                        state.tool_call_count += 1;
                    }
                    tool_results.push(value);
                }
                Err(InterceptionError::Exhausted { tool_name, message })
                | Err(InterceptionError::Fatal { tool_name, message }) => {
                    return Err(StepFailure::Fatal(FailureKind::ToolFailure { tool_name }, message));
                }
                Err(other) => return Err(StepFailure::Infra(EngineError::from(other))),
            }
        }

        let output = if tool_results.is_empty() {
            result.output
        } else {
            serde_json::json!({ "output": result.output, "tool_results": tool_results })
        };

        Ok(StepOutcome { output, tokens: result.tokens, done: result.done })
    }

    fn finish_policy_violation(
        &self,
        log: &dyn EventLogBackend,
        snapshot: &ExecutionSnapshot,
        state: &mut ExecutionState,
        trace: &Option<TraceContext>,
        started_at: Instant,
        rule: PolicyRule,
    ) -> Result<ExecutionReport, EngineError> {
        let execution_id = snapshot.execution_id;
        let event = log.append(self.draft(execution_id, EventPayload::PolicyViolation { rule }, None, trace))?;
        state.apply(&event);
        self.finish_fatal(
            log,
            snapshot,
            state,
            trace,
            started_at,
            FailureKind::PolicyViolation { rule },
            format!("policy rule {rule} violated"),
        )
    }

    fn finish_fatal(
        &self,
        log: &dyn EventLogBackend,
        snapshot: &ExecutionSnapshot,
        state: &mut ExecutionState,
        trace: &Option<TraceContext>,
        started_at: Instant,
        kind: FailureKind,
        detail: String,
    ) -> Result<ExecutionReport, EngineError> {
        let execution_id = snapshot.execution_id;
        let event = log.append(self.draft(
            execution_id,
            EventPayload::ExecutionFailed { kind: kind.clone(), detail: detail.clone() },
            None,
            trace,
        ))?;
        state.apply(&event);
        tracing::warn!(execution_id = %execution_id, kind = %kind, detail = %detail, "execution failed");
        Ok(self.report(snapshot, state, started_at, ReportStatus::Failed, Some(FailureSummary { kind, detail })))
    }

    pub(crate) fn report_from_terminal(
        &self,
        snapshot: &ExecutionSnapshot,
        state: &ExecutionState,
        terminal: daer_core::state::Terminal,
    ) -> ExecutionReport {
        let started_at = self.clock.now();
        match terminal {
            daer_core::state::Terminal::Completed { .. } => {
                self.report(snapshot, state, started_at, ReportStatus::Success, None)
            }
            daer_core::state::Terminal::Failed { kind, detail } => {
                self.report(snapshot, state, started_at, ReportStatus::Failed, Some(FailureSummary { kind, detail }))
            }
        }
    }

    pub(crate) fn report(
        &self,
        snapshot: &ExecutionSnapshot,
        state: &ExecutionState,
        started_at: Instant,
        status: ReportStatus,
        failure: Option<FailureSummary>,
    ) -> ExecutionReport {
        let execution_time_seconds = self.clock.now().duration_since(started_at).as_secs_f64();
        ExecutionReport {
            execution_id: snapshot.execution_id,
            status,
            agent_name: self.adapter.name().to_string(),
            total_steps: state.step_number,
            token_usage: state.token_usage,
            tool_calls: state.tool_call_count,
            state_history: state.state_history.clone(),
            execution_time_seconds,
            final_output: state.last_output.clone().unwrap_or(Value::Null),
            failure,
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;

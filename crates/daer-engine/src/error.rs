// SPDX-License-Identifier: MIT

//! Infrastructure-level errors the Engine can surface. Failures that
//! belong in an [`crate::ExecutionReport`] instead (policy violations,
//! adapter/tool failures, determinism violations) never appear here —
//! they are recorded as `EXECUTION_FAILED` and returned as a `Failed`
//! report, not as an `Err`.

use daer_core::ids::ExecutionId;
use daer_storage::{EventLogError, SnapshotError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("event log error: {0}")]
    EventLog(#[from] EventLogError),
    #[error("snapshot store error: {0}")]
    Snapshot(#[from] SnapshotError),
    #[error(
        "execution {0}: recomputed execution_hash does not match the stored snapshot; \
         refusing to resume"
    )]
    ExecutionHashMismatch(ExecutionId),
    #[error("execution {0} has no recorded events to rehydrate from")]
    EmptyLog(ExecutionId),
    #[error(
        "forced re-execution of {execution_id} would touch non-idempotent tool `{tool_name}`; \
         refused without an explicit override"
    )]
    NonIdempotentTool { execution_id: ExecutionId, tool_name: String },
}

// SPDX-License-Identifier: MIT

//! `Job` (spec §3): one unit of scheduled work, keyed by the execution it
//! drives.

use chrono::{DateTime, Utc};
use daer_core::ids::{ExecutionId, SchedJobId, WorkerId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A job queued for a worker to claim and drive to completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: SchedJobId,
    pub execution_id: ExecutionId,
    pub payload: Value,
    pub visibility_deadline: DateTime<Utc>,
    pub attempt: u32,
}

impl Job {
    pub fn new(execution_id: ExecutionId, payload: Value, visibility_deadline: DateTime<Utc>) -> Self {
        Self { job_id: SchedJobId::new(), execution_id, payload, visibility_deadline, attempt: 0 }
    }
}

/// Where a [`Job`] currently sits (internal bookkeeping; not part of the
/// wire contract).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    InFlight,
}

pub(crate) struct TrackedJob {
    pub job: Job,
    pub status: JobStatus,
    pub owner: Option<WorkerId>,
}

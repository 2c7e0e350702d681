// SPDX-License-Identifier: MIT

//! The Distributed Scheduler (spec §4.8): a thin façade over a
//! [`SchedulerBackend`] that also records `RETRY_ATTEMPTED` into the Event
//! Log whenever `recover` re-queues a job, the way the Engine records its
//! own retries.

use daer_core::event::{EventDraft, EventPayload};
use daer_core::ids::{SchedJobId, WorkerId};
use daer_core::Clock;
use daer_storage::EventLogBackend;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::backend::SchedulerBackend;
use crate::error::SchedulerError;
use crate::job::Job;

/// Read-only view of scheduler load, exposed for the CLI/dashboard to poll
/// the way `daer-engine` exposes `ExecutionState`.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStatus {
    pub pending: usize,
    pub in_flight: usize,
    pub known_workers: usize,
}

pub struct Scheduler<B, C>
where
    B: SchedulerBackend,
    C: Clock,
{
    backend: Arc<B>,
    event_log: Arc<dyn EventLogBackend>,
    clock: C,
    worker_timeout: Duration,
}

impl<B, C> Scheduler<B, C>
where
    B: SchedulerBackend,
    C: Clock,
{
    pub fn new(backend: Arc<B>, event_log: Arc<dyn EventLogBackend>, clock: C, worker_timeout: Duration) -> Self {
        Self { backend, event_log, clock, worker_timeout }
    }

    pub fn enqueue(&self, execution_id: daer_core::ids::ExecutionId, payload: Value) -> Job {
        let job = Job::new(execution_id, payload, chrono::Utc::now());
        self.backend.enqueue(job.clone());
        job
    }

    pub fn claim(&self, worker_id: WorkerId) -> Option<Job> {
        self.backend.claim(worker_id)
    }

    pub fn ack(&self, job_id: SchedJobId) -> Result<(), SchedulerError> {
        self.backend.ack(job_id)
    }

    pub fn heartbeat(&self, worker_id: WorkerId) {
        self.backend.heartbeat(worker_id, self.clock.now());
    }

    pub fn status(&self) -> SchedulerStatus {
        self.backend.status()
    }

    /// Moves every job owned by a worker whose heartbeat has aged past
    /// `worker_timeout` back to pending, emitting `RETRY_ATTEMPTED` for
    /// each recovered job (spec §4.8).
    pub fn recover(&self) -> Result<Vec<Job>, SchedulerError> {
        let recovered = self.backend.recover(self.clock.now(), self.worker_timeout);
        for job in &recovered {
            let draft = EventDraft::new(
                job.execution_id,
                chrono::Utc::now(),
                EventPayload::RetryAttempted { attempt: job.attempt, delay_ms: 0 },
            );
            self.event_log.append(draft)?;
            tracing::warn!(job_id = %job.job_id, execution_id = %job.execution_id, attempt = job.attempt, "job recovered from dead worker");
        }
        Ok(recovered)
    }
}

// SPDX-License-Identifier: MIT

//! Storage-agnostic queue contract, mirroring `daer-storage`'s
//! `EventLogBackend`/`SnapshotBackend` split so `persistence_backend ∈
//! {memory, redis}` (spec §6) can pick an implementation without the
//! Scheduler caring which.

use daer_core::ids::{SchedJobId, WorkerId};
use std::time::{Duration, Instant};

use crate::error::SchedulerError;
use crate::job::Job;
use crate::scheduler::SchedulerStatus;

pub trait SchedulerBackend: Send + Sync {
    /// Atomic push to the pending list (spec §4.8 `enqueue`).
    fn enqueue(&self, job: Job);

    /// Atomically moves one job from pending to `worker_id`'s in-flight
    /// list. Returns `None` if no work is pending (spec §4.8 `claim`).
    fn claim(&self, worker_id: WorkerId) -> Option<Job>;

    /// Removes a job from its owner's in-flight list (spec §4.8 `ack`).
    fn ack(&self, job_id: SchedJobId) -> Result<(), SchedulerError>;

    /// Updates a worker's liveness key (spec §4.8 `heartbeat`). `now` comes
    /// from a `Clock` so heartbeat age is testable with `FakeClock`.
    fn heartbeat(&self, worker_id: WorkerId, now: Instant);

    /// For each worker whose heartbeat age exceeds `worker_timeout`, move
    /// every job in its in-flight list back to pending, incrementing
    /// `attempt`. Returns the recovered jobs for the caller to emit
    /// `RETRY_ATTEMPTED` against (spec §4.8 `recover`).
    fn recover(&self, now: Instant, worker_timeout: Duration) -> Vec<Job>;

    /// A read-only load snapshot for the CLI/dashboard to poll.
    fn status(&self) -> SchedulerStatus;
}

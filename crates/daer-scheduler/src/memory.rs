// SPDX-License-Identifier: MIT

//! Process-local queue + heartbeat map, used by tests and by
//! `persistence_backend = "memory"` deployments (spec §6). The teacher's
//! in-memory `QueueItem`/`WorkerRecord` pair
//! (`storage/state/queues.rs`, `storage/state/workers.rs`) is the model:
//! pending/in-flight/heartbeat tracked as plain maps guarded by one lock,
//! atomic moves between them rather than copy-then-delete.

use daer_core::ids::{SchedJobId, WorkerId};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

use crate::backend::SchedulerBackend;
use crate::error::SchedulerError;
use crate::job::{Job, JobStatus, TrackedJob};
use crate::scheduler::SchedulerStatus;

#[derive(Default)]
struct Inner {
    jobs: HashMap<SchedJobId, TrackedJob>,
    pending: VecDeque<SchedJobId>,
    in_flight: HashMap<WorkerId, HashSet<SchedJobId>>,
    heartbeats: HashMap<WorkerId, Instant>,
}

/// Thread-safe, process-local queue backend.
#[derive(Default)]
pub struct MemoryScheduler {
    inner: Mutex<Inner>,
}

impl MemoryScheduler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SchedulerBackend for MemoryScheduler {
    fn enqueue(&self, job: Job) {
        let mut inner = self.inner.lock();
        let job_id = job.job_id;
        inner.pending.push_back(job_id);
        inner.jobs.insert(job_id, TrackedJob { job, status: JobStatus::Pending, owner: None });
    }

    fn claim(&self, worker_id: WorkerId) -> Option<Job> {
        let mut inner = self.inner.lock();
        let job_id = inner.pending.pop_front()?;
        let tracked = inner.jobs.get_mut(&job_id)?;
        tracked.status = JobStatus::InFlight;
        tracked.owner = Some(worker_id);
        let job = tracked.job.clone();
        inner.in_flight.entry(worker_id).or_default().insert(job_id);
        Some(job)
    }

    fn ack(&self, job_id: SchedJobId) -> Result<(), SchedulerError> {
        let mut inner = self.inner.lock();
        let tracked = inner.jobs.get(&job_id).ok_or(SchedulerError::NotInFlight(job_id))?;
        if tracked.status != JobStatus::InFlight {
            return Err(SchedulerError::NotInFlight(job_id));
        }
        let owner = tracked.owner;
        inner.jobs.remove(&job_id);
        if let Some(owner) = owner {
            if let Some(set) = inner.in_flight.get_mut(&owner) {
                set.remove(&job_id);
            }
        }
        Ok(())
    }

    fn heartbeat(&self, worker_id: WorkerId, now: Instant) {
        self.inner.lock().heartbeats.insert(worker_id, now);
    }

    fn recover(&self, now: Instant, worker_timeout: Duration) -> Vec<Job> {
        let mut inner = self.inner.lock();
        let timed_out: Vec<WorkerId> = inner
            .in_flight
            .iter()
            .filter(|(_, jobs)| !jobs.is_empty())
            .filter(|(worker_id, _)| match inner.heartbeats.get(worker_id) {
                Some(last_seen) => now.duration_since(*last_seen) > worker_timeout,
                None => true,
            })
            .map(|(worker_id, _)| *worker_id)
            .collect();

        let mut recovered = Vec::new();
        for worker_id in timed_out {
            let Some(job_ids) = inner.in_flight.remove(&worker_id) else { continue };
            for job_id in job_ids {
                let Some(tracked) = inner.jobs.get_mut(&job_id) else { continue };
                tracked.status = JobStatus::Pending;
                tracked.owner = None;
                tracked.job.attempt += 1;
                inner.pending.push_back(job_id);
                recovered.push(tracked.job.clone());
            }
        }
        recovered
    }

    fn status(&self) -> SchedulerStatus {
        let inner = self.inner.lock();
        SchedulerStatus {
            pending: inner.pending.len(),
            in_flight: inner.in_flight.values().map(HashSet::len).sum(),
            known_workers: inner.heartbeats.len(),
        }
    }
}

// SPDX-License-Identifier: MIT

//! Errors the Distributed Scheduler can surface.

use daer_core::ids::{SchedJobId, WorkerId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("job {0} is not in-flight under any worker")]
    NotInFlight(SchedJobId),
    #[error("worker {0} is unknown to the scheduler")]
    UnknownWorker(WorkerId),
    #[error("event log error while recording a retry: {0}")]
    EventLog(#[from] daer_storage::EventLogError),
}

// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! daer-storage: Event Log (spec §4.1) and Snapshot Store (spec §4.2).
//!
//! Two concrete backends ship: a crash-recoverable file-backed one
//! (`log`/`snapshot`/`wal`, the default) and an in-process one (`memory`,
//! for tests and ephemeral deployments). Both implement the
//! [`backend::EventLogBackend`] / [`backend::SnapshotBackend`] traits so
//! callers can depend on the trait rather than a concrete store.

pub mod backend;
pub mod log;
pub mod memory;
pub mod snapshot;
pub mod wal;

#[cfg(feature = "redis-backend")]
pub mod redis_backend;

pub use backend::{EventLogBackend, SnapshotBackend};
pub use log::{EventLog, EventLogError};
pub use memory::MemoryStore;
pub use snapshot::{SnapshotError, SnapshotStore};
pub use wal::{Wal, WalError};

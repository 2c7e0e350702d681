// SPDX-License-Identifier: MIT

//! Backend-agnostic traits so the Engine can be configured with
//! `persistence_backend ∈ {memory, redis}` (spec §6) without depending on
//! a concrete storage implementation.

use daer_core::event::{Event, EventDraft};
use daer_core::execution::ExecutionSnapshot;
use daer_core::ids::ExecutionId;
use std::time::Duration;

use crate::log::{EventLog, EventLogError};
use crate::memory::MemoryStore;
use crate::snapshot::{SnapshotError, SnapshotStore};

/// Append/read access to one execution's event stream.
pub trait EventLogBackend: Send + Sync {
    fn append(&self, draft: EventDraft) -> Result<Event, EventLogError>;
    fn read(&self, execution_id: ExecutionId) -> Result<Vec<Event>, EventLogError>;

    /// Set (or refresh) an expiry on `execution_id`'s event stream (spec
    /// §4.1 `retention(execution_id, ttl)`). Once `ttl` has elapsed, the
    /// backend is free to drop the stream on its next access; callers must
    /// not rely on the events surviving past that point.
    fn set_retention(&self, execution_id: ExecutionId, ttl: Duration) -> Result<(), EventLogError>;
}

/// Put/get access to the immutable per-execution snapshot.
pub trait SnapshotBackend: Send + Sync {
    fn put(&self, snapshot: &ExecutionSnapshot) -> Result<ExecutionSnapshot, SnapshotError>;
    fn get(&self, execution_id: ExecutionId) -> Result<ExecutionSnapshot, SnapshotError>;
}

impl EventLogBackend for crate::log::EventLog {
    fn append(&self, draft: EventDraft) -> Result<Event, EventLogError> {
        EventLog::append(self, draft)
    }
    fn read(&self, execution_id: ExecutionId) -> Result<Vec<Event>, EventLogError> {
        EventLog::read(self, execution_id)
    }
    fn set_retention(&self, execution_id: ExecutionId, ttl: Duration) -> Result<(), EventLogError> {
        EventLog::set_retention(self, execution_id, ttl)
    }
}

impl SnapshotBackend for crate::snapshot::SnapshotStore {
    fn put(&self, snapshot: &ExecutionSnapshot) -> Result<ExecutionSnapshot, SnapshotError> {
        SnapshotStore::put(self, snapshot)
    }
    fn get(&self, execution_id: ExecutionId) -> Result<ExecutionSnapshot, SnapshotError> {
        SnapshotStore::get(self, execution_id)
    }
}

impl EventLogBackend for crate::memory::MemoryStore {
    fn append(&self, draft: EventDraft) -> Result<Event, EventLogError> {
        MemoryStore::append(self, draft)
    }
    fn read(&self, execution_id: ExecutionId) -> Result<Vec<Event>, EventLogError> {
        Ok(MemoryStore::read(self, execution_id))
    }
    fn set_retention(&self, execution_id: ExecutionId, ttl: Duration) -> Result<(), EventLogError> {
        MemoryStore::set_retention(self, execution_id, ttl);
        Ok(())
    }
}

impl SnapshotBackend for crate::memory::MemoryStore {
    fn put(&self, snapshot: &ExecutionSnapshot) -> Result<ExecutionSnapshot, SnapshotError> {
        MemoryStore::put_snapshot(self, snapshot)
    }
    fn get(&self, execution_id: ExecutionId) -> Result<ExecutionSnapshot, SnapshotError> {
        MemoryStore::get_snapshot(self, execution_id)
    }
}

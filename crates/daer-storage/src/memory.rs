// SPDX-License-Identifier: MIT

//! In-memory Event Log + Snapshot Store, used by tests and by
//! `persistence_backend = "memory"` deployments that accept losing state on
//! restart (spec §6).

use chrono::{DateTime, Utc};
use daer_core::event::{Event, EventDraft};
use daer_core::execution::ExecutionSnapshot;
use daer_core::ids::{EventId, ExecutionId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::log::EventLogError;
use crate::snapshot::SnapshotError;

#[derive(Default)]
struct Inner {
    events: HashMap<ExecutionId, Vec<Event>>,
    snapshots: HashMap<ExecutionId, ExecutionSnapshot>,
    /// Expiry timestamps set via [`MemoryStore::set_retention`] (spec §4.1
    /// `retention(execution_id, ttl)`).
    expires_at: HashMap<ExecutionId, DateTime<Utc>>,
}

impl Inner {
    /// Drop an execution's events/snapshot/expiry entry once its TTL has
    /// elapsed. Called lazily on access rather than on a timer, matching
    /// how the file-backed [`crate::log::EventLog`] expires on access too.
    fn expire_if_due(&mut self, execution_id: ExecutionId) {
        if let Some(expires_at) = self.expires_at.get(&execution_id) {
            if *expires_at <= Utc::now() {
                self.events.remove(&execution_id);
                self.snapshots.remove(&execution_id);
                self.expires_at.remove(&execution_id);
            }
        }
    }
}

/// Thread-safe, process-local Event Log + Snapshot Store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, draft: EventDraft) -> Result<Event, EventLogError> {
        let mut inner = self.inner.lock();
        let execution_id = draft.execution_id;
        inner.expire_if_due(execution_id);
        let log = inner.events.entry(execution_id).or_default();
        if log.last().map(|e| e.is_terminal()).unwrap_or(false) {
            return Err(EventLogError::AlreadyTerminal(execution_id));
        }
        let sequence = log.len() as u64;
        let event = draft.into_event(EventId::new(), sequence);
        log.push(event.clone());
        Ok(event)
    }

    pub fn read(&self, execution_id: ExecutionId) -> Vec<Event> {
        let mut inner = self.inner.lock();
        inner.expire_if_due(execution_id);
        inner.events.get(&execution_id).cloned().unwrap_or_default()
    }

    /// Set (or refresh) `execution_id`'s expiry to `ttl` from now (spec
    /// §4.1 `retention(execution_id, ttl)`).
    pub fn set_retention(&self, execution_id: ExecutionId, ttl: Duration) {
        let expires_at = Utc::now() + chrono::Duration::seconds(ttl.as_secs() as i64);
        self.inner.lock().expires_at.insert(execution_id, expires_at);
    }

    pub fn put_snapshot(&self, snapshot: &ExecutionSnapshot) -> Result<ExecutionSnapshot, SnapshotError> {
        let mut inner = self.inner.lock();
        if let Some(existing) = inner.snapshots.get(&snapshot.execution_id) {
            if existing.execution_hash != snapshot.execution_hash {
                return Err(SnapshotError::Conflict {
                    execution_id: snapshot.execution_id,
                    existing: existing.execution_hash.clone(),
                    submitted: snapshot.execution_hash.clone(),
                });
            }
            return Ok(existing.clone());
        }
        inner.snapshots.insert(snapshot.execution_id, snapshot.clone());
        Ok(snapshot.clone())
    }

    pub fn get_snapshot(&self, execution_id: ExecutionId) -> Result<ExecutionSnapshot, SnapshotError> {
        self.inner
            .lock()
            .snapshots
            .get(&execution_id)
            .cloned()
            .ok_or(SnapshotError::NotFound(execution_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use daer_core::event::EventPayload;
    use daer_core::test_support::sample_snapshot;
    use serde_json::json;

    #[test]
    fn append_and_read_round_trip() {
        let store = MemoryStore::new();
        let execution_id = ExecutionId::new();
        store
            .append(EventDraft::new(
                execution_id,
                Utc::now(),
                EventPayload::ExecutionStarted { task: json!("t") },
            ))
            .unwrap();

        let events = store.read(execution_id);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].sequence, 0);
    }

    #[test]
    fn snapshot_put_get_round_trip() {
        let store = MemoryStore::new();
        let snapshot = sample_snapshot();
        store.put_snapshot(&snapshot).unwrap();
        let fetched = store.get_snapshot(snapshot.execution_id).unwrap();
        assert_eq!(fetched.execution_hash, snapshot.execution_hash);
    }

    #[test]
    fn expired_retention_drops_events_on_next_access() {
        let store = MemoryStore::new();
        let execution_id = ExecutionId::new();
        store
            .append(EventDraft::new(
                execution_id,
                Utc::now(),
                EventPayload::ExecutionStarted { task: json!("t") },
            ))
            .unwrap();

        store.set_retention(execution_id, Duration::from_secs(0));
        assert!(store.read(execution_id).is_empty());
    }

    #[test]
    fn unexpired_retention_keeps_events() {
        let store = MemoryStore::new();
        let execution_id = ExecutionId::new();
        store
            .append(EventDraft::new(
                execution_id,
                Utc::now(),
                EventPayload::ExecutionStarted { task: json!("t") },
            ))
            .unwrap();

        store.set_retention(execution_id, Duration::from_secs(3600));
        assert_eq!(store.read(execution_id).len(), 1);
    }
}

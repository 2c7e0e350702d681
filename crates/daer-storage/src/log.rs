// SPDX-License-Identifier: MIT

//! The Event Log proper (spec §4.1): `append`, `read`, backed by one
//! [`crate::wal::Wal`] file per execution.
//!
//! Internally synchronized with `parking_lot::Mutex` so a single
//! `EventLog` can be shared behind an `Arc` across the Engine's async
//! tasks, the way the teacher shares `MaterializedState`.

use crate::wal::{Wal, WalError};
use chrono::{DateTime, Utc};
use daer_core::event::{Event, EventDraft};
use daer_core::ids::{EventId, ExecutionId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventLogError {
    #[error("wal error: {0}")]
    Wal(#[from] WalError),
    #[error("execution {0} already has a terminal event; no further events may be appended")]
    AlreadyTerminal(ExecutionId),
}

struct Shared {
    dir: PathBuf,
    open: HashMap<ExecutionId, Wal>,
    terminal: HashMap<ExecutionId, bool>,
    /// Expiry timestamps set via [`EventLog::set_retention`] (spec §4.1
    /// `retention(execution_id, ttl)`).
    expires_at: HashMap<ExecutionId, DateTime<Utc>>,
}

impl Shared {
    fn wal_mut(&mut self, execution_id: ExecutionId) -> Result<&mut Wal, EventLogError> {
        self.expire_if_due(execution_id)?;
        match self.open.entry(execution_id) {
            std::collections::hash_map::Entry::Occupied(e) => Ok(e.into_mut()),
            std::collections::hash_map::Entry::Vacant(e) => {
                let wal = Wal::open(self.dir.join(format!("{}.wal", execution_id.as_str())), 0)?;
                let is_terminal = wal.entries_after(0)?.iter().any(|ev| ev.event.is_terminal());
                self.terminal.insert(execution_id, is_terminal);
                Ok(e.insert(wal))
            }
        }
    }

    /// Drop an execution's cached WAL handle and on-disk file once its TTL
    /// has elapsed, so the next access re-opens (and finds empty) instead
    /// of serving stale events.
    fn expire_if_due(&mut self, execution_id: ExecutionId) -> Result<(), EventLogError> {
        let Some(expires_at) = self.expires_at.get(&execution_id) else { return Ok(()) };
        if *expires_at > Utc::now() {
            return Ok(());
        }
        self.open.remove(&execution_id);
        self.terminal.remove(&execution_id);
        self.expires_at.remove(&execution_id);
        let path = self.dir.join(format!("{}.wal", execution_id.as_str()));
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(EventLogError::Wal(WalError::Io(e))),
        }
    }
}

/// File-backed Event Log keeping one [`Wal`] per execution, opened lazily
/// and cached for the process lifetime.
pub struct EventLog {
    shared: Mutex<Shared>,
}

impl EventLog {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, EventLogError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| EventLogError::Wal(WalError::Io(e)))?;
        Ok(Self {
            shared: Mutex::new(Shared {
                dir,
                open: HashMap::new(),
                terminal: HashMap::new(),
                expires_at: HashMap::new(),
            }),
        })
    }

    /// Append one event, assigning it the next dense sequence number
    /// (spec §3's "monotonic sequence numbers"). Rejects appends to an
    /// execution that already has a terminal event (spec's "at most one
    /// terminal event per execution").
    pub fn append(&self, draft: EventDraft) -> Result<Event, EventLogError> {
        let execution_id = draft.execution_id;
        let mut shared = self.shared.lock();
        if *shared.terminal.get(&execution_id).unwrap_or(&false) {
            return Err(EventLogError::AlreadyTerminal(execution_id));
        }
        let is_terminal = draft.payload.is_terminal();
        let wal = shared.wal_mut(execution_id)?;
        let sequence = wal.write_seq();
        let event = draft.into_event(EventId::new(), sequence);
        wal.append(&event)?;
        if wal.needs_flush() {
            wal.flush()?;
        }
        if is_terminal {
            shared.terminal.insert(execution_id, true);
        }
        Ok(event)
    }

    /// Read the full ordered event stream for `execution_id`, empty if it
    /// has never been appended to.
    pub fn read(&self, execution_id: ExecutionId) -> Result<Vec<Event>, EventLogError> {
        let mut shared = self.shared.lock();
        let wal = shared.wal_mut(execution_id)?;
        Ok(wal.entries_after(0)?.into_iter().map(|e| e.event).collect())
    }

    /// Read events with `sequence >= from`, for resuming a read cursor.
    pub fn read_from(&self, execution_id: ExecutionId, from: u64) -> Result<Vec<Event>, EventLogError> {
        let mut shared = self.shared.lock();
        let wal = shared.wal_mut(execution_id)?;
        Ok(wal.entries_after(from.saturating_sub(1))?.into_iter().map(|e| e.event).collect())
    }

    pub fn flush(&self, execution_id: ExecutionId) -> Result<(), EventLogError> {
        let mut shared = self.shared.lock();
        Ok(shared.wal_mut(execution_id)?.flush()?)
    }

    /// Drop log entries prior to `keep_from`, called after a snapshot
    /// checkpoint has absorbed them (spec §4.2 "snapshot + WAL truncation").
    pub fn truncate_before(&self, execution_id: ExecutionId, keep_from: u64) -> Result<(), EventLogError> {
        let mut shared = self.shared.lock();
        Ok(shared.wal_mut(execution_id)?.truncate_before(keep_from)?)
    }

    /// Set (or refresh) `execution_id`'s expiry to `ttl` from now (spec
    /// §4.1 `retention(execution_id, ttl)`). The WAL file is deleted on
    /// the next access past that point, not on a timer.
    pub fn set_retention(&self, execution_id: ExecutionId, ttl: Duration) -> Result<(), EventLogError> {
        let expires_at = Utc::now() + chrono::Duration::seconds(ttl.as_secs() as i64);
        self.shared.lock().expires_at.insert(execution_id, expires_at);
        Ok(())
    }
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;

// SPDX-License-Identifier: MIT

//! Snapshot Store (spec §4.2): the immutable [`ExecutionSnapshot`] recorded
//! at submission time, keyed by `execution_id`, re-read on resume/replay to
//! compute the continuity check against `execution_hash`.

use crate::wal::rotate_bak_path;
use daer_core::execution::ExecutionSnapshot;
use daer_core::ids::ExecutionId;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no snapshot recorded for execution {0}")]
    NotFound(ExecutionId),
    #[error(
        "execution {execution_id} already has a snapshot with a different execution_hash \
         (existing {existing}, submitted {submitted}); this is a new logical execution and \
         needs its own execution_id"
    )]
    Conflict { execution_id: ExecutionId, existing: String, submitted: String },
}

/// File-backed Snapshot Store, one JSON file per execution.
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, execution_id: &ExecutionId) -> PathBuf {
        self.dir.join(format!("{}.snapshot.json", execution_id.as_str()))
    }

    /// Idempotent submission: re-submitting the same `execution_id` with a
    /// snapshot whose `execution_hash` matches the one on disk is a no-op
    /// returning the existing snapshot (spec §4.5 "Submission API" /
    /// §9 "idempotent resubmission"). A mismatched hash is a conflict, not
    /// a silent overwrite.
    pub fn put(&self, snapshot: &ExecutionSnapshot) -> Result<ExecutionSnapshot, SnapshotError> {
        let path = self.path_for(&snapshot.execution_id);
        if path.exists() {
            let existing: ExecutionSnapshot = serde_json::from_slice(&fs::read(&path)?)?;
            if existing.execution_hash != snapshot.execution_hash {
                return Err(SnapshotError::Conflict {
                    execution_id: snapshot.execution_id,
                    existing: existing.execution_hash,
                    submitted: snapshot.execution_hash.clone(),
                });
            }
            return Ok(existing);
        }

        let bytes = serde_json::to_vec_pretty(snapshot)?;
        let tmp = path.with_extension("snapshot.json.tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;
        Ok(snapshot.clone())
    }

    pub fn get(&self, execution_id: ExecutionId) -> Result<ExecutionSnapshot, SnapshotError> {
        let path = self.path_for(&execution_id);
        if !path.exists() {
            return Err(SnapshotError::NotFound(execution_id));
        }
        let bytes = fs::read(&path)?;
        match serde_json::from_slice(&bytes) {
            Ok(snapshot) => Ok(snapshot),
            Err(err) => {
                // A torn write (crash mid-rename is impossible since rename
                // is atomic, but a crash mid-write to `tmp` could have left
                // a corrupt file if a caller wrote directly). Rotate it out
                // rather than failing recovery forever.
                let bak = rotate_bak_path(&path);
                fs::copy(&path, &bak)?;
                Err(SnapshotError::Json(err))
            }
        }
    }

    pub fn exists(&self, execution_id: ExecutionId) -> bool {
        self.path_for(&execution_id).exists()
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;

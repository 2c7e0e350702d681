// SPDX-License-Identifier: MIT

//! Write-ahead log backing one execution's [`Event`] stream (spec §4.1).
//!
//! One `.wal` file per execution. Each line is a canonical JSON encoding of
//! one [`Event`]; `sequence` is dense and starts at 0. A line that fails to
//! parse marks the end of the valid log — everything after it, including the
//! unparseable line itself, is rotated out to a `.bak` file on the next
//! `open` so a half-written line from a crash never blocks recovery.

use daer_core::event::Event;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("non-monotonic sequence: expected {expected}, got {got}")]
    NonMonotonicSequence { expected: u64, got: u64 },
}

const FLUSH_EVERY: usize = 100;
const FLUSH_INTERVAL: Duration = Duration::from_secs(1);
const MAX_BAK_FILES: u32 = 3;

/// One parsed line of the log, alongside the sequence it was recorded under.
#[derive(Debug, Clone)]
pub struct WalEntry {
    pub seq: u64,
    pub event: Event,
}

/// Append-only, crash-recoverable store for one execution's event stream.
pub struct Wal {
    path: PathBuf,
    file: File,
    /// Next sequence number that will be assigned to an appended event.
    write_seq: u64,
    /// High-water mark of sequences the caller has durably consumed
    /// downstream (e.g. folded into a snapshot). Read cursor for
    /// `next_unprocessed` starts here.
    processed_seq: u64,
    unflushed: usize,
    last_flush: Instant,
}

impl Wal {
    /// Open (creating if absent) the log at `path`. `processed_seq` seeds the
    /// read cursor, e.g. the sequence recorded in the last snapshot.
    pub fn open(path: impl AsRef<Path>, processed_seq: u64) -> Result<Self, WalError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            File::create(&path)?;
        }

        let write_seq = Self::recover(&path)?;

        let file = OpenOptions::new().read(true).append(true).open(&path)?;

        Ok(Self { path, file, write_seq, processed_seq, unflushed: 0, last_flush: Instant::now() })
    }

    /// Scan the file front-to-back, validating every line. On the first
    /// unparseable line, truncate the file to the last good line and rotate
    /// everything from that point (including the bad line) into a `.bak`
    /// file. Returns the next sequence to assign.
    fn recover(path: &Path) -> Result<u64, WalError> {
        let bytes = fs::read(path)?;
        let mut good_end = 0usize;
        let mut next_seq = 0u64;
        let mut corrupt = false;

        for line in bytes.split(|&b| b == b'\n') {
            if line.is_empty() {
                continue;
            }
            match std::str::from_utf8(line).ok().and_then(|s| serde_json::from_str::<Event>(s).ok()) {
                Some(event) if event.sequence == next_seq => {
                    next_seq += 1;
                    good_end += line.len() + 1;
                }
                _ => {
                    corrupt = true;
                    break;
                }
            }
        }

        if corrupt {
            let bak_path = rotate_bak_path(path);
            fs::copy(path, &bak_path)?;
            let mut f = OpenOptions::new().write(true).open(path)?;
            f.set_len(good_end as u64)?;
            tracing::warn!(path = %path.display(), bak = %bak_path.display(), "wal corruption detected, rotated to backup");
        }

        Ok(next_seq)
    }

    /// Append an event that already carries its sequence; the sequence must
    /// equal `write_seq()` (dense, no gaps).
    pub fn append(&mut self, event: &Event) -> Result<u64, WalError> {
        if event.sequence != self.write_seq {
            return Err(WalError::NonMonotonicSequence { expected: self.write_seq, got: event.sequence });
        }
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');
        self.file.write_all(&line)?;
        self.write_seq += 1;
        self.unflushed += 1;
        Ok(event.sequence)
    }

    pub fn flush(&mut self) -> Result<(), WalError> {
        self.file.flush()?;
        self.file.sync_data()?;
        self.unflushed = 0;
        self.last_flush = Instant::now();
        Ok(())
    }

    pub fn needs_flush(&self) -> bool {
        self.unflushed >= FLUSH_EVERY || (self.unflushed > 0 && self.last_flush.elapsed() >= FLUSH_INTERVAL)
    }

    pub fn write_seq(&self) -> u64 {
        self.write_seq
    }

    pub fn processed_seq(&self) -> u64 {
        self.processed_seq
    }

    pub fn mark_processed(&mut self, seq: u64) {
        if seq > self.processed_seq {
            self.processed_seq = seq;
        }
    }

    /// Read the next entry after `processed_seq` without advancing it.
    /// Returns `Ok(None)` on EOF or on hitting a corrupt/partial line —
    /// a torn write at the tail is not an error, just "nothing to read yet".
    pub fn next_unprocessed(&mut self) -> Result<Option<WalEntry>, WalError> {
        let after = self.processed_seq;
        Ok(self.entries_after(after)?.into_iter().next())
    }

    /// All entries with `sequence > after`, stopping at the first
    /// unparseable line.
    pub fn entries_after(&self, after: u64) -> Result<Vec<WalEntry>, WalError> {
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(0))?;
        let reader = BufReader::new(file);
        let mut out = Vec::new();
        for line in reader.lines() {
            let line = match line {
                Ok(l) => l,
                Err(_) => break,
            };
            if line.is_empty() {
                continue;
            }
            let event: Event = match serde_json::from_str(&line) {
                Ok(e) => e,
                Err(_) => break,
            };
            if event.sequence > after {
                out.push(WalEntry { seq: event.sequence, event });
            }
        }
        Ok(out)
    }

    /// Drop entries with `sequence < keep_from`, rewriting the file in
    /// place. Used after a snapshot checkpoint to bound log growth.
    pub fn truncate_before(&mut self, keep_from: u64) -> Result<(), WalError> {
        let kept = self.entries_after(keep_from.saturating_sub(1))?;
        let tmp_path = self.path.with_extension("wal.tmp");
        {
            let mut tmp = File::create(&tmp_path)?;
            for entry in &kept {
                let mut line = serde_json::to_vec(&entry.event)?;
                line.push(b'\n');
                tmp.write_all(&line)?;
            }
            tmp.flush()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        self.file = OpenOptions::new().read(true).append(true).open(&self.path)?;
        Ok(())
    }
}

/// Pick the next `.bak` / `.bak.N` path, rotating older backups out. Keeps
/// up to [`MAX_BAK_FILES`] generations.
pub(crate) fn rotate_bak_path(path: &Path) -> PathBuf {
    let bak = |n: u32| {
        if n == 1 {
            path.with_extension("bak")
        } else {
            path.with_extension(format!("bak.{n}"))
        }
    };

    let oldest = bak(MAX_BAK_FILES);
    if oldest.exists() {
        let _ = fs::remove_file(&oldest);
    }
    for n in (1..MAX_BAK_FILES).rev() {
        let src = bak(n);
        if src.exists() {
            let _ = fs::rename(&src, bak(n + 1));
        }
    }
    bak(1)
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;

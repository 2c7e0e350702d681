// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! daer-engine: the Execution Engine, replay and resume (spec §4.5–4.6).
//!
//! [`Engine`] is the Runtime's one mutator of the Event Log during a live
//! execution; every other crate in the workspace only reads it back. The
//! lifecycle loop, hash-continuity check, and forced re-execution audit
//! live here because they are the one place that needs all of Policy,
//! Interception, Storage, and the adapter at once.

pub mod engine;
pub mod error;
pub mod replay;
pub mod report;

pub use engine::{Engine, RunOptions};
pub use error::EngineError;
pub use replay::{DeterminismViolation, EventFingerprint, ReplayMode};
pub use report::{ExecutionReport, FailureSummary, ReportStatus};

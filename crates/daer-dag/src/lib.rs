// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! daer-dag: the DAG Executor (spec §4.7), fanning `Engine` runs out over a
//! dependency graph with bounded concurrency and crash-consistent resume.

pub mod error;
pub mod executor;
pub mod graph;

pub use error::DagError;
pub use executor::{DagExecutor, DagReport, FailurePolicy};
pub use graph::{TaskGraph, TaskNode};

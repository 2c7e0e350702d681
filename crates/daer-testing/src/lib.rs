// SPDX-License-Identifier: MIT

//! daer-testing: the harness and fixture builders shared by this
//! workspace's own test suites (unit tests in each crate still build
//! their own ad hoc fixtures; this crate is for the cross-crate
//! integration scenarios in `tests/specs.rs`).

pub mod fixtures;
pub mod harness;

pub use daer_adapters::fake::FakeAgentAdapter;
pub use harness::{TestHarness, UnreachableToolExecutor};

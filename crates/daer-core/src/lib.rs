// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! daer-core: shared data model for the Deterministic AI Execution Runtime.
//!
//! Defines the types every other `daer-*` crate builds on: identifiers,
//! the [`Event`](event::Event) log record, the immutable
//! [`ExecutionSnapshot`](execution::ExecutionSnapshot), the derived
//! [`ExecutionState`](state::ExecutionState), and the shared error taxonomy.

pub mod macros;

pub mod canonical;
pub mod clock;
pub mod error;
pub mod event;
pub mod execution;
pub mod id;
pub mod ids;
pub mod state;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use error::{Classification, FailureKind, PolicyRule};
pub use event::{Event, EventDraft, EventPayload, LifecycleState, TraceContext};
pub use execution::{AgentIdentity, ExecutionSnapshot, PolicyConfig, RetryConfig};
pub use ids::{EventId, ExecutionId, NodeId, SchedJobId, TraceId, WorkerId};
pub use state::{ExecutionState, Terminal};

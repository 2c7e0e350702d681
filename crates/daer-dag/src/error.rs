// SPDX-License-Identifier: MIT

//! Errors the DAG Executor can surface.

use daer_core::ids::NodeId;
use daer_engine::EngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DagError {
    #[error("task graph has a cycle; cannot schedule")]
    Cycle,
    #[error("node {node} declares a dependency on unknown node {dependency}")]
    UnknownDependency { node: NodeId, dependency: NodeId },
    #[error("engine error while driving node {node}: {source}")]
    Engine { node: NodeId, #[source] source: EngineError },
}

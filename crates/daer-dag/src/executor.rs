// SPDX-License-Identifier: MIT

//! The DAG Executor (spec §4.7): drives multiple [`Engine`] runs over a
//! [`TaskGraph`], starting a node only once every dependency it declares
//! has produced a terminal success event, bounding concurrency with a
//! semaphore the way the teacher bounds worker concurrency
//! (`daemon/src/storage/state/workers.rs`'s per-worker `concurrency`).

use daer_adapters::AgentAdapter;
use daer_core::ids::{ExecutionId, NodeId};
use daer_core::execution::PolicyConfig;
use daer_core::Clock;
use daer_engine::{Engine, EngineError, ExecutionReport, ReportStatus, RunOptions};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::DagError;
use crate::graph::TaskGraph;

/// How the whole graph reacts to one node failing fatally (spec §4.7 "the
/// whole graph's policy decides").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop starting any new node once one has failed; nodes already
    /// in-flight are allowed to finish (the spec's default).
    #[default]
    FailFast,
    /// Keep scheduling every branch unrelated to the failed node;
    /// dependents of the failure are still never started.
    IsolateBranch,
}

/// The outcome of one [`DagExecutor::submit`] or [`DagExecutor::resume`] call.
#[derive(Debug, Clone)]
pub struct DagReport {
    pub status: ReportStatus,
    pub node_reports: HashMap<NodeId, ExecutionReport>,
    /// Nodes never started: either a descendant of a node that failed, or
    /// (under [`FailurePolicy::FailFast`]) an unrelated branch that lost its
    /// chance to start once another node failed first.
    pub skipped: Vec<NodeId>,
}

enum Launch {
    Fresh,
    Resume(ExecutionId),
}

/// Drives a [`TaskGraph`] against one injected `Engine<A, C>` (spec §4.7).
/// Every node in the graph runs through the same adapter; dispatching
/// `agent_ref` to distinct adapter implementations is left to the caller
/// (`daer-adapters` has no adapter registry to dispatch through).
pub struct DagExecutor<A, C>
where
    A: AgentAdapter,
    C: Clock,
{
    engine: Engine<A, C>,
    max_concurrency: usize,
    failure_policy: FailurePolicy,
}

impl<A, C> DagExecutor<A, C>
where
    A: AgentAdapter + 'static,
    C: Clock + 'static,
{
    pub fn new(engine: Engine<A, C>, max_concurrency: usize, failure_policy: FailurePolicy) -> Self {
        Self { engine, max_concurrency: max_concurrency.max(1), failure_policy }
    }

    /// Submit a fresh graph (spec §4.7 `submit`).
    pub async fn submit(&self, graph: &TaskGraph, policy: PolicyConfig) -> Result<DagReport, DagError> {
        self.schedule(graph, policy, &HashMap::new()).await
    }

    /// Resume a graph whose nodes may already have an `execution_id` from a
    /// prior, interrupted run (spec §4.7 "On resume, nodes whose terminal
    /// `EXECUTION_COMPLETED` is present in the Event Log are skipped").
    /// `Engine::resume` already returns the recorded report without
    /// re-driving a terminal execution, so a known `execution_id` always
    /// resolves through `resume` here; a node absent from the map is
    /// treated as never started and runs fresh.
    pub async fn resume(
        &self,
        graph: &TaskGraph,
        node_execution_ids: &HashMap<NodeId, ExecutionId>,
        policy: PolicyConfig,
    ) -> Result<DagReport, DagError> {
        self.schedule(graph, policy, node_execution_ids).await
    }

    async fn schedule(
        &self,
        graph: &TaskGraph,
        policy: PolicyConfig,
        node_execution_ids: &HashMap<NodeId, ExecutionId>,
    ) -> Result<DagReport, DagError> {
        graph.topo_order()?;

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let completed_outputs: Arc<Mutex<HashMap<NodeId, Value>>> = Arc::new(Mutex::new(HashMap::new()));
        let mut started: HashSet<NodeId> = HashSet::new();
        let mut panicked: HashSet<NodeId> = HashSet::new();
        let mut node_reports = HashMap::new();
        let mut failed = false;
        let mut join_set: JoinSet<(NodeId, Result<ExecutionReport, EngineError>)> = JoinSet::new();
        let mut task_nodes: HashMap<tokio::task::Id, NodeId> = HashMap::new();

        loop {
            for node in graph.nodes() {
                if started.contains(&node.id) {
                    continue;
                }
                if failed && self.failure_policy == FailurePolicy::FailFast {
                    continue;
                }
                let ready = {
                    let outputs = completed_outputs.lock();
                    node.dependencies.iter().all(|dep| outputs.contains_key(dep))
                };
                if !ready {
                    continue;
                }

                started.insert(node.id);
                let node_id = node.id;
                let task_input = compose_task_input(node.task_input.clone(), &node.dependencies, &completed_outputs);
                let launch = match node_execution_ids.get(&node_id) {
                    Some(&execution_id) => Launch::Resume(execution_id),
                    None => Launch::Fresh,
                };
                let engine = self.engine.clone();
                let policy = policy.clone();
                let permit = Arc::clone(&semaphore);
                let abort_handle = join_set.spawn(async move {
                    let _permit =
                        permit.acquire_owned().await.unwrap_or_else(|_| unreachable!("semaphore never closed"));
                    let result = match launch {
                        Launch::Fresh => engine.run(task_input, policy, RunOptions::default()).await,
                        Launch::Resume(execution_id) => engine.resume(execution_id).await,
                    };
                    (node_id, result)
                });
                task_nodes.insert(abort_handle.id(), node_id);
            }

            let Some(joined) = join_set.join_next_with_id().await else { break };
            let (node_id, result) = match joined {
                Ok((_id, pair)) => pair,
                Err(join_err) => {
                    let node_id = task_nodes.remove(&join_err.id());
                    tracing::error!(error = %join_err, node_id = ?node_id, "dag node task panicked");
                    failed = true;
                    if let Some(node_id) = node_id {
                        panicked.insert(node_id);
                    }
                    continue;
                }
            };

            match result {
                Ok(report) => {
                    if report.status == ReportStatus::Success {
                        completed_outputs.lock().insert(node_id, report.final_output.clone());
                    } else {
                        failed = true;
                    }
                    node_reports.insert(node_id, report);
                }
                Err(source) => return Err(DagError::Engine { node: node_id, source }),
            }
        }

        let skipped: Vec<NodeId> = graph
            .nodes()
            .map(|n| n.id)
            .filter(|id| !started.contains(id) || panicked.contains(id))
            .collect();
        if !skipped.is_empty() {
            tracing::warn!(count = skipped.len(), "dag nodes never started");
        }

        let status = if failed { ReportStatus::Failed } else { ReportStatus::Success };
        Ok(DagReport { status, node_reports, skipped })
    }
}

/// Pass each node its dependencies' `final_output` as additional context
/// (spec §4.7), leaving task_input untouched for root nodes.
fn compose_task_input(
    task_input: Value,
    dependencies: &HashSet<NodeId>,
    completed_outputs: &Mutex<HashMap<NodeId, Value>>,
) -> Value {
    if dependencies.is_empty() {
        return task_input;
    }
    let outputs = completed_outputs.lock();
    let deps: serde_json::Map<String, Value> =
        dependencies.iter().filter_map(|dep| outputs.get(dep).map(|v| (dep.to_string(), v.clone()))).collect();
    serde_json::json!({ "task": task_input, "dependencies": Value::Object(deps) })
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;

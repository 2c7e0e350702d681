// SPDX-License-Identifier: MIT

//! `daer dag`: submit a task graph (loaded from a JSON file of `TaskNode`s)
//! to the DAG Executor and print each node's outcome.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use daer_core::{PolicyConfig, SystemClock};
use daer_dag::{DagExecutor, FailurePolicy, TaskGraph};
use daer_engine::Engine;
use daer_interception::TokioSleeper;
use daer_storage::MemoryStore;
use serde_json::json;

use crate::adapter::{EchoAdapter, EchoToolExecutor};
use crate::output::{print_report, OutputFormat};

#[derive(Args)]
pub struct DagArgs {
    /// Path to a JSON array of `TaskNode` objects.
    #[arg(long)]
    pub graph: PathBuf,

    /// Nodes allowed to run concurrently.
    #[arg(long, default_value_t = 4)]
    pub max_concurrency: usize,

    /// Stop scheduling new nodes as soon as one fails instead of
    /// isolating only the failed branch.
    #[arg(long)]
    pub fail_fast: bool,

    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

pub async fn run(args: DagArgs) -> Result<()> {
    let contents = std::fs::read_to_string(&args.graph)
        .with_context(|| format!("reading graph file {}", args.graph.display()))?;
    let nodes: Vec<daer_dag::TaskNode> = serde_json::from_str(&contents).context("graph file must be a JSON array of task nodes")?;

    let mut graph = TaskGraph::new();
    for node in nodes {
        graph.add_node(node);
    }

    let event_log = Arc::new(MemoryStore::new());
    let snapshots = Arc::new(MemoryStore::new());
    let engine = Engine::new(
        EchoAdapter,
        event_log,
        snapshots,
        Arc::new(EchoToolExecutor),
        Arc::new(TokioSleeper),
        SystemClock,
        env!("CARGO_PKG_VERSION"),
        "daer-cli/echo-tools-v1",
    );

    let failure_policy = if args.fail_fast { FailurePolicy::FailFast } else { FailurePolicy::IsolateBranch };
    let executor = DagExecutor::new(engine, args.max_concurrency, failure_policy);
    let report = executor.submit(&graph, PolicyConfig::default()).await.context("dag execution failed")?;

    let node_count = report.node_reports.len();
    let skipped_count = report.skipped.len();
    let rendered = json!({
        "status": format!("{:?}", report.status),
        "skipped": report.skipped.clone(),
        "node_reports": report.node_reports.clone(),
    });
    print_report(args.format, &rendered, || {
        format!("dag finished as {:?}: {node_count} node(s) ran, {skipped_count} skipped", report.status)
    });
    Ok(())
}

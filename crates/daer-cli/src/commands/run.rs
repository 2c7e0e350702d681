// SPDX-License-Identifier: MIT

//! `daer run`: submit one task to the Execution Engine and print the
//! resulting report.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use daer_core::{PolicyConfig, SystemClock};
use daer_engine::{Engine, RunOptions};
use daer_interception::TokioSleeper;
use daer_storage::MemoryStore;
use serde_json::Value;

use crate::adapter::{EchoAdapter, EchoToolExecutor};
use crate::output::{print_report, OutputFormat};

#[derive(Args)]
pub struct RunArgs {
    /// Task payload, as a JSON literal (e.g. `'{"prompt": "hi"}'`).
    #[arg(long, default_value = "null")]
    pub task: String,

    /// Maximum steps the policy allows before the execution is cut off.
    #[arg(long)]
    pub max_steps: Option<u32>,

    /// Token budget the policy enforces across the whole execution.
    #[arg(long)]
    pub max_tokens: Option<u64>,

    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

pub async fn run(args: RunArgs) -> Result<()> {
    let task: Value = serde_json::from_str(&args.task).context("--task must be valid JSON")?;

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

    let policy = PolicyConfig { max_steps: args.max_steps, max_tokens: args.max_tokens, ..PolicyConfig::default() };
    let report = engine.run(task, policy, RunOptions::default()).await.context("execution failed")?;

    print_report(args.format, &report, || {
        format!(
            "execution {} finished as {:?} after {} step(s), {} token(s)",
            report.execution_id, report.status, report.total_steps, report.token_usage
        )
    });
    Ok(())
}

// SPDX-License-Identifier: MIT

//! `daer`: a command-line front end over the Runtime's Submission API, for
//! local runs and ad hoc DAG demos. The Runtime's real deployment surface
//! is a library embedded in a host process, not this binary; `daer` exists
//! for local development and smoke-testing, not production traffic.

mod adapter;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "daer", version, about = "Deterministic AI Execution Runtime CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit one task to the Execution Engine and print its report.
    Run(commands::run::RunArgs),
    /// Submit a task graph to the DAG Executor and print per-node reports.
    Dag(commands::dag::DagArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => commands::run::run(args).await,
        Command::Dag(args) => commands::dag::run(args).await,
    }
}

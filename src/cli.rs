// SPDX-License-Identifier: MIT
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Thin CLI surface wiring the nine components together for headless use.
/// Full interactive argument parsing is intentionally out of scope here.
#[derive(Debug, Parser)]
#[command(name = "aiwhisperer", about = "Interactive multi-agent orchestration runtime")]
pub struct Cli {
    /// Path to a workspace config YAML file. Defaults to `.WHISPER/config.yaml`.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Emit tracing output to stderr.
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Parse, validate, and execute a single batch script through the Batch Runtime.
    RunBatch {
        script: PathBuf,
        #[arg(long)]
        dry_run: bool,
        #[arg(long)]
        stop_on_error: bool,
    },
    /// Discover batch scripts under the workspace's health-check folder and run them.
    HealthCheck {
        #[arg(long)]
        scripts_dir: Option<PathBuf>,
    },
    /// Run the Workspace Validator and print a check-by-check report.
    ValidateWorkspace,
}

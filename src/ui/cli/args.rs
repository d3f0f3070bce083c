// Wed Jan 15 2026 - Alex

use crate::config::ExecutionMode;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "bench-runner")]
#[command(author = "Alex")]
#[command(version = "1.0.0")]
#[command(about = "Runs model accuracy benchmark pipelines across parallel workers", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true, default_value = "info")]
    pub log_level: String,

    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run every pipeline listed in a manifest
    Run(RunArgs),
    /// Print a saved results file
    Summary(SummaryArgs),
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    pub manifest: PathBuf,

    #[arg(short, long)]
    pub jobs: Option<usize>,

    #[arg(long)]
    pub mode: Option<String>,

    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    #[arg(long)]
    pub desc: Option<String>,

    #[arg(long)]
    pub no_progress: bool,

    #[arg(short, long, default_value = "results.json")]
    pub output: PathBuf,

    #[arg(long)]
    pub markdown: Option<PathBuf>,
}

impl RunArgs {
    pub fn validate(&self) -> Result<(), String> {
        if !self.manifest.exists() {
            return Err(format!("Manifest does not exist: {:?}", self.manifest));
        }
        if self.jobs == Some(0) {
            return Err("--jobs must be greater than 0".to_string());
        }
        if self.poll_interval_ms == Some(0) {
            return Err("--poll-interval-ms must be greater than 0".to_string());
        }
        if let Some(ref mode) = self.mode {
            if ExecutionMode::from_str(mode).is_none() {
                return Err(format!(
                    "Unknown mode '{}'; expected auto, pool or sequential",
                    mode
                ));
            }
        }
        Ok(())
    }

    pub fn execution_mode(&self) -> Option<ExecutionMode> {
        self.mode.as_deref().and_then(ExecutionMode::from_str)
    }
}

#[derive(Parser, Debug)]
pub struct SummaryArgs {
    pub input: PathBuf,

    #[arg(long)]
    pub markdown: bool,
}

// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::types::EngineMode;

/// Command-line arguments for `mtsched`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "mtsched",
    version,
    about = "Run a message-passing schedule in parallel over its dependency graph.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the model description (TOML).
    #[arg(long, value_name = "PATH", default_value = "Mtsched.toml")]
    pub config: PathBuf,

    /// Execution engine; overrides `[config].mode`.
    #[arg(long, value_name = "MODE")]
    pub mode: Option<EngineMode>,

    /// Worker threads; overrides `[config].workers`.
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,

    /// Iterations to run; overrides `[config].iterations`.
    #[arg(long, value_name = "K")]
    pub iterations: Option<usize>,

    /// Write the per-iteration dependency graph as GraphViz DOT.
    #[arg(long, value_name = "PATH")]
    pub dot: Option<PathBuf>,

    /// Also run sequentially on a fresh model and fail on any difference.
    #[arg(long)]
    pub verify: bool,

    /// Parse + validate, print the model and schedule, but do not run.
    #[arg(long)]
    pub dry_run: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `MTSCHED_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

// src/logging.rs

//! Logging setup for `mtsched` using `tracing` + `tracing-subscriber`.
//!
//! The filter is picked in this order:
//! 1. `--log-level`, applied to the `mtsched` targets (dependencies stay at
//!    `warn`)
//! 2. `MTSCHED_LOG`, read as `EnvFilter` directives, e.g.
//!    `info,mtsched::engine::static_queue=trace`
//! 3. [`DEFAULT_DIRECTIVES`]
//!
//! Engine threads run inside a `worker` span nested under the manager's
//! `iterate` span, so every event carries the mode and worker index.
//! Logs go to STDERR; stdout carries the final messages printed by the CLI.

use anyhow::{Context, Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

pub const LOG_ENV: &str = "MTSCHED_LOG";

pub const DEFAULT_DIRECTIVES: &str = "warn,mtsched=info";

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV).ok();
    let filter = build_filter(cli_level, env.as_deref())?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to install log subscriber: {e}"))
}

/// The filter for a CLI level and the raw value of [`LOG_ENV`].
pub fn build_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> Result<EnvFilter> {
    if let Some(level) = cli_level {
        return Ok(EnvFilter::new(format!("warn,mtsched={}", level_directive(level))));
    }
    match env.map(str::trim).filter(|s| !s.is_empty()) {
        Some(directives) => EnvFilter::try_new(directives)
            .with_context(|| format!("invalid {LOG_ENV} value '{directives}'")),
        None => Ok(EnvFilter::new(DEFAULT_DIRECTIVES)),
    }
}

fn level_directive(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

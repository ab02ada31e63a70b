// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MtschedError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// The schedule cannot be turned into a dependency graph (e.g. it is
    /// dynamic and therefore not statically enumerable).
    #[error("Unsupported schedule: {0}")]
    UnsupportedSchedule(String),

    #[error("Unknown node: {0}")]
    UnknownNode(String),

    /// A worker's `update()` returned an error. Re-raised once from
    /// `iterate()` after every worker has stopped.
    #[error("worker {worker} failed while updating {entry}: {source}")]
    WorkerFailed {
        entry: String,
        worker: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("worker {worker} panicked while updating {entry}: {message}")]
    WorkerPanicked {
        entry: String,
        worker: usize,
        message: String,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, MtschedError>;

// src/config/mod.rs

//! TOML model descriptions.
//!
//! [`loader`] reads a file into a [`RawConfigFile`]; [`validate`] turns it
//! into a [`ConfigFile`] that can build a [`MessageGraph`](crate::model::MessageGraph)
//! and the manager options.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{ConfigFile, ConfigSection, NodeConfig, RawConfigFile, ScheduleEntryConfig};

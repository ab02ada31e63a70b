// src/config/validate.rs

use std::collections::{BTreeMap, BTreeSet};

use crate::config::model::{ConfigFile, RawConfigFile, ScheduleEntryConfig};
use crate::errors::{MtschedError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = MtschedError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.node, raw.schedule))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_nodes(cfg)?;
    validate_global_config(cfg)?;
    let adjacency = validate_neighbors(cfg)?;
    validate_schedule(cfg, &adjacency)?;
    Ok(())
}

fn ensure_has_nodes(cfg: &RawConfigFile) -> Result<()> {
    if cfg.node.is_empty() {
        return Err(MtschedError::ConfigError(
            "config must contain at least one [node.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.workers == Some(0) {
        return Err(MtschedError::ConfigError(
            "[config].workers must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.config.iterations == 0 {
        return Err(MtschedError::ConfigError(
            "[config].iterations must be >= 1 (got 0)".to_string(),
        ));
    }
    let damping = cfg.config.damping;
    if !(0.0..1.0).contains(&damping) {
        return Err(MtschedError::ConfigError(format!(
            "[config].damping must be in [0, 1) (got {damping})"
        )));
    }
    Ok(())
}

/// Check `neighbors` lists and return the undirected adjacency they imply.
fn validate_neighbors(cfg: &RawConfigFile) -> Result<BTreeMap<&str, BTreeSet<&str>>> {
    let mut adjacency: BTreeMap<&str, BTreeSet<&str>> = cfg
        .node
        .keys()
        .map(|name| (name.as_str(), BTreeSet::new()))
        .collect();

    for (name, node) in &cfg.node {
        for neighbor in &node.neighbors {
            if !cfg.node.contains_key(neighbor) {
                return Err(MtschedError::ConfigError(format!(
                    "node '{name}' has unknown neighbor '{neighbor}'"
                )));
            }
            if neighbor == name {
                return Err(MtschedError::ConfigError(format!(
                    "node '{name}' cannot be its own neighbor"
                )));
            }
            adjacency.entry(name.as_str()).or_default().insert(neighbor.as_str());
            adjacency.entry(neighbor.as_str()).or_default().insert(name.as_str());
        }
    }
    Ok(adjacency)
}

fn validate_schedule(
    cfg: &RawConfigFile,
    adjacency: &BTreeMap<&str, BTreeSet<&str>>,
) -> Result<()> {
    let known = |name: &str, item: &ScheduleEntryConfig| -> Result<()> {
        if adjacency.contains_key(name) {
            Ok(())
        } else {
            Err(MtschedError::ConfigError(format!(
                "schedule item ({}) refers to unknown node '{name}'",
                item.describe()
            )))
        }
    };

    for item in &cfg.schedule {
        match (&item.node, &item.edge, &item.block, item.port) {
            (Some(node), None, None, None) => known(node.as_str(), item)?,
            (None, Some(edge), None, Some(port)) => {
                known(edge.as_str(), item)?;
                let degree = adjacency.get(edge.as_str()).map_or(0, |s| s.len());
                if port >= degree {
                    return Err(MtschedError::ConfigError(format!(
                        "schedule item ({}) uses port {port} but '{edge}' has {degree} neighbors",
                        item.describe()
                    )));
                }
            }
            (None, None, Some(block), None) => {
                if block.is_empty() {
                    return Err(MtschedError::ConfigError(
                        "schedule item has an empty `block`".to_string(),
                    ));
                }
                for name in block {
                    known(name.as_str(), item)?;
                }
            }
            (None, Some(edge), None, None) => {
                return Err(MtschedError::ConfigError(format!(
                    "schedule item for edge '{edge}' is missing `port`"
                )));
            }
            _ => {
                return Err(MtschedError::ConfigError(format!(
                    "schedule item must set exactly one of `node`, `edge` or `block` ({})",
                    item.describe()
                )));
            }
        }
    }
    Ok(())
}

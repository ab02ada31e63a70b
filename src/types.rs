use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Which execution engine the manager uses for `iterate()`.
///
/// - `CrossIteration`: unroll all requested iterations into one graph and
///   drain it through a single shared queue.
/// - `Static`: build one iteration's graph, drain it through a single shared
///   queue with atomic counters, once per iteration.
/// - `Phase`: layer the per-iteration graph into phases and run each phase
///   across per-worker queues with work stealing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineMode {
    CrossIteration,
    Static,
    Phase,
}

impl Default for EngineMode {
    fn default() -> Self {
        EngineMode::Static
    }
}

impl FromStr for EngineMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "cross_iteration" => Ok(EngineMode::CrossIteration),
            "static" => Ok(EngineMode::Static),
            "phase" => Ok(EngineMode::Phase),
            other => Err(format!(
                "invalid engine mode: {other} (expected \"cross_iteration\", \"static\" or \"phase\")"
            )),
        }
    }
}

impl fmt::Display for EngineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EngineMode::CrossIteration => "cross_iteration",
            EngineMode::Static => "static",
            EngineMode::Phase => "phase",
        };
        f.write_str(s)
    }
}

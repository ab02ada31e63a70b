// src/dag/mod.rs

//! Dependency graphs derived from schedules.
//!
//! - [`graph`] and [`node`] hold the generic arena-backed graph.
//! - [`access`] tracks port writers/readers while a graph is being built.
//! - [`cross_iteration`] unrolls a schedule over every iteration.
//! - [`static_graph`] builds one reusable iteration with countdown counters.
//! - [`phases`] layers any graph into mutually independent phases.
//! - [`verify`] checks finished graphs; [`dot`] renders them.

pub mod access;
pub mod cross_iteration;
pub mod dot;
pub mod graph;
pub mod node;
pub mod phases;
pub mod static_graph;
pub mod verify;

/// Position of a node inside its [`DependencyGraph`].
pub type NodeIndex = usize;

pub use access::AccessTracker;
pub use cross_iteration::build_cross_iteration_graph;
pub use graph::DependencyGraph;
pub use node::DependencyGraphNode;
pub use phases::phase_layers;
pub use static_graph::StaticDependencyGraph;
pub use verify::{GraphViolation, verify_ordering, verify_phases};

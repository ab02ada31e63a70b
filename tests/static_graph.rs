// tests/static_graph.rs

mod common;
use crate::common::builders::{chain, grid, star};
use crate::common::mixed_schedule;

use mtsched::dag::{StaticDependencyGraph, verify_ordering, verify_phases};
use mtsched::errors::MtschedError;
use mtsched::model::{FactorModel, MessageGraph, NodeId};
use mtsched::schedule::{Schedule, ScheduleEntry};

fn node(i: usize) -> ScheduleEntry {
    ScheduleEntry::node(NodeId(i))
}

/// Hub `n0` with leaves `n1..n3`; leaves first, hub last.
fn star_model() -> (MessageGraph, Schedule) {
    let model = star(3);
    let schedule = Schedule::fixed(vec![node(1), node(2), node(3), node(0)]);
    (model, schedule)
}

#[test]
fn star_leaves_share_a_phase_and_the_hub_follows() {
    let (model, schedule) = star_model();
    let graph = StaticDependencyGraph::build(&model, &schedule).unwrap();

    let sizes: Vec<usize> = graph.phase_indices().iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![3, 1]);
    assert_eq!(graph.phases()[1], vec![node(0)]);
    assert_eq!(graph.initial_entries(), &[0, 1, 2]);
    assert_eq!(graph.phase_of(3), 1);
    assert!(verify_phases(graph.graph(), graph.phase_indices()).is_ok());
}

#[test]
fn counters_count_down_and_restore_at_zero() {
    let (model, schedule) = star_model();
    let graph = StaticDependencyGraph::build(&model, &schedule).unwrap();
    let hub = 3;

    assert_eq!(graph.original_dependency_count(hub), 3);
    assert_eq!(graph.dependency_count(hub), 3);

    assert!(!graph.release_dependency(hub));
    assert!(!graph.release_dependency(hub));
    assert_eq!(graph.dependency_count(hub), 1);
    assert!(graph.release_dependency(hub), "last release must report ready");
    assert_eq!(
        graph.dependency_count(hub),
        3,
        "counter is restored for the next iteration"
    );
}

#[test]
fn reset_counters_recovers_from_partial_release() {
    let (model, schedule) = star_model();
    let graph = StaticDependencyGraph::build(&model, &schedule).unwrap();

    graph.release_dependency(3);
    graph.release_dependency(3);
    graph.reset_counters();

    for index in 0..graph.node_count() {
        assert_eq!(
            graph.dependency_count(index),
            graph.original_dependency_count(index)
        );
    }
}

#[test]
fn phase_is_one_past_the_latest_dependency() {
    let model = grid(3, 3);
    let schedule = mixed_schedule(&model);
    let graph = StaticDependencyGraph::build(&model, &schedule).unwrap();
    let inner = graph.graph();

    assert_eq!(graph.node_count(), schedule.leaf_count());
    for (index, node) in inner.iter() {
        let expected = node
            .dependencies()
            .map(|d| graph.phase_of(d) + 1)
            .max()
            .unwrap_or(0);
        assert_eq!(graph.phase_of(index), expected, "phase of node {index}");
    }
    assert!(verify_ordering(&model, inner).is_ok());
    assert!(verify_phases(inner, graph.phase_indices()).is_ok());
}

#[test]
fn unrolled_graph_repeats_the_schedule() {
    let (model, schedule) = star_model();
    let graph = StaticDependencyGraph::build_unrolled(&model, &schedule, 2).unwrap();

    assert_eq!(graph.node_count(), 8);
    let sizes: Vec<usize> = graph.phase_indices().iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![3, 1, 3, 1]);
    // The second round's leaves wait for the first round's hub.
    for leaf in 4..7 {
        assert!(graph.graph().node(leaf).has_dependency(3));
    }
}

#[test]
fn empty_schedule_builds_an_empty_graph() {
    let model = chain(3);
    let graph = StaticDependencyGraph::build(&model, &Schedule::default()).unwrap();

    assert_eq!(graph.node_count(), 0);
    assert!(graph.initial_entries().is_empty());
    assert!(graph.phases().is_empty());
}

#[test]
fn dynamic_schedule_is_rejected() {
    let model = chain(3);
    let err = StaticDependencyGraph::build(&model, &Schedule::dynamic(vec![node(0)])).unwrap_err();
    assert!(matches!(err, MtschedError::UnsupportedSchedule(_)), "{err:?}");
}

#[test]
fn dot_output_uses_node_names_and_phase_colors() {
    let (model, schedule) = star_model();
    let graph = StaticDependencyGraph::build(&model, &schedule).unwrap();

    let dot = graph.to_dot(&model);
    assert!(dot.contains("node(n1)"), "{dot}");
    assert!(dot.contains("node(n0)"), "{dot}");
    assert!(dot.contains("color = \"red\""), "{dot}");
    assert!(dot.contains("color = \"blue\""), "{dot}");
}

#[test]
fn write_dot_creates_the_file() {
    let (model, schedule) = star_model();
    let graph = StaticDependencyGraph::build(&model, &schedule).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graph.dot");

    graph.write_dot(&model, &path).unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    assert_eq!(written, graph.to_dot(&model));
    assert_eq!(model.node_count(), 4);
}

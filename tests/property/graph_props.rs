// tests/property/graph_props.rs

use proptest::prelude::*;

use mtsched::dag::phases::phase_layers;
use mtsched::dag::{
    StaticDependencyGraph, build_cross_iteration_graph, verify_ordering, verify_phases,
};
use mtsched::engine::{MultithreadingManager, MultithreadingOptions, run_sequential};
use mtsched::model::{FactorModel, MessageGraph, NodeId};
use mtsched::schedule::{Schedule, ScheduleEntry};
use mtsched::types::EngineMode;

#[derive(Debug, Clone)]
enum EntrySpec {
    Node(usize),
    Edge(usize, usize),
    Block(Vec<usize>),
}

fn entry_strategy() -> impl Strategy<Value = EntrySpec> {
    prop_oneof![
        3 => any::<usize>().prop_map(EntrySpec::Node),
        2 => (any::<usize>(), any::<usize>()).prop_map(|(n, p)| EntrySpec::Edge(n, p)),
        1 => proptest::collection::vec(any::<usize>(), 1..4).prop_map(EntrySpec::Block),
    ]
}

/// Random model (node count, edge list) plus a schedule over it. Indices
/// are reduced modulo the node count / degree when the model is built.
#[derive(Debug, Clone)]
struct Case {
    nodes: usize,
    edges: Vec<(usize, usize)>,
    entries: Vec<EntrySpec>,
    nest: bool,
    damping: f64,
}

fn case_strategy() -> impl Strategy<Value = Case> {
    (
        3usize..9,
        proptest::collection::vec((any::<usize>(), any::<usize>()), 2..16),
        proptest::collection::vec(entry_strategy(), 1..14),
        any::<bool>(),
        prop_oneof![Just(0.0), Just(0.5)],
    )
        .prop_map(|(nodes, edges, entries, nest, damping)| Case {
            nodes,
            edges,
            entries,
            nest,
            damping,
        })
}

fn build(case: &Case) -> MessageGraph {
    let mut model = MessageGraph::new();
    for i in 0..case.nodes {
        model.add_node(format!("v{i}"), (i as f64 * 0.37).sin()).unwrap();
    }
    for &(a, b) in &case.edges {
        let (a, b) = (a % case.nodes, b % case.nodes);
        if a != b {
            model.connect(NodeId(a), NodeId(b)).unwrap();
        }
    }
    model.set_damping(case.damping).unwrap();

    let mut entries: Vec<ScheduleEntry> = case
        .entries
        .iter()
        .map(|spec| match spec {
            EntrySpec::Node(n) => ScheduleEntry::node(NodeId(n % case.nodes)),
            EntrySpec::Edge(n, p) => {
                let node = NodeId(n % case.nodes);
                match model.siblings(node).len() {
                    0 => ScheduleEntry::node(node),
                    degree => ScheduleEntry::edge(node, p % degree),
                }
            }
            EntrySpec::Block(members) => {
                let mut ids: Vec<NodeId> =
                    members.iter().map(|m| NodeId(m % case.nodes)).collect();
                ids.sort_unstable();
                ids.dedup();
                ScheduleEntry::block(ids)
            }
        })
        .collect();

    if case.nest && entries.len() >= 3 {
        let inner: Vec<ScheduleEntry> = entries.drain(1..3).collect();
        entries.insert(1, Schedule::fixed(inner).into_entry());
    }
    model.set_schedule(Schedule::fixed(entries));
    model
}

proptest! {
    #[test]
    fn cross_iteration_graph_orders_every_conflict(case in case_strategy(), iterations in 1usize..4) {
        let model = build(&case);
        let graph = build_cross_iteration_graph(&model, model.schedule(), iterations).unwrap();

        prop_assert_eq!(graph.len(), iterations * model.schedule().leaf_count());
        prop_assert!(verify_ordering(&model, &graph).is_ok());

        let layers = phase_layers(&graph);
        prop_assert!(verify_phases(&graph, &layers).is_ok());
    }

    #[test]
    fn recurring_entries_wait_for_the_previous_occurrence_and_its_readers(
        case in case_strategy(),
    ) {
        let model = build(&case);
        let graph = build_cross_iteration_graph(&model, model.schedule(), 3).unwrap();

        for index in 0..graph.len() {
            let Some(previous) = (0..index).rev().find(|&i| graph.payload(i) == graph.payload(index)) else {
                continue;
            };
            let ancestors = graph.transitive_dependencies(index);
            prop_assert!(ancestors.contains(&previous));
            for dependent in graph.node(previous).dependents().filter(|&d| d < index) {
                prop_assert!(ancestors.contains(&dependent));
            }
        }
    }

    #[test]
    fn static_graph_phases_are_independent(case in case_strategy()) {
        let model = build(&case);
        let graph = StaticDependencyGraph::build(&model, model.schedule()).unwrap();

        prop_assert!(verify_ordering(&model, graph.graph()).is_ok());
        prop_assert!(verify_phases(graph.graph(), graph.phase_indices()).is_ok());

        let covered: usize = graph.phase_indices().iter().map(Vec::len).sum();
        prop_assert_eq!(covered, graph.node_count());
        for &index in graph.initial_entries() {
            prop_assert_eq!(graph.original_dependency_count(index), 0);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn parallel_runs_match_sequential(
        case in case_strategy(),
        mode in prop_oneof![
            Just(EngineMode::CrossIteration),
            Just(EngineMode::Static),
            Just(EngineMode::Phase),
        ],
        workers in 1usize..5,
    ) {
        let reference = build(&case);
        run_sequential(&reference, 3).unwrap();

        let model = build(&case);
        let mut mgr = MultithreadingManager::new(MultithreadingOptions {
            mode,
            workers,
            enabled: true,
        });
        mgr.iterate(&model, 3).unwrap();

        for ((port, got), (_, want)) in model.messages().into_iter().zip(reference.messages()) {
            prop_assert_eq!(got.to_bits(), want.to_bits(), "{} differs in {}", port, mode);
        }
    }
}

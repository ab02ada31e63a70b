#![allow(dead_code)]

pub use mtsched_test_utils::builders;
pub use mtsched_test_utils::instrumented::InstrumentedModel;
pub use mtsched_test_utils::{blocking_with_timeout, init_tracing};

use mtsched::engine::{MultithreadingManager, MultithreadingOptions};
use mtsched::model::{MessageGraph, NodeId};
use mtsched::schedule::{Schedule, ScheduleEntry};
use mtsched::types::EngineMode;

pub const ALL_MODES: [EngineMode; 3] = [
    EngineMode::CrossIteration,
    EngineMode::Static,
    EngineMode::Phase,
];

pub fn manager(mode: EngineMode, workers: usize) -> MultithreadingManager {
    MultithreadingManager::new(MultithreadingOptions {
        mode,
        workers,
        enabled: true,
    })
}

/// Bit-for-bit comparison of every port message.
pub fn assert_same_messages(actual: &MessageGraph, expected: &MessageGraph, context: &str) {
    let actual = actual.messages();
    let expected = expected.messages();
    assert_eq!(actual.len(), expected.len(), "{context}: port count differs");
    for ((port, got), (_, want)) in actual.iter().zip(expected.iter()) {
        assert_eq!(
            got.to_bits(),
            want.to_bits(),
            "{context}: message at {port} differs ({got} vs {want})"
        );
    }
}

/// A schedule mixing every entry kind over a model with at least 6 nodes:
/// node entries, single edges, a block, and a nested sub-schedule.
pub fn mixed_schedule(model: &MessageGraph) -> Schedule {
    let n = model.nodes().count();
    assert!(n >= 6, "mixed_schedule needs at least 6 nodes");

    let nested = Schedule::fixed(vec![
        ScheduleEntry::node(NodeId(n - 1)),
        ScheduleEntry::edge(NodeId(2), 0),
    ]);
    let mut entries = vec![
        ScheduleEntry::node(NodeId(0)),
        ScheduleEntry::edge(NodeId(1), 0),
        ScheduleEntry::block([NodeId(3), NodeId(4)]),
        nested.into_entry(),
    ];
    entries.extend((0..n).map(|i| ScheduleEntry::node(NodeId(i))));
    Schedule::fixed(entries)
}

// tests/integration/config_loading.rs

use std::io::Write;

use tempfile::NamedTempFile;

use crate::common::builders::ConfigFileBuilder;
use mtsched::config::load_and_validate;
use mtsched::engine::MultithreadingOptions;
use mtsched::model::{FactorModel, NodeId};
use mtsched::schedule::{Schedule, ScheduleEntry};
use mtsched::types::EngineMode;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn full_config_is_loaded() {
    let file = write_config(
        r#"
[config]
mode = "phase"
workers = 4
iterations = 10
multithreading = false
damping = 0.25

[node.x]
bias = 0.5
neighbors = ["f"]

[node.f]
neighbors = ["y"]

[node.y]
bias = -0.5

[[schedule]]
node = "x"

[[schedule]]
edge = "f"
port = 1

[[schedule]]
block = ["x", "y"]
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();
    let options = cfg.options();
    assert_eq!(options.mode, EngineMode::Phase);
    assert_eq!(options.workers, 4);
    assert!(!options.enabled);
    assert_eq!(cfg.iterations(), 10);

    let model = cfg.build_model().unwrap();
    // Ids follow key order: f, x, y.
    let (f, x, y) = (NodeId(0), NodeId(1), NodeId(2));
    assert_eq!(model.node_by_name("f"), Some(f));
    assert_eq!(model.node_by_name("x"), Some(x));
    assert_eq!(model.bias_of(x), Some(0.5));
    assert_eq!(model.damping(), 0.25);
    // f lists y itself and is listed by x afterwards.
    assert_eq!(model.siblings(f), &[y, x]);
    assert_eq!(model.siblings(x), &[f]);

    assert_eq!(
        model.schedule(),
        &Schedule::fixed(vec![
            ScheduleEntry::node(x),
            ScheduleEntry::edge(f, 1),
            ScheduleEntry::block([x, y]),
        ])
    );
}

#[test]
fn missing_sections_fall_back_to_defaults() {
    let file = write_config(
        r#"
[node.a]
neighbors = ["b"]

[node.b]
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();
    let options = cfg.options();
    assert_eq!(options.mode, EngineMode::Static);
    assert_eq!(options.workers, MultithreadingOptions::default().workers);
    assert!(options.enabled);
    assert_eq!(cfg.iterations(), 1);

    let model = cfg.build_model().unwrap();
    assert_eq!(model.damping(), 0.0);
    assert_eq!(model.schedule(), &Schedule::flooding(&model));
}

#[test]
fn edges_listed_from_both_ends_are_one_edge() {
    let cfg = ConfigFileBuilder::new()
        .with_node("a", 0.0, &["b"])
        .with_node("b", 0.0, &["a", "c"])
        .with_node("c", 0.0, &[])
        .build();

    let model = cfg.build_model().unwrap();
    assert_eq!(model.siblings(NodeId(0)).len(), 1);
    assert_eq!(model.siblings(NodeId(1)).len(), 2);
    assert_eq!(model.messages().len(), 4);
}

#[test]
fn engine_mode_accepts_hyphenated_names() {
    assert_eq!(
        "cross-iteration".parse::<EngineMode>().unwrap(),
        EngineMode::CrossIteration
    );
    assert_eq!(" Static ".parse::<EngineMode>().unwrap(), EngineMode::Static);
    assert!("turbo".parse::<EngineMode>().is_err());
    assert_eq!(EngineMode::CrossIteration.to_string(), "cross_iteration");
}

#[test]
fn builder_schedule_resolves_names() {
    let cfg = ConfigFileBuilder::new()
        .with_node("hub", 0.1, &["l1", "l2"])
        .with_node("l1", 0.2, &[])
        .with_node("l2", 0.3, &[])
        .mode(EngineMode::CrossIteration)
        .workers(2)
        .iterations(3)
        .damping(0.5)
        .schedule_node("l1")
        .schedule_edge("hub", 1)
        .schedule_block(&["l1", "l2"])
        .build();

    assert_eq!(cfg.options().mode, EngineMode::CrossIteration);
    assert_eq!(cfg.options().workers, 2);
    assert_eq!(cfg.iterations(), 3);

    let model = cfg.build_model().unwrap();
    let (hub, l1, l2) = (NodeId(0), NodeId(1), NodeId(2));
    assert_eq!(
        model.schedule().entries(),
        &[
            ScheduleEntry::node(l1),
            ScheduleEntry::edge(hub, 1),
            ScheduleEntry::block([l1, l2]),
        ]
    );
}

// tests/integration/error_handling.rs

use std::io::Write;

use tempfile::NamedTempFile;

use crate::common::builders::ConfigFileBuilder;
use mtsched::config::{ConfigFile, load_and_validate};
use mtsched::errors::MtschedError;

fn load(contents: &str) -> Result<ConfigFile, MtschedError> {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    load_and_validate(file.path())
}

fn expect_config_error(contents: &str, needle: &str) {
    match load(contents) {
        Err(MtschedError::ConfigError(msg)) => {
            assert!(msg.contains(needle), "'{msg}' does not mention '{needle}'")
        }
        Err(e) => panic!("Expected ConfigError, got: {e:?}"),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

const TWO_NODES: &str = r#"
[node.a]
neighbors = ["b"]

[node.b]
"#;

#[test]
fn missing_file_returns_io_error() {
    let result = load_and_validate("/definitely/not/here/Mtsched.toml");
    assert!(matches!(result, Err(MtschedError::IoError(_))), "{result:?}");
}

#[test]
fn invalid_toml_returns_toml_error() {
    let result = load("[node.a\nbias = ");
    assert!(matches!(result, Err(MtschedError::TomlError(_))), "{result:?}");
}

#[test]
fn unknown_engine_mode_is_a_parse_error() {
    let result = load(&format!("[config]\nmode = \"turbo\"\n{TWO_NODES}"));
    assert!(matches!(result, Err(MtschedError::TomlError(_))), "{result:?}");
}

#[test]
fn unknown_schedule_field_is_a_parse_error() {
    let result = load(&format!("{TWO_NODES}\n[[schedule]]\nnod = \"a\"\n"));
    assert!(matches!(result, Err(MtschedError::TomlError(_))), "{result:?}");
}

#[test]
fn misspelled_keys_are_parse_errors() {
    for contents in [
        format!("[config]\niteratons = 5\n{TWO_NODES}"),
        format!("{TWO_NODES}bais = 0.5\n"),
        format!("[confg]\nworkers = 2\n{TWO_NODES}"),
    ] {
        let result = load(&contents);
        assert!(
            matches!(result, Err(MtschedError::TomlError(_))),
            "{contents}: {result:?}"
        );
    }
}

#[test]
fn config_without_nodes_is_rejected() {
    expect_config_error("[config]\niterations = 2\n", "at least one");
}

#[test]
fn unknown_neighbor_is_rejected() {
    expect_config_error("[node.a]\nneighbors = [\"ghost\"]\n", "unknown neighbor 'ghost'");
}

#[test]
fn self_neighbor_is_rejected() {
    expect_config_error("[node.a]\nneighbors = [\"a\"]\n", "its own neighbor");
}

#[test]
fn out_of_range_settings_are_rejected() {
    expect_config_error(&format!("[config]\nworkers = 0\n{TWO_NODES}"), "workers");
    expect_config_error(&format!("[config]\niterations = 0\n{TWO_NODES}"), "iterations");
    expect_config_error(&format!("[config]\ndamping = 1.0\n{TWO_NODES}"), "damping");
    expect_config_error(&format!("[config]\ndamping = -0.1\n{TWO_NODES}"), "damping");
}

#[test]
fn schedule_item_with_unknown_node_is_rejected() {
    expect_config_error(
        &format!("{TWO_NODES}\n[[schedule]]\nnode = \"ghost\"\n"),
        "unknown node 'ghost'",
    );
    expect_config_error(
        &format!("{TWO_NODES}\n[[schedule]]\nblock = [\"a\", \"ghost\"]\n"),
        "unknown node 'ghost'",
    );
}

#[test]
fn edge_item_port_must_exist() {
    expect_config_error(
        &format!("{TWO_NODES}\n[[schedule]]\nedge = \"a\"\nport = 1\n"),
        "has 1 neighbors",
    );
    expect_config_error(
        &format!("{TWO_NODES}\n[[schedule]]\nedge = \"a\"\n"),
        "missing `port`",
    );
}

#[test]
fn malformed_schedule_items_are_rejected() {
    expect_config_error(
        &format!("{TWO_NODES}\n[[schedule]]\nblock = []\n"),
        "empty `block`",
    );
    expect_config_error(
        &format!("{TWO_NODES}\n[[schedule]]\nnode = \"a\"\nedge = \"b\"\nport = 0\n"),
        "exactly one",
    );
    expect_config_error(
        &format!("{TWO_NODES}\n[[schedule]]\nnode = \"a\"\nport = 0\n"),
        "exactly one",
    );
}

#[test]
fn builder_rejects_invalid_raw_config() {
    let raw = ConfigFileBuilder::new()
        .with_node("a", 0.0, &["b"])
        .raw();
    let result = ConfigFile::try_from(raw);
    assert!(matches!(result, Err(MtschedError::ConfigError(_))));
}

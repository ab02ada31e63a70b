// tests/integration/cli_run.rs

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use tempfile::TempDir;

use mtsched::cli::CliArgs;
use mtsched::run;
use mtsched::types::EngineMode;

const GRID: &str = r#"
[config]
iterations = 4
damping = 0.2

[node.a]
bias = 0.3
neighbors = ["b", "d"]

[node.b]
bias = -0.2
neighbors = ["c", "e"]

[node.c]
bias = 0.1
neighbors = ["f"]

[node.d]
bias = 0.4
neighbors = ["e"]

[node.e]
bias = -0.4
neighbors = ["f"]

[node.f]
bias = 0.0

[[schedule]]
node = "a"

[[schedule]]
edge = "e"
port = 2

[[schedule]]
block = ["c", "d"]

[[schedule]]
node = "f"

[[schedule]]
node = "b"
"#;

fn workspace(contents: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Mtsched.toml");
    fs::write(&path, contents).unwrap();
    (dir, path)
}

fn args(config: &Path, extra: &[&str]) -> CliArgs {
    let mut argv = vec!["mtsched", "--config", config.to_str().unwrap()];
    argv.extend_from_slice(extra);
    CliArgs::try_parse_from(argv).unwrap()
}

#[test]
fn cli_flags_are_parsed() {
    let parsed = CliArgs::try_parse_from([
        "mtsched",
        "--mode",
        "cross-iteration",
        "--workers",
        "3",
        "--iterations",
        "7",
        "--verify",
        "--log-level",
        "debug",
    ])
    .unwrap();

    assert_eq!(parsed.config, PathBuf::from("Mtsched.toml"));
    assert_eq!(parsed.mode, Some(EngineMode::CrossIteration));
    assert_eq!(parsed.workers, Some(3));
    assert_eq!(parsed.iterations, Some(7));
    assert!(parsed.verify);
    assert!(!parsed.dry_run);
    assert!(parsed.dot.is_none());
}

#[test]
fn invalid_mode_flag_is_rejected() {
    assert!(CliArgs::try_parse_from(["mtsched", "--mode", "turbo"]).is_err());
}

#[test]
fn verified_run_succeeds_in_every_mode() {
    let (_dir, path) = workspace(GRID);
    for mode in ["cross_iteration", "static", "phase"] {
        run(args(&path, &["--mode", mode, "--workers", "3", "--verify"]))
            .unwrap_or_else(|e| panic!("{mode}: {e:?}"));
    }
}

#[test]
fn sequential_config_runs_without_workers() {
    let (_dir, path) = workspace(&GRID.replace(
        "[config]\n",
        "[config]\nmultithreading = false\n",
    ));
    run(args(&path, &["--verify", "--iterations", "2"])).unwrap();
}

#[test]
fn dot_flag_writes_the_per_iteration_graph() {
    let (dir, path) = workspace(GRID);
    let dot = dir.path().join("graph.dot");

    run(args(&path, &["--dot", dot.to_str().unwrap()])).unwrap();

    let written = fs::read_to_string(&dot).unwrap();
    assert!(written.starts_with("digraph"), "{written}");
    assert!(written.contains("node(a)"), "{written}");
    assert!(written.contains("edge(e:2)"), "{written}");
    assert!(written.contains("block[c,d]"), "{written}");
}

#[test]
fn dry_run_executes_nothing() {
    let (dir, path) = workspace(GRID);
    let dot = dir.path().join("graph.dot");

    run(args(&path, &["--dry-run", "--dot", dot.to_str().unwrap()])).unwrap();

    assert!(!dot.exists(), "dry-run must not write the DOT file");
}

#[test]
fn zero_workers_flag_is_rejected() {
    let (_dir, path) = workspace(GRID);
    let err = run(args(&path, &["--workers", "0"])).unwrap_err();
    assert!(err.to_string().contains("--workers"), "{err}");
}

#[test]
fn invalid_config_fails_the_run() {
    let (_dir, path) = workspace("[node.a]\nneighbors = [\"nobody\"]\n");
    assert!(run(args(&path, &[])).is_err());
}

// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod model;
pub mod schedule;
pub mod types;

use anyhow::{Result, bail, ensure};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::ConfigFile;
use crate::config::loader::load_and_validate;
use crate::dag::{StaticDependencyGraph, build_cross_iteration_graph, verify_ordering, verify_phases};
use crate::engine::{MultithreadingManager, MultithreadingOptions, run_sequential};
use crate::model::{FactorModel, MessageGraph};

/// High-level entry point used by `main.rs`.
///
/// Loads the model description, applies CLI overrides, optionally exports
/// the dependency graph, runs the schedule and prints the final messages.
pub fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)?;
    let model = cfg.build_model()?;

    let mut options = cfg.options();
    if let Some(mode) = args.mode {
        options.mode = mode;
    }
    if let Some(workers) = args.workers {
        ensure!(workers >= 1, "--workers must be >= 1 (got 0)");
        options.workers = workers;
    }
    let iterations = args.iterations.unwrap_or(cfg.iterations());

    if args.dry_run {
        print_dry_run(&cfg, &model, &options, iterations);
        return Ok(());
    }

    if let Some(path) = &args.dot {
        let graph = StaticDependencyGraph::build(&model, model.schedule())?;
        graph.write_dot(&model, path)?;
        info!(path = %path.display(), phases = graph.phase_indices().len(), "wrote DOT file");
    }

    let mut manager = MultithreadingManager::new(options);
    manager.iterate(&model, iterations)?;

    if args.verify {
        verify_run(&cfg, &model, iterations)?;
    }

    print_messages(&model);
    Ok(())
}

/// Check the dependency graphs for ordering violations, then replay the run
/// sequentially on a fresh model and compare every message bit for bit.
fn verify_run(cfg: &ConfigFile, model: &MessageGraph, iterations: usize) -> Result<()> {
    let unrolled = build_cross_iteration_graph(model, model.schedule(), iterations)?;
    verify_ordering(model, &unrolled)?;
    let per_iteration = StaticDependencyGraph::build(model, model.schedule())?;
    verify_ordering(model, per_iteration.graph())?;
    verify_phases(per_iteration.graph(), per_iteration.phase_indices())?;
    debug!("dependency graphs verified");

    let reference = cfg.build_model()?;
    run_sequential(&reference, iterations)?;

    let mut mismatches = 0;
    for ((port, got), (_, want)) in model.messages().into_iter().zip(reference.messages()) {
        if got.to_bits() != want.to_bits() {
            mismatches += 1;
            eprintln!(
                "mismatch at {}:{}: parallel {got} vs sequential {want}",
                model.node_name(port.node),
                port.index
            );
        }
    }
    if mismatches > 0 {
        bail!("{mismatches} message(s) differ from the sequential run");
    }
    info!("parallel run matches sequential reference");
    Ok(())
}

fn print_messages(model: &MessageGraph) {
    for (port, value) in model.messages() {
        let from = model
            .siblings(port.node)
            .get(port.index)
            .map(|s| model.node_name(*s))
            .unwrap_or_default();
        println!("{} <- {from}: {value:.6}", model.node_name(port.node));
    }
}

/// Simple dry-run output: print settings, nodes and the schedule.
fn print_dry_run(
    cfg: &ConfigFile,
    model: &MessageGraph,
    options: &MultithreadingOptions,
    iterations: usize,
) {
    println!("mtsched dry-run");
    println!("  config.mode = {}", options.mode);
    println!("  config.workers = {}", options.workers);
    println!("  config.iterations = {iterations}");
    println!("  config.multithreading = {}", options.enabled);
    println!("  config.damping = {}", cfg.config.damping);
    println!();

    println!("nodes ({}):", model.node_count());
    for node in model.nodes() {
        let neighbors: Vec<String> = model
            .siblings(node)
            .iter()
            .map(|s| model.node_name(*s))
            .collect();
        println!(
            "  - {} (bias {}) -> {:?}",
            model.node_name(node),
            model.bias_of(node).unwrap_or_default(),
            neighbors
        );
    }

    let schedule = model.schedule();
    let source = if cfg.schedule.is_empty() { "flooding" } else { "explicit" };
    println!();
    println!("schedule ({source}, {} entries):", schedule.len());
    for entry in schedule.entries() {
        println!("  - {}", entry.describe(model));
    }

    debug!("dry-run complete (no execution)");
}

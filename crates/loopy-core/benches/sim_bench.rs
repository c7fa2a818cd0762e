//! Criterion benchmarks for the Loopy simulation engine.
//!
//! Benchmark groups:
//! - `ring`: a 200-node reinforcing loop kept busy by alternating pokes
//! - `grid`: a 40x40 mesh (3120 edges) with latency on every other node
//! - `chain`: a 1000-node relay where one pulse walks the whole line
//! - `persistence`: snapshot/restore and diagram save/load of the grid

use criterion::{Criterion, criterion_group, criterion_main};
use loopy_core::engine::Engine;
use loopy_core::id::*;
use loopy_core::persist::Diagram;
use loopy_core::sim::GlobalConfig;
use loopy_core::test_utils::*;

// ===========================================================================
// Diagram builders
// ===========================================================================

/// A started ring of 200 nodes, warmed up with a few pokes so signals are
/// in flight on most edges.
fn build_busy_ring() -> (Engine, Vec<NodeId>) {
    let (mut engine, nodes) = build_ring(200, GlobalConfig::default());
    engine.start();
    for (i, &node) in nodes.iter().enumerate().step_by(10) {
        engine.inject_external(node, if i % 20 == 0 { 0.3 } else { -0.3 }, None);
    }
    run(&mut engine, 5);
    (engine, nodes)
}

/// A started 40x40 grid. Every other node aggregates for a tenth of a
/// second, so buckets open and release throughout the run.
fn build_busy_grid() -> (Engine, Vec<NodeId>) {
    let (mut engine, grid) = build_grid(40, 40);
    let nodes: Vec<NodeId> = grid.into_iter().flatten().collect();
    for &node in nodes.iter().step_by(2) {
        if let Ok(config) = engine.graph.node_config_mut(node) {
            config.aggregation_latency = 0.1;
        }
    }
    engine.start();
    for &node in nodes.iter().take(40) {
        engine.inject_external(node, 0.2, None);
    }
    run(&mut engine, 5);
    (engine, nodes)
}

// ===========================================================================
// Benchmarks
// ===========================================================================

fn bench_ring(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring");
    group.sample_size(50);

    let (mut engine, nodes) = build_busy_ring();
    let mut flip = false;

    group.bench_function("200_nodes_reinforcing", |b| {
        b.iter(|| {
            flip = !flip;
            engine.inject_external(nodes[0], if flip { 0.1 } else { -0.1 }, None);
            engine.step(1.0);
        });
    });

    group.finish();
}

fn bench_grid(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid");
    group.sample_size(20);

    let (mut engine, nodes) = build_busy_grid();
    let mut flip = false;

    group.bench_function("1600_nodes_3120_edges_latency", |b| {
        b.iter(|| {
            flip = !flip;
            engine.inject_external(nodes[0], if flip { 0.2 } else { -0.2 }, None);
            engine.step(1.0);
        });
    });

    group.finish();
}

fn bench_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain");
    group.sample_size(10);

    group.bench_function("1000_node_relay_200_ticks", |b| {
        b.iter_batched(
            || {
                let (mut engine, nodes) = build_chain(1000);
                engine.start();
                engine.inject_external(nodes[0], 0.25, None);
                engine
            },
            |mut engine| run(&mut engine, 200),
            criterion::BatchSize::LargeInput,
        );
    });

    group.finish();
}

fn bench_persistence(c: &mut Criterion) {
    let mut group = c.benchmark_group("persistence");
    group.sample_size(30);

    let (engine, _) = build_busy_grid();

    group.bench_function("snapshot_1600_nodes", |b| {
        b.iter(|| {
            engine.snapshot().unwrap();
        });
    });

    let bytes = engine.snapshot().unwrap();
    group.bench_function("restore_1600_nodes", |b| {
        b.iter(|| {
            Engine::restore(&bytes).unwrap();
        });
    });

    group.bench_function("diagram_save_1600_nodes", |b| {
        b.iter(|| {
            Diagram::capture(&engine).to_json().unwrap();
        });
    });

    let json = Diagram::capture(&engine).to_json().unwrap();
    group.bench_function("diagram_load_1600_nodes", |b| {
        b.iter(|| {
            Diagram::from_json(&json)
                .unwrap()
                .build(GlobalConfig::default());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_ring, bench_grid, bench_chain, bench_persistence);
criterion_main!(benches);

//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::color::Hue;
use crate::edge::EdgeConfig;
use crate::engine::Engine;
use crate::fixed::{Fixed64, f64_to_fixed64};
use crate::id::*;
use crate::node::{InitialFill, NodeConfig};
use crate::sim::GlobalConfig;

// ===========================================================================
// Fixed-point helper
// ===========================================================================

pub fn fixed(v: f64) -> Fixed64 {
    f64_to_fixed64(v)
}

// ===========================================================================
// Node and edge constructors
// ===========================================================================

/// A node at `(x, 0)` whose thresholds can never be reached, so nothing
/// crosses or explodes unless a test asks for it.
pub fn quiet_node(x: f64) -> NodeConfig {
    NodeConfig {
        x,
        overflow: Fixed64::from_num(2),
        underflow: Fixed64::from_num(2),
        ..NodeConfig::default()
    }
}

/// A quiet node with the given starting fill.
pub fn node_with_fill(x: f64, initial_fill: InitialFill) -> NodeConfig {
    NodeConfig {
        initial_fill,
        ..quiet_node(x)
    }
}

/// A quiet node of a given hue.
pub fn colored_node(x: f64, hue: Hue) -> NodeConfig {
    NodeConfig {
        hue,
        ..quiet_node(x)
    }
}

pub fn add_node(engine: &mut Engine, config: NodeConfig) -> NodeId {
    engine.add_node(config)
}

pub fn connect(engine: &mut Engine, from: NodeId, to: NodeId, config: EdgeConfig) -> EdgeId {
    engine
        .connect(from, to, config)
        .expect("test nodes must exist")
}

// ===========================================================================
// Stepping helpers
// ===========================================================================

/// Step `n` ticks of `dt = 1`.
pub fn run(engine: &mut Engine, n: usize) {
    for _ in 0..n {
        engine.step(1.0);
    }
}

/// Fill of a node, panicking if it does not exist.
pub fn fill(engine: &Engine, node: NodeId) -> Fixed64 {
    engine.node_fill(node).expect("node must exist")
}

// ===========================================================================
// Diagram builders (for benchmarks, stress tests, and proptests)
// ===========================================================================

/// Two quiet nodes `distance` apart joined by a default edge. Running.
pub fn build_pair(distance: f64) -> (Engine, NodeId, NodeId, EdgeId) {
    let mut engine = Engine::default();
    let a = add_node(&mut engine, quiet_node(0.0));
    let b = add_node(&mut engine, quiet_node(distance));
    let e = connect(&mut engine, a, b, EdgeConfig::default());
    engine.start();
    (engine, a, b, e)
}

/// A linear chain of `length` nodes, 30 units apart. Stopped.
pub fn build_chain(length: usize) -> (Engine, Vec<NodeId>) {
    let mut engine = Engine::default();
    let nodes: Vec<NodeId> = (0..length)
        .map(|i| add_node(&mut engine, quiet_node(30.0 * i as f64)))
        .collect();
    for pair in nodes.windows(2) {
        connect(&mut engine, pair[0], pair[1], EdgeConfig::default());
    }
    (engine, nodes)
}

/// A ring of `size` nodes where every edge feeds the next node and the
/// last feeds the first: a reinforcing loop. Stopped.
pub fn build_ring(size: usize, config: GlobalConfig) -> (Engine, Vec<NodeId>) {
    let mut engine = Engine::new(config);
    let nodes: Vec<NodeId> = (0..size)
        .map(|i| {
            let angle = std::f64::consts::TAU * i as f64 / size.max(1) as f64;
            add_node(
                &mut engine,
                NodeConfig {
                    y: 100.0 * angle.sin(),
                    ..quiet_node(100.0 * angle.cos())
                },
            )
        })
        .collect();
    for (i, &from) in nodes.iter().enumerate() {
        let to = nodes[(i + 1) % nodes.len()];
        connect(&mut engine, from, to, EdgeConfig::default());
    }
    (engine, nodes)
}

/// A `rows x cols` mesh where every node feeds its right and lower
/// neighbours. Stopped.
pub fn build_grid(rows: usize, cols: usize) -> (Engine, Vec<Vec<NodeId>>) {
    let mut engine = Engine::default();
    let grid: Vec<Vec<NodeId>> = (0..rows)
        .map(|r| {
            (0..cols)
                .map(|c| {
                    add_node(
                        &mut engine,
                        NodeConfig {
                            y: 50.0 * r as f64,
                            ..quiet_node(50.0 * c as f64)
                        },
                    )
                })
                .collect()
        })
        .collect();

    for row in &grid {
        for pair in row.windows(2) {
            connect(&mut engine, pair[0], pair[1], EdgeConfig::default());
        }
    }
    for pair in grid.windows(2) {
        for (&src, &dst) in pair[0].iter().zip(pair[1].iter()) {
            connect(&mut engine, src, dst, EdgeConfig::default());
        }
    }
    (engine, grid)
}

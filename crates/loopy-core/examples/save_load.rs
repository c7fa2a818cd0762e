//! Save/load example: both persistence formats.
//!
//! Builds a reinforcing loop, runs it mid-flight, then:
//! - takes a binary snapshot and restores it, checking the two engines
//!   stay in lockstep;
//! - saves the diagram as a flat attribute-list JSON string and loads it
//!   back into a fresh, stopped engine.
//!
//! Run with: `cargo run -p loopy-core --example save_load`

use loopy_core::edge::EdgeConfig;
use loopy_core::engine::Engine;
use loopy_core::node::{InitialFill, NodeConfig};
use loopy_core::persist::Diagram;
use loopy_core::sim::GlobalConfig;

fn build_loop() -> Engine {
    let mut engine = Engine::default();
    let habit = engine.add_node(NodeConfig {
        label: "habit".into(),
        initial_fill: InitialFill::Quarter,
        ..NodeConfig::default()
    });
    let reward = engine.add_node(NodeConfig {
        label: "reward".into(),
        x: 120.0,
        aggregation_latency: 0.5,
        ..NodeConfig::default()
    });
    for (from, to) in [(habit, reward), (reward, habit)] {
        engine
            .connect(from, to, EdgeConfig::default())
            .expect("both nodes exist");
    }
    engine.start();
    engine.inject_external(habit, 0.1, None);
    engine
}

fn main() {
    // --- Step 1: Build and run ---

    let mut engine = build_loop();
    for _ in 0..25 {
        engine.step(1.0);
    }
    println!("Tick {}, {} signals in flight", engine.current_tick(), engine.signal_count());

    // --- Step 2: Snapshot ---

    let bytes = engine.snapshot().expect("snapshot should succeed");
    println!("Snapshot: {} bytes", bytes.len());

    let mut restored = Engine::restore(&bytes).expect("restore should succeed");
    assert_eq!(engine.state_hash(), restored.state_hash());

    for _ in 0..100 {
        engine.step(1.0);
        restored.step(1.0);
    }
    assert_eq!(
        engine.state_hash(),
        restored.state_hash(),
        "restored engine should stay in lockstep"
    );
    println!("Snapshot round trip verified after 100 more ticks.");

    // --- Step 3: Diagram JSON ---

    let json = Diagram::capture(&engine)
        .to_json()
        .expect("diagram should encode");
    println!("\nDiagram JSON: {json}");

    let loaded = Diagram::from_json(&json)
        .expect("diagram should decode")
        .build(GlobalConfig::default());
    assert_eq!(loaded.node_count(), engine.node_count());
    assert_eq!(loaded.edge_count(), engine.edge_count());
    assert!(!loaded.is_running());
    println!(
        "Loaded {} nodes and {} edges; ready to start.",
        loaded.node_count(),
        loaded.edge_count()
    );
}

//! Predator/prey example: a balancing loop with event listeners.
//!
//! Rabbits feed foxes, foxes eat rabbits. A single poke on the rabbit stock
//! sends a pulse around the loop; listeners report every delivery and any
//! threshold crossing while the query API prints the fills.
//!
//! Run with: `cargo run -p loopy-core --example predator_prey`

use std::cell::RefCell;
use std::rc::Rc;

use loopy_core::color::Hue;
use loopy_core::edge::{EdgeConfig, EdgeGeometry, Strength};
use loopy_core::engine::Engine;
use loopy_core::event::{Event, EventKind};
use loopy_core::fixed::fixed64_to_f64;
use loopy_core::node::NodeConfig;

fn main() {
    let mut engine = Engine::default();

    let rabbits = engine.add_node(NodeConfig {
        label: "rabbits".into(),
        hue: Hue::Green,
        ..NodeConfig::default()
    });
    let foxes = engine.add_node(NodeConfig {
        label: "foxes".into(),
        hue: Hue::Orange,
        x: 150.0,
        ..NodeConfig::default()
    });

    // Curved arrows so the two edges do not overlap on screen.
    let curve = EdgeGeometry {
        arc: 40.0,
        rotation: 0.0,
    };
    engine
        .connect(
            rabbits,
            foxes,
            EdgeConfig {
                geometry: curve,
                ..EdgeConfig::default()
            },
        )
        .expect("both nodes exist");
    engine
        .connect(
            foxes,
            rabbits,
            EdgeConfig {
                strength: Strength::Invert,
                geometry: curve,
                ..EdgeConfig::default()
            },
        )
        .expect("both nodes exist");

    // --- Listeners ---

    let deliveries = Rc::new(RefCell::new(0u32));
    let counter = Rc::clone(&deliveries);
    engine.on_passive(
        EventKind::SignalDelivered,
        Box::new(move |_| *counter.borrow_mut() += 1),
    );
    engine.on_passive(
        EventKind::ThresholdCrossed,
        Box::new(|event| {
            if let Event::ThresholdCrossed { node, side, tick } = event {
                println!("  tick {tick}: {node:?} reached {side:?}");
            }
        }),
    );

    // --- Run ---

    engine.start();
    engine.inject_external(rabbits, 0.25, None);

    for tick in 0..300 {
        engine.step(1.0);
        if tick % 50 == 0 {
            for node in engine.snapshot_all_nodes() {
                println!(
                    "tick {:>3} {:>8}: fill {:+.3}",
                    tick,
                    node.label,
                    fixed64_to_f64(node.fill)
                );
            }
        }
    }

    println!("\n{} signals delivered", deliveries.borrow());
    println!("{} still in flight", engine.signal_count());
    println!("state hash: {:016x}", engine.state_hash());
}

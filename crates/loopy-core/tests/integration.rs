//! Integration tests for the Loopy signal-propagation engine.
//!
//! These tests exercise end-to-end behavior across the full tick pipeline:
//! emission, travel, delivery, aggregation, thresholds, color logic,
//! lifecycle, persistence and determinism.

use loopy_core::color::{Hue, SignalColor};
use loopy_core::edge::{
    ColorFilter, ColorTarget, EdgeConfig, EdgeGeometry, QuantitativeMode, SignBehavior, Strength,
    ValueFilter,
};
use loopy_core::engine::Engine;
use loopy_core::event::{Event, EventKind};
use loopy_core::fixed::Fixed64;
use loopy_core::id::NodeId;
use loopy_core::node::{
    CapacityClass, ExplodePolicy, ForeignColorPolicy, InitialFill, Interactivity, NodeConfig,
};
use loopy_core::persist::Diagram;
use loopy_core::signal::DropReason;
use loopy_core::sim::GlobalConfig;
use loopy_core::test_utils::*;
use std::cell::RefCell;
use std::rc::Rc;

/// Collect every event of one kind into a shared vector.
fn record(engine: &mut Engine, kind: EventKind) -> Rc<RefCell<Vec<Event>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    engine.on_passive(kind, Box::new(move |e| sink.borrow_mut().push(e.clone())));
    log
}

/// Source at x = 0 and a destination 3 units away (one tick at speed 3)
/// joined by `edge`. Running.
fn adjacent(source: NodeConfig, dest: NodeConfig, edge: EdgeConfig) -> (Engine, NodeId, NodeId) {
    let mut engine = Engine::default();
    let a = add_node(&mut engine, source);
    let b = add_node(&mut engine, NodeConfig { x: 3.0, ..dest });
    connect(&mut engine, a, b, edge);
    engine.start();
    (engine, a, b)
}

// ===========================================================================
// Test 1: Determinism
// ===========================================================================

#[test]
fn determinism_identical_runs() {
    fn run_once() -> Vec<Vec<Fixed64>> {
        let config = GlobalConfig {
            seed: 42,
            ..GlobalConfig::default()
        };
        let (mut engine, nodes) = build_ring(5, config);
        for &n in &nodes {
            if let Ok(cfg) = engine.graph.node_config_mut(n) {
                cfg.aggregation_latency = 0.1;
            }
        }
        let edges: Vec<_> = engine.graph.edge_order().to_vec();
        for (i, &e) in edges.iter().enumerate() {
            let cfg = engine.graph.edge_config_mut(e).unwrap();
            cfg.value_filter = ValueFilter::RandomSubset;
            if i % 2 == 0 {
                cfg.color_target = ColorTarget::Random;
            }
        }
        engine.start();

        let mut trajectory = Vec::new();
        for t in 0..300 {
            if t % 17 == 0 {
                engine.inject_external(nodes[t % nodes.len()], 0.3, None);
            }
            engine.step(0.5);
            trajectory.push(nodes.iter().map(|&n| fill(&engine, n)).collect());
        }
        trajectory
    }

    assert_eq!(run_once(), run_once());
}

#[test]
fn determinism_state_hash_matches() {
    let build = || {
        let (mut engine, nodes) = build_ring(4, GlobalConfig::default());
        engine.start();
        engine.inject_external(nodes[0], 0.4, None);
        run(&mut engine, 120);
        engine.state_hash()
    };
    assert_eq!(build(), build());
}

// ===========================================================================
// Test 2: Conservation on a +1 edge
// ===========================================================================

#[test]
fn delivered_magnitude_changes_fill_exactly() {
    let (mut engine, a, b) = adjacent(quiet_node(0.0), quiet_node(0.0), EdgeConfig::default());
    engine.inject_external(a, 0.2, None);
    engine.step(1.0);
    assert_eq!(fill(&engine, b), fixed(0.5) + fixed(0.2));
}

#[test]
fn delivered_magnitude_is_clamped() {
    let (mut engine, a, b) = adjacent(
        quiet_node(0.0),
        node_with_fill(0.0, InitialFill::Full),
        EdgeConfig::default(),
    );
    engine.inject_external(a, 0.4, None);
    engine.step(1.0);
    assert_eq!(fill(&engine, b), Fixed64::ONE);
}

// ===========================================================================
// Test 3: Sign inversion
// ===========================================================================

#[test]
fn invert_strength_delivers_negative() {
    let edge = EdgeConfig {
        strength: Strength::Invert,
        ..EdgeConfig::default()
    };
    let (mut engine, a, b) = adjacent(quiet_node(0.0), quiet_node(0.0), edge);
    let emitted = record(&mut engine, EventKind::SignalEmitted);
    engine.inject_external(a, 0.3, None);
    engine.step(1.0);

    assert_eq!(fill(&engine, b), fixed(0.5) - fixed(0.3));
    match emitted.borrow().as_slice() {
        [Event::SignalEmitted { magnitude, .. }] => assert_eq!(*magnitude, -fixed(0.3)),
        other => panic!("expected one emission, got {other:?}"),
    }
}

#[test]
fn invert_then_force_positive() {
    let edge = EdgeConfig {
        strength: Strength::Invert,
        sign_behavior: SignBehavior::ForcePositive,
        ..EdgeConfig::default()
    };
    let (mut engine, a, b) = adjacent(quiet_node(0.0), quiet_node(0.0), edge);
    engine.inject_external(a, 0.3, None);
    engine.step(1.0);
    assert_eq!(fill(&engine, b), fixed(0.5) + fixed(0.3));
}

#[test]
fn clamp_behavior_zeroes_and_drops() {
    let edge = EdgeConfig {
        sign_behavior: SignBehavior::ClampPositive,
        ..EdgeConfig::default()
    };
    let (mut engine, a, b) = adjacent(quiet_node(0.0), quiet_node(0.0), edge);
    let dropped = record(&mut engine, EventKind::SignalDropped);
    engine.inject_external(a, -0.3, None);
    engine.step(1.0);
    assert_eq!(engine.signal_count(), 0);
    assert_eq!(fill(&engine, b), fixed(0.5));
    assert!(matches!(
        dropped.borrow().as_slice(),
        [Event::SignalDropped {
            reason: DropReason::ZeroMagnitude,
            ..
        }]
    ));
}

// ===========================================================================
// Test 4: Filter dropout
// ===========================================================================

#[test]
fn life_only_filter_drops_death_signal() {
    let edge = EdgeConfig {
        value_filter: ValueFilter::LifeOnly,
        ..EdgeConfig::default()
    };
    let (mut engine, a, b) = adjacent(quiet_node(0.0), quiet_node(0.0), edge);
    let dropped = record(&mut engine, EventKind::SignalDropped);
    engine.inject_external(a, -0.4, None);
    engine.step(1.0);

    assert_eq!(engine.last_report().emitted, 0);
    assert_eq!(fill(&engine, b), fixed(0.5));
    assert!(matches!(
        dropped.borrow().as_slice(),
        [Event::SignalDropped {
            reason: DropReason::ValueFilter,
            ..
        }]
    ));

    // A life signal on the same edge passes.
    engine.inject_external(a, 0.1, None);
    engine.step(1.0);
    assert_eq!(fill(&engine, b), fixed(0.5) + fixed(0.1));
}

#[test]
fn random_subset_passes_some_but_not_all() {
    let edge = EdgeConfig {
        value_filter: ValueFilter::RandomSubset,
        ..EdgeConfig::default()
    };
    let (mut engine, a, _b) = adjacent(quiet_node(0.0), quiet_node(0.0), edge);
    let mut emitted = 0;
    for i in 0..200 {
        engine.inject_external(a, if i % 2 == 0 { 0.01 } else { -0.01 }, None);
        engine.step(1.0);
        emitted += engine.last_report().emitted;
    }
    assert!(emitted > 50 && emitted < 150, "emitted {emitted} of 200");
}

// ===========================================================================
// Test 5: Explode
// ===========================================================================

#[test]
fn explode_if_full_kills_and_pins() {
    let dest = NodeConfig {
        overflow: Fixed64::ONE,
        explode: ExplodePolicy::IfFull,
        ..quiet_node(0.0)
    };
    let (mut engine, a, b) = adjacent(quiet_node(0.0), dest, EdgeConfig::default());
    let deaths = record(&mut engine, EventKind::NodeDied);

    engine.inject_external(a, 0.5, None);
    engine.step(1.0);
    assert_eq!(engine.node_alive(b), Some(false));
    assert_eq!(fill(&engine, b), Fixed64::ONE);
    assert_eq!(deaths.borrow().len(), 1);

    engine.inject_external(a, -0.5, None);
    run(&mut engine, 3);
    assert_eq!(engine.node_alive(b), Some(false));
    assert_eq!(fill(&engine, b), Fixed64::ONE);
    assert_eq!(deaths.borrow().len(), 1, "a node dies once");
}

#[test]
fn dead_node_emits_nothing() {
    let source = NodeConfig {
        underflow: fixed(0.5),
        explode: ExplodePolicy::IfEmpty,
        ..quiet_node(0.0)
    };
    let (mut engine, a, b) = adjacent(source, quiet_node(0.0), EdgeConfig::default());
    // 0.5 - 1.0 = -0.5: dies on the stimulus itself.
    engine.inject_external(a, -1.0, None);
    engine.step(1.0);
    assert_eq!(engine.node_alive(a), Some(false));
    assert_eq!(engine.last_report().emitted, 0);
    assert_eq!(fill(&engine, b), fixed(0.5));
}

#[test]
fn dead_source_keeps_signals_in_flight() {
    let mut engine = Engine::default();
    let a = add_node(
        &mut engine,
        NodeConfig {
            overflow: fixed(0.9),
            explode: ExplodePolicy::IfFull,
            ..quiet_node(0.0)
        },
    );
    let b = add_node(&mut engine, quiet_node(60.0));
    connect(&mut engine, a, b, EdgeConfig::default());
    engine.start();

    engine.inject_external(a, 0.1, None);
    run(&mut engine, 2);
    assert_eq!(engine.signal_count(), 1);

    // 0.6 + 0.4 reaches the overflow and kills the source mid-flight.
    engine.inject_external(a, 0.4, None);
    engine.step(1.0);
    assert_eq!(engine.node_alive(a), Some(false));
    assert_eq!(engine.signal_count(), 1);
    assert_eq!(fill(&engine, b), fixed(0.5));

    run(&mut engine, 30);
    assert_eq!(engine.signal_count(), 0);
    assert_eq!(fill(&engine, b), fixed(0.5) + fixed(0.1));
}

#[test]
fn threshold_crossing_without_explode_is_reported() {
    let dest = NodeConfig {
        overflow: fixed(0.66),
        ..quiet_node(0.0)
    };
    let (mut engine, a, b) = adjacent(quiet_node(0.0), dest, EdgeConfig::default());
    let crossed = record(&mut engine, EventKind::ThresholdCrossed);
    engine.inject_external(a, 0.3, None);
    engine.step(1.0);
    assert_eq!(engine.node_alive(b), Some(true));
    assert_eq!(crossed.borrow().len(), 1);
}

#[test]
fn edited_thresholds_apply_without_spurious_crossing() {
    let (mut engine, a, b) = adjacent(quiet_node(0.0), quiet_node(0.0), EdgeConfig::default());
    let crossed = record(&mut engine, EventKind::ThresholdCrossed);

    // Lowered under the current fill: b is already full, not crossing.
    engine.graph.node_config_mut(b).unwrap().overflow = fixed(0.4);
    engine.inject_external(a, 0.1, None);
    engine.step(1.0);
    assert_eq!(fill(&engine, b), fixed(0.5) + fixed(0.1));
    assert!(crossed.borrow().is_empty());

    engine.graph.node_config_mut(b).unwrap().overflow = fixed(0.75);
    engine.inject_external(a, 0.3, None);
    engine.step(1.0);
    assert_eq!(crossed.borrow().len(), 1);
}

// ===========================================================================
// Test 6: Latency aggregation
// ===========================================================================

#[test]
fn latency_releases_one_combined_delta() {
    // 0.5 s at 10 ticks/s = 5 ticks.
    let mut engine = Engine::new(GlobalConfig {
        ticks_per_second: 10,
        ..GlobalConfig::default()
    });
    let a = add_node(&mut engine, quiet_node(0.0));
    let b = add_node(
        &mut engine,
        NodeConfig {
            aggregation_latency: 0.5,
            ..quiet_node(3.0)
        },
    );
    connect(&mut engine, a, b, EdgeConfig::default());
    engine.start();
    let released = record(&mut engine, EventKind::BucketReleased);

    engine.step(1.0); // tick 0
    for _ in 1..=3 {
        engine.inject_external(a, 0.1, None);
        engine.step(1.0); // ticks 1..=3: one arrival each
    }
    assert_eq!(fill(&engine, b), fixed(0.5));
    let bucket = engine.snapshot_node(b).unwrap().pending_bucket.unwrap();
    assert_eq!(bucket.opened_at, 1);
    assert_eq!(bucket.contributions, 3);

    engine.step(1.0); // tick 4
    engine.step(1.0); // tick 5
    assert_eq!(fill(&engine, b), fixed(0.5), "nothing applied incrementally");
    assert!(released.borrow().is_empty());

    engine.step(1.0); // tick 6
    assert_eq!(fill(&engine, b), fixed(0.5) + (fixed(0.1) + fixed(0.1) + fixed(0.1)));
    match released.borrow().as_slice() {
        [Event::BucketReleased {
            tick, contributions, ..
        }] => {
            assert_eq!(*tick, 6);
            assert_eq!(*contributions, 3);
        }
        other => panic!("expected one release, got {other:?}"),
    }
}

#[test]
fn vital_contributions_bypass_capacity_in_buckets() {
    let mut engine = Engine::new(GlobalConfig {
        ticks_per_second: 10,
        ..GlobalConfig::default()
    });
    let a = add_node(&mut engine, quiet_node(0.0));
    let b = add_node(
        &mut engine,
        NodeConfig {
            capacity: CapacityClass::Huge,
            aggregation_latency: 0.1,
            ..node_with_fill(3.0, InitialFill::Empty)
        },
    );
    connect(
        &mut engine,
        a,
        b,
        EdgeConfig {
            quantitative: QuantitativeMode::OutputAsVitalChange,
            ..EdgeConfig::default()
        },
    );
    engine.start();
    engine.inject_external(a, 0.25, None);
    run(&mut engine, 2);
    assert_eq!(fill(&engine, b), fixed(0.25));
}

// ===========================================================================
// Test 7: Idempotent reset
// ===========================================================================

#[test]
fn reset_twice_equals_reset_once() {
    let (mut engine, nodes) = build_ring(3, GlobalConfig::default());
    engine.start();
    engine.inject_external(nodes[0], 0.3, None);
    run(&mut engine, 25);

    engine.reset();
    let once_hash = engine.state_hash();
    let once_nodes = engine.snapshot_all_nodes();
    engine.reset();
    assert_eq!(engine.state_hash(), once_hash);
    assert_eq!(engine.snapshot_all_nodes(), once_nodes);
    assert_eq!(engine.signal_count(), 0);
    for snap in once_nodes {
        assert_eq!(snap.fill, fixed(0.5));
        assert!(snap.pending_bucket.is_none());
    }
}

#[test]
fn reset_revives_dead_nodes() {
    let dest = NodeConfig {
        overflow: Fixed64::ONE,
        explode: ExplodePolicy::IfFull,
        ..quiet_node(0.0)
    };
    let (mut engine, a, b) = adjacent(quiet_node(0.0), dest, EdgeConfig::default());
    engine.inject_external(a, 0.5, None);
    engine.step(1.0);
    assert_eq!(engine.node_alive(b), Some(false));
    engine.reset();
    assert_eq!(engine.node_alive(b), Some(true));
    assert_eq!(fill(&engine, b), fixed(0.5));
}

// ===========================================================================
// Test 8: Travel time
// ===========================================================================

#[test]
fn travel_240_at_speed_3_takes_80_ticks() {
    let (mut engine, a, b, e) = build_pair(240.0);
    engine.inject_external(a, 0.1, None);
    run(&mut engine, 79);
    assert_eq!(fill(&engine, b), fixed(0.5));
    assert_eq!(engine.signals_on(e).len(), 1);
    engine.step(1.0);
    assert_eq!(fill(&engine, b), fixed(0.5) + fixed(0.1));
    assert_eq!(engine.signal_count(), 0);
}

#[test]
fn travel_time_is_in_simulated_time_units() {
    let (mut engine, a, b, _e) = build_pair(240.0);
    engine.inject_external(a, 0.1, None);
    for _ in 0..159 {
        engine.step(0.5);
    }
    assert_eq!(fill(&engine, b), fixed(0.5));
    engine.step(0.5);
    assert_eq!(fill(&engine, b), fixed(0.5) + fixed(0.1));
}

#[test]
fn speed_change_rescales_in_flight_signals() {
    let (mut engine, a, b, e) = build_pair(240.0);
    engine.inject_external(a, 0.1, None);
    run(&mut engine, 40); // halfway at speed 3
    assert_eq!(engine.signals_on(e)[0].progress, fixed(0.5));
    engine.set_global_speed(6.0);
    run(&mut engine, 19);
    assert_eq!(fill(&engine, b), fixed(0.5));
    engine.step(1.0);
    assert_eq!(fill(&engine, b), fixed(0.5) + fixed(0.1));
}

#[test]
fn curved_edges_take_longer() {
    let (mut straight, a, _, e) = build_pair(100.0);
    straight.inject_external(a, 0.1, None);
    straight.step(1.0);

    let mut engine = Engine::default();
    let c = add_node(&mut engine, quiet_node(0.0));
    let d = add_node(&mut engine, quiet_node(100.0));
    let curved = connect(
        &mut engine,
        c,
        d,
        EdgeConfig {
            geometry: EdgeGeometry {
                arc: 50.0,
                rotation: 0.0,
            },
            ..EdgeConfig::default()
        },
    );
    engine.start();
    engine.inject_external(c, 0.1, None);
    engine.step(1.0);

    assert!(engine.signals_on(curved)[0].progress < straight.signals_on(e)[0].progress);
}

// ===========================================================================
// Color logic
// ===========================================================================

#[test]
fn foreign_color_dropped_only_with_color_logic() {
    let dest = NodeConfig {
        foreign_color: ForeignColorPolicy::Drop,
        ..colored_node(0.0, Hue::Blue)
    };
    let (mut engine, a, b) = adjacent(colored_node(0.0, Hue::Red), dest, EdgeConfig::default());

    engine.inject_external(a, 0.1, None);
    engine.step(1.0);
    assert_eq!(fill(&engine, b), fixed(0.5) + fixed(0.1), "aesthetic mode forwards");

    engine.set_color_logic(true);
    let dropped = record(&mut engine, EventKind::SignalDropped);
    engine.inject_external(a, 0.1, None);
    engine.step(1.0);
    assert_eq!(fill(&engine, b), fixed(0.5) + fixed(0.1));
    assert!(matches!(
        dropped.borrow().as_slice(),
        [Event::SignalDropped {
            reason: DropReason::ForeignColor,
            ..
        }]
    ));
}

#[test]
fn signal_to_node_always_passes_foreign_check() {
    let dest = NodeConfig {
        foreign_color: ForeignColorPolicy::Drop,
        ..colored_node(0.0, Hue::Green)
    };
    let edge = EdgeConfig {
        color_target: ColorTarget::SignalToNode,
        ..EdgeConfig::default()
    };
    let (mut engine, a, b) = adjacent(colored_node(0.0, Hue::Red), dest, edge);
    engine.set_color_logic(true);
    engine.inject_external(a, 0.1, None);
    engine.step(1.0);
    assert_eq!(fill(&engine, b), fixed(0.5) + fixed(0.1));
}

#[test]
fn color_filter_gates_under_color_logic() {
    let edge = EdgeConfig {
        color_filter: ColorFilter::Only(Hue::Yellow),
        ..EdgeConfig::default()
    };
    let (mut engine, a, b) = adjacent(colored_node(0.0, Hue::Red), quiet_node(0.0), edge);
    engine.set_color_logic(true);

    engine.inject_external(a, 0.1, None);
    engine.step(1.0);
    assert_eq!(fill(&engine, b), fixed(0.5));

    // A yellow stimulus matches the filter.
    engine.inject_external(a, 0.1, Some(SignalColor::Hue(Hue::Yellow)));
    engine.step(1.0);
    assert_eq!(fill(&engine, b), fixed(0.5) + fixed(0.1));
}

#[test]
fn color_filter_is_start_color_in_aesthetic_mode() {
    let edge = EdgeConfig {
        color_filter: ColorFilter::Only(Hue::Yellow),
        ..EdgeConfig::default()
    };
    let mut engine = Engine::default();
    let a = add_node(&mut engine, colored_node(0.0, Hue::Red));
    let b = add_node(&mut engine, quiet_node(90.0));
    let e = connect(&mut engine, a, b, edge);
    engine.start();
    engine.inject_external(a, 0.1, None);
    engine.step(1.0);
    assert_eq!(engine.signals_on(e)[0].color, SignalColor::Hue(Hue::Yellow));
}

// ===========================================================================
// Quantity and capacity
// ===========================================================================

#[test]
fn input_as_quantity_sends_absolute_fill() {
    let edge = EdgeConfig {
        quantitative: QuantitativeMode::InputAsQuantity,
        ..EdgeConfig::default()
    };
    let (mut engine, a, b) = adjacent(
        quiet_node(0.0),
        node_with_fill(0.0, InitialFill::Empty),
        edge,
    );
    engine.inject_external(a, 0.25, None);
    engine.step(1.0);
    assert_eq!(fill(&engine, b), fixed(0.75));

    // No change at the source: nothing is sent.
    engine.step(1.0);
    assert_eq!(engine.last_report().emitted, 0);
    assert_eq!(fill(&engine, b), fixed(0.75));
}

#[test]
fn big_capacity_scales_delivery() {
    let dest = NodeConfig {
        capacity: CapacityClass::Big,
        ..node_with_fill(0.0, InitialFill::Empty)
    };
    let (mut engine, a, b) = adjacent(quiet_node(0.0), dest, EdgeConfig::default());
    engine.inject_external(a, 0.5, None);
    engine.step(1.0);
    assert_eq!(fill(&engine, b), fixed(0.5) / Fixed64::from_num(5));
}

#[test]
fn tiny_capacity_acts_as_boolean() {
    let dest = NodeConfig {
        capacity: CapacityClass::Tiny,
        ..node_with_fill(0.0, InitialFill::Empty)
    };
    let (mut engine, a, b) = adjacent(quiet_node(0.0), dest, EdgeConfig::default());
    engine.inject_external(a, -0.01, None);
    engine.step(1.0);
    assert_eq!(fill(&engine, b), -Fixed64::ONE);
}

// ===========================================================================
// Chains and loops
// ===========================================================================

#[test]
fn chain_relays_change_hop_by_hop() {
    let (mut engine, nodes) = build_chain(4);
    engine.start();
    engine.inject_external(nodes[0], 0.2, None);
    // Each 30-unit hop takes 10 ticks, and a relay leaves on the tick
    // after its arrival.
    run(&mut engine, 32);
    for &n in &nodes {
        assert_eq!(fill(&engine, n), fixed(0.5) + fixed(0.2));
    }
}

#[test]
fn reinforcing_loop_saturates() {
    let (mut engine, nodes) = build_ring(3, GlobalConfig::default());
    engine.start();
    engine.inject_external(nodes[0], 0.2, None);
    run(&mut engine, 2_000);
    for &n in &nodes {
        assert_eq!(fill(&engine, n), Fixed64::ONE);
    }
}

// ===========================================================================
// Stimuli and lifecycle
// ===========================================================================

#[test]
fn interactivity_policies_gate_stimuli() {
    let mut engine = Engine::default();
    let read_only = add_node(
        &mut engine,
        NodeConfig {
            interactivity: Interactivity::ReadOnly,
            ..quiet_node(0.0)
        },
    );
    let positive = add_node(
        &mut engine,
        NodeConfig {
            interactivity: Interactivity::SendPositive,
            ..quiet_node(10.0)
        },
    );
    engine.start();
    let rejected = record(&mut engine, EventKind::StimulusRejected);

    engine.inject_external(read_only, 0.2, None);
    engine.inject_external(positive, -0.2, None);
    engine.inject_external(positive, 0.2, None);
    engine.step(1.0);

    assert_eq!(fill(&engine, read_only), fixed(0.5));
    assert_eq!(fill(&engine, positive), fixed(0.5) + fixed(0.2));
    assert_eq!(rejected.borrow().len(), 2);
}

#[test]
fn stimulus_waits_for_next_tick() {
    let (mut engine, a, _b, _e) = build_pair(30.0);
    engine.inject_external(a, 0.2, None);
    assert_eq!(fill(&engine, a), fixed(0.5));
    engine.step(1.0);
    assert_eq!(fill(&engine, a), fixed(0.5) + fixed(0.2));
}

#[test]
fn stopped_engine_does_not_tick() {
    let (mut engine, a, _b, _e) = build_pair(30.0);
    engine.stop();
    engine.inject_external(a, 0.2, None);
    run(&mut engine, 5);
    assert_eq!(engine.current_tick(), 0);
    assert_eq!(fill(&engine, a), fixed(0.5));

    // The stimulus stays queued until the engine runs; start() resets.
    engine.start();
    engine.step(1.0);
    assert_eq!(fill(&engine, a), fixed(0.5));
}

#[test]
fn autoplay_node_starts_the_loop() {
    let mut engine = Engine::default();
    let auto = add_node(
        &mut engine,
        NodeConfig {
            label: "autostart".into(),
            ..quiet_node(0.0)
        },
    );
    let b = add_node(&mut engine, quiet_node(3.0));
    connect(&mut engine, auto, b, EdgeConfig::default());
    engine.start();
    engine.step(1.0);
    assert_eq!(fill(&engine, b), fixed(0.5) + fixed(0.33));
}

#[test]
fn removing_destination_drops_in_flight_signals() {
    let (mut engine, a, b, _e) = build_pair(30.0);
    let dropped = record(&mut engine, EventKind::SignalDropped);
    engine.inject_external(a, 0.2, None);
    engine.step(1.0);
    engine.graph.queue_remove_node(b);
    engine.step(1.0);
    assert_eq!(engine.signal_count(), 0);
    assert_eq!(engine.edge_count(), 0);
    assert!(matches!(
        dropped.borrow().as_slice(),
        [Event::SignalDropped {
            reason: DropReason::Orphaned,
            ..
        }]
    ));
}

#[test]
fn dead_destination_swallows_signals() {
    let (mut engine, a, b) = adjacent(
        quiet_node(0.0),
        node_with_fill(0.0, InitialFill::Dead),
        EdgeConfig::default(),
    );
    engine.inject_external(a, 0.2, None);
    engine.step(1.0);
    assert_eq!(fill(&engine, b), Fixed64::ZERO);
    assert_eq!(engine.last_report().delivered, 0);
    assert_eq!(engine.last_report().dropped, 1);
}

#[test]
fn suppressed_events_are_not_buffered() {
    let (mut engine, a, _b, _e) = build_pair(30.0);
    engine.suppress_event(EventKind::SignalEmitted);
    let emitted = record(&mut engine, EventKind::SignalEmitted);
    engine.inject_external(a, 0.2, None);
    engine.step(1.0);
    assert!(emitted.borrow().is_empty());
    assert_eq!(engine.last_report().emitted, 1);
}

// ===========================================================================
// Persistence and snapshots
// ===========================================================================

#[test]
fn diagram_loads_and_runs() {
    let json = r#"[
        [[0, 0, 0, 0.5, "rabbits", 3], [1, 3, 0, 0.5, "foxes", 0]],
        [[0, 1, 0, 1], [1, 0, 0, -1]],
        [], 2, 0, 0, 0
    ]"#;
    let mut engine = Diagram::from_json(json).unwrap().build(GlobalConfig::default());
    let nodes = engine.graph.node_order().to_vec();
    engine.start();
    engine.inject_external(nodes[0], 0.2, None);
    engine.step(1.0);
    // Rabbits feed foxes.
    assert_eq!(fill(&engine, nodes[1]), fixed(0.5) + fixed(0.2));
    engine.step(1.0);
    // Foxes eat rabbits.
    assert_eq!(fill(&engine, nodes[0]), fixed(0.5));
}

#[test]
fn snapshot_mid_flight_resumes() {
    let (mut engine, a, b, _e) = build_pair(240.0);
    engine.inject_external(a, 0.1, None);
    run(&mut engine, 50);
    let mut restored = Engine::restore(&engine.snapshot().unwrap()).unwrap();
    run(&mut restored, 30);
    assert_eq!(fill(&restored, b), fixed(0.5) + fixed(0.1));
}

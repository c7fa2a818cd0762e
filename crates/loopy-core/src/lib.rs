//! Loopy Core -- the signal-propagation engine for causal-loop diagrams.
//!
//! This crate provides the causal graph of stocks (nodes) and flows (edges),
//! the edge transform pipeline, travelling signals, aggregation buckets,
//! events, queries, snapshots, the flat attribute-list boundary used by
//! saved diagrams, and deterministic fixed-point arithmetic.
//!
//! # Tick Pipeline
//!
//! Each call to [`engine::Engine::tick`] (or [`engine::Engine::step`])
//! advances a running engine by one tick:
//!
//! 0. **Pre-tick** -- Apply queued graph mutations; drop orphaned signals.
//! 1. **Snapshot** -- Record each node's fill change and apply user stimuli.
//! 2. **Emit** -- Edges turn their source's change into new signals.
//! 3. **Advance** -- Signals move by `dt * signal_speed`.
//! 4. **Deliver** -- Arrivals change their destination or join its bucket;
//!    due buckets release.
//! 5. **Update** -- Changes are applied; explode policies are evaluated.
//! 6. **Bookkeeping** -- Deliver events, increment the tick, hash state.
//!
//! # Graph Mutation Pattern
//!
//! Graph changes are queued and applied atomically at the start of the next
//! tick, or immediately through the engine's helpers:
//!
//! ```rust
//! use loopy_core::edge::EdgeConfig;
//! use loopy_core::engine::Engine;
//! use loopy_core::node::NodeConfig;
//!
//! let mut engine = Engine::default();
//! let a = engine.add_node(NodeConfig::default());
//! let b = engine.add_node(NodeConfig { x: 30.0, ..NodeConfig::default() });
//! engine.connect(a, b, EdgeConfig::default()).unwrap();
//!
//! engine.start();
//! engine.inject_external(a, 0.25, None);
//! for _ in 0..10 {
//!     engine.step(1.0);
//! }
//! // The pulse has landed: both stocks moved by the same amount.
//! assert_eq!(engine.node_fill(a), engine.node_fill(b));
//! ```
//!
//! # Key Types
//!
//! - [`engine::Engine`] -- Owns all state and runs the tick pipeline.
//! - [`graph::CausalGraph`] -- Nodes and edges with creation-order iteration.
//! - [`node::NodeConfig`] / [`node::NodeState`] -- Stock settings and fill.
//! - [`edge::EdgeConfig`] -- The sign, filter, color and quantity pipeline.
//! - [`signal::Signal`] -- A pulse travelling along an edge.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point type for deterministic math.
//! - [`event::EventBus`] -- Per-kind buffered events with passive listeners.
//! - [`persist::Diagram`] -- Load and save the flat attribute-list format.
//! - [`serialize`] -- Versioned binary snapshots via bitcode.

pub mod color;
pub mod edge;
pub mod engine;
pub mod event;
pub mod fixed;
pub mod graph;
pub mod id;
pub mod node;
pub mod persist;
pub mod query;
pub mod rng;
pub mod schema;
pub mod serialize;
pub mod signal;
pub mod sim;
pub mod stimulus;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

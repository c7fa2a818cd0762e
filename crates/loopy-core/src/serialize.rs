//! Versioned binary snapshots of the engine.
//!
//! Snapshots are encoded with `bitcode` behind a small header (magic number,
//! format version, tick). Registered listeners are not part of a snapshot:
//! a restored engine starts with an empty [`EventBus`].

use crate::edge::MIN_PATH_LENGTH;
use crate::engine::Engine;
use crate::event::EventBus;
use crate::fixed::f64_to_fixed64;
use crate::graph::CausalGraph;
use crate::id::NodeId;
use crate::node::NodeState;
use crate::rng::SimRng;
use crate::signal::Signal;
use crate::sim::{GlobalConfig, SimState, TickReport};
use crate::stimulus::StimulusQueue;
use serde::{Deserialize, Serialize};
use slotmap::SecondaryMap;
use tracing::warn;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying an engine snapshot ("LOOP").
pub const SNAPSHOT_MAGIC: u32 = 0x4C4F_4F50;

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("data too short for snapshot header")]
    TooShort,
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", SNAPSHOT_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("snapshot from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
    #[error("corrupt snapshot: {0}")]
    Corrupt(String),
}

// ---------------------------------------------------------------------------
// Snapshot header
// ---------------------------------------------------------------------------

/// Header carried by every snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub magic: u32,
    pub version: u32,
    /// Tick count at the time the snapshot was taken.
    pub tick: u64,
}

impl SnapshotHeader {
    pub fn new(tick: u64) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION,
            tick,
        }
    }

    pub fn validate(&self) -> Result<(), DeserializeError> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(DeserializeError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(DeserializeError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(DeserializeError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

/// Read only the header of a snapshot.
///
/// bitcode has no partial decoding, so the whole payload is decoded.
pub fn read_snapshot_header(data: &[u8]) -> Result<SnapshotHeader, DeserializeError> {
    decode(data).map(|snapshot| snapshot.header)
}

// ---------------------------------------------------------------------------
// Serializable engine state
// ---------------------------------------------------------------------------

/// Everything needed to resume a run. Excludes the event bus (listeners
/// are closures) and the last tick report (derived).
#[derive(Debug, Serialize, Deserialize)]
struct EngineSnapshot {
    header: SnapshotHeader,
    graph: CausalGraph,
    sim_state: SimState,
    config: GlobalConfig,
    node_states: SecondaryMap<NodeId, NodeState>,
    signals: Vec<Signal>,
    stimuli: StimulusQueue,
    rng: SimRng,
    last_state_hash: u64,
}

fn decode(data: &[u8]) -> Result<EngineSnapshot, DeserializeError> {
    if data.is_empty() {
        return Err(DeserializeError::TooShort);
    }
    bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))
}

impl EngineSnapshot {
    /// Reject state the engine cannot tick from and repair in-flight
    /// signals that would break path arithmetic.
    fn check(&mut self) -> Result<(), DeserializeError> {
        if self.sim_state.tick == u64::MAX {
            return Err(DeserializeError::Corrupt("tick counter exhausted".into()));
        }

        let graph = &self.graph;
        let before = self.signals.len();
        self.signals.retain(|signal| {
            graph
                .get_edge(signal.edge)
                .is_some_and(|e| e.from == signal.from && e.to == signal.to)
        });
        if self.signals.len() < before {
            warn!(
                dropped = before - self.signals.len(),
                "snapshot held signals on missing edges"
            );
        }

        let min_path = f64_to_fixed64(MIN_PATH_LENGTH);
        for signal in &mut self.signals {
            signal.clamp_path(min_path);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Engine snapshot methods
// ---------------------------------------------------------------------------

impl Engine {
    /// Encode the full simulation state.
    ///
    /// Queued (unapplied) graph mutations are not captured.
    pub fn snapshot(&self) -> Result<Vec<u8>, SnapshotError> {
        let snapshot = EngineSnapshot {
            header: SnapshotHeader::new(self.sim_state.tick),
            graph: self.graph.clone(),
            sim_state: self.sim_state.clone(),
            config: self.config.clone(),
            node_states: self.node_states.clone(),
            signals: self.signals.clone(),
            stimuli: self.stimuli.clone(),
            rng: self.rng.clone(),
            last_state_hash: self.last_state_hash,
        };
        bitcode::serialize(&snapshot).map_err(|e| SnapshotError::Encode(e.to_string()))
    }

    /// Rebuild an engine from [`Engine::snapshot`] output.
    ///
    /// The header is validated before the engine is assembled. Signals on
    /// edges the graph does not hold are discarded and path lengths are
    /// clamped to the minimum. Listeners and suppressions must be
    /// registered again.
    pub fn restore(data: &[u8]) -> Result<Self, DeserializeError> {
        let mut snapshot = decode(data)?;
        snapshot.header.validate()?;
        snapshot.check()?;

        Ok(Engine {
            graph: snapshot.graph,
            sim_state: snapshot.sim_state,
            config: snapshot.config,
            node_states: snapshot.node_states,
            signals: snapshot.signals,
            stimuli: snapshot.stimuli,
            rng: snapshot.rng,
            event_bus: EventBus::default(),
            last_state_hash: snapshot.last_state_hash,
            last_report: TickReport::default(),
        })
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::{ColorTarget, EdgeConfig, ValueFilter};
    use crate::fixed::Fixed64;
    use crate::node::NodeConfig;

    fn make_test_engine() -> Engine {
        let mut engine = Engine::new(GlobalConfig {
            seed: 7,
            ..GlobalConfig::default()
        });
        let a = engine.add_node(NodeConfig {
            label: "a".into(),
            ..NodeConfig::default()
        });
        let b = engine.add_node(NodeConfig {
            label: "b".into(),
            x: 60.0,
            aggregation_latency: 0.1,
            ..NodeConfig::default()
        });
        engine
            .connect(
                a,
                b,
                EdgeConfig {
                    value_filter: ValueFilter::RandomSubset,
                    color_target: ColorTarget::Random,
                    ..EdgeConfig::default()
                },
            )
            .unwrap();
        engine.connect(b, a, EdgeConfig::default()).unwrap();
        engine.start();
        for i in 0..10 {
            engine.inject_external(a, if i % 2 == 0 { 0.2 } else { -0.1 }, None);
            engine.step(1.0);
        }
        engine
    }

    #[test]
    fn round_trip_preserves_state_hash() {
        let engine = make_test_engine();
        let bytes = engine.snapshot().unwrap();
        let restored = Engine::restore(&bytes).unwrap();
        assert_eq!(restored.state_hash(), engine.state_hash());
        assert_eq!(restored.current_tick(), engine.current_tick());
        assert_eq!(restored.signal_count(), engine.signal_count());
        assert_eq!(restored.snapshot_all_nodes(), engine.snapshot_all_nodes());
    }

    #[test]
    fn restored_engine_continues_identically() {
        let mut original = make_test_engine();
        let mut restored = Engine::restore(&original.snapshot().unwrap()).unwrap();
        let first = original.graph.node_order()[0];
        for _ in 0..40 {
            original.inject_external(first, 0.05, None);
            restored.inject_external(first, 0.05, None);
            original.step(1.0);
            restored.step(1.0);
            assert_eq!(original.state_hash(), restored.state_hash());
        }
    }

    #[test]
    fn node_ids_survive_round_trip() {
        let engine = make_test_engine();
        let restored = Engine::restore(&engine.snapshot().unwrap()).unwrap();
        assert_eq!(engine.graph.node_order(), restored.graph.node_order());
        for &id in engine.graph.node_order() {
            assert_eq!(engine.node_fill(id), restored.node_fill(id));
        }
    }

    #[test]
    fn config_survives_round_trip() {
        let mut engine = make_test_engine();
        engine.set_global_speed(1.5);
        engine.set_color_logic(true);
        let restored = Engine::restore(&engine.snapshot().unwrap()).unwrap();
        assert_eq!(restored.config().signal_speed, f64_to_fixed64(1.5));
        assert!(restored.config().color_logic);
        assert_eq!(restored.config().seed, 7);
    }

    #[test]
    fn empty_engine_round_trip() {
        let engine = Engine::default();
        let restored = Engine::restore(&engine.snapshot().unwrap()).unwrap();
        assert_eq!(restored.node_count(), 0);
        assert_eq!(restored.state_hash(), engine.state_hash());
    }

    #[test]
    fn header_validation() {
        assert!(SnapshotHeader::new(3).validate().is_ok());

        let bad_magic = SnapshotHeader {
            magic: 0xDEAD_BEEF,
            ..SnapshotHeader::new(0)
        };
        assert!(matches!(
            bad_magic.validate(),
            Err(DeserializeError::InvalidMagic(0xDEAD_BEEF))
        ));

        let future = SnapshotHeader {
            version: FORMAT_VERSION + 1,
            ..SnapshotHeader::new(0)
        };
        assert!(matches!(future.validate(), Err(DeserializeError::FutureVersion(_))));

        let past = SnapshotHeader {
            version: 0,
            ..SnapshotHeader::new(0)
        };
        assert!(matches!(
            past.validate(),
            Err(DeserializeError::UnsupportedVersion(0))
        ));
    }

    #[test]
    fn read_header_reports_tick() {
        let engine = make_test_engine();
        let header = read_snapshot_header(&engine.snapshot().unwrap()).unwrap();
        assert_eq!(header.tick, 10);
        assert_eq!(header.magic, SNAPSHOT_MAGIC);
    }

    #[test]
    fn empty_data_is_too_short() {
        assert!(matches!(Engine::restore(&[]), Err(DeserializeError::TooShort)));
    }

    #[test]
    fn truncated_data_returns_error() {
        let bytes = make_test_engine().snapshot().unwrap();
        let result = Engine::restore(&bytes[..bytes.len() / 2]);
        assert!(matches!(result, Err(DeserializeError::Decode(_))));
    }

    #[test]
    fn garbage_returns_error() {
        assert!(Engine::restore(&[0xFF; 64]).is_err());
    }

    #[test]
    fn listeners_are_not_restored() {
        let mut engine = make_test_engine();
        engine.on_passive(crate::event::EventKind::SignalEmitted, Box::new(|_| {}));
        let restored = Engine::restore(&engine.snapshot().unwrap()).unwrap();
        assert_eq!(
            restored
                .event_bus()
                .total_emitted(crate::event::EventKind::SignalEmitted),
            0
        );
    }

    /// Decode `engine`'s snapshot, let `tamper` edit the payload, and
    /// re-encode it with a valid header.
    fn tampered(engine: &Engine, tamper: impl FnOnce(&mut EngineSnapshot)) -> Vec<u8> {
        let mut snapshot = decode(&engine.snapshot().unwrap()).unwrap();
        tamper(&mut snapshot);
        bitcode::serialize(&snapshot).unwrap()
    }

    fn engine_with_signal_in_flight() -> Engine {
        let (mut engine, a, _, _) = crate::test_utils::build_pair(60.0);
        engine.inject_external(a, 0.3, None);
        engine.step(1.0);
        assert_eq!(engine.signal_count(), 1);
        engine
    }

    #[test]
    fn zero_path_length_is_clamped_on_restore() {
        let engine = engine_with_signal_in_flight();
        let bytes = tampered(&engine, |s| {
            s.signals[0].path_length = Fixed64::ZERO;
            s.signals[0].travelled = Fixed64::ZERO;
        });

        let mut restored = Engine::restore(&bytes).unwrap();
        let signals = restored.signals();
        assert_eq!(signals.len(), engine.signal_count());
        assert_eq!(signals[0].progress, Fixed64::ZERO);
        restored.step(1.0);
    }

    #[test]
    fn travelled_is_capped_at_path_length_on_restore() {
        let engine = engine_with_signal_in_flight();
        let bytes = tampered(&engine, |s| {
            s.signals[0].travelled = Fixed64::MAX;
        });

        let restored = Engine::restore(&bytes).unwrap();
        let signal = &restored.signals[0];
        assert_eq!(signal.travelled(), signal.path_length());
        assert_eq!(restored.signals()[0].progress, Fixed64::ONE);
    }

    #[test]
    fn signals_on_missing_edges_are_dropped_on_restore() {
        let engine = engine_with_signal_in_flight();
        let count = engine.signal_count();
        let bytes = tampered(&engine, |s| {
            let (from, to) = (s.signals[0].from, s.signals[0].to);
            s.signals[0].from = to;
            s.signals[0].to = from;
        });

        let restored = Engine::restore(&bytes).unwrap();
        assert_eq!(restored.signal_count(), count - 1);
    }

    #[test]
    fn exhausted_tick_counter_is_rejected() {
        let engine = make_test_engine();
        let bytes = tampered(&engine, |s| s.sim_state.tick = u64::MAX);
        assert!(matches!(
            Engine::restore(&bytes),
            Err(DeserializeError::Corrupt(_))
        ));

        let bytes = tampered(&engine, |s| s.sim_state.tick = u64::MAX - 1);
        assert!(Engine::restore(&bytes).is_ok());
    }
}

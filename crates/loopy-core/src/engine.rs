//! The simulation engine: owns the causal-loop graph and runs the tick
//! pipeline.
//!
//! # Architecture
//!
//! The `Engine` owns:
//! - A [`CausalGraph`] (nodes = stocks, edges = flows, with configuration)
//! - Per-node runtime state: [`NodeState`] (fill, lifecycle, bucket)
//! - The in-flight [`Signal`]s, in spawn order
//! - A [`StimulusQueue`] of user pokes waiting for the next tick
//! - A [`SimState`] (tick counter, run state) and the [`GlobalConfig`]
//! - A seeded [`SimRng`] and an [`EventBus`]
//!
//! # Tick Pipeline
//!
//! Each executed tick runs, in this order:
//! 0. **Pre-tick** -- apply queued graph mutations; drop orphaned signals
//! 1. **Snapshot** -- per-node fill delta since the last tick, plus stimuli
//! 2. **Emit** -- run every edge's transform pipeline on its source basis
//! 3. **Advance** -- move every in-flight signal by `dt * signal_speed`
//! 4. **Deliver** -- route arrivals to their destination (apply or buffer);
//!    release aggregation buckets that are due
//! 5. **Update** -- apply the collected changes; evaluate explode policies
//! 6. **Bookkeeping** -- remove landed signals, deliver events, advance
//!    the tick counter, compute the state hash
//!
//! Nodes and edges are always visited in creation order and signals in
//! spawn order, so a run is a pure function of configuration, seed and the
//! `dt` sequence.

use crate::color::SignalColor;
use crate::edge::{EdgeConfig, EmissionBasis, MIN_PATH_LENGTH, TransformContext};
use crate::event::{Event, EventBus, EventFilter, EventKind, PassiveListener};
use crate::fixed::{Fixed64, Ticks, f64_to_fixed64};
use crate::graph::{CausalGraph, GraphError, MutationResult};
use crate::id::{EdgeId, NodeId};
use crate::node::{NodeConfig, NodeState, NodeTransition, StimulusOutcome};
use crate::query::{NodeSnapshot, SignalSnapshot};
use crate::rng::SimRng;
use crate::signal::{DropReason, Signal};
use crate::sim::{GlobalConfig, RunState, SimState, StateHash, TickReport};
use crate::stimulus::{Stimulus, StimulusQueue};
use slotmap::SecondaryMap;
use tracing::{debug, trace, warn};

/// Magnitude of the kick `start()` gives to autoplay nodes.
pub const AUTOPLAY_MAGNITUDE: f64 = 0.33;

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The core simulation engine.
#[derive(Debug)]
pub struct Engine {
    /// Nodes, edges and their configuration.
    pub graph: CausalGraph,

    /// Tick counter and run state.
    pub sim_state: SimState,

    /// Settings used by [`Engine::step`]; replaced by every [`Engine::tick`].
    pub(crate) config: GlobalConfig,

    // -- Per-node state (SoA, keyed by NodeId) --
    pub(crate) node_states: SecondaryMap<NodeId, NodeState>,

    /// In-flight signals in spawn order.
    pub(crate) signals: Vec<Signal>,

    pub(crate) stimuli: StimulusQueue,

    pub(crate) rng: SimRng,

    pub(crate) event_bus: EventBus,

    pub(crate) last_state_hash: u64,

    pub(crate) last_report: TickReport,
}

/// A fill change collected in the deliver phase and applied in the update
/// phase.
#[derive(Debug, Clone, Copy)]
struct PendingChange {
    node: NodeId,
    amount: Fixed64,
    /// Bypasses capacity scaling.
    vital: bool,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(GlobalConfig::default())
    }
}

impl Engine {
    /// Create an empty, stopped engine.
    pub fn new(config: GlobalConfig) -> Self {
        let rng = SimRng::new(config.seed);
        let mut engine = Self {
            graph: CausalGraph::new(),
            sim_state: SimState::new(),
            config,
            node_states: SecondaryMap::new(),
            signals: Vec::new(),
            stimuli: StimulusQueue::new(),
            rng,
            event_bus: EventBus::default(),
            last_state_hash: 0,
            last_report: TickReport::default(),
        };
        engine.last_state_hash = engine.compute_state_hash();
        engine
    }

    // -----------------------------------------------------------------------
    // Construction helpers
    // -----------------------------------------------------------------------

    /// Add a node immediately, seeded from its initial fill.
    pub fn add_node(&mut self, config: NodeConfig) -> NodeId {
        let pending = self.graph.queue_add_node(config);
        let result = self.apply_graph_mutations();
        // A freshly queued node is always added.
        result
            .resolve_node(pending)
            .unwrap_or_else(|| unreachable!("queued node was not added"))
    }

    /// Connect two nodes immediately. Self-loops are allowed.
    pub fn connect(
        &mut self,
        from: NodeId,
        to: NodeId,
        config: EdgeConfig,
    ) -> Result<EdgeId, GraphError> {
        for node in [from, to] {
            if !self.graph.contains_node(node) {
                return Err(GraphError::NodeNotFound(node));
            }
        }
        let pending = self.graph.queue_connect(from, to, config);
        self.apply_graph_mutations()
            .resolve_edge(pending)
            .ok_or(GraphError::ConnectRejected(pending))
    }

    /// Remove a node and its edges immediately. Signals on those edges are
    /// dropped.
    pub fn remove_node(&mut self, node: NodeId) -> Result<(), GraphError> {
        if !self.graph.contains_node(node) {
            return Err(GraphError::NodeNotFound(node));
        }
        self.graph.queue_remove_node(node);
        self.apply_graph_mutations();
        Ok(())
    }

    /// Remove an edge immediately. Its in-flight signals are dropped.
    pub fn disconnect(&mut self, edge: EdgeId) -> Result<(), GraphError> {
        if !self.graph.contains_edge(edge) {
            return Err(GraphError::EdgeNotFound(edge));
        }
        self.graph.queue_disconnect(edge);
        self.apply_graph_mutations();
        Ok(())
    }

    /// Apply anything queued on [`Engine::graph`] and bring runtime state in
    /// line with the new topology.
    pub fn apply_graph_mutations(&mut self) -> MutationResult {
        let result = self.graph.apply_mutations();
        self.sync_topology();
        result
    }

    /// Seed state for new nodes, forget removed ones, re-evaluate threshold
    /// flags and drop orphaned signals.
    fn sync_topology(&mut self) {
        let graph = &self.graph;
        self.node_states.retain(|id, _| graph.contains_node(id));
        for (id, data) in graph.nodes() {
            match self.node_states.get_mut(id) {
                Some(state) => state.refresh_thresholds(&data.config),
                None => {
                    self.node_states.insert(id, NodeState::seeded(&data.config));
                }
            }
        }

        let tick = self.sim_state.tick;
        let event_bus = &mut self.event_bus;
        self.signals.retain(|signal| {
            let intact = graph
                .get_edge(signal.edge)
                .is_some_and(|e| e.from == signal.from && e.to == signal.to);
            if !intact {
                trace!(edge = ?signal.edge, "dropping orphaned signal");
                event_bus.emit(Event::SignalDropped {
                    edge: signal.edge,
                    reason: DropReason::Orphaned,
                    tick,
                });
            }
            intact
        });
    }

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    /// Replace the stored global settings. The seed takes effect at the
    /// next reset.
    pub fn set_config(&mut self, config: GlobalConfig) {
        self.config = config;
    }

    /// Set the global signal speed. In-flight signals pick it up at the
    /// next tick. Negative or non-finite values clamp to zero.
    pub fn set_global_speed(&mut self, speed: f64) {
        self.config.signal_speed = GlobalConfig::speed_from_f64(speed).unwrap_or_else(|| {
            warn!(speed, "invalid signal speed, clamping to 0");
            Fixed64::ZERO
        });
    }

    /// Toggle color logic. Read every tick, never cached.
    pub fn set_color_logic(&mut self, enabled: bool) {
        self.config.color_logic = enabled;
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Restore every node to its initial fill and clear all transient
    /// state. Configuration and run state are untouched.
    pub fn reset(&mut self) {
        self.sync_topology();
        for (id, data) in self.graph.nodes() {
            self.node_states.insert(id, NodeState::seeded(&data.config));
        }
        self.signals.clear();
        self.stimuli.discard_pending();
        self.rng = SimRng::new(self.config.seed);
        self.event_bus.clear_all();
        self.sim_state.tick = 0;
        self.last_report = TickReport::default();
        self.last_state_hash = self.compute_state_hash();
        debug!(nodes = self.graph.node_count(), "engine reset");
    }

    /// Reset and start running. Nodes labelled `autoplay`/`autostart` get
    /// a positive kick on the first tick.
    pub fn start(&mut self) {
        self.reset();
        self.sim_state.run_state = RunState::Running;
        self.sim_state.paused = false;

        let kick = f64_to_fixed64(AUTOPLAY_MAGNITUDE);
        for (id, data) in self.graph.nodes() {
            if data.config.is_autoplay() {
                self.stimuli.push(Stimulus {
                    node: id,
                    magnitude: kick,
                    color: None,
                });
            }
        }
        debug!(autoplay = self.stimuli.pending().len(), "simulation started");
    }

    /// Reset and return to editing.
    pub fn stop(&mut self) {
        self.reset();
        self.sim_state.run_state = RunState::Stopped;
        self.sim_state.paused = false;
        debug!("simulation stopped");
    }

    /// Gate ticking without resetting.
    pub fn pause(&mut self) {
        self.sim_state.paused = true;
    }

    pub fn resume(&mut self) {
        self.sim_state.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.sim_state.paused
    }

    pub fn is_running(&self) -> bool {
        self.sim_state.run_state == RunState::Running
    }

    // -----------------------------------------------------------------------
    // External input
    // -----------------------------------------------------------------------

    /// Queue a user stimulus for the next tick. The node's interactivity
    /// policy decides at that point whether it applies.
    ///
    /// Returns false (and logs) if the node does not exist or the magnitude
    /// is not finite.
    pub fn inject_external(
        &mut self,
        node: NodeId,
        magnitude: f64,
        color: Option<SignalColor>,
    ) -> bool {
        if !self.graph.contains_node(node) {
            warn!(?node, "stimulus for unknown node ignored");
            return false;
        }
        if !magnitude.is_finite() {
            warn!(?node, magnitude, "non-finite stimulus ignored");
            return false;
        }
        self.stimuli.push(Stimulus {
            node,
            magnitude: f64_to_fixed64(magnitude),
            color,
        });
        true
    }

    /// Keep the last `max` drained stimuli for inspection.
    pub fn record_stimuli(&mut self, max: usize) {
        let pending = std::mem::take(&mut self.stimuli);
        self.stimuli = StimulusQueue::with_max_history(max);
        for s in pending.pending() {
            self.stimuli.push(*s);
        }
    }

    pub fn stimulus_history(&self) -> &[(Ticks, Stimulus)] {
        self.stimuli.history()
    }

    // -----------------------------------------------------------------------
    // Event system
    // -----------------------------------------------------------------------

    pub fn suppress_event(&mut self, kind: EventKind) {
        self.event_bus.suppress(kind);
    }

    /// Register a listener, called during bookkeeping of every tick.
    pub fn on_passive(&mut self, kind: EventKind, listener: PassiveListener) {
        self.event_bus.on_passive(kind, listener);
    }

    pub fn on_passive_filtered(
        &mut self,
        kind: EventKind,
        filter: EventFilter,
        listener: PassiveListener,
    ) {
        self.event_bus.on_passive_filtered(kind, Some(filter), listener);
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    // -----------------------------------------------------------------------
    // Ticking
    // -----------------------------------------------------------------------

    /// Advance one tick of `dt` simulated time units with the given global
    /// settings. No effect unless running and not paused.
    pub fn tick(&mut self, dt: f64, config: &GlobalConfig) {
        if !self.sim_state.is_live() {
            trace!("tick ignored: engine not running");
            return;
        }
        self.config.clone_from(config);
        self.step_internal(dt);
    }

    /// Advance one tick using the stored settings.
    pub fn step(&mut self, dt: f64) {
        if !self.sim_state.is_live() {
            trace!("step ignored: engine not running");
            return;
        }
        self.step_internal(dt);
    }

    fn step_internal(&mut self, dt: f64) {
        let dt = sanitize_dt(dt);
        let mut report = TickReport {
            tick: self.sim_state.tick,
            ..TickReport::default()
        };

        self.phase_pre_tick();
        let bases = self.phase_snapshot(&mut report);
        self.phase_emit(&bases, &mut report);
        self.phase_advance(dt);
        let changes = self.phase_deliver(&mut report);
        self.phase_update(&changes, &mut report);
        self.phase_bookkeeping();

        self.last_report = report;
    }

    // -----------------------------------------------------------------------
    // Phase 0: Pre-tick
    // -----------------------------------------------------------------------

    fn phase_pre_tick(&mut self) {
        if self.graph.has_pending_mutations() {
            self.graph.apply_mutations();
        }
        self.sync_topology();
    }

    // -----------------------------------------------------------------------
    // Phase 1: Snapshot deltas and apply stimuli
    // -----------------------------------------------------------------------

    fn phase_snapshot(&mut self, report: &mut TickReport) -> SecondaryMap<NodeId, EmissionBasis> {
        let tick = self.sim_state.tick;
        let mut bases = SecondaryMap::new();

        for &node in self.graph.node_order() {
            let (Some(data), Some(state)) =
                (self.graph.get_node(node), self.node_states.get_mut(node))
            else {
                continue;
            };
            bases.insert(
                node,
                EmissionBasis {
                    delta: state.take_delta(),
                    fill: state.fill(),
                    color: data.config.hue.into(),
                },
            );
        }

        for stimulus in self.stimuli.drain(tick) {
            let node = stimulus.node;
            let (Some(data), Some(state)) =
                (self.graph.get_node(node), self.node_states.get_mut(node))
            else {
                trace!(?node, "stimulus target vanished");
                continue;
            };
            match state.receive_external(&data.config, stimulus.magnitude) {
                StimulusOutcome::Rejected => {
                    debug!(?node, "stimulus rejected by interactivity policy");
                    self.event_bus.emit(Event::StimulusRejected {
                        node,
                        magnitude: stimulus.magnitude,
                        tick,
                    });
                }
                StimulusOutcome::Absorbed => {
                    trace!(?node, "stimulus absorbed by dead node");
                }
                StimulusOutcome::Applied(transition) => {
                    // The stimulus is emitted through the basis, not as a
                    // fill delta on the next tick.
                    state.settle_mark();
                    if let Some(basis) = bases.get_mut(node) {
                        basis.delta = basis.delta.saturating_add(stimulus.magnitude);
                        basis.fill = state.fill();
                        basis.color = stimulus.color.unwrap_or(data.config.hue.into());
                    }
                    if let Some(t) = transition {
                        record_transition(&mut self.event_bus, report, node, t, tick);
                    }
                }
            }
        }

        bases
    }

    // -----------------------------------------------------------------------
    // Phase 2: Emit
    // -----------------------------------------------------------------------

    fn phase_emit(&mut self, bases: &SecondaryMap<NodeId, EmissionBasis>, report: &mut TickReport) {
        let tick = self.sim_state.tick;
        let color_logic = self.config.color_logic;

        for &edge_id in self.graph.edge_order() {
            let Some(edge) = self.graph.get_edge(edge_id) else {
                continue;
            };
            let Some(basis) = bases.get(edge.from) else {
                continue;
            };
            if basis.delta == Fixed64::ZERO {
                continue;
            }
            if !self
                .node_states
                .get(edge.from)
                .is_some_and(NodeState::is_alive)
            {
                continue;
            }
            let Some(dest) = self.graph.get_node(edge.to) else {
                continue;
            };

            let mut ctx = TransformContext {
                color_logic,
                destination_hue: dest.config.hue,
                rng: &mut self.rng,
            };
            match edge.config.transform(basis, &mut ctx) {
                Ok(emission) => {
                    let path_length = self
                        .graph
                        .path_length(edge_id)
                        .unwrap_or_else(|| f64_to_fixed64(MIN_PATH_LENGTH));
                    trace!(edge = ?edge_id, magnitude = %emission.magnitude, "signal emitted");
                    self.signals.push(Signal::new(
                        edge_id,
                        edge.from,
                        edge.to,
                        emission.magnitude,
                        emission.color,
                        emission.vital,
                        path_length,
                        tick,
                    ));
                    self.event_bus.emit(Event::SignalEmitted {
                        edge: edge_id,
                        from: edge.from,
                        to: edge.to,
                        magnitude: emission.magnitude,
                        color: emission.color,
                        tick,
                    });
                    report.emitted += 1;
                }
                Err(reason) => {
                    trace!(edge = ?edge_id, ?reason, "emission filtered");
                    self.event_bus.emit(Event::SignalDropped {
                        edge: edge_id,
                        reason,
                        tick,
                    });
                    report.dropped += 1;
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Phase 3: Advance
    // -----------------------------------------------------------------------

    fn phase_advance(&mut self, dt: Fixed64) {
        let step = dt.saturating_mul(self.config.signal_speed);
        for signal in &mut self.signals {
            signal.advance(step);
        }
    }

    // -----------------------------------------------------------------------
    // Phase 4: Deliver
    // -----------------------------------------------------------------------

    fn phase_deliver(&mut self, report: &mut TickReport) -> Vec<PendingChange> {
        let tick = self.sim_state.tick;
        let color_logic = self.config.color_logic;
        let tps = self.config.ticks_per_second;
        let mut changes = Vec::new();

        for signal in self.signals.iter().filter(|s| s.has_arrived()) {
            let (Some(dest), Some(state)) = (
                self.graph.get_node(signal.to),
                self.node_states.get_mut(signal.to),
            ) else {
                self.event_bus.emit(Event::SignalDropped {
                    edge: signal.edge,
                    reason: DropReason::Orphaned,
                    tick,
                });
                report.dropped += 1;
                continue;
            };

            let dropped = if dest.config.rejects_color(signal.color, color_logic) {
                Some(DropReason::ForeignColor)
            } else if !state.is_alive() {
                Some(DropReason::DeadDestination)
            } else {
                None
            };
            if let Some(reason) = dropped {
                trace!(edge = ?signal.edge, ?reason, "signal dropped on arrival");
                self.event_bus.emit(Event::SignalDropped {
                    edge: signal.edge,
                    reason,
                    tick,
                });
                report.dropped += 1;
                continue;
            }

            let buffered = dest.config.latency_ticks(tps) > 0;
            if buffered {
                state.buffer(tick, signal.magnitude, signal.vital);
            } else {
                changes.push(PendingChange {
                    node: signal.to,
                    amount: signal.magnitude,
                    vital: signal.vital,
                });
            }
            trace!(edge = ?signal.edge, buffered, "signal delivered");
            self.event_bus.emit(Event::SignalDelivered {
                edge: signal.edge,
                node: signal.to,
                magnitude: signal.magnitude,
                buffered,
                tick,
            });
            report.delivered += 1;
        }

        for &node in self.graph.node_order() {
            let (Some(data), Some(state)) =
                (self.graph.get_node(node), self.node_states.get_mut(node))
            else {
                continue;
            };
            let latency = data.config.latency_ticks(tps);
            let Some(bucket) = state.take_due_bucket(tick, latency) else {
                continue;
            };
            for (amount, vital) in [(bucket.scaled, false), (bucket.vital, true)] {
                if amount != Fixed64::ZERO {
                    changes.push(PendingChange {
                        node,
                        amount,
                        vital,
                    });
                }
            }
            trace!(?node, contributions = bucket.contributions, "bucket released");
            self.event_bus.emit(Event::BucketReleased {
                node,
                scaled: bucket.scaled,
                vital: bucket.vital,
                contributions: bucket.contributions,
                tick,
            });
            report.released_buckets += 1;
        }

        changes
    }

    // -----------------------------------------------------------------------
    // Phase 5: Update & evaluate
    // -----------------------------------------------------------------------

    fn phase_update(&mut self, changes: &[PendingChange], report: &mut TickReport) {
        let tick = self.sim_state.tick;
        for change in changes {
            let (Some(data), Some(state)) = (
                self.graph.get_node(change.node),
                self.node_states.get_mut(change.node),
            ) else {
                continue;
            };
            let transition = if change.vital {
                state.apply_vital_change(&data.config, change.amount)
            } else {
                state.apply_delta(&data.config, change.amount)
            };
            if let Some(t) = transition {
                record_transition(&mut self.event_bus, report, change.node, t, tick);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Phase 6: Bookkeeping
    // -----------------------------------------------------------------------

    fn phase_bookkeeping(&mut self) {
        self.signals.retain(|s| !s.has_arrived());
        self.event_bus.deliver();
        self.sim_state.tick += 1;
        self.last_state_hash = self.compute_state_hash();
    }

    /// Deterministic hash over tick, node state, signals and RNG.
    fn compute_state_hash(&self) -> u64 {
        let mut hasher = StateHash::new();
        hasher.write_u64(self.sim_state.tick);

        for &node in self.graph.node_order() {
            let Some(state) = self.node_states.get(node) else {
                continue;
            };
            hasher.write_fixed64(state.fill());
            hasher.write_bool(state.is_alive());
            if let Some(bucket) = state.bucket() {
                hasher.write_u64(bucket.opened_at);
                hasher.write_fixed64(bucket.scaled);
                hasher.write_fixed64(bucket.vital);
                hasher.write_u32(bucket.contributions);
            }
        }

        hasher.write_u64(self.signals.len() as u64);
        for signal in &self.signals {
            hasher.write_fixed64(signal.magnitude);
            hasher.write_fixed64(signal.travelled());
            hasher.write_u32(color_code(signal.color));
            hasher.write_bool(signal.vital);
        }

        hasher.write_u64(self.rng.state());
        hasher.finish()
    }

    // -----------------------------------------------------------------------
    // Query API (read-only)
    // -----------------------------------------------------------------------

    /// Hash computed at the end of the last tick (or reset).
    pub fn state_hash(&self) -> u64 {
        self.last_state_hash
    }

    /// Counts from the last executed tick.
    pub fn last_report(&self) -> TickReport {
        self.last_report
    }

    pub fn current_tick(&self) -> Ticks {
        self.sim_state.tick
    }

    pub fn node_fill(&self, node: NodeId) -> Option<Fixed64> {
        self.node_states.get(node).map(NodeState::fill)
    }

    pub fn node_alive(&self, node: NodeId) -> Option<bool> {
        self.node_states.get(node).map(NodeState::is_alive)
    }

    pub fn node_state(&self, node: NodeId) -> Option<&NodeState> {
        self.node_states.get(node)
    }

    pub fn snapshot_node(&self, node: NodeId) -> Option<NodeSnapshot> {
        let data = self.graph.get_node(node)?;
        let state = self.node_states.get(node)?;
        Some(NodeSnapshot {
            id: node,
            fill: state.fill(),
            alive: state.is_alive(),
            hue: data.config.hue,
            label: data.config.label.clone(),
            pending_bucket: state.bucket().copied(),
        })
    }

    /// Snapshots of every node, in creation order.
    pub fn snapshot_all_nodes(&self) -> Vec<NodeSnapshot> {
        self.graph
            .node_order()
            .iter()
            .filter_map(|&id| self.snapshot_node(id))
            .collect()
    }

    /// Every in-flight signal, in spawn order.
    pub fn signals(&self) -> Vec<SignalSnapshot> {
        self.signals.iter().map(signal_snapshot).collect()
    }

    /// In-flight signals on one edge, in spawn order.
    pub fn signals_on(&self, edge: EdgeId) -> Vec<SignalSnapshot> {
        self.signals
            .iter()
            .filter(|s| s.edge == edge)
            .map(signal_snapshot)
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn signal_count(&self) -> usize {
        self.signals.len()
    }

    pub fn get_inputs(&self, node: NodeId) -> &[EdgeId] {
        self.graph.get_inputs(node)
    }

    pub fn get_outputs(&self, node: NodeId) -> &[EdgeId] {
        self.graph.get_outputs(node)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Negative or non-finite `dt` becomes zero.
fn sanitize_dt(dt: f64) -> Fixed64 {
    if dt.is_finite() && dt >= 0.0 {
        f64_to_fixed64(dt)
    } else {
        warn!(dt, "invalid dt, treating as 0");
        Fixed64::ZERO
    }
}

fn record_transition(
    bus: &mut EventBus,
    report: &mut TickReport,
    node: NodeId,
    transition: NodeTransition,
    tick: Ticks,
) {
    match transition {
        NodeTransition::Died(cause) => {
            debug!(?node, ?cause, tick, "node died");
            bus.emit(Event::NodeDied { node, cause, tick });
            report.deaths += 1;
        }
        NodeTransition::Crossed(side) => {
            bus.emit(Event::ThresholdCrossed { node, side, tick });
        }
    }
}

fn signal_snapshot(signal: &Signal) -> SignalSnapshot {
    SignalSnapshot {
        edge: signal.edge,
        from: signal.from,
        to: signal.to,
        progress: signal.progress(),
        magnitude: signal.magnitude,
        color: signal.color,
    }
}

fn color_code(color: SignalColor) -> u32 {
    match color {
        SignalColor::Hue(h) => u32::from(h.index()),
        SignalColor::Neutral => u32::MAX,
    }
}

// ===========================================================================
// Tests
// ===========================================================================

//! Nodes (stocks): configuration, fill state and threshold evaluation.
//!
//! A node's configuration ([`NodeConfig`]) is edited outside the simulation
//! and never touched by the engine. Its runtime state ([`NodeState`]) is
//! owned by the engine and only changes during a tick:
//!
//! - fill moves by `delta / capacity`, clamped to `[-1, 1]`
//! - after every change the explode policy is evaluated; a node that dies
//!   stays dead (fill pinned) until the next reset
//! - incoming signals may be held in an [`AggregationBucket`] and released
//!   as one combined change once the node's latency has elapsed

use crate::color::{Hue, SignalColor};
use crate::fixed::{Fixed64, Ticks, clamp_fill, f64_to_fixed64, saturating_div_64};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Configuration enums
// ---------------------------------------------------------------------------

/// How much raw signal is needed to move the fill by one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CapacityClass {
    /// Behaves like a boolean: the smallest signal saturates it.
    Tiny,
    #[default]
    Normal,
    Big,
    Huge,
}

impl CapacityClass {
    /// The divisor applied to incoming deltas. Never zero.
    pub fn factor(self) -> Fixed64 {
        match self {
            CapacityClass::Tiny => f64_to_fixed64(0.0001),
            CapacityClass::Normal => Fixed64::ONE,
            CapacityClass::Big => Fixed64::from_num(5),
            CapacityClass::Huge => Fixed64::from_num(100),
        }
    }

    /// Persisted `size` value.
    pub fn code(self) -> f64 {
        match self {
            CapacityClass::Tiny => 0.0001,
            CapacityClass::Normal => 1.0,
            CapacityClass::Big => 5.0,
            CapacityClass::Huge => 100.0,
        }
    }

    pub fn from_code(code: f64) -> Option<Self> {
        [Self::Tiny, Self::Normal, Self::Big, Self::Huge]
            .into_iter()
            .find(|c| c.code() == code)
    }
}

/// Fill level (or lifecycle) a node starts with on every reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InitialFill {
    Dead,
    Empty,
    Quarter,
    #[default]
    Half,
    ThreeQuarters,
    Full,
}

impl InitialFill {
    /// Starting fill, or `None` for a node that starts dead.
    pub fn level(self) -> Option<Fixed64> {
        match self {
            InitialFill::Dead => None,
            InitialFill::Empty => Some(Fixed64::ZERO),
            InitialFill::Quarter => Some(f64_to_fixed64(0.25)),
            InitialFill::Half => Some(f64_to_fixed64(0.5)),
            InitialFill::ThreeQuarters => Some(f64_to_fixed64(0.75)),
            InitialFill::Full => Some(Fixed64::ONE),
        }
    }

    /// Persisted `init` value (`-1` marks a dead start).
    pub fn code(self) -> f64 {
        match self {
            InitialFill::Dead => -1.0,
            InitialFill::Empty => 0.0,
            InitialFill::Quarter => 0.25,
            InitialFill::Half => 0.5,
            InitialFill::ThreeQuarters => 0.75,
            InitialFill::Full => 1.0,
        }
    }

    pub fn from_code(code: f64) -> Option<Self> {
        [
            Self::Dead,
            Self::Empty,
            Self::Quarter,
            Self::Half,
            Self::ThreeQuarters,
            Self::Full,
        ]
        .into_iter()
        .find(|i| i.code() == code)
    }
}

/// When crossing a threshold kills the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ExplodePolicy {
    #[default]
    Never,
    IfEmpty,
    IfFull,
    Either,
}

impl ExplodePolicy {
    fn on_full(self) -> bool {
        matches!(self, ExplodePolicy::IfFull | ExplodePolicy::Either)
    }

    fn on_empty(self) -> bool {
        matches!(self, ExplodePolicy::IfEmpty | ExplodePolicy::Either)
    }

    pub fn code(self) -> f64 {
        match self {
            ExplodePolicy::Never => 0.0,
            ExplodePolicy::IfEmpty => -1.0,
            ExplodePolicy::IfFull => 1.0,
            ExplodePolicy::Either => 2.0,
        }
    }

    pub fn from_code(code: f64) -> Option<Self> {
        [Self::Never, Self::IfEmpty, Self::IfFull, Self::Either]
            .into_iter()
            .find(|p| p.code() == code)
    }
}

/// What a node does with signals whose color differs from its hue.
/// Only consulted while color logic is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ForeignColorPolicy {
    #[default]
    Forward,
    Drop,
}

impl ForeignColorPolicy {
    pub fn code(self) -> f64 {
        match self {
            ForeignColorPolicy::Forward => 0.0,
            ForeignColorPolicy::Drop => 1.0,
        }
    }

    pub fn from_code(code: f64) -> Option<Self> {
        [Self::Forward, Self::Drop].into_iter().find(|p| p.code() == code)
    }
}

/// Whether the user may poke the node directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Interactivity {
    ReadOnly,
    SendPositive,
    #[default]
    SendBoth,
    SendPositiveUnlessDead,
    SendBothUnlessDead,
}

impl Interactivity {
    /// Whether a stimulus of the given sign is allowed on a node that is
    /// (or is not) alive.
    pub fn allows(self, magnitude: Fixed64, alive: bool) -> bool {
        if magnitude == Fixed64::ZERO {
            return false;
        }
        let positive = magnitude > Fixed64::ZERO;
        match self {
            Interactivity::ReadOnly => false,
            Interactivity::SendPositive => positive,
            Interactivity::SendBoth => true,
            Interactivity::SendPositiveUnlessDead => positive && alive,
            Interactivity::SendBothUnlessDead => alive,
        }
    }

    pub fn code(self) -> f64 {
        match self {
            Interactivity::ReadOnly => 0.0,
            Interactivity::SendPositive => 1.0,
            Interactivity::SendBoth => 2.0,
            Interactivity::SendPositiveUnlessDead => 3.0,
            Interactivity::SendBothUnlessDead => 4.0,
        }
    }

    pub fn from_code(code: f64) -> Option<Self> {
        [
            Self::ReadOnly,
            Self::SendPositive,
            Self::SendBoth,
            Self::SendPositiveUnlessDead,
            Self::SendBothUnlessDead,
        ]
        .into_iter()
        .find(|p| p.code() == code)
    }
}

// ---------------------------------------------------------------------------
// NodeConfig
// ---------------------------------------------------------------------------

/// Editable configuration of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Display label. `autoplay` / `autostart` get a kick on `start()`.
    pub label: String,
    pub hue: Hue,
    /// Canvas position, used to derive edge path lengths.
    pub x: f64,
    pub y: f64,
    pub capacity: CapacityClass,
    pub initial_fill: InitialFill,
    /// Fill at or above which the node counts as full. In `[0, 1]`.
    pub overflow: Fixed64,
    /// Fill at or below `-underflow` counts as empty. In `[0, 1]`.
    pub underflow: Fixed64,
    /// Delay, in seconds, between the first buffered arrival and release.
    pub aggregation_latency: f64,
    pub explode: ExplodePolicy,
    pub foreign_color: ForeignColorPolicy,
    pub interactivity: Interactivity,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            label: "?".to_string(),
            hue: Hue::Red,
            x: 0.0,
            y: 0.0,
            capacity: CapacityClass::Normal,
            initial_fill: InitialFill::Half,
            overflow: Fixed64::ZERO,
            underflow: Fixed64::ONE,
            aggregation_latency: 0.0,
            explode: ExplodePolicy::Never,
            foreign_color: ForeignColorPolicy::Forward,
            interactivity: Interactivity::SendBoth,
        }
    }
}

impl NodeConfig {
    /// Aggregation latency converted to whole ticks at the given rate.
    pub fn latency_ticks(&self, ticks_per_second: u32) -> Ticks {
        let ticks = self.aggregation_latency * f64::from(ticks_per_second);
        if ticks.is_finite() && ticks > 0.0 {
            ticks.round() as Ticks
        } else {
            0
        }
    }

    /// Whether this node rejects a signal of the given color.
    pub fn rejects_color(&self, color: SignalColor, color_logic: bool) -> bool {
        color_logic
            && self.foreign_color == ForeignColorPolicy::Drop
            && color.is_foreign_to(self.hue)
    }

    /// Whether the node autostarts when the simulation starts.
    pub fn is_autoplay(&self) -> bool {
        self.label == "autoplay" || self.label == "autostart"
    }
}

// ---------------------------------------------------------------------------
// Runtime state
// ---------------------------------------------------------------------------

/// Which threshold a node reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThresholdSide {
    /// Fill reached the overflow threshold.
    Full,
    /// Fill reached the negative underflow threshold.
    Empty,
}

/// A lifecycle-relevant outcome of changing a node's fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeTransition {
    /// The explode policy fired; the node is now dead.
    Died(ThresholdSide),
    /// A threshold was reached that the explode policy does not cover.
    Crossed(ThresholdSide),
}

/// Result of offering an external stimulus to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StimulusOutcome {
    /// The interactivity policy forbids it. No state change.
    Rejected,
    /// Allowed, but the node is dead and cannot change.
    Absorbed,
    /// Applied to the fill.
    Applied(Option<NodeTransition>),
}

/// Signals held back by a node with aggregation latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationBucket {
    /// Tick of the first contribution.
    pub opened_at: Ticks,
    /// Sum of contributions that scale with capacity.
    pub scaled: Fixed64,
    /// Sum of vital contributions that bypass capacity scaling.
    pub vital: Fixed64,
    pub contributions: u32,
}

impl AggregationBucket {
    fn open(tick: Ticks) -> Self {
        Self {
            opened_at: tick,
            scaled: Fixed64::ZERO,
            vital: Fixed64::ZERO,
            contributions: 0,
        }
    }

    /// Whether the bucket is due at `tick` for the given latency.
    pub fn is_due(&self, tick: Ticks, latency: Ticks) -> bool {
        tick >= self.opened_at.saturating_add(latency)
    }
}

/// Mutable per-node simulation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeState {
    fill: Fixed64,
    alive: bool,
    /// Fill at the last delta snapshot.
    mark: Fixed64,
    /// Currently at/above the overflow threshold.
    full: bool,
    /// Currently at/below the negative underflow threshold.
    empty: bool,
    bucket: Option<AggregationBucket>,
}

impl NodeState {
    /// Fresh state seeded from the configuration's initial fill.
    pub fn seeded(config: &NodeConfig) -> Self {
        let (fill, alive) = match config.initial_fill.level() {
            Some(level) => (level, true),
            None => (Fixed64::ZERO, false),
        };
        Self {
            fill,
            alive,
            mark: fill,
            full: fill >= config.overflow,
            empty: fill <= -config.underflow,
            bucket: None,
        }
    }

    pub fn fill(&self) -> Fixed64 {
        self.fill
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn bucket(&self) -> Option<&AggregationBucket> {
        self.bucket.as_ref()
    }

    /// Change since the previous snapshot; advances the snapshot mark.
    pub fn take_delta(&mut self) -> Fixed64 {
        let delta = self.fill - self.mark;
        self.mark = self.fill;
        delta
    }

    /// Move the snapshot mark to the current fill, so the change made since
    /// the last snapshot is not reported again.
    pub fn settle_mark(&mut self) {
        self.mark = self.fill;
    }

    /// Apply a raw delta scaled by the node's capacity class.
    ///
    /// No-op on a dead node.
    pub fn apply_delta(&mut self, config: &NodeConfig, delta: Fixed64) -> Option<NodeTransition> {
        if !self.alive {
            return None;
        }
        let scaled = saturating_div_64(delta, config.capacity.factor());
        self.set_fill(config, self.fill.saturating_add(scaled))
    }

    /// Apply a change directly to the fill, bypassing capacity scaling.
    ///
    /// No-op on a dead node.
    pub fn apply_vital_change(
        &mut self,
        config: &NodeConfig,
        change: Fixed64,
    ) -> Option<NodeTransition> {
        if !self.alive {
            return None;
        }
        self.set_fill(config, self.fill.saturating_add(change))
    }

    /// Offer a user stimulus. The interactivity policy decides acceptance.
    pub fn receive_external(&mut self, config: &NodeConfig, magnitude: Fixed64) -> StimulusOutcome {
        if !config.interactivity.allows(magnitude, self.alive) {
            return StimulusOutcome::Rejected;
        }
        if !self.alive {
            return StimulusOutcome::Absorbed;
        }
        StimulusOutcome::Applied(self.apply_delta(config, magnitude))
    }

    /// Hold a delivered magnitude until the node's latency elapses.
    pub fn buffer(&mut self, tick: Ticks, magnitude: Fixed64, vital: bool) {
        let bucket = self.bucket.get_or_insert_with(|| AggregationBucket::open(tick));
        if vital {
            bucket.vital = bucket.vital.saturating_add(magnitude);
        } else {
            bucket.scaled = bucket.scaled.saturating_add(magnitude);
        }
        bucket.contributions += 1;
    }

    /// Remove and return the bucket if it is due at `tick`.
    pub fn take_due_bucket(&mut self, tick: Ticks, latency: Ticks) -> Option<AggregationBucket> {
        match self.bucket {
            Some(b) if b.is_due(tick, latency) => self.bucket.take(),
            _ => None,
        }
    }

    /// Re-evaluate the threshold flags against `config` without reporting
    /// a crossing. Used after the thresholds were edited.
    pub(crate) fn refresh_thresholds(&mut self, config: &NodeConfig) {
        self.full = self.fill >= config.overflow;
        self.empty = self.fill <= -config.underflow;
    }

    /// Clamp, store and evaluate thresholds.
    fn set_fill(&mut self, config: &NodeConfig, value: Fixed64) -> Option<NodeTransition> {
        self.fill = clamp_fill(value);

        let full = self.fill >= config.overflow;
        let empty = self.fill <= -config.underflow;
        let was_full = std::mem::replace(&mut self.full, full);
        let was_empty = std::mem::replace(&mut self.empty, empty);

        if full && config.explode.on_full() {
            self.die();
            return Some(NodeTransition::Died(ThresholdSide::Full));
        }
        if empty && config.explode.on_empty() {
            self.die();
            return Some(NodeTransition::Died(ThresholdSide::Empty));
        }
        if full && !was_full {
            return Some(NodeTransition::Crossed(ThresholdSide::Full));
        }
        if empty && !was_empty {
            return Some(NodeTransition::Crossed(ThresholdSide::Empty));
        }
        None
    }

    fn die(&mut self) {
        self.alive = false;
        self.bucket = None;
    }
}

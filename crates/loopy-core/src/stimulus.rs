//! External stimuli waiting for the next tick.
//!
//! Interactive tools may poke a node at any time; the poke is queued here
//! and only applied during the next tick's snapshot phase, so a tick is
//! never observed half-applied.

use crate::color::SignalColor;
use crate::fixed::{Fixed64, Ticks};
use crate::id::NodeId;
use serde::{Deserialize, Serialize};

/// A signed user stimulus aimed at one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stimulus {
    pub node: NodeId,
    pub magnitude: Fixed64,
    /// `None` uses the node's own hue.
    pub color: Option<SignalColor>,
}

/// Pending stimuli plus an optional bounded history of drained ones.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StimulusQueue {
    pending: Vec<Stimulus>,
    history: Vec<(Ticks, Stimulus)>,
    /// Maximum history entries kept. 0 disables history.
    max_history: usize,
}

impl StimulusQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// A queue that keeps the last `max_history` drained stimuli.
    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            max_history,
            ..Self::default()
        }
    }

    pub fn push(&mut self, stimulus: Stimulus) {
        self.pending.push(stimulus);
    }

    /// Take every pending stimulus in submission order, recording them in
    /// the history under `tick`.
    pub fn drain(&mut self, tick: Ticks) -> Vec<Stimulus> {
        let drained = std::mem::take(&mut self.pending);
        if self.max_history > 0 {
            self.history.extend(drained.iter().map(|s| (tick, *s)));
            let excess = self.history.len().saturating_sub(self.max_history);
            self.history.drain(..excess);
        }
        drained
    }

    /// Forget pending stimuli without applying them.
    pub fn discard_pending(&mut self) {
        self.pending.clear();
    }

    pub fn pending(&self) -> &[Stimulus] {
        &self.pending
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn history(&self) -> &[(Ticks, Stimulus)] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

// ===========================================================================
// Tests
// ===========================================================================

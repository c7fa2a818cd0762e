//! In-flight signals and the reasons a signal can fail to land.

use crate::color::SignalColor;
use crate::fixed::{Fixed64, Ticks, saturating_div_64};
use crate::id::{EdgeId, NodeId};
use serde::{Deserialize, Serialize};

/// Semantic kind of a signal, derived from its magnitude sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalKind {
    /// Positive magnitude.
    Life,
    /// Negative magnitude.
    Death,
}

impl SignalKind {
    /// `None` for a zero magnitude, which is never a valid signal.
    pub fn classify(magnitude: Fixed64) -> Option<Self> {
        if magnitude > Fixed64::ZERO {
            Some(SignalKind::Life)
        } else if magnitude < Fixed64::ZERO {
            Some(SignalKind::Death)
        } else {
            None
        }
    }
}

/// Why a signal was not spawned, or not applied on arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DropReason {
    /// The transformed magnitude was zero.
    ZeroMagnitude,
    /// The edge's value filter rejected the signal kind.
    ValueFilter,
    /// The edge's color filter rejected the signal color.
    ColorFilter,
    /// The destination drops foreign colors and this one did not match.
    ForeignColor,
    /// The destination was dead on arrival.
    DeadDestination,
    /// The edge or one of its endpoints was removed mid-flight.
    Orphaned,
}

/// A quantum of influence travelling along an edge.
///
/// Magnitude, color and target are fixed at spawn; only the distance
/// travelled changes while in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    pub edge: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
    pub magnitude: Fixed64,
    pub color: SignalColor,
    /// Bypasses capacity scaling at the destination.
    pub vital: bool,
    pub(crate) travelled: Fixed64,
    pub(crate) path_length: Fixed64,
    pub spawned_at: Ticks,
}

impl Signal {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        edge: EdgeId,
        from: NodeId,
        to: NodeId,
        magnitude: Fixed64,
        color: SignalColor,
        vital: bool,
        path_length: Fixed64,
        spawned_at: Ticks,
    ) -> Self {
        Self {
            edge,
            from,
            to,
            magnitude,
            color,
            vital,
            travelled: Fixed64::ZERO,
            path_length: path_length.max(Fixed64::from_bits(1)),
            spawned_at,
        }
    }

    /// Move along the path. Returns true once the signal has arrived.
    pub fn advance(&mut self, step: Fixed64) -> bool {
        if step > Fixed64::ZERO {
            self.travelled = self.travelled.saturating_add(step).min(self.path_length);
        }
        self.has_arrived()
    }

    pub fn has_arrived(&self) -> bool {
        self.travelled >= self.path_length
    }

    /// Fraction of the path covered, in `[0, 1]`.
    pub fn progress(&self) -> Fixed64 {
        saturating_div_64(self.travelled, self.path_length).min(Fixed64::ONE)
    }

    /// Force the path to at least `min_path` and the distance travelled
    /// into `[0, path_length]`.
    pub(crate) fn clamp_path(&mut self, min_path: Fixed64) {
        self.path_length = self.path_length.max(min_path);
        self.travelled = self.travelled.clamp(Fixed64::ZERO, self.path_length);
    }

    pub fn travelled(&self) -> Fixed64 {
        self.travelled
    }

    pub fn path_length(&self) -> Fixed64 {
        self.path_length
    }

    pub fn kind(&self) -> Option<SignalKind> {
        SignalKind::classify(self.magnitude)
    }
}

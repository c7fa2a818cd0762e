//! Read-only query API for inspecting simulation state.
//!
//! Snapshot types are owned copies, never references into engine storage,
//! so renderers can hold them across ticks.

use crate::color::{Hue, SignalColor};
use crate::fixed::Fixed64;
use crate::id::{EdgeId, NodeId};
use crate::node::AggregationBucket;

// ---------------------------------------------------------------------------
// Node snapshot
// ---------------------------------------------------------------------------

/// What a renderer needs to draw one node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSnapshot {
    pub id: NodeId,
    /// In `[-1, 1]`.
    pub fill: Fixed64,
    pub alive: bool,
    pub hue: Hue,
    pub label: String,
    /// Signals held back by aggregation latency, if any.
    pub pending_bucket: Option<AggregationBucket>,
}

// ---------------------------------------------------------------------------
// Signal snapshot
// ---------------------------------------------------------------------------

/// One in-flight signal, positioned along its edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalSnapshot {
    pub edge: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
    /// Fraction of the path covered, in `[0, 1]`.
    pub progress: Fixed64,
    pub magnitude: Fixed64,
    pub color: SignalColor,
}

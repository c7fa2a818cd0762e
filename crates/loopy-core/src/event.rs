//! Typed simulation events with per-kind ring buffers.
//!
//! Events are emitted while a tick runs (emission, delivery, node updates)
//! and handed to listeners in one batch during bookkeeping, after the
//! simulation state is final for that tick. Each event kind has its own
//! bounded [`EventBuffer`]; when it overflows, the oldest events are lost.
//!
//! Kinds can be suppressed via [`EventBus::suppress`]. A suppressed kind
//! is never buffered and costs nothing.

use crate::color::SignalColor;
use crate::fixed::{Fixed64, Ticks};
use crate::id::*;
use crate::node::ThresholdSide;
use crate::signal::DropReason;
use std::collections::VecDeque;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// A simulation event. All events carry the tick at which they occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// An edge spawned a signal.
    SignalEmitted {
        edge: EdgeId,
        from: NodeId,
        to: NodeId,
        magnitude: Fixed64,
        color: SignalColor,
        tick: Ticks,
    },
    /// A signal reached its destination and was applied or buffered.
    SignalDelivered {
        edge: EdgeId,
        node: NodeId,
        magnitude: Fixed64,
        /// Held in the node's aggregation bucket rather than applied.
        buffered: bool,
        tick: Ticks,
    },
    /// A signal was not spawned, or was discarded before it could apply.
    SignalDropped {
        edge: EdgeId,
        reason: DropReason,
        tick: Ticks,
    },
    /// An aggregation bucket was released as one combined change.
    BucketReleased {
        node: NodeId,
        scaled: Fixed64,
        vital: Fixed64,
        contributions: u32,
        tick: Ticks,
    },
    /// The explode policy fired.
    NodeDied {
        node: NodeId,
        cause: ThresholdSide,
        tick: Ticks,
    },
    /// A threshold was reached without killing the node.
    ThresholdCrossed {
        node: NodeId,
        side: ThresholdSide,
        tick: Ticks,
    },
    /// The node's interactivity policy refused an external stimulus.
    StimulusRejected {
        node: NodeId,
        magnitude: Fixed64,
        tick: Ticks,
    },
}

/// Discriminant tag for event types, used for suppression and routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    SignalEmitted,
    SignalDelivered,
    SignalDropped,
    BucketReleased,
    NodeDied,
    ThresholdCrossed,
    StimulusRejected,
}

impl EventKind {
    pub const ALL: [EventKind; 7] = [
        EventKind::SignalEmitted,
        EventKind::SignalDelivered,
        EventKind::SignalDropped,
        EventKind::BucketReleased,
        EventKind::NodeDied,
        EventKind::ThresholdCrossed,
        EventKind::StimulusRejected,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

const EVENT_KIND_COUNT: usize = EventKind::ALL.len();

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::SignalEmitted { .. } => EventKind::SignalEmitted,
            Event::SignalDelivered { .. } => EventKind::SignalDelivered,
            Event::SignalDropped { .. } => EventKind::SignalDropped,
            Event::BucketReleased { .. } => EventKind::BucketReleased,
            Event::NodeDied { .. } => EventKind::NodeDied,
            Event::ThresholdCrossed { .. } => EventKind::ThresholdCrossed,
            Event::StimulusRejected { .. } => EventKind::StimulusRejected,
        }
    }

    pub fn tick(&self) -> Ticks {
        match self {
            Event::SignalEmitted { tick, .. }
            | Event::SignalDelivered { tick, .. }
            | Event::SignalDropped { tick, .. }
            | Event::BucketReleased { tick, .. }
            | Event::NodeDied { tick, .. }
            | Event::ThresholdCrossed { tick, .. }
            | Event::StimulusRejected { tick, .. } => *tick,
        }
    }
}

// ---------------------------------------------------------------------------
// EventBuffer
// ---------------------------------------------------------------------------

/// A bounded ring of events. When full, pushing drops the oldest event.
#[derive(Debug)]
pub struct EventBuffer {
    events: VecDeque<Event>,
    capacity: usize,
    /// Total events ever written (including dropped).
    total_written: u64,
    dropped: u64,
}

impl EventBuffer {
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
            total_written: 0,
            dropped: 0,
        }
    }

    pub fn push(&mut self, event: Event) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
            self.dropped += 1;
        }
        self.events.push_back(event);
        self.total_written += 1;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Events lost because the buffer was full.
    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Event> {
        self.events.iter()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

// ---------------------------------------------------------------------------
// Listeners
// ---------------------------------------------------------------------------

/// A passive listener receives events read-only.
pub type PassiveListener = Box<dyn FnMut(&Event)>;

/// Optional predicate that filters events for a listener.
pub type EventFilter = Box<dyn Fn(&Event) -> bool>;

struct ListenerEntry {
    listener: PassiveListener,
    filter: Option<EventFilter>,
}

impl std::fmt::Debug for ListenerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerEntry")
            .field("filtered", &self.filter.is_some())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// One ring buffer and one listener list per event kind.
pub struct EventBus {
    buffers: [Option<EventBuffer>; EVENT_KIND_COUNT],
    suppressed: [bool; EVENT_KIND_COUNT],
    listeners: [Vec<ListenerEntry>; EVENT_KIND_COUNT],
    default_capacity: usize,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("buffers", &self.buffers)
            .field("suppressed", &self.suppressed)
            .field("default_capacity", &self.default_capacity)
            .finish_non_exhaustive()
    }
}

impl EventBus {
    /// Create a bus whose buffers hold up to `default_capacity` events each.
    pub fn new(default_capacity: usize) -> Self {
        Self {
            buffers: Default::default(),
            suppressed: [false; EVENT_KIND_COUNT],
            listeners: Default::default(),
            default_capacity,
        }
    }

    /// Stop recording a kind. Anything already buffered for it is dropped.
    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
        self.buffers[kind.index()] = None;
    }

    pub fn unsuppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = false;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    /// Buffer an event. No-op for a suppressed kind.
    pub fn emit(&mut self, event: Event) {
        let idx = event.kind().index();
        if self.suppressed[idx] {
            return;
        }
        let capacity = self.default_capacity;
        self.buffers[idx]
            .get_or_insert_with(|| EventBuffer::new(capacity))
            .push(event);
    }

    /// Register a listener. Listeners of a kind run in registration order.
    pub fn on_passive(&mut self, kind: EventKind, listener: PassiveListener) {
        self.on_passive_filtered(kind, None, listener);
    }

    /// Register a listener that only sees events passing `filter`.
    pub fn on_passive_filtered(
        &mut self,
        kind: EventKind,
        filter: Option<EventFilter>,
        listener: PassiveListener,
    ) {
        self.listeners[kind.index()].push(ListenerEntry { listener, filter });
    }

    /// Hand every buffered event to its listeners, oldest first, then clear
    /// the buffers. Kinds are visited in [`EventKind::ALL`] order.
    pub fn deliver(&mut self) {
        for idx in 0..EVENT_KIND_COUNT {
            let Some(buffer) = self.buffers[idx].as_mut() else {
                continue;
            };
            if buffer.is_empty() {
                continue;
            }
            let events: Vec<Event> = buffer.events.drain(..).collect();

            for entry in &mut self.listeners[idx] {
                for event in &events {
                    if let Some(filter) = &entry.filter
                        && !filter(event)
                    {
                        continue;
                    }
                    (entry.listener)(event);
                }
            }
        }
    }

    pub fn buffer(&self, kind: EventKind) -> Option<&EventBuffer> {
        self.buffers[kind.index()].as_ref()
    }

    /// Events of a kind currently waiting for delivery.
    pub fn buffered_count(&self, kind: EventKind) -> usize {
        self.buffer(kind).map_or(0, EventBuffer::len)
    }

    /// Total events ever emitted for a kind (including dropped).
    pub fn total_emitted(&self, kind: EventKind) -> u64 {
        self.buffer(kind).map_or(0, EventBuffer::total_written)
    }

    /// Clear all buffers. Listeners and suppression are kept.
    pub fn clear_all(&mut self) {
        for buffer in self.buffers.iter_mut().flatten() {
            buffer.clear();
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

// ===========================================================================
// Tests
// ===========================================================================

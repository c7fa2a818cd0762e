//! Edges (flows): configuration, geometry and the signal transform pipeline.
//!
//! Every tick in which an edge's source node changed, the engine runs the
//! edge's pipeline once. The pipeline is a pure function of the edge
//! configuration, the source basis and the engine RNG:
//!
//! 1. **Magnitude basis** -- fill delta (tendency), absolute fill
//!    (quantity), or fill delta flagged as a vital change.
//! 2. **Sign** -- multiply by strength, then apply the sign behavior.
//! 3. **Value filter** -- zero never spawns; life/death/random gating.
//! 4. **Color** -- color filter (gate under color logic, start color
//!    otherwise), then color target recoloring.
//!
//! Travel time comes from the edge's path length, fixed at spawn; the
//! global signal speed is applied per tick by the engine.

use crate::color::{Hue, SignalColor};
use crate::fixed::{Fixed64, f64_to_fixed64};
use crate::rng::SimRng;
use crate::signal::{DropReason, SignalKind};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Shortest path an edge can have. Keeps travel time strictly positive.
pub const MIN_PATH_LENGTH: f64 = 1.0;

// ---------------------------------------------------------------------------
// Configuration enums
// ---------------------------------------------------------------------------

/// Sign multiplier applied to every signal the edge carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Strength {
    /// "Same effect" (+1).
    #[default]
    Same,
    /// "Invert effect" (-1).
    Invert,
}

impl Strength {
    pub fn apply(self, magnitude: Fixed64) -> Fixed64 {
        match self {
            Strength::Same => magnitude,
            Strength::Invert => -magnitude,
        }
    }

    pub fn code(self) -> f64 {
        match self {
            Strength::Same => 1.0,
            Strength::Invert => -1.0,
        }
    }

    pub fn from_code(code: f64) -> Option<Self> {
        [Self::Same, Self::Invert].into_iter().find(|s| s.code() == code)
    }
}

/// Second sign transform, applied after [`Strength`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SignBehavior {
    #[default]
    Preserved,
    Inverted,
    /// Positive values become zero.
    ClampNegative,
    /// Negative values become zero.
    ClampPositive,
    ForceNegative,
    ForcePositive,
}

impl SignBehavior {
    pub fn apply(self, magnitude: Fixed64) -> Fixed64 {
        match self {
            SignBehavior::Preserved => magnitude,
            SignBehavior::Inverted => -magnitude,
            SignBehavior::ClampNegative => magnitude.min(Fixed64::ZERO),
            SignBehavior::ClampPositive => magnitude.max(Fixed64::ZERO),
            SignBehavior::ForceNegative => -magnitude.saturating_abs(),
            SignBehavior::ForcePositive => magnitude.saturating_abs(),
        }
    }

    pub fn code(self) -> f64 {
        self as u8 as f64
    }

    pub fn from_code(code: f64) -> Option<Self> {
        [
            Self::Preserved,
            Self::Inverted,
            Self::ClampNegative,
            Self::ClampPositive,
            Self::ForceNegative,
            Self::ForcePositive,
        ]
        .into_iter()
        .find(|s| s.code() == code)
    }
}

/// Which signals the edge forwards, by semantic kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ValueFilter {
    #[default]
    Any,
    /// Every edge-borne signal is an arrow signal, so this passes all.
    ArrowOnly,
    DeathOnly,
    LifeOnly,
    DeathOrLife,
    /// Each signal passes with probability 1/2.
    RandomSubset,
}

impl ValueFilter {
    /// Whether a signal of the given kind passes. May draw from `rng`.
    pub fn passes(self, kind: SignalKind, rng: &mut SimRng) -> bool {
        match self {
            ValueFilter::Any | ValueFilter::ArrowOnly | ValueFilter::DeathOrLife => true,
            ValueFilter::DeathOnly => kind == SignalKind::Death,
            ValueFilter::LifeOnly => kind == SignalKind::Life,
            ValueFilter::RandomSubset => rng.chance(Fixed64::from_num(0.5)),
        }
    }

    pub fn code(self) -> f64 {
        self as u8 as f64
    }

    pub fn from_code(code: f64) -> Option<Self> {
        [
            Self::Any,
            Self::ArrowOnly,
            Self::DeathOnly,
            Self::LifeOnly,
            Self::DeathOrLife,
            Self::RandomSubset,
        ]
        .into_iter()
        .find(|f| f.code() == code)
    }
}

/// What the edge reads from its source, and how the destination applies it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum QuantitativeMode {
    /// Source fill delta; destination scales by capacity.
    #[default]
    InputAsTendency,
    /// Source absolute fill; destination scales by capacity.
    InputAsQuantity,
    /// Source fill delta; destination applies it directly to its fill.
    OutputAsVitalChange,
}

impl QuantitativeMode {
    pub fn code(self) -> f64 {
        self as u8 as f64
    }

    pub fn from_code(code: f64) -> Option<Self> {
        [
            Self::InputAsTendency,
            Self::InputAsQuantity,
            Self::OutputAsVitalChange,
        ]
        .into_iter()
        .find(|m| m.code() == code)
    }
}

/// Color gate (color logic) or start color (aesthetic mode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ColorFilter {
    #[default]
    Any,
    Only(Hue),
}

impl ColorFilter {
    pub fn code(self) -> f64 {
        match self {
            ColorFilter::Any => -1.0,
            ColorFilter::Only(h) => h.index() as f64,
        }
    }

    pub fn from_code(code: f64) -> Option<Self> {
        if code == -1.0 {
            return Some(ColorFilter::Any);
        }
        if code.fract() != 0.0 {
            return None;
        }
        Hue::from_index(code as i64).map(ColorFilter::Only)
    }
}

/// Recoloring applied to passing signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ColorTarget {
    #[default]
    None,
    To(Hue),
    Random,
    /// The signal takes the destination node's hue.
    SignalToNode,
}

impl ColorTarget {
    pub fn code(self) -> f64 {
        match self {
            ColorTarget::None => -1.0,
            ColorTarget::To(h) => h.index() as f64,
            ColorTarget::Random => -2.0,
            ColorTarget::SignalToNode => -3.0,
        }
    }

    pub fn from_code(code: f64) -> Option<Self> {
        match code {
            c if c == -1.0 => Some(ColorTarget::None),
            c if c == -2.0 => Some(ColorTarget::Random),
            c if c == -3.0 => Some(ColorTarget::SignalToNode),
            c if c.fract() == 0.0 => Hue::from_index(c as i64).map(ColorTarget::To),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// Shape of the drawn arrow. Determines path length and so travel time.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EdgeGeometry {
    /// Signed sagitta of the circular arc between the node centres.
    /// Zero draws a straight line. For self-loops, the loop diameter.
    pub arc: f64,
    /// Orientation of a self-loop, in degrees. No effect on length.
    pub rotation: f64,
}

impl EdgeGeometry {
    /// Path length between two node centres (or around a self-loop).
    pub fn path_length(&self, from: (f64, f64), to: (f64, f64), self_loop: bool) -> Fixed64 {
        let length = if self_loop {
            PI * self.arc.abs().max(MIN_PATH_LENGTH)
        } else {
            arc_length(from, to, self.arc)
        };
        debug_assert!(
            length.is_finite() && length >= 0.0,
            "edge geometry produced invalid path length {length}"
        );
        let length = if length.is_finite() { length } else { MIN_PATH_LENGTH };
        f64_to_fixed64(length.max(MIN_PATH_LENGTH))
    }
}

/// Length of the circular arc with chord `from -> to` and sagitta `arc`.
fn arc_length(from: (f64, f64), to: (f64, f64), arc: f64) -> f64 {
    let chord = (to.0 - from.0).hypot(to.1 - from.1);
    let sagitta = arc.abs();
    if chord <= f64::EPSILON {
        return 0.0;
    }
    if sagitta <= f64::EPSILON {
        return chord;
    }
    // tan(alpha / 2) = 2h / d, with alpha the half central angle.
    let alpha = 2.0 * (2.0 * sagitta / chord).atan();
    let radius = chord / (2.0 * alpha.sin());
    2.0 * alpha * radius
}

// ---------------------------------------------------------------------------
// EdgeConfig and the transform pipeline
// ---------------------------------------------------------------------------

/// Editable configuration of an edge.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EdgeConfig {
    pub strength: Strength,
    pub sign_behavior: SignBehavior,
    pub value_filter: ValueFilter,
    pub quantitative: QuantitativeMode,
    pub color_filter: ColorFilter,
    pub color_target: ColorTarget,
    pub geometry: EdgeGeometry,
    /// Display only.
    pub custom_label: String,
}

/// What the source node offers to its outgoing edges this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmissionBasis {
    /// Fill change since the previous tick, plus injected stimuli.
    pub delta: Fixed64,
    /// Absolute fill at snapshot time.
    pub fill: Fixed64,
    /// Source hue, or the color of the last accepted stimulus.
    pub color: SignalColor,
}

/// A decided emission: what the spawned signal will carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Emission {
    pub magnitude: Fixed64,
    pub color: SignalColor,
    /// Apply directly to the destination fill, bypassing capacity.
    pub vital: bool,
}

/// Inputs to the pipeline that come from outside the edge.
pub struct TransformContext<'a> {
    pub color_logic: bool,
    pub destination_hue: Hue,
    pub rng: &'a mut SimRng,
}

impl EdgeConfig {
    /// Run the transform pipeline. `Err` carries why nothing is emitted.
    pub fn transform(
        &self,
        basis: &EmissionBasis,
        ctx: &mut TransformContext<'_>,
    ) -> Result<Emission, DropReason> {
        let (raw, vital) = match self.quantitative {
            QuantitativeMode::InputAsTendency => (basis.delta, false),
            QuantitativeMode::InputAsQuantity => (basis.fill, false),
            QuantitativeMode::OutputAsVitalChange => (basis.delta, true),
        };

        let magnitude = self.sign_behavior.apply(self.strength.apply(raw));

        let kind = SignalKind::classify(magnitude).ok_or(DropReason::ZeroMagnitude)?;
        if !self.value_filter.passes(kind, ctx.rng) {
            return Err(DropReason::ValueFilter);
        }

        let mut color = basis.color;
        match (self.color_filter, ctx.color_logic) {
            (ColorFilter::Any, _) => {}
            (ColorFilter::Only(hue), true) => {
                if color != SignalColor::Hue(hue) {
                    return Err(DropReason::ColorFilter);
                }
            }
            (ColorFilter::Only(hue), false) => color = SignalColor::Hue(hue),
        }
        color = match self.color_target {
            ColorTarget::None => color,
            ColorTarget::To(hue) => SignalColor::Hue(hue),
            ColorTarget::Random => SignalColor::Hue(ctx.rng.hue()),
            ColorTarget::SignalToNode => SignalColor::Hue(ctx.destination_hue),
        };

        Ok(Emission {
            magnitude,
            color,
            vital,
        })
    }
}

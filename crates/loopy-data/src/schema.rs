//! Serde data file structs for diagram descriptions.
//!
//! A diagram file names its nodes and wires edges by those names. Choice
//! attributes reuse the engine's own enums; numeric attributes are plain
//! floats and are converted (and sanitized) by the loader.

use loopy_core::color::Hue;
use loopy_core::edge::{
    ColorFilter, ColorTarget, QuantitativeMode, SignBehavior, Strength, ValueFilter,
};
use loopy_core::node::{
    CapacityClass, ExplodePolicy, ForeignColorPolicy, InitialFill, Interactivity, NodeConfig,
};
use loopy_core::sim::{CameraMode, DEFAULT_SIGNAL_SPEED, DEFAULT_TICKS_PER_SECOND, LoopyMode};
use serde::Deserialize;

// ===========================================================================
// Diagram
// ===========================================================================

/// A whole diagram file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DiagramData {
    pub settings: SettingsData,
    pub nodes: Vec<NodeData>,
    pub edges: Vec<EdgeData>,
}

// ===========================================================================
// Global settings
// ===========================================================================

/// Model-wide settings. Every field is optional in the file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SettingsData {
    /// Path units per unit of simulated time.
    pub signal_speed: f64,
    pub color_logic: bool,
    pub ticks_per_second: u32,
    pub seed: u64,
    pub loopy_mode: LoopyMode,
    pub camera_mode: CameraMode,
}

impl Default for SettingsData {
    fn default() -> Self {
        Self {
            signal_speed: DEFAULT_SIGNAL_SPEED as f64,
            color_logic: false,
            ticks_per_second: DEFAULT_TICKS_PER_SECOND,
            seed: 0,
            loopy_mode: LoopyMode::default(),
            camera_mode: CameraMode::default(),
        }
    }
}

// ===========================================================================
// Nodes
// ===========================================================================

/// A node definition. `name` is the reference used by edges; `label`
/// defaults to it.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeData {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub hue: Hue,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub capacity: CapacityClass,
    #[serde(default)]
    pub initial_fill: InitialFill,
    #[serde(default = "default_overflow")]
    pub overflow: f64,
    #[serde(default = "default_underflow")]
    pub underflow: f64,
    /// Seconds.
    #[serde(default)]
    pub aggregation_latency: f64,
    #[serde(default)]
    pub explode: ExplodePolicy,
    #[serde(default)]
    pub foreign_color: ForeignColorPolicy,
    #[serde(default)]
    pub interactivity: Interactivity,
}

fn default_overflow() -> f64 {
    NodeConfig::default().overflow.to_num()
}

fn default_underflow() -> f64 {
    NodeConfig::default().underflow.to_num()
}

// ===========================================================================
// Edges
// ===========================================================================

/// An edge between two named nodes. `from == to` declares a self-loop.
#[derive(Debug, Clone, Deserialize)]
pub struct EdgeData {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub strength: Strength,
    #[serde(default)]
    pub sign_behavior: SignBehavior,
    #[serde(default)]
    pub value_filter: ValueFilter,
    #[serde(default)]
    pub quantitative: QuantitativeMode,
    #[serde(default)]
    pub color_filter: ColorFilter,
    #[serde(default)]
    pub color_target: ColorTarget,
    /// Arc sagitta; for self-loops, the loop diameter.
    #[serde(default)]
    pub arc: f64,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub label: String,
}

// ===========================================================================
// Tests
// ===========================================================================

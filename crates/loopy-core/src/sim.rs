//! Global settings, run state and per-tick bookkeeping types.
//!
//! [`GlobalConfig`] is passed into every [`Engine::tick`](crate::engine::Engine::tick)
//! call rather than read from ambient state; the engine keeps a copy for
//! the convenience [`Engine::step`](crate::engine::Engine::step).

use crate::fixed::{Fixed64, Ticks, f64_to_fixed64};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Global configuration
// ---------------------------------------------------------------------------

/// Editor complexity. Carried for the editor; no propagation effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LoopyMode {
    #[default]
    Simple,
    Advanced,
}

impl LoopyMode {
    pub fn code(self) -> f64 {
        self as u8 as f64
    }

    pub fn from_code(code: f64) -> Option<Self> {
        [Self::Simple, Self::Advanced]
            .into_iter()
            .find(|m| m.code() == code)
    }
}

/// Camera behaviour during play. Carried for the host; no propagation effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CameraMode {
    #[default]
    ResizeToScene,
    FollowSignals,
    UserControllable,
}

impl CameraMode {
    pub fn code(self) -> f64 {
        self as u8 as f64
    }

    pub fn from_code(code: f64) -> Option<Self> {
        [Self::ResizeToScene, Self::FollowSignals, Self::UserControllable]
            .into_iter()
            .find(|m| m.code() == code)
    }
}

/// Model-wide settings read by the tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Path units a signal covers per unit of `dt`. Never negative.
    pub signal_speed: Fixed64,
    /// Whether colors affect propagation rather than only rendering.
    pub color_logic: bool,
    /// Host cadence, used to convert latency seconds to ticks.
    pub ticks_per_second: u32,
    /// Seed for the random edge options. Re-applied on every reset.
    pub seed: u64,
    pub loopy_mode: LoopyMode,
    pub camera_mode: CameraMode,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            signal_speed: Fixed64::from_num(DEFAULT_SIGNAL_SPEED),
            color_logic: false,
            ticks_per_second: DEFAULT_TICKS_PER_SECOND,
            seed: 0,
            loopy_mode: LoopyMode::Simple,
            camera_mode: CameraMode::ResizeToScene,
        }
    }
}

pub const DEFAULT_SIGNAL_SPEED: i32 = 3;
pub const DEFAULT_TICKS_PER_SECOND: u32 = 30;

impl GlobalConfig {
    /// Sanitized signal speed from a host value. Negative or non-finite
    /// input becomes zero.
    pub fn speed_from_f64(v: f64) -> Option<Fixed64> {
        if v.is_finite() && v >= 0.0 {
            Some(f64_to_fixed64(v))
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Run state
// ---------------------------------------------------------------------------

/// Explicit lifecycle, decoupled from any editor/play UI mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RunState {
    /// Editing. Ticks have no effect.
    #[default]
    Stopped,
    Running,
}

/// Mutable simulation state tracked by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimState {
    /// Ticks executed since the last reset.
    pub tick: Ticks,
    pub run_state: RunState,
    /// Gates ticking without resetting.
    pub paused: bool,
}

impl SimState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a tick call should do any work.
    pub fn is_live(&self) -> bool {
        self.run_state == RunState::Running && !self.paused
    }
}

// ---------------------------------------------------------------------------
// Tick report
// ---------------------------------------------------------------------------

/// Counts from the most recent executed tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: Ticks,
    pub emitted: u32,
    pub delivered: u32,
    pub dropped: u32,
    pub released_buckets: u32,
    pub deaths: u32,
}

// ---------------------------------------------------------------------------
// State hash
// ---------------------------------------------------------------------------

/// Deterministic hash of simulation state for desync detection.
///
/// FNV-1a (64-bit). Not cryptographic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHash(pub u64);

impl StateHash {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    pub fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= u64::from(b);
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_bool(&mut self, v: bool) {
        self.write(&[u8::from(v)]);
    }

    pub fn write_fixed64(&mut self, v: Fixed64) {
        self.write(&v.to_bits().to_le_bytes());
    }

    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = GlobalConfig::default();
        assert_eq!(cfg.signal_speed, Fixed64::from_num(3));
        assert_eq!(cfg.ticks_per_second, 30);
        assert!(!cfg.color_logic);
    }

    #[test]
    fn fresh_state_is_stopped() {
        let state = SimState::new();
        assert_eq!(state.tick, 0);
        assert!(!state.is_live());
        let running = SimState {
            run_state: RunState::Running,
            ..SimState::new()
        };
        assert!(running.is_live());
        assert!(!SimState { paused: true, ..running }.is_live());
    }

    #[test]
    fn speed_sanitizing() {
        assert_eq!(GlobalConfig::speed_from_f64(2.5), Some(f64_to_fixed64(2.5)));
        assert_eq!(GlobalConfig::speed_from_f64(0.0), Some(Fixed64::ZERO));
        assert_eq!(GlobalConfig::speed_from_f64(-1.0), None);
        assert_eq!(GlobalConfig::speed_from_f64(f64::NAN), None);
    }

    #[test]
    fn mode_codes() {
        assert_eq!(LoopyMode::from_code(1.0), Some(LoopyMode::Advanced));
        assert_eq!(CameraMode::from_code(2.0), Some(CameraMode::UserControllable));
        assert_eq!(CameraMode::from_code(3.0), None);
    }

    #[test]
    fn partial_config_deserializes_with_defaults() {
        let cfg: GlobalConfig = serde_json::from_str(r#"{"color_logic": true}"#).unwrap();
        assert!(cfg.color_logic);
        assert_eq!(cfg.ticks_per_second, 30);
    }

    #[test]
    fn state_hash_order_matters() {
        let mut h1 = StateHash::new();
        h1.write_u32(1);
        h1.write_u32(2);
        let mut h2 = StateHash::new();
        h2.write_u32(2);
        h2.write_u32(1);
        assert_ne!(h1.finish(), h2.finish());
    }
}

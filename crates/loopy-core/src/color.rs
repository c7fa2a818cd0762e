//! The six discrete hues shared by nodes and signals.

use serde::{Deserialize, Serialize};

/// A node hue. Persisted as its index (0..=5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Hue {
    #[default]
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
    Purple,
}

impl Hue {
    /// All hues in persistence order.
    pub const ALL: [Hue; 6] = [
        Hue::Red,
        Hue::Orange,
        Hue::Yellow,
        Hue::Green,
        Hue::Blue,
        Hue::Purple,
    ];

    /// The persisted index of this hue.
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Look a hue up by its persisted index.
    pub fn from_index(index: i64) -> Option<Hue> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    /// Display name, as the editor shows it.
    pub fn name(self) -> &'static str {
        match self {
            Hue::Red => "red",
            Hue::Orange => "orange",
            Hue::Yellow => "yellow",
            Hue::Green => "green",
            Hue::Blue => "blue",
            Hue::Purple => "purple",
        }
    }
}

/// The color tag carried by an in-flight signal.
///
/// Edge-borne signals always carry a hue; `Neutral` only enters the engine
/// through external stimuli that do not name a color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalColor {
    Hue(Hue),
    Neutral,
}

impl SignalColor {
    /// The hue, if the signal has one.
    pub fn hue(self) -> Option<Hue> {
        match self {
            SignalColor::Hue(h) => Some(h),
            SignalColor::Neutral => None,
        }
    }

    /// Whether this color counts as foreign to a node of hue `hue`.
    pub fn is_foreign_to(self, hue: Hue) -> bool {
        self.hue() != Some(hue)
    }
}

impl From<Hue> for SignalColor {
    fn from(hue: Hue) -> Self {
        SignalColor::Hue(hue)
    }
}

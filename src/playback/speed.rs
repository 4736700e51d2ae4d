//! Supported playback speed multipliers.

use std::fmt;
use std::str::FromStr;

use crate::error::TimelineError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PlaybackSpeed {
    Half,
    #[default]
    Normal,
    Double,
    Quadruple,
}

impl PlaybackSpeed {
    pub const ALL: [PlaybackSpeed; 4] = [Self::Half, Self::Normal, Self::Double, Self::Quadruple];

    pub fn multiplier(self) -> f64 {
        match self {
            Self::Half => 0.5,
            Self::Normal => 1.0,
            Self::Double => 2.0,
            Self::Quadruple => 4.0,
        }
    }

    pub fn from_multiplier(multiplier: f64) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|speed| speed.multiplier() == multiplier)
    }

    /// Next faster speed, wrapping back to the slowest.
    pub fn cycle(self) -> Self {
        match self {
            Self::Half => Self::Normal,
            Self::Normal => Self::Double,
            Self::Double => Self::Quadruple,
            Self::Quadruple => Self::Half,
        }
    }
}

impl FromStr for PlaybackSpeed {
    type Err = TimelineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let number = trimmed
            .strip_suffix(|ch: char| ch == 'x' || ch == 'X')
            .unwrap_or(trimmed)
            .trim();
        number
            .parse::<f64>()
            .ok()
            .and_then(Self::from_multiplier)
            .ok_or_else(|| TimelineError::unsupported_speed(value))
    }
}

impl fmt::Display for PlaybackSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.multiplier())
    }
}

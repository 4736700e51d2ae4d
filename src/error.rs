use thiserror::Error;

/// Errors for the fallible entry points (speed and configuration parsing).
///
/// Parsing, ticking and rendering a recording never fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimelineError {
    #[error("unsupported playback speed '{value}'; expected one of 0.5, 1, 2, 4")]
    UnsupportedSpeed { value: String },

    #[error("invalid value for {key}: '{value}'")]
    InvalidConfig { key: &'static str, value: String },
}

impl TimelineError {
    #[must_use]
    pub fn unsupported_speed(value: impl Into<String>) -> Self {
        Self::UnsupportedSpeed {
            value: value.into(),
        }
    }

    #[must_use]
    pub fn invalid_config(key: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidConfig {
            key,
            value: value.into(),
        }
    }
}

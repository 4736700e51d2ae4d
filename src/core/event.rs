//! Cast event model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stream an event was recorded on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CastEventKind {
    /// Terminal bytes written to the screen.
    Output,
    /// Bytes sent by the controlling process. Never rendered.
    Input,
    /// Out-of-band metadata emitted by the recorded agent.
    Marker,
}

impl CastEventKind {
    /// Maps the wire type code (`"o"`, `"i"`, `"m"`) to a kind.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "o" => Some(Self::Output),
            "i" => Some(Self::Input),
            "m" => Some(Self::Marker),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Output => "o",
            Self::Input => "i",
            Self::Marker => "m",
        }
    }
}

/// One accepted row of a recording.
#[derive(Debug, Clone, PartialEq)]
pub struct CastEvent {
    /// Seconds since the first accepted event.
    pub timestamp_offset: f64,
    pub kind: CastEventKind,
    /// Raw terminal bytes for output/input, encoded metadata for markers.
    ///
    /// Structured (non-string) marker content is kept as its compact JSON text.
    pub payload: String,
}

impl CastEvent {
    pub fn is_output(&self) -> bool {
        self.kind == CastEventKind::Output
    }
}

/// Decoded header line of a recording (`{"version": 2, ...}`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CastHeader {
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    /// Any header keys not listed above.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

//! Cast-format (newline-delimited JSON) parsing.
//!
//! Parsing is total: a line that cannot be used is skipped and reported through `tracing`,
//! never returned as an error.

use serde_json::Value;
use tracing::debug;

use super::event::{CastEvent, CastEventKind, CastHeader};
use super::thought::AgentThought;

/// Why a line was left out of the event list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    InvalidJson,
    /// A second header-shaped object, or a header whose fields did not decode.
    ExtraHeader,
    NotAnEventRow,
    InvalidTimestamp,
    UnknownEventCode,
    NonTextPayload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkippedLine {
    /// 1-based line number in the source text.
    pub line: usize,
    pub reason: SkipReason,
}

/// Everything extracted from one recording.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedCast {
    pub header: Option<CastHeader>,
    pub events: Vec<CastEvent>,
    pub thoughts: Vec<AgentThought>,
    pub skipped: Vec<SkippedLine>,
}

/// Parses a full recording.
pub fn parse_cast(text: &str) -> ParsedCast {
    let mut parsed = ParsedCast::default();
    let mut first_timestamp: Option<f64> = None;
    let mut last_offset = 0.0_f64;

    for (index, line) in text.lines().enumerate() {
        let line_number = index + 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let value = match serde_json::from_str::<Value>(line) {
            Ok(value) => value,
            Err(error) => {
                debug!(line = line_number, %error, "skipping malformed cast line");
                skip(&mut parsed, line_number, SkipReason::InvalidJson);
                continue;
            }
        };

        let items = match value {
            Value::Array(items) if items.len() >= 3 => items,
            Value::Object(fields) if fields.contains_key("version") => {
                if parsed.header.is_some() {
                    skip(&mut parsed, line_number, SkipReason::ExtraHeader);
                    continue;
                }
                match serde_json::from_value::<CastHeader>(Value::Object(fields)) {
                    Ok(header) => parsed.header = Some(header),
                    Err(error) => {
                        debug!(line = line_number, %error, "cast header fields did not decode");
                        skip(&mut parsed, line_number, SkipReason::ExtraHeader);
                    }
                }
                continue;
            }
            _ => {
                debug!(line = line_number, "skipping cast line that is not an event row");
                skip(&mut parsed, line_number, SkipReason::NotAnEventRow);
                continue;
            }
        };

        let Some(timestamp) = items[0].as_f64().filter(|value| value.is_finite()) else {
            debug!(line = line_number, "skipping cast event with invalid timestamp");
            skip(&mut parsed, line_number, SkipReason::InvalidTimestamp);
            continue;
        };
        let Some(kind) = items[1].as_str().and_then(CastEventKind::from_code) else {
            debug!(line = line_number, code = %items[1], "skipping cast event with unknown code");
            skip(&mut parsed, line_number, SkipReason::UnknownEventCode);
            continue;
        };

        let content = &items[2];
        let payload = match (kind, content) {
            (_, Value::String(text)) => text.clone(),
            (CastEventKind::Marker, other) => other.to_string(),
            _ => {
                debug!(line = line_number, "skipping terminal event with non-text payload");
                skip(&mut parsed, line_number, SkipReason::NonTextPayload);
                continue;
            }
        };

        let t0 = *first_timestamp.get_or_insert(timestamp);
        // Offsets never run backwards, even if a producer wrote an earlier timestamp late.
        let timestamp_offset = (timestamp - t0).max(last_offset);
        last_offset = timestamp_offset;

        if kind == CastEventKind::Marker {
            parsed
                .thoughts
                .push(AgentThought::from_value(timestamp_offset, content));
        }
        parsed.events.push(CastEvent {
            timestamp_offset,
            kind,
            payload,
        });
    }

    parsed
}

fn skip(parsed: &mut ParsedCast, line: usize, reason: SkipReason) {
    parsed.skipped.push(SkippedLine { line, reason });
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{parse_cast, ParsedCast, SkipReason, SkippedLine};
    use crate::core::event::CastEventKind;
    use crate::core::thought::ThoughtContent;

    #[test]
    fn header_is_decoded_and_not_an_event() {
        let parsed = parse_cast("{\"version\": 2, \"width\": 100, \"height\": 30}\n[0.5, \"o\", \"x\"]\n");
        let header = parsed.header.expect("header");
        assert_eq!(header.version, 2);
        assert_eq!(header.width, Some(100));
        assert_eq!(parsed.events.len(), 1);
        assert_eq!(parsed.events[0].timestamp_offset, 0.0);
    }

    #[test]
    fn offsets_are_relative_to_first_accepted_event() {
        let parsed = parse_cast(
            "{\"version\": 2}\n[\"bad\", \"o\", \"x\"]\n[10.0, \"o\", \"a\"]\n[12.5, \"i\", \"b\"]\n",
        );
        let offsets: Vec<f64> = parsed.events.iter().map(|event| event.timestamp_offset).collect();
        assert_eq!(offsets, vec![0.0, 2.5]);
        assert_eq!(parsed.events[1].kind, CastEventKind::Input);
        assert_eq!(
            parsed.skipped,
            vec![SkippedLine {
                line: 2,
                reason: SkipReason::InvalidTimestamp,
            }]
        );
    }

    #[test]
    fn resize_and_unknown_codes_are_skipped_before_t0() {
        let parsed = parse_cast("[1.0, \"r\", \"80x24\"]\n[3.0, \"o\", \"a\"]\n");
        assert_eq!(parsed.events.len(), 1);
        assert_eq!(parsed.events[0].timestamp_offset, 0.0);
        assert_eq!(parsed.skipped[0].reason, SkipReason::UnknownEventCode);
    }

    #[test]
    fn backwards_timestamps_are_clamped() {
        let parsed = parse_cast("[1.0, \"o\", \"a\"]\n[3.0, \"o\", \"b\"]\n[2.0, \"o\", \"c\"]\n[0.5, \"o\", \"d\"]\n");
        let offsets: Vec<f64> = parsed.events.iter().map(|event| event.timestamp_offset).collect();
        assert_eq!(offsets, vec![0.0, 2.0, 2.0, 2.0]);
    }

    #[test]
    fn structured_marker_content_is_kept_as_json_payload() {
        let parsed = parse_cast("[0, \"m\", {\"explanation\": \"look\"}]\n");
        assert_eq!(parsed.events[0].payload, "{\"explanation\":\"look\"}");
        assert!(matches!(
            parsed.thoughts[0].content,
            ThoughtContent::Thinking { .. }
        ));
    }

    #[test]
    fn terminal_events_require_text() {
        let parsed = parse_cast("[0, \"o\", 5]\n[0, \"o\", \"ok\"]\n");
        assert_eq!(parsed.events.len(), 1);
        assert_eq!(parsed.skipped[0].reason, SkipReason::NonTextPayload);
    }

    #[test]
    fn short_rows_and_scalars_are_not_events() {
        let parsed = parse_cast("[0, \"o\"]\n42\n{\"no\": \"version\"}\n");
        assert!(parsed.events.is_empty());
        assert_eq!(parsed.skipped.len(), 3);
        assert!(parsed
            .skipped
            .iter()
            .all(|skipped| skipped.reason == SkipReason::NotAnEventRow));
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert_eq!(parse_cast(""), ParsedCast::default());
        assert_eq!(parse_cast("\n\n  \n").events.len(), 0);
    }
}

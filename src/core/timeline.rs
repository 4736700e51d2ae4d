//! Immutable timeline over one parsed recording.
//!
//! Every view here is a pure function of a time cursor; nothing mutates after load.

use super::event::{CastEvent, CastHeader};
use super::parser::{parse_cast, ParsedCast, SkippedLine};
use super::text::markup::{render_markup, strip_ansi, MarkupOptions};
use super::text::utils::normalize_newlines;
use super::thought::AgentThought;

const SYNTHETIC_TICK_SPACING_SECS: f64 = 60.0;
const MIN_SYNTHETIC_TICKS: usize = 3;
const MAX_SYNTHETIC_TICKS: usize = 8;

/// A scrubber tick. Synthetic ticks only aid navigation and carry no thought.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerTick {
    pub timestamp_offset: f64,
    pub is_real_marker: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    header: Option<CastHeader>,
    events: Vec<CastEvent>,
    thoughts: Vec<AgentThought>,
    skipped: Vec<SkippedLine>,
    max_time: f64,
}

impl Timeline {
    /// Parses `cast_text` and indexes it. Never fails; unusable lines are skipped.
    pub fn load(cast_text: &str) -> Self {
        Self::from_parsed(parse_cast(cast_text))
    }

    pub fn from_parsed(parsed: ParsedCast) -> Self {
        let ParsedCast {
            header,
            mut events,
            mut thoughts,
            skipped,
        } = parsed;

        // Stable sorts: equal offsets keep file order, so the last marker at a tie wins lookups.
        events.sort_by(|a, b| a.timestamp_offset.total_cmp(&b.timestamp_offset));
        thoughts.sort_by(|a, b| a.timestamp_offset.total_cmp(&b.timestamp_offset));
        let max_time = events
            .last()
            .map(|event| event.timestamp_offset)
            .unwrap_or(0.0);

        Self {
            header,
            events,
            thoughts,
            skipped,
            max_time,
        }
    }

    pub fn header(&self) -> Option<&CastHeader> {
        self.header.as_ref()
    }

    pub fn events(&self) -> &[CastEvent] {
        &self.events
    }

    pub fn thoughts(&self) -> &[AgentThought] {
        &self.thoughts
    }

    /// Lines dropped while parsing, in source order.
    pub fn skipped_lines(&self) -> &[SkippedLine] {
        &self.skipped
    }

    /// Offset of the last event; 0 for an empty recording.
    pub fn max_time(&self) -> f64 {
        self.max_time
    }

    /// True when the recording has no events ("no session").
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// First event whose offset is strictly greater than `time`.
    pub fn next_event_after(&self, time: f64) -> Option<&CastEvent> {
        let index = self
            .events
            .partition_point(|event| event.timestamp_offset <= time);
        self.events.get(index)
    }

    /// Events with offset `<= time`.
    pub fn visible_events(&self, time: f64) -> &[CastEvent] {
        let end = self
            .events
            .partition_point(|event| event.timestamp_offset <= time);
        &self.events[..end]
    }

    /// Concatenated output bytes visible at `time`, newlines normalized, escapes intact.
    pub fn visible_output(&self, time: f64) -> String {
        let raw: String = self
            .visible_events(time)
            .iter()
            .filter(|event| event.is_output())
            .map(|event| event.payload.as_str())
            .collect();
        normalize_newlines(&raw)
    }

    /// Visible output as HTML markup with the default palette.
    pub fn visible_output_markup(&self, time: f64) -> String {
        self.visible_output_markup_with(time, &MarkupOptions::default())
    }

    pub fn visible_output_markup_with(&self, time: f64, options: &MarkupOptions) -> String {
        render_markup(&self.visible_output(time), options)
    }

    /// Visible output with every escape sequence removed.
    pub fn visible_output_text(&self, time: f64) -> String {
        strip_ansi(&self.visible_output(time))
    }

    /// The most recent thought at or before `time`.
    pub fn active_thought(&self, time: f64) -> Option<&AgentThought> {
        let end = self
            .thoughts
            .partition_point(|thought| thought.timestamp_offset <= time);
        end.checked_sub(1).and_then(|index| self.thoughts.get(index))
    }

    /// Real marker offsets, or evenly spaced synthetic ticks when the recording has none.
    pub fn marker_ticks(&self) -> Vec<MarkerTick> {
        if !self.thoughts.is_empty() {
            return self
                .thoughts
                .iter()
                .map(|thought| MarkerTick {
                    timestamp_offset: thought.timestamp_offset,
                    is_real_marker: true,
                })
                .collect();
        }
        synthetic_ticks(self.max_time)
    }
}

fn synthetic_ticks(max_time: f64) -> Vec<MarkerTick> {
    if max_time <= 0.0 || !max_time.is_finite() {
        return Vec::new();
    }

    let count = ((max_time / SYNTHETIC_TICK_SPACING_SECS).ceil() as usize)
        .clamp(MIN_SYNTHETIC_TICKS, MAX_SYNTHETIC_TICKS);
    (1..=count)
        .map(|index| MarkerTick {
            timestamp_offset: max_time * index as f64 / (count + 1) as f64,
            is_real_marker: false,
        })
        .collect()
}

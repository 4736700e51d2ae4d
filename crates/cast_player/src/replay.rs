//! Incremental writer from a moving playback cursor to terminal streams.

use std::io::{self, Write};

use cast_timeline::{truncate_to_width, AgentThought, Timeline};

use crate::terminal::ANSI_RESET;

/// Remembers what has already been written so each tick only emits the new suffix.
#[derive(Debug, Clone, Default)]
pub struct ReplaySink {
    events_written: usize,
    thoughts_seen: usize,
    show_thoughts: bool,
    columns: usize,
}

impl ReplaySink {
    pub fn new(show_thoughts: bool, columns: usize) -> Self {
        Self {
            events_written: 0,
            thoughts_seen: 0,
            show_thoughts,
            columns,
        }
    }

    /// Writes output bytes that became visible at `time` and, if the active thought changed,
    /// one summary line for it.
    pub fn sync<W: Write, E: Write>(
        &mut self,
        timeline: &Timeline,
        time: f64,
        output: &mut W,
        thoughts: &mut E,
    ) -> io::Result<()> {
        let visible = timeline.visible_events(time);
        if visible.len() < self.events_written {
            // The cursor moved back; bytes already on screen cannot be taken back.
            self.events_written = visible.len();
        }
        for event in &visible[self.events_written..] {
            if event.is_output() {
                output.write_all(event.payload.as_bytes())?;
            }
        }
        self.events_written = visible.len();
        output.flush()?;

        let thoughts_seen = timeline
            .thoughts()
            .partition_point(|thought| thought.timestamp_offset <= time);
        if thoughts_seen != self.thoughts_seen {
            self.thoughts_seen = thoughts_seen;
            if self.show_thoughts {
                if let Some(thought) = timeline.active_thought(time) {
                    writeln!(thoughts, "{}", format_thought_line(thought, self.columns))?;
                    thoughts.flush()?;
                }
            }
        }
        Ok(())
    }
}

/// `[  12.30s] summary`, dimmed and truncated to `columns`.
pub fn format_thought_line(thought: &AgentThought, columns: usize) -> String {
    let line = format!(
        "\x1b[2m[{:>7.2}s] {}{ANSI_RESET}",
        thought.timestamp_offset,
        thought.summary()
    );
    truncate_to_width(&line, columns.max(1), "…")
}

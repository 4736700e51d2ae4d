//! Text outline of a recording for `--summary`.

use std::fmt::Write as _;

use cast_timeline::{CastEventKind, Timeline};

pub fn render_summary(timeline: &Timeline) -> String {
    let mut out = String::new();
    if timeline.is_empty() {
        out.push_str("no session\n");
        return out;
    }

    if let Some(header) = timeline.header() {
        let _ = write!(out, "asciicast v{}", header.version);
        if let (Some(width), Some(height)) = (header.width, header.height) {
            let _ = write!(out, " {width}x{height}");
        }
        if let Some(title) = header.title.as_deref() {
            let _ = write!(out, " \"{title}\"");
        }
        out.push('\n');
    }

    let count = |kind: CastEventKind| {
        timeline
            .events()
            .iter()
            .filter(|event| event.kind == kind)
            .count()
    };
    let _ = writeln!(
        out,
        "duration {:.2}s, {} events ({} output, {} input, {} markers), {} skipped lines",
        timeline.max_time(),
        timeline.events().len(),
        count(CastEventKind::Output),
        count(CastEventKind::Input),
        count(CastEventKind::Marker),
        timeline.skipped_lines().len(),
    );

    if timeline.thoughts().is_empty() {
        let ticks = timeline
            .marker_ticks()
            .iter()
            .map(|tick| format!("{:.2}s", tick.timestamp_offset))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(out, "no markers; navigation ticks at {ticks}");
        return out;
    }

    for thought in timeline.thoughts() {
        let _ = writeln!(out, "[{:>7.2}s] {}", thought.timestamp_offset, thought.summary());
        for field in thought.display_fields() {
            for (index, line) in field.value.lines().enumerate() {
                if index == 0 {
                    let _ = writeln!(out, "    {}: {line}", field.label);
                } else {
                    let _ = writeln!(out, "      {line}");
                }
            }
        }
    }
    out
}

//! Terminal host for the cast timeline engine.
//!
//! Loads a recording from disk, drives a [`cast_timeline::Player`] on a real-time clock and
//! streams newly visible output bytes to stdout, with the active agent thought on stderr.
//!
//! Environment (flags take precedence):
//!
//! - `CAST_TIMELINE_SPEED` initial speed (`0.5`, `1`, `2`, `4`)
//! - `CAST_TIMELINE_MIN_TICK_MS` minimum delay between ticks
//! - `CAST_TIMELINE_LOG` tracing filter, e.g. `cast_timeline=debug`

pub mod cli;
pub mod logging;
pub mod replay;
pub mod summary;
pub mod terminal;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use cast_timeline::Timeline;

/// Reads and parses a recording. Only I/O can fail; bad lines inside the file are skipped.
pub fn load_timeline(path: &Path) -> Result<Timeline> {
    let cast_text = fs::read_to_string(path)
        .with_context(|| format!("failed to read recording {}", path.display()))?;
    Ok(Timeline::load(&cast_text))
}

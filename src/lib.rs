//! Asciicast timeline engine for agent session recordings.
//!
//! Invariant: a [`Timeline`] is immutable once loaded; only a [`Player`] cursor moves, and it
//! moves only through timers armed on its [`Scheduler`].
//!
//! # Public API Overview
//! - Load a recording with [`Timeline::load`] (or swap one into a running [`Player`]).
//! - Drive playback with `play`/`pause`/`reset`/`seek`/`set_speed` and feed fired timers back
//!   through [`Player::on_timer`].
//! - Read the derived views: [`Timeline::visible_output_markup`],
//!   [`Timeline::active_thought`], [`Timeline::marker_ticks`].
//! - Use [`ManualScheduler`] for deterministic tests and [`ThreadScheduler`] for real time.

pub mod config;
pub mod error;

pub mod core;
pub mod playback;

/// Configuration and errors.
pub use crate::config::PlayerConfig;
pub use crate::error::TimelineError;

/// Recording model and parsing.
pub use crate::core::event::{CastEvent, CastEventKind, CastHeader};
pub use crate::core::parser::{parse_cast, ParsedCast, SkipReason, SkippedLine};
pub use crate::core::thought::{AgentThought, PlannedCommand, ThoughtContent, ThoughtField};
pub use crate::core::timeline::{MarkerTick, Timeline};

/// Playback.
pub use crate::playback::clock::{ManualScheduler, Scheduler, ThreadScheduler, TimerId};
pub use crate::playback::player::{PlaybackState, Player, DEFAULT_MIN_TICK};
pub use crate::playback::speed::PlaybackSpeed;

/// ANSI-aware text helpers.
pub use crate::core::text::markup::{render_markup, strip_ansi, MarkupOptions, Palette, Rgb};
pub use crate::core::text::utils::{normalize_newlines, truncate_to_width};
pub use crate::core::text::width::visible_width;

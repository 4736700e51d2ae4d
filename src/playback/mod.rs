//! Playback clock and state machine.

pub mod clock;
pub mod player;
pub mod speed;

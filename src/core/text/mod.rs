//! Text helpers (escape-sequence boundaries, SGR markup, width, truncation).
//!
//! These helpers are pure (string in/string out) so the timeline and any terminal host can
//! share them.

pub mod ansi;
pub mod markup;
pub mod utils;
pub mod width;

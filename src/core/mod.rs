//! Recording model, parsing and the immutable timeline.

pub mod event;
pub mod parser;
pub mod text;
pub mod thought;
pub mod timeline;

pub mod listing;
pub mod text;
pub mod thread;

pub use thread::{parse_thread, ParseError, ThreadMarkers};

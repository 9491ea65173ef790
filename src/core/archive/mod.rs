pub mod extract;

pub use extract::{extract_with_progress, DEFAULT_POLL_INTERVAL};

//! Session output: CSV sinks and the per-session folder layout

pub mod session_paths;
pub mod sinks;

pub use session_paths::SessionPaths;
pub use sinks::{CsvFilteredSink, CsvRawSink, FilteredSink, MemorySink, RawSink};

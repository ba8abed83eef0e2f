//! Common utilities shared by the processing stages

pub mod stats;
pub mod time;

pub use stats::{median, median_absolute, percentile};
pub use time::{MockTimeProvider, MonotonicTimeProvider, TimeProvider};

// src/acquisition/mod.rs
//! Frame ingestion: ordering checks, counters and fan-out to the two paths

pub mod ingest_queue;
pub mod metrics;
pub mod sample_sync;

pub use ingest_queue::*;
pub use metrics::*;
pub use sample_sync::*;

//! Holter-Core: streaming motion-adaptive ECG denoising
//!
//! This library turns the raw stream of a wearable three-lead ECG monitor
//! with an on-board accelerometer into two persisted streams:
//!
//! - the raw stream, stored unmodified as the audit of record
//! - a filtered stream, denoised window by window with wavelet shrinkage
//!   whose thresholds rise where the accelerometer reports patient motion
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use holter_core::config::SystemConfig;
//! use holter_core::hal::simulation::{MotionBurst, SimulationConfig};
//! use holter_core::hal::HolterSimulator;
//! use holter_core::output::MemorySink;
//! use holter_core::session::HolterSession;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut sim_config = SimulationConfig::default();
//!     sim_config.total_samples = Some(3000);
//!     sim_config.artifacts.bursts.push(MotionBurst::new(1200, 300));
//!     let source = HolterSimulator::new(sim_config)?;
//!
//!     let session = HolterSession::new(SystemConfig::default())?;
//!     let sink = MemorySink::new();
//!     let report = session.run(source, sink.clone(), sink.clone())?;
//!
//!     println!("{} raw, {} filtered", sink.raw_frames().len(), sink.filtered_frames().len());
//!     println!("{}", report.to_toml()?);
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod acquisition;
pub mod config;
pub mod error;
pub mod hal;
pub mod output;
pub mod processing;
pub mod session;
pub mod utils;

// Re-export commonly used types for convenience
pub use config::{ConfigLoader, SystemConfig};
pub use error::{HolterError, HolterResult};
pub use hal::{FilterGap, FilteredFrame, FrameSource, HolterSimulator, Lead, SampleFrame, UdpFrameSource};
pub use output::{CsvFilteredSink, CsvRawSink, FilteredSink, MemorySink, RawSink, SessionPaths};
pub use processing::{AdaptiveWaveletFilter, MotionClassifier, ProcessingPipeline, SlidingWindowBuffer, WindowStitcher};
pub use session::{HolterSession, SessionReport, StopHandle};
pub use utils::time::TimeProvider;

/// Crate version, recorded in every session report
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

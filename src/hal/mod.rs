// src/hal/mod.rs
//! Frame sources and the types they produce

pub mod record;
pub mod simulation;
pub mod simulator;
pub mod traits;
pub mod types;
pub mod udp_source;

pub use record::{format_record, parse_record, InboundLine, RecordError, StatusLevel, StatusLine};
pub use simulator::{HolterSimulator, SimulatedSample, SimulatorError};
pub use traits::*;
pub use types::*;
pub use udp_source::{UdpFrameSource, UdpSourceError};

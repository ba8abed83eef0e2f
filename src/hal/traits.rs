// src/hal/traits.rs
//! Frame source abstraction

use crate::hal::types::SampleFrame;
use serde::Serialize;
use std::error::Error;

/// Result of a single poll of a [`FrameSource`]
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    /// Raw text line still to be parsed
    Line(String),
    /// Already structured frame (simulators, replays)
    Frame(SampleFrame),
    /// Nothing arrived within the poll timeout
    Idle,
    /// The source is exhausted; no further events will arrive
    Closed,
}

/// Static description of a source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceInfo {
    pub name: String,
    pub transport: TransportKind,
    pub nominal_rate_hz: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Udp,
    Simulator,
}

/// Producer of inbound samples, polled from the ingest thread
///
/// `poll` must return within a bounded time so the ingest thread can observe
/// shutdown requests; sources with nothing to deliver return [`SourceEvent::Idle`].
pub trait FrameSource: Send {
    type Error: Error + Send + Sync + 'static;

    /// Wait for the next event
    fn poll(&mut self) -> Result<SourceEvent, Self::Error>;

    /// Get source information
    fn info(&self) -> SourceInfo;
}

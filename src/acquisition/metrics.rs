// src/acquisition/metrics.rs
//! Lock-free ingestion counters shared between the session threads

use crate::hal::RecordError;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Reasons an inbound record is dropped before reaching the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    /// Wrong field count, unparsable number or empty line
    Malformed,
    NonFinite,
    MagnitudeMismatch,
    DuplicateTimestamp,
    OutOfOrderTimestamp,
}

impl AnomalyKind {
    pub const ALL: [AnomalyKind; 5] = [
        AnomalyKind::Malformed,
        AnomalyKind::NonFinite,
        AnomalyKind::MagnitudeMismatch,
        AnomalyKind::DuplicateTimestamp,
        AnomalyKind::OutOfOrderTimestamp,
    ];

    fn index(self) -> usize {
        match self {
            AnomalyKind::Malformed => 0,
            AnomalyKind::NonFinite => 1,
            AnomalyKind::MagnitudeMismatch => 2,
            AnomalyKind::DuplicateTimestamp => 3,
            AnomalyKind::OutOfOrderTimestamp => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AnomalyKind::Malformed => "malformed",
            AnomalyKind::NonFinite => "non_finite",
            AnomalyKind::MagnitudeMismatch => "magnitude_mismatch",
            AnomalyKind::DuplicateTimestamp => "duplicate_timestamp",
            AnomalyKind::OutOfOrderTimestamp => "out_of_order_timestamp",
        }
    }
}

impl From<&RecordError> for AnomalyKind {
    fn from(err: &RecordError) -> Self {
        match err {
            RecordError::Empty | RecordError::FieldCount { .. } | RecordError::InvalidNumber { .. } => {
                AnomalyKind::Malformed
            }
            RecordError::NonFinite { .. } => AnomalyKind::NonFinite,
            RecordError::MagnitudeMismatch { .. } => AnomalyKind::MagnitudeMismatch,
        }
    }
}

impl std::fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters updated by the ingest thread, read by anyone
#[derive(Debug, Default)]
pub struct IngestMetrics {
    records_received: AtomicU64,
    frames_accepted: AtomicU64,
    status_lines: AtomicU64,
    source_errors: AtomicU64,
    anomalies: [AtomicU64; 5],
    frames_shed: AtomicU64,
    gaps_opened: AtomicU64,
}

/// Counters updated by the persistence and filtering threads
#[derive(Debug, Default)]
pub struct SinkMetrics {
    raw_frames_written: AtomicU64,
    filtered_frames_written: AtomicU64,
    filtered_write_errors: AtomicU64,
    windows_processed: AtomicU64,
}

/// Point-in-time copy of [`IngestMetrics`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestSnapshot {
    pub records_received: u64,
    pub frames_accepted: u64,
    pub status_lines: u64,
    /// Failed source polls, including the one that ended a session
    pub source_errors: u64,
    pub anomalies: AnomalyCounts,
    pub frames_shed: u64,
    pub gaps_opened: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnomalyCounts {
    pub malformed: u64,
    pub non_finite: u64,
    pub magnitude_mismatch: u64,
    pub duplicate_timestamp: u64,
    pub out_of_order_timestamp: u64,
}

/// Point-in-time copy of [`SinkMetrics`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SinkSnapshot {
    pub raw_frames_written: u64,
    pub filtered_frames_written: u64,
    pub filtered_write_errors: u64,
    pub windows_processed: u64,
}

impl IngestMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&self) {
        self.records_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_accepted(&self) {
        self.frames_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_status_line(&self) {
        self.status_lines.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a failed poll; returns the total so far
    pub fn record_source_error(&self) -> u64 {
        self.source_errors.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Count an anomaly; returns how many of this kind have been seen including this one
    pub fn record_anomaly(&self, kind: AnomalyKind) -> u64 {
        self.anomalies[kind.index()].fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn record_shed(&self) {
        self.frames_shed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_gap_opened(&self) {
        self.gaps_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn anomaly_count(&self, kind: AnomalyKind) -> u64 {
        self.anomalies[kind.index()].load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> IngestSnapshot {
        IngestSnapshot {
            records_received: self.records_received.load(Ordering::Relaxed),
            frames_accepted: self.frames_accepted.load(Ordering::Relaxed),
            status_lines: self.status_lines.load(Ordering::Relaxed),
            source_errors: self.source_errors.load(Ordering::Relaxed),
            anomalies: AnomalyCounts {
                malformed: self.anomaly_count(AnomalyKind::Malformed),
                non_finite: self.anomaly_count(AnomalyKind::NonFinite),
                magnitude_mismatch: self.anomaly_count(AnomalyKind::MagnitudeMismatch),
                duplicate_timestamp: self.anomaly_count(AnomalyKind::DuplicateTimestamp),
                out_of_order_timestamp: self.anomaly_count(AnomalyKind::OutOfOrderTimestamp),
            },
            frames_shed: self.frames_shed.load(Ordering::Relaxed),
            gaps_opened: self.gaps_opened.load(Ordering::Relaxed),
        }
    }
}

impl SinkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_raw_written(&self) {
        self.raw_frames_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_filtered_written(&self, frames: u64) {
        self.filtered_frames_written.fetch_add(frames, Ordering::Relaxed);
    }

    pub fn record_filtered_error(&self) -> u64 {
        self.filtered_write_errors.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn record_window(&self) {
        self.windows_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SinkSnapshot {
        SinkSnapshot {
            raw_frames_written: self.raw_frames_written.load(Ordering::Relaxed),
            filtered_frames_written: self.filtered_frames_written.load(Ordering::Relaxed),
            filtered_write_errors: self.filtered_write_errors.load(Ordering::Relaxed),
            windows_processed: self.windows_processed.load(Ordering::Relaxed),
        }
    }
}

impl AnomalyCounts {
    pub fn total(&self) -> u64 {
        self.malformed
            + self.non_finite
            + self.magnitude_mismatch
            + self.duplicate_timestamp
            + self.out_of_order_timestamp
    }
}

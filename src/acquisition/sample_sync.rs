// src/acquisition/sample_sync.rs
//! Timestamp ordering for the inbound frame stream

use crate::acquisition::metrics::AnomalyKind;
use crate::hal::SampleFrame;
use serde::Serialize;

/// Enforces strictly increasing timestamps and tracks stream continuity
#[derive(Debug, Clone)]
pub struct SampleSynchronizer {
    /// Expected spacing between frames in source clock units (ms)
    nominal_interval: u64,
    last_timestamp: Option<u64>,
    stats: SyncStats,
}

/// Synchronization statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub frames_accepted: u64,
    pub duplicates: u64,
    pub out_of_order: u64,
    /// Forward jumps longer than 1.5 nominal intervals, usually lost datagrams
    pub timestamp_jumps: u64,
    pub max_interval: u64,
}

impl SampleSynchronizer {
    pub fn new(sample_rate_hz: u32) -> Self {
        Self {
            nominal_interval: (1000 / u64::from(sample_rate_hz.max(1))).max(1),
            last_timestamp: None,
            stats: SyncStats::default(),
        }
    }

    /// Accept `frame` if its timestamp is later than every previously accepted one
    pub fn check(&mut self, frame: &SampleFrame) -> Result<(), AnomalyKind> {
        let timestamp = frame.timestamp;

        if let Some(last) = self.last_timestamp {
            if timestamp == last {
                self.stats.duplicates += 1;
                return Err(AnomalyKind::DuplicateTimestamp);
            }
            if timestamp < last {
                self.stats.out_of_order += 1;
                return Err(AnomalyKind::OutOfOrderTimestamp);
            }

            let interval = timestamp - last;
            self.stats.max_interval = self.stats.max_interval.max(interval);
            if interval.saturating_mul(2) > self.nominal_interval.saturating_mul(3) {
                self.stats.timestamp_jumps += 1;
            }
        }

        self.last_timestamp = Some(timestamp);
        self.stats.frames_accepted += 1;
        Ok(())
    }

    pub fn last_timestamp(&self) -> Option<u64> {
        self.last_timestamp
    }

    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    /// Reset synchronizer state
    pub fn reset(&mut self) {
        self.last_timestamp = None;
        self.stats = SyncStats::default();
    }
}

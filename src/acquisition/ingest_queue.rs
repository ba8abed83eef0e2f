// src/acquisition/ingest_queue.rs
//! Fan-out of accepted frames to the raw and windowing paths
//!
//! The raw path is an unbounded channel: every frame reaches the audit sink.
//! The windowing path is bounded and never blocks the producer. When it is
//! full the queue sheds frames from the windowing path only, and hands the
//! resulting [`FilterGap`] to the consumer with the first frame admitted once
//! the queue has drained to the resume watermark.

use crate::acquisition::metrics::IngestMetrics;
use crate::error::{HolterError, HolterResult, SinkPath};
use crate::hal::{FilterGap, GapCause, SampleFrame};
use crossbeam::channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use std::sync::Arc;
use tracing::{info, warn};

/// A frame for the windowing path, with the gap that precedes it if any
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowInput {
    pub frame: SampleFrame,
    pub gap: Option<FilterGap>,
}

/// What happened to a frame on the windowing path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    /// Withheld while the windowing queue drains
    Shed,
    /// The windowing consumer is gone; only the raw path receives frames
    RawOnly,
}

/// Consumer ends of the two paths
pub struct IngestReceivers {
    pub raw: Receiver<SampleFrame>,
    pub windows: Receiver<WindowInput>,
}

pub struct IngestQueue {
    raw_tx: Sender<SampleFrame>,
    window_tx: Option<Sender<WindowInput>>,
    capacity: usize,
    resume_watermark: usize,
    open_gap: Option<FilterGap>,
    metrics: Arc<IngestMetrics>,
}

impl IngestQueue {
    pub fn new(capacity: usize, resume_watermark: usize, metrics: Arc<IngestMetrics>) -> (Self, IngestReceivers) {
        let (raw_tx, raw_rx) = unbounded();
        let (window_tx, window_rx) = bounded(capacity);

        let queue = Self {
            raw_tx,
            window_tx: Some(window_tx),
            capacity,
            resume_watermark: resume_watermark.min(capacity.saturating_sub(1)),
            open_gap: None,
            metrics,
        };

        (
            queue,
            IngestReceivers {
                raw: raw_rx,
                windows: window_rx,
            },
        )
    }

    /// Hand `frame` to both paths
    ///
    /// Fails only when the raw consumer has disconnected, which ends the session.
    pub fn publish(&mut self, frame: SampleFrame) -> HolterResult<Admission> {
        self.raw_tx
            .send(frame)
            .map_err(|e| HolterError::sink(SinkPath::Raw, "publish", e))?;

        Ok(self.offer_to_windowing(frame))
    }

    fn offer_to_windowing(&mut self, frame: SampleFrame) -> Admission {
        let Some(window_tx) = &self.window_tx else {
            return Admission::RawOnly;
        };

        if self.open_gap.is_some() && window_tx.len() > self.resume_watermark {
            self.extend_gap(frame.timestamp);
            return Admission::Shed;
        }

        let input = WindowInput {
            frame,
            gap: self.open_gap,
        };
        match window_tx.try_send(input) {
            Ok(()) => {
                if let Some(gap) = self.open_gap.take() {
                    info!(
                        gap_start = gap.start_timestamp,
                        gap_end = gap.end_timestamp,
                        frames = gap.frames,
                        "Windowing path resumed after backpressure"
                    );
                }
                Admission::Admitted
            }
            Err(TrySendError::Full(_)) => {
                if self.open_gap.is_none() {
                    self.metrics.record_gap_opened();
                    let err = HolterError::backpressure(self.capacity, "publish");
                    warn!(
                        timestamp = frame.timestamp,
                        error = %err,
                        "Shedding filter input"
                    );
                }
                self.extend_gap(frame.timestamp);
                Admission::Shed
            }
            Err(TrySendError::Disconnected(_)) => {
                warn!("Windowing consumer disconnected, continuing with raw capture only");
                self.window_tx = None;
                Admission::RawOnly
            }
        }
    }

    fn extend_gap(&mut self, timestamp: u64) {
        self.metrics.record_shed();
        let gap = self.open_gap.get_or_insert(FilterGap {
            start_timestamp: timestamp,
            end_timestamp: timestamp,
            frames: 0,
            cause: GapCause::Backpressure,
        });
        gap.end_timestamp = timestamp;
        gap.frames += 1;
    }

    pub fn is_shedding(&self) -> bool {
        self.open_gap.is_some()
    }

    pub fn is_raw_only(&self) -> bool {
        self.window_tx.is_none()
    }

    /// Frames waiting on the windowing path
    pub fn window_depth(&self) -> usize {
        self.window_tx.as_ref().map_or(0, Sender::len)
    }

    /// Drop both senders so the consumers drain and finish
    ///
    /// Returns the gap still open at shutdown; its frames never reach the filter.
    pub fn close(self) -> Option<FilterGap> {
        if let Some(gap) = self.open_gap {
            warn!(
                gap_start = gap.start_timestamp,
                gap_end = gap.end_timestamp,
                frames = gap.frames,
                "Session ended while shedding filter input"
            );
        }
        self.open_gap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(timestamp: u64) -> SampleFrame {
        SampleFrame::new(timestamp, [0.0; 3], [0.0, 0.0, 1.0])
    }

    #[test]
    fn test_both_paths_receive_frames_in_order() {
        let metrics = Arc::new(IngestMetrics::new());
        let (mut queue, rx) = IngestQueue::new(8, 4, metrics);

        for ts in 0..5 {
            assert_eq!(queue.publish(frame(ts)).unwrap(), Admission::Admitted);
        }

        let raw: Vec<u64> = rx.raw.try_iter().map(|f| f.timestamp).collect();
        let windows: Vec<u64> = rx.windows.try_iter().map(|w| w.frame.timestamp).collect();
        assert_eq!(raw, vec![0, 1, 2, 3, 4]);
        assert_eq!(windows, raw);
    }

    #[test]
    fn test_shedding_opens_and_closes_gap() {
        let metrics = Arc::new(IngestMetrics::new());
        let (mut queue, rx) = IngestQueue::new(4, 1, Arc::clone(&metrics));

        for ts in 0..4 {
            assert_eq!(queue.publish(frame(ts)).unwrap(), Admission::Admitted);
        }
        // Queue full: frames 4..7 are shed but still reach the raw path
        for ts in 4..7 {
            assert_eq!(queue.publish(frame(ts)).unwrap(), Admission::Shed);
        }
        assert!(queue.is_shedding());
        assert_eq!(queue.window_depth(), 4);

        // Draining to 2 is still above the watermark of 1
        rx.windows.recv().unwrap();
        rx.windows.recv().unwrap();
        assert_eq!(queue.publish(frame(7)).unwrap(), Admission::Shed);

        rx.windows.recv().unwrap();
        assert_eq!(queue.publish(frame(8)).unwrap(), Admission::Admitted);
        assert!(!queue.is_shedding());

        rx.windows.recv().unwrap(); // frame 3
        let resumed = rx.windows.recv().unwrap();
        assert_eq!(resumed.frame.timestamp, 8);
        assert_eq!(
            resumed.gap,
            Some(FilterGap {
                start_timestamp: 4,
                end_timestamp: 7,
                frames: 4,
                cause: GapCause::Backpressure,
            })
        );

        assert_eq!(rx.raw.try_iter().count(), 9);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.frames_shed, 4);
        assert_eq!(snapshot.gaps_opened, 1);
    }

    #[test]
    fn test_windowing_disconnect_switches_to_raw_only() {
        let metrics = Arc::new(IngestMetrics::new());
        let (mut queue, rx) = IngestQueue::new(4, 2, metrics);
        drop(rx.windows);

        assert_eq!(queue.publish(frame(1)).unwrap(), Admission::RawOnly);
        assert!(queue.is_raw_only());
        assert_eq!(queue.publish(frame(2)).unwrap(), Admission::RawOnly);
        assert_eq!(rx.raw.try_iter().count(), 2);
    }

    #[test]
    fn test_raw_disconnect_is_fatal() {
        let metrics = Arc::new(IngestMetrics::new());
        let (mut queue, rx) = IngestQueue::new(4, 2, metrics);
        drop(rx.raw);

        let err = queue.publish(frame(1)).unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, HolterError::Sink { path: SinkPath::Raw, .. }));
    }

    #[test]
    fn test_close_reports_open_gap() {
        let metrics = Arc::new(IngestMetrics::new());
        let (mut queue, _rx) = IngestQueue::new(2, 0, metrics);
        for ts in 0..5 {
            queue.publish(frame(ts)).unwrap();
        }

        let gap = queue.close().unwrap();
        assert_eq!((gap.start_timestamp, gap.end_timestamp, gap.frames), (2, 4, 3));
    }
}

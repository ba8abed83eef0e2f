// src/processing/windowing.rs
//! Sliding window segmentation of the frame stream

use crate::config::processing_config::WindowingConfig;
use crate::hal::{FilterGap, GapCause, Lead, SampleFrame};
use std::collections::VecDeque;

/// `window_size` consecutive frames, the unit of classification and filtering
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    /// Position in the current run of windows, starting at 0
    pub index: u64,
    pub frames: Vec<SampleFrame>,
}

impl Window {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn start_timestamp(&self) -> Option<u64> {
        self.frames.first().map(|f| f.timestamp)
    }

    pub fn end_timestamp(&self) -> Option<u64> {
        self.frames.last().map(|f| f.timestamp)
    }

    /// One lead as a contiguous signal
    pub fn lead(&self, lead: Lead) -> Vec<f64> {
        self.frames.iter().map(|f| f.lead(lead)).collect()
    }

    pub fn magnitudes(&self) -> Vec<f64> {
        self.frames.iter().map(|f| f.acc_magnitude).collect()
    }

    pub fn timestamps(&self) -> Vec<u64> {
        self.frames.iter().map(|f| f.timestamp).collect()
    }
}

/// Accumulates frames and emits overlapping windows every `hop` frames
pub struct SlidingWindowBuffer {
    window_size: usize,
    hop: usize,
    buffer: VecDeque<SampleFrame>,
    /// Frames pushed since the last emitted window (or reset)
    fresh: usize,
    next_index: u64,
}

impl SlidingWindowBuffer {
    /// Create window buffer from configuration
    pub fn new(config: &WindowingConfig) -> Self {
        Self {
            window_size: config.window_size,
            hop: config.hop().max(1),
            buffer: VecDeque::with_capacity(config.window_size),
            fresh: 0,
            next_index: 0,
        }
    }

    /// Add a frame; returns a window once `window_size` frames are buffered
    pub fn push(&mut self, frame: SampleFrame) -> Option<Window> {
        self.buffer.push_back(frame);
        self.fresh += 1;

        if self.buffer.len() < self.window_size {
            return None;
        }

        let window = Window {
            index: self.next_index,
            frames: self.buffer.iter().copied().collect(),
        };
        self.next_index += 1;
        self.fresh = 0;

        // Keep the last `overlap` frames for the next window
        self.buffer.drain(..self.hop);
        Some(window)
    }

    /// Discard buffered frames that no emitted window has covered yet
    ///
    /// Returns the discarded range as a gap, `None` when nothing was lost.
    pub fn flush(&mut self) -> Option<FilterGap> {
        let uncovered = self.fresh.min(self.buffer.len());
        let first = self.buffer.get(self.buffer.len() - uncovered);
        let gap = match (first, self.buffer.back()) {
            (Some(first), Some(last)) if uncovered > 0 => Some(FilterGap {
                start_timestamp: first.timestamp,
                end_timestamp: last.timestamp,
                frames: uncovered as u64,
                cause: GapCause::DiscardedPartialWindow,
            }),
            _ => None,
        };

        self.buffer.clear();
        self.fresh = 0;
        gap
    }

    /// Start a new run of windows after a discontinuity
    pub fn reset(&mut self) -> Option<FilterGap> {
        let gap = self.flush();
        self.next_index = 0;
        gap
    }

    /// Buffered frames
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn hop(&self) -> usize {
        self.hop
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(timestamp: u64) -> SampleFrame {
        SampleFrame::new(timestamp, [timestamp as f64; 3], [0.0, 0.0, 1.0])
    }

    fn config(window_size: usize, overlap: usize) -> WindowingConfig {
        WindowingConfig { window_size, overlap }
    }

    #[test]
    fn test_thousand_samples_give_three_windows() {
        let mut buffer = SlidingWindowBuffer::new(&WindowingConfig::default());
        let windows: Vec<Window> = (0..1000).filter_map(|ts| buffer.push(frame(ts))).collect();

        assert_eq!(windows.len(), 3);
        let starts: Vec<u64> = windows.iter().filter_map(Window::start_timestamp).collect();
        assert_eq!(starts, vec![0, 250, 500]);
        assert!(windows.iter().all(|w| w.len() == 500));

        // Consecutive windows share exactly 250 frames
        assert_eq!(windows[0].frames[250..], windows[1].frames[..250]);
        assert_eq!(windows[1].frames[250..], windows[2].frames[..250]);
        assert_eq!(windows.iter().map(|w| w.index).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_no_window_before_full() {
        let mut buffer = SlidingWindowBuffer::new(&WindowingConfig::default());
        for ts in 0..499 {
            assert!(buffer.push(frame(ts)).is_none());
        }
        assert!(buffer.push(frame(499)).is_some());
        assert_eq!(buffer.len(), 250);
    }

    #[test]
    fn test_flush_reports_uncovered_frames() {
        let mut buffer = SlidingWindowBuffer::new(&config(8, 4));
        for ts in 0..11 {
            buffer.push(frame(ts));
        }
        // Window [0, 8) was emitted, frames 8..=10 are not covered by any window
        let gap = buffer.flush().unwrap();
        assert_eq!((gap.start_timestamp, gap.end_timestamp, gap.frames), (8, 10, 3));
        assert_eq!(gap.cause, GapCause::DiscardedPartialWindow);
        assert!(buffer.is_empty());
        assert!(buffer.flush().is_none());
    }

    #[test]
    fn test_flush_right_after_window_loses_nothing() {
        let mut buffer = SlidingWindowBuffer::new(&config(8, 4));
        for ts in 0..8 {
            buffer.push(frame(ts));
        }
        assert!(buffer.flush().is_none());
    }

    #[test]
    fn test_reset_restarts_indices() {
        let mut buffer = SlidingWindowBuffer::new(&config(4, 2));
        for ts in 0..6 {
            buffer.push(frame(ts));
        }
        buffer.reset();

        let windows: Vec<Window> = (100..104).filter_map(|ts| buffer.push(frame(ts))).collect();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].index, 0);
        assert_eq!(windows[0].start_timestamp(), Some(100));
    }

    #[test]
    fn test_zero_overlap_windows_are_disjoint() {
        let mut buffer = SlidingWindowBuffer::new(&config(4, 0));
        let windows: Vec<Window> = (0..12).filter_map(|ts| buffer.push(frame(ts))).collect();
        let starts: Vec<u64> = windows.iter().filter_map(Window::start_timestamp).collect();
        assert_eq!(starts, vec![0, 4, 8]);
    }
}

// src/processing/stitcher.rs
//! Overlap-aware reassembly of filtered windows into one output stream
//!
//! Each window commits its centre `[m, m + hop)`, with `m = overlap / 2`, so
//! the samples near a window edge are always taken from the neighbouring
//! window where they sit further from the boundary. The first window of a run
//! also commits its leading `m` samples. The trailing part of the latest
//! window is held back until the next window replaces it or the run ends.

use crate::config::constants::signal::LEAD_COUNT;
use crate::config::processing_config::WindowingConfig;
use crate::error::{HolterError, HolterResult, ProcessingStage};
use crate::hal::FilteredFrame;
use crate::processing::windowing::Window;

pub struct WindowStitcher {
    hop: usize,
    margin: usize,
    /// Tail of the latest window, emitted on finish or reset
    held: Vec<FilteredFrame>,
    run_started: bool,
    last_timestamp: Option<u64>,
    emitted: u64,
}

impl WindowStitcher {
    pub fn new(config: &WindowingConfig) -> Self {
        Self {
            hop: config.hop().max(1),
            margin: config.overlap / 2,
            held: Vec::new(),
            run_started: false,
            last_timestamp: None,
            emitted: 0,
        }
    }

    /// Commit a filtered window, returning the frames that are now final
    pub fn commit(&mut self, window: &Window, leads: &[Vec<f64>; LEAD_COUNT]) -> HolterResult<Vec<FilteredFrame>> {
        let len = window.len();
        if leads.iter().any(|lead| lead.len() != len) {
            return Err(HolterError::processing(
                "stitcher",
                ProcessingStage::Stitching,
                format!("filtered leads do not match window length {len}"),
            ));
        }
        if len < self.margin + self.hop {
            return Err(HolterError::processing(
                "stitcher",
                ProcessingStage::Stitching,
                format!("window of {len} samples is shorter than margin {} plus hop {}", self.margin, self.hop),
            ));
        }

        let frame_at = |i: usize| FilteredFrame {
            timestamp: window.frames[i].timestamp,
            ecg: [leads[0][i], leads[1][i], leads[2][i]],
        };

        let commit_start = if self.run_started { self.margin } else { 0 };
        let commit_end = self.margin + self.hop;
        let committed: Vec<FilteredFrame> = (commit_start..commit_end).map(frame_at).collect();

        self.check_order(&committed)?;
        self.held = (commit_end..len).map(frame_at).collect();
        self.run_started = true;
        self.emitted += committed.len() as u64;
        Ok(committed)
    }

    /// End the run and release the held tail
    pub fn finish(&mut self) -> HolterResult<Vec<FilteredFrame>> {
        let tail = std::mem::take(&mut self.held);
        self.run_started = false;
        self.check_order(&tail)?;
        self.emitted += tail.len() as u64;
        Ok(tail)
    }

    /// Same as [`finish`](Self::finish); the next window starts a new run
    pub fn reset(&mut self) -> HolterResult<Vec<FilteredFrame>> {
        self.finish()
    }

    /// Frames held for the next window
    pub fn held(&self) -> usize {
        self.held.len()
    }

    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    pub fn last_timestamp(&self) -> Option<u64> {
        self.last_timestamp
    }

    fn check_order(&mut self, frames: &[FilteredFrame]) -> HolterResult<()> {
        for frame in frames {
            if let Some(last) = self.last_timestamp {
                if frame.timestamp <= last {
                    return Err(HolterError::processing(
                        "stitcher",
                        ProcessingStage::Stitching,
                        format!("timestamp {} does not follow {}", frame.timestamp, last),
                    ));
                }
            }
            self.last_timestamp = Some(frame.timestamp);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::SampleFrame;
    use crate::processing::windowing::SlidingWindowBuffer;

    fn frame(timestamp: u64) -> SampleFrame {
        SampleFrame::new(timestamp, [timestamp as f64, 0.0, -(timestamp as f64)], [0.0, 0.0, 1.0])
    }

    fn identity(window: &Window) -> [Vec<f64>; LEAD_COUNT] {
        [
            window.lead(crate::hal::Lead::I),
            window.lead(crate::hal::Lead::II),
            window.lead(crate::hal::Lead::III),
        ]
    }

    fn run(config: &WindowingConfig, samples: u64) -> Vec<Vec<FilteredFrame>> {
        let mut buffer = SlidingWindowBuffer::new(config);
        let mut stitcher = WindowStitcher::new(config);
        let mut batches = Vec::new();
        for ts in 0..samples {
            if let Some(window) = buffer.push(frame(ts)) {
                batches.push(stitcher.commit(&window, &identity(&window)).unwrap());
            }
        }
        batches.push(stitcher.finish().unwrap());
        batches
    }

    #[test]
    fn test_thousand_samples_commit_in_four_batches() {
        let batches = run(&WindowingConfig::default(), 1000);
        let ranges: Vec<(u64, u64)> = batches
            .iter()
            .map(|b| (b[0].timestamp, b[b.len() - 1].timestamp + 1))
            .collect();
        assert_eq!(ranges, vec![(0, 375), (375, 625), (625, 875), (875, 1000)]);
    }

    #[test]
    fn test_every_covered_sample_emitted_once_in_order() {
        let config = WindowingConfig {
            window_size: 64,
            overlap: 48,
        };
        let emitted: Vec<u64> = run(&config, 300).into_iter().flatten().map(|f| f.timestamp).collect();

        // Windows start every 16 frames; the last one ends at 64 + 14 * 16
        let expected: Vec<u64> = (0..288).collect();
        assert_eq!(emitted, expected);
    }

    #[test]
    fn test_values_follow_the_window_they_came_from() {
        let config = WindowingConfig {
            window_size: 8,
            overlap: 4,
        };
        let mut buffer = SlidingWindowBuffer::new(&config);
        let mut stitcher = WindowStitcher::new(&config);
        let mut emitted = Vec::new();
        for ts in 0..12 {
            if let Some(window) = buffer.push(frame(ts)) {
                let offset = window.index as f64 * 1000.0;
                let mut leads = identity(&window);
                leads[0].iter_mut().for_each(|v| *v += offset);
                emitted.extend(stitcher.commit(&window, &leads).unwrap());
            }
        }
        emitted.extend(stitcher.finish().unwrap());

        // Window 0 owns 0..6, window 1 owns 6..12
        assert_eq!(emitted[5].ecg[0], 5.0);
        assert_eq!(emitted[6].ecg[0], 1006.0);
        assert_eq!(emitted[11].ecg[0], 1011.0);
    }

    #[test]
    fn test_reset_starts_new_run_with_leading_margin() {
        let config = WindowingConfig {
            window_size: 8,
            overlap: 4,
        };
        let mut buffer = SlidingWindowBuffer::new(&config);
        let mut stitcher = WindowStitcher::new(&config);

        let window = (0..8).find_map(|ts| buffer.push(frame(ts))).unwrap();
        assert_eq!(stitcher.commit(&window, &identity(&window)).unwrap().len(), 6);
        assert_eq!(stitcher.reset().unwrap().len(), 2);
        buffer.reset();

        let window = (100..108).find_map(|ts| buffer.push(frame(ts))).unwrap();
        let committed = stitcher.commit(&window, &identity(&window)).unwrap();
        assert_eq!(committed[0].timestamp, 100);
        assert_eq!(committed.len(), 6);
    }

    #[test]
    fn test_non_increasing_timestamps_are_rejected() {
        let config = WindowingConfig {
            window_size: 4,
            overlap: 0,
        };
        let mut stitcher = WindowStitcher::new(&config);
        let window = Window {
            index: 0,
            frames: (10..14).map(frame).collect(),
        };
        stitcher.commit(&window, &identity(&window)).unwrap();

        let replay = Window {
            index: 1,
            frames: (12..16).map(frame).collect(),
        };
        let err = stitcher.commit(&replay, &identity(&replay)).unwrap_err();
        assert!(matches!(err, HolterError::Processing { stage: ProcessingStage::Stitching, .. }));
    }

    #[test]
    fn test_lead_length_mismatch_is_rejected() {
        let mut stitcher = WindowStitcher::new(&WindowingConfig::default());
        let window = Window {
            index: 0,
            frames: (0..500).map(frame).collect(),
        };
        let leads = [vec![0.0; 500], vec![0.0; 499], vec![0.0; 500]];
        assert!(stitcher.commit(&window, &leads).is_err());
    }
}

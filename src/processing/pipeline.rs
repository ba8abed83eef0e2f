// src/processing/pipeline.rs
use crate::acquisition::WindowInput;
use crate::config::processing_config::ProcessingConfig;
use crate::error::{HolterError, HolterResult, ProcessingStage};
use crate::hal::{FilterGap, FilteredFrame};
use crate::processing::adaptive_filter::{AdaptiveWaveletFilter, FilterMode, FilterOutcome, LeadResult};
use crate::processing::motion::MotionClassifier;
use crate::processing::stitcher::WindowStitcher;
use crate::processing::windowing::{SlidingWindowBuffer, Window};
use crate::utils::time::TimeProvider;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Windowing path: buffer, classify, filter and stitch
pub struct ProcessingPipeline {
    buffer: SlidingWindowBuffer,
    classifier: MotionClassifier,
    filter: AdaptiveWaveletFilter,
    stitcher: WindowStitcher,
    time_provider: Arc<dyn TimeProvider>,
    /// Time between window starts; processing longer than this falls behind
    window_budget_us: f64,
    performance_metrics: PerformanceMetrics,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PerformanceMetrics {
    pub windows_processed: u64,
    pub frames_emitted: u64,
    pub average_processing_time_us: f64,
    pub max_processing_time_us: f64,
    pub budget_violations: u64,
    pub bypassed_leads: u64,
    pub pass_through_leads: u64,
    pub resets: u64,
}

/// Per-window summary for logs and reports
#[derive(Debug, Clone)]
pub struct WindowReport {
    pub index: u64,
    pub start_timestamp: u64,
    pub end_timestamp: u64,
    pub motion_threshold: f64,
    pub high_fraction: f64,
    pub outcomes: Vec<FilterOutcome>,
    pub processing_time_us: f64,
}

/// Result of one pipeline step
#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    /// Finalised filtered frames, in timestamp order
    pub frames: Vec<FilteredFrame>,
    /// Ranges that will never appear in the filtered stream
    pub gaps: Vec<FilterGap>,
    pub window: Option<WindowReport>,
}

impl ProcessingPipeline {
    pub fn new(
        config: &ProcessingConfig,
        sample_rate_hz: u32,
        time_provider: Arc<dyn TimeProvider>,
    ) -> HolterResult<Self> {
        let windowing = &config.windowing;
        if windowing.window_size == 0 || windowing.overlap >= windowing.window_size {
            return Err(HolterError::configuration(
                "pipeline",
                format!(
                    "overlap {} must be smaller than window size {}",
                    windowing.overlap, windowing.window_size
                ),
            ));
        }
        if sample_rate_hz == 0 {
            return Err(HolterError::configuration("pipeline", "sample rate must be positive"));
        }

        Ok(Self {
            buffer: SlidingWindowBuffer::new(windowing),
            classifier: MotionClassifier::new(&config.motion)?,
            filter: AdaptiveWaveletFilter::new(&config.wavelet, &config.motion)?,
            stitcher: WindowStitcher::new(windowing),
            time_provider,
            window_budget_us: windowing.hop() as f64 * 1e6 / f64::from(sample_rate_hz),
            performance_metrics: PerformanceMetrics::default(),
        })
    }

    /// Feed one frame from the windowing path
    pub fn push(&mut self, input: WindowInput) -> HolterResult<PipelineOutput> {
        let mut output = PipelineOutput::default();

        if let Some(gap) = input.gap {
            self.handle_gap(gap, &mut output)?;
        }

        if let Some(window) = self.buffer.push(input.frame) {
            self.process_window(window, &mut output)?;
        }

        Ok(output)
    }

    /// End of stream: drop the incomplete trailing window and release the held tail
    pub fn finish(&mut self) -> HolterResult<PipelineOutput> {
        let mut output = PipelineOutput::default();

        if let Some(discarded) = self.buffer.flush() {
            info!(
                gap_start = discarded.start_timestamp,
                gap_end = discarded.end_timestamp,
                frames = discarded.frames,
                "Discarding incomplete trailing window"
            );
            output.gaps.push(discarded);
        }

        output.frames = self.stitcher.finish()?;
        self.performance_metrics.frames_emitted += output.frames.len() as u64;
        Ok(output)
    }

    /// Close the current run of windows before a discontinuity
    fn handle_gap(&mut self, gap: FilterGap, output: &mut PipelineOutput) -> HolterResult<()> {
        output.frames = self.stitcher.reset()?;
        self.performance_metrics.frames_emitted += output.frames.len() as u64;
        self.performance_metrics.resets += 1;

        if let Some(discarded) = self.buffer.reset() {
            debug!(
                frames = discarded.frames,
                "Discarding partial window before gap"
            );
            output.gaps.push(discarded);
        }

        warn!(
            gap_start = gap.start_timestamp,
            gap_end = gap.end_timestamp,
            frames = gap.frames,
            cause = ?gap.cause,
            "Filtered stream restarts after gap"
        );
        output.gaps.push(gap);
        Ok(())
    }

    fn process_window(&mut self, window: Window, output: &mut PipelineOutput) -> HolterResult<()> {
        let start_time = self.time_provider.now_nanos();

        let profile = self.classifier.classify(&window)?;
        let results = self.filter.filter_window(&window, &profile)?;
        let outcomes: Vec<FilterOutcome> = results.iter().map(|r| r.outcome).collect();

        let leads: [LeadResult; 3] = results.try_into().map_err(|results: Vec<LeadResult>| {
            HolterError::processing(
                "pipeline",
                ProcessingStage::Reconstruction,
                format!("expected 3 filtered leads, got {}", results.len()),
            )
        })?;
        let [lead_i, lead_ii, lead_iii] = leads;
        let committed = self
            .stitcher
            .commit(&window, &[lead_i.signal, lead_ii.signal, lead_iii.signal])?;

        let end_time = self.time_provider.now_nanos();
        let processing_time_us = end_time.saturating_sub(start_time) as f64 / 1000.0;
        self.update_performance_metrics(processing_time_us, committed.len(), &outcomes);

        let report = WindowReport {
            index: window.index,
            start_timestamp: window.start_timestamp().unwrap_or_default(),
            end_timestamp: window.end_timestamp().unwrap_or_default(),
            motion_threshold: profile.threshold,
            high_fraction: profile.high_fraction,
            outcomes,
            processing_time_us,
        };
        debug!(
            window = report.index,
            start = report.start_timestamp,
            threshold = report.motion_threshold,
            high_fraction = report.high_fraction,
            committed = committed.len(),
            elapsed_us = processing_time_us,
            "Window filtered"
        );

        output.frames.extend(committed);
        output.window = Some(report);
        Ok(())
    }

    /// Get current performance metrics
    pub fn get_performance_metrics(&self) -> &PerformanceMetrics {
        &self.performance_metrics
    }

    /// Reset performance metrics
    pub fn reset_metrics(&mut self) {
        self.performance_metrics = PerformanceMetrics::default();
    }

    pub fn filter(&self) -> &AdaptiveWaveletFilter {
        &self.filter
    }

    /// Frames waiting for the next window
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    fn update_performance_metrics(&mut self, processing_time_us: f64, committed: usize, outcomes: &[FilterOutcome]) {
        let metrics = &mut self.performance_metrics;
        metrics.windows_processed += 1;
        metrics.frames_emitted += committed as u64;

        let n = metrics.windows_processed as f64;
        metrics.average_processing_time_us = (metrics.average_processing_time_us * (n - 1.0) + processing_time_us) / n;
        if processing_time_us > metrics.max_processing_time_us {
            metrics.max_processing_time_us = processing_time_us;
        }
        if processing_time_us > self.window_budget_us {
            metrics.budget_violations += 1;
        }

        for outcome in outcomes {
            match outcome.mode {
                FilterMode::Bypass(_) => metrics.bypassed_leads += 1,
                FilterMode::PassThrough => metrics.pass_through_leads += 1,
                FilterMode::Denoised => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::processing_config::WindowingConfig;
    use crate::hal::{GapCause, SampleFrame};
    use crate::utils::time::MockTimeProvider;

    fn pipeline(config: &ProcessingConfig) -> ProcessingPipeline {
        ProcessingPipeline::new(config, 100, Arc::new(MockTimeProvider::new(0))).unwrap()
    }

    fn input(timestamp: u64) -> WindowInput {
        let t = timestamp as f64 / 100.0;
        let ecg = (2.0 * std::f64::consts::PI * 1.2 * t).sin() + 0.05 * ((timestamp * 31) % 17) as f64 / 17.0;
        WindowInput {
            frame: SampleFrame::new(timestamp, [ecg, ecg * 1.5, ecg * 0.5], [0.0, 0.0, 1.0]),
            gap: None,
        }
    }

    #[test]
    fn test_stream_is_filtered_end_to_end() {
        let mut pipeline = pipeline(&ProcessingConfig::default());
        let mut frames = Vec::new();
        let mut windows = 0;
        for ts in 0..1000 {
            let output = pipeline.push(input(ts)).unwrap();
            windows += usize::from(output.window.is_some());
            frames.extend(output.frames);
        }
        let tail = pipeline.finish().unwrap();
        assert!(tail.gaps.is_empty());
        frames.extend(tail.frames);

        assert_eq!(windows, 3);
        assert_eq!(frames.len(), 1000);
        assert!(frames.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert!(frames.iter().all(|f| f.ecg.iter().all(|v| v.is_finite())));

        let metrics = pipeline.get_performance_metrics();
        assert_eq!(metrics.windows_processed, 3);
        assert_eq!(metrics.frames_emitted, 1000);
    }

    #[test]
    fn test_finish_reports_discarded_partial_window() {
        let mut pipeline = pipeline(&ProcessingConfig::default());
        let mut emitted = 0;
        for ts in 0..900 {
            emitted += pipeline.push(input(ts)).unwrap().frames.len();
        }
        let output = pipeline.finish().unwrap();
        emitted += output.frames.len();

        // Windows cover 0..750; 750..900 never completed a window
        assert_eq!(emitted, 750);
        assert_eq!(output.gaps.len(), 1);
        let gap = output.gaps[0];
        assert_eq!((gap.start_timestamp, gap.end_timestamp, gap.frames), (750, 899, 150));
        assert_eq!(gap.cause, GapCause::DiscardedPartialWindow);
    }

    #[test]
    fn test_gap_resets_windowing() {
        let config = ProcessingConfig {
            windowing: WindowingConfig {
                window_size: 64,
                overlap: 32,
            },
            ..ProcessingConfig::default()
        };
        let mut pipeline = pipeline(&config);
        let mut frames = Vec::new();
        for ts in 0..70 {
            frames.extend(pipeline.push(input(ts)).unwrap().frames);
        }

        let mut resumed = input(200);
        resumed.gap = Some(FilterGap {
            start_timestamp: 70,
            end_timestamp: 199,
            frames: 130,
            cause: GapCause::Backpressure,
        });
        let output = pipeline.push(resumed).unwrap();
        frames.extend(output.frames);

        // Held tail of window 0 flushed, frames 64..70 never got a window
        assert_eq!(frames.len(), 64);
        assert_eq!(output.gaps.len(), 2);
        assert_eq!(output.gaps[0].cause, GapCause::DiscardedPartialWindow);
        assert_eq!(output.gaps[1].cause, GapCause::Backpressure);
        assert_eq!(pipeline.buffered(), 1);
        assert_eq!(pipeline.get_performance_metrics().resets, 1);

        for ts in 201..264 {
            frames.extend(pipeline.push(input(ts)).unwrap().frames);
        }
        frames.extend(pipeline.finish().unwrap().frames);
        assert_eq!(frames.len(), 128);
        assert!(frames.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    /// Clock that moves forward 3 s on every read
    struct SteppingClock(MockTimeProvider);

    impl TimeProvider for SteppingClock {
        fn now_nanos(&self) -> u64 {
            self.0.advance_by(3_000_000_000);
            self.0.now_nanos()
        }
    }

    #[test]
    fn test_slow_windows_count_as_budget_violations() {
        // Default hop is 250 samples at 100 Hz, a 2.5 s budget
        let clock = Arc::new(SteppingClock(MockTimeProvider::new(0)));
        let mut pipeline = ProcessingPipeline::new(&ProcessingConfig::default(), 100, clock).unwrap();
        for ts in 0..750 {
            pipeline.push(input(ts)).unwrap();
        }

        let metrics = pipeline.get_performance_metrics();
        assert_eq!(metrics.windows_processed, 2);
        assert_eq!(metrics.budget_violations, 2);
        assert_eq!(metrics.max_processing_time_us, 3_000_000.0);

        pipeline.reset_metrics();
        assert_eq!(pipeline.get_performance_metrics().windows_processed, 0);
    }

    #[test]
    fn test_invalid_geometry_rejected() {
        let config = ProcessingConfig {
            windowing: WindowingConfig {
                window_size: 100,
                overlap: 100,
            },
            ..ProcessingConfig::default()
        };
        assert!(ProcessingPipeline::new(&config, 100, Arc::new(MockTimeProvider::new(0))).is_err());
    }
}

// src/session.rs
//! Recording session: the ingest, raw persistence and filtering threads
//!
//! ```text
//! FrameSource -> holter-ingest -> IngestQueue -+-> holter-raw    -> RawSink
//!                                              +-> holter-filter -> FilteredSink
//! ```
//!
//! The raw path is the audit of record and its failure ends the session. The
//! filtered path degrades: sink failures are counted and processing failures
//! switch the session to raw-only capture.

use crate::acquisition::{
    AnomalyKind, IngestMetrics, IngestQueue, IngestSnapshot, SampleSynchronizer, SinkMetrics, SinkSnapshot,
    SyncStats, WindowInput,
};
use crate::config::constants::acquisition::{ANOMALY_LOG_LIMIT, MAX_CONSECUTIVE_SOURCE_ERRORS, STATUS_INTERVAL_S};
use crate::config::SystemConfig;
use crate::error::{HolterError, HolterResult, IntoHolterError};
use crate::hal::{
    parse_record, FilterGap, FrameSource, InboundLine, SampleFrame, SourceEvent, SourceInfo, StatusLevel,
};
use crate::output::{FilteredSink, RawSink};
use crate::processing::{PerformanceMetrics, PipelineOutput, ProcessingPipeline};
use crate::utils::time::{MonotonicTimeProvider, TimeProvider};
use crossbeam::channel::Receiver;
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt::Display;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Requests a graceful end of the session from any thread
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    stop: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}

/// Summary of a finished session
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    /// `holter-core` version that produced the session
    pub version: String,
    pub started_at: String,
    pub duration_s: f64,
    /// Why the filtered path stopped early, if it did
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_error: Option<String>,
    pub source: SourceInfo,
    pub ingest: IngestSnapshot,
    pub sync: SyncStats,
    pub sinks: SinkSnapshot,
    pub pipeline: PerformanceMetrics,
    /// Timestamp ranges missing from the filtered stream
    pub gaps: Vec<FilterGap>,
}

impl SessionReport {
    /// Frames missing from the filtered stream
    pub fn frames_in_gaps(&self) -> u64 {
        self.gaps.iter().map(|g| g.frames).sum()
    }

    pub fn to_toml(&self) -> HolterResult<String> {
        toml::to_string_pretty(self).holter_err("session_report", "serialize")
    }

    pub fn write(&self, path: impl AsRef<Path>) -> HolterResult<()> {
        std::fs::write(path, self.to_toml()?).holter_err("session_report", "write")
    }
}

/// What the ingest thread hands back when it ends
struct IngestOutcome {
    sync: SyncStats,
    open_gap: Option<FilterGap>,
}

/// What the filter thread hands back when it ends
struct FilterOutcome {
    pipeline: PerformanceMetrics,
    error: Option<HolterError>,
}

pub struct HolterSession {
    config: SystemConfig,
    stop: StopHandle,
    ingest_metrics: Arc<IngestMetrics>,
    sink_metrics: Arc<SinkMetrics>,
    time_provider: Arc<dyn TimeProvider>,
}

impl HolterSession {
    /// Validate `config` and prepare a session
    pub fn new(config: SystemConfig) -> HolterResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            stop: StopHandle::new(),
            ingest_metrics: Arc::new(IngestMetrics::new()),
            sink_metrics: Arc::new(SinkMetrics::new()),
            time_provider: Arc::new(MonotonicTimeProvider::new()),
        })
    }

    /// Clock used to time window processing
    pub fn with_time_provider(mut self, time_provider: Arc<dyn TimeProvider>) -> Self {
        self.time_provider = time_provider;
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    /// Live ingest counters
    pub fn ingest_metrics(&self) -> Arc<IngestMetrics> {
        Arc::clone(&self.ingest_metrics)
    }

    /// Live persistence counters
    pub fn sink_metrics(&self) -> Arc<SinkMetrics> {
        Arc::clone(&self.sink_metrics)
    }

    /// Run until the source closes or a stop is requested
    ///
    /// Blocks until all three threads have drained and joined.
    pub fn run<S, R, F>(&self, source: S, raw_sink: R, filtered_sink: F) -> HolterResult<SessionReport>
    where
        S: FrameSource + 'static,
        R: RawSink + 'static,
        F: FilteredSink + 'static,
    {
        let started_at = chrono::Local::now();
        let started = Instant::now();
        let source_info = source.info();

        let pipeline = ProcessingPipeline::new(
            &self.config.processing,
            self.config.system.sample_rate_hz,
            Arc::clone(&self.time_provider),
        )?;
        let acquisition = &self.config.acquisition;
        let (queue, receivers) = IngestQueue::new(
            acquisition.queue_capacity,
            acquisition.resume_watermark(),
            Arc::clone(&self.ingest_metrics),
        );
        let gaps = Arc::new(Mutex::new(Vec::new()));

        info!(
            source = %source_info.name,
            rate_hz = source_info.nominal_rate_hz,
            window = self.config.processing.windowing.window_size,
            wavelet = %self.config.processing.wavelet.family,
            "Starting session"
        );

        let raw_handle = {
            let metrics = Arc::clone(&self.sink_metrics);
            let stop = self.stop.clone();
            spawn("holter-raw", move || raw_loop(receivers.raw, raw_sink, metrics, stop))?
        };

        let filter_handle = {
            let metrics = Arc::clone(&self.sink_metrics);
            let gaps = Arc::clone(&gaps);
            spawn("holter-filter", move || {
                filter_loop(receivers.windows, pipeline, filtered_sink, metrics, gaps)
            })?
        };

        let ingest_handle = {
            let ingest = IngestLoop {
                queue,
                sync: SampleSynchronizer::new(self.config.system.sample_rate_hz),
                metrics: Arc::clone(&self.ingest_metrics),
                stop: self.stop.clone(),
                tolerance: acquisition.magnitude_tolerance,
                consecutive_source_errors: 0,
                status: StatusTicker::new(Duration::from_secs(STATUS_INTERVAL_S)),
            };
            spawn("holter-ingest", move || ingest.run(source))?
        };

        let ingest_result = join(ingest_handle);
        let raw_result = join(raw_handle);
        let filter_outcome = join(filter_handle)?;

        raw_result?;
        let ingest = ingest_result?;

        let mut gaps = std::mem::take(&mut *gaps.lock());
        gaps.extend(ingest.open_gap);
        gaps.sort_by_key(|g| g.start_timestamp);

        let report = SessionReport {
            version: crate::VERSION.to_string(),
            started_at: started_at.to_rfc3339(),
            duration_s: started.elapsed().as_secs_f64(),
            filter_error: filter_outcome.error.map(|e| e.to_string()),
            source: source_info,
            ingest: self.ingest_metrics.snapshot(),
            sync: ingest.sync,
            sinks: self.sink_metrics.snapshot(),
            pipeline: filter_outcome.pipeline,
            gaps,
        };

        info!(
            frames = report.ingest.frames_accepted,
            raw_written = report.sinks.raw_frames_written,
            filtered_written = report.sinks.filtered_frames_written,
            windows = report.sinks.windows_processed,
            anomalies = report.ingest.anomalies.total(),
            gaps = report.gaps.len(),
            "Session finished"
        );
        Ok(report)
    }
}

fn spawn<T, F>(name: &str, body: F) -> HolterResult<JoinHandle<T>>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(body)
        .holter_err("session", "spawn")
}

fn join<T>(handle: JoinHandle<HolterResult<T>>) -> HolterResult<T> {
    let name = handle.thread().name().unwrap_or("unnamed").to_string();
    handle.join().map_err(|_| HolterError::System {
        subsystem: "session".to_string(),
        reason: format!("thread {name} panicked"),
        context: crate::error_context!("session", "join"),
    })?
}

struct IngestLoop {
    queue: IngestQueue,
    sync: SampleSynchronizer,
    metrics: Arc<IngestMetrics>,
    stop: StopHandle,
    tolerance: f64,
    consecutive_source_errors: u32,
    status: StatusTicker,
}

/// Periodic ingest progress logging
struct StatusTicker {
    interval: Duration,
    started: Instant,
    last: Instant,
}

impl StatusTicker {
    fn new(interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            interval,
            started: now,
            last: now,
        }
    }

    /// Log progress if `interval` has passed since the last line; returns whether it logged
    fn tick(&mut self, now: Instant, frames: u64) -> bool {
        if now.duration_since(self.last) < self.interval {
            return false;
        }
        self.last = now;

        let elapsed_s = now.duration_since(self.started).as_secs_f64();
        let rate_hz = if elapsed_s > 0.0 { frames as f64 / elapsed_s } else { 0.0 };
        info!(frames, elapsed_s, rate_hz, "Ingest status");
        true
    }
}

impl IngestLoop {
    fn run<S: FrameSource>(mut self, mut source: S) -> HolterResult<IngestOutcome> {
        loop {
            if self.stop.is_stop_requested() {
                info!("Stop requested, closing ingest");
                break;
            }

            let event = match source.poll() {
                Ok(event) => {
                    self.consecutive_source_errors = 0;
                    event
                }
                Err(err) => {
                    self.source_error(err)?;
                    continue;
                }
            };

            match event {
                SourceEvent::Line(line) => self.handle_line(&line)?,
                SourceEvent::Frame(frame) => {
                    self.metrics.record_received();
                    if frame.is_finite() {
                        self.accept(frame)?;
                    } else {
                        self.anomaly(AnomalyKind::NonFinite, &"simulated frame contains non-finite values");
                    }
                }
                SourceEvent::Idle => {}
                SourceEvent::Closed => {
                    info!("Frame source closed");
                    break;
                }
            }

            self.status.tick(Instant::now(), self.sync.stats().frames_accepted);
        }

        Ok(IngestOutcome {
            sync: self.sync.stats().clone(),
            open_gap: self.queue.close(),
        })
    }

    /// A failed poll is recovered from unless the source keeps failing
    fn source_error<E>(&mut self, err: E) -> HolterResult<()>
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.consecutive_source_errors += 1;
        let total = self.metrics.record_source_error();
        if self.consecutive_source_errors >= MAX_CONSECUTIVE_SOURCE_ERRORS {
            error!(
                consecutive = self.consecutive_source_errors,
                error = %err,
                "Frame source keeps failing, ending session"
            );
            return Err(HolterError::transport("poll", err));
        }
        if total <= ANOMALY_LOG_LIMIT {
            warn!(error = %err, consecutive = self.consecutive_source_errors, "Frame source error, continuing");
        }
        Ok(())
    }

    fn handle_line(&mut self, line: &str) -> HolterResult<()> {
        self.metrics.record_received();
        match parse_record(line, self.tolerance) {
            Ok(InboundLine::Frame(frame)) => self.accept(frame),
            Ok(InboundLine::Status(status)) => {
                self.metrics.record_status_line();
                match status.level {
                    StatusLevel::System => info!(message = %status.message, "Device status"),
                    StatusLevel::Error => warn!(message = %status.message, "Device reported an error"),
                }
                Ok(())
            }
            Err(err) => {
                self.anomaly(AnomalyKind::from(&err), &err);
                Ok(())
            }
        }
    }

    fn accept(&mut self, frame: SampleFrame) -> HolterResult<()> {
        if let Err(kind) = self.sync.check(&frame) {
            self.anomaly(kind, &format_args!("timestamp {}", frame.timestamp));
            return Ok(());
        }
        self.metrics.record_accepted();
        self.queue.publish(frame)?;
        Ok(())
    }

    fn anomaly(&self, kind: AnomalyKind, detail: &dyn Display) {
        let count = self.metrics.record_anomaly(kind);
        if count <= ANOMALY_LOG_LIMIT {
            warn!(kind = %kind, count, detail = %detail, "Dropping inbound record");
            if count == ANOMALY_LOG_LIMIT {
                warn!(kind = %kind, "Further anomalies of this kind are only counted");
            }
        }
    }
}

fn raw_loop<R: RawSink>(
    frames: Receiver<SampleFrame>,
    mut sink: R,
    metrics: Arc<SinkMetrics>,
    stop: StopHandle,
) -> HolterResult<()> {
    let result = (|| {
        for frame in frames.iter() {
            sink.append(&frame)?;
            metrics.record_raw_written();
        }
        sink.flush()
    })();

    match &result {
        Ok(()) => info!(frames = metrics.snapshot().raw_frames_written, "Raw stream closed"),
        Err(e) => {
            error!(error = %e, "Raw persistence failed, stopping session");
            stop.request_stop();
        }
    }
    result
}

fn filter_loop<F: FilteredSink>(
    inputs: Receiver<WindowInput>,
    mut pipeline: ProcessingPipeline,
    mut sink: F,
    metrics: Arc<SinkMetrics>,
    gaps: Arc<Mutex<Vec<FilterGap>>>,
) -> HolterResult<FilterOutcome> {
    let mut deliver = |output: PipelineOutput| {
        gaps.lock().extend(output.gaps);
        if output.window.is_some() {
            metrics.record_window();
        }
        if output.frames.is_empty() {
            return;
        }
        match sink.append(&output.frames) {
            Ok(()) => metrics.record_filtered_written(output.frames.len() as u64),
            Err(e) => {
                let failures = metrics.record_filtered_error();
                warn!(error = %e, frames = output.frames.len(), failures, "Filtered sink write failed");
            }
        }
    };

    let mut error = None;
    for input in inputs.iter() {
        match pipeline.push(input) {
            Ok(output) => deliver(output),
            Err(e) => {
                // Dropping the receiver switches ingest to raw-only capture
                error!(error = %e, "Filtering failed, continuing with raw capture only");
                error = Some(e);
                break;
            }
        }
    }
    drop(inputs);

    if error.is_none() {
        match pipeline.finish() {
            Ok(output) => deliver(output),
            Err(e) => {
                error!(error = %e, "Failed to finish filtered stream");
                error = Some(e);
            }
        }
    }

    if let Err(e) = sink.flush() {
        let failures = metrics.record_filtered_error();
        warn!(error = %e, failures, "Filtered sink flush failed");
    }
    info!(
        frames = metrics.snapshot().filtered_frames_written,
        windows = metrics.snapshot().windows_processed,
        "Filtered stream closed"
    );

    Ok(FilterOutcome {
        pipeline: pipeline.get_performance_metrics().clone(),
        error,
    })
}

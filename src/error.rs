// src/error.rs
//! Unified error handling for the Holter core
//!
//! Every component reports failures through [`HolterError`]. Each variant
//! carries an [`ErrorContext`] naming the component and operation that failed,
//! so errors surfacing at the session boundary can still be traced back to the
//! stage that produced them.

use std::error::Error;
use std::fmt;
use std::time::SystemTime;
use thiserror::Error;

/// Unified error type for the entire Holter pipeline
#[derive(Debug, Error)]
pub enum HolterError {
    /// Configuration and setup errors
    #[error("[CONFIG] Configuration error in {component}: {reason} ({})", .context.operation)]
    Configuration {
        component: String,
        reason: String,
        context: ErrorContext,
    },

    /// Invalid input data errors
    #[error("[DATA] Invalid {data_type}: {reason} ({})", .context.operation)]
    InvalidData {
        data_type: String,
        reason: String,
        context: ErrorContext,
    },

    /// Signal processing errors
    #[error("[PROCESSING] {stage} stage error: {reason} ({})", .context.operation)]
    Processing {
        stage: ProcessingStage,
        reason: String,
        context: ErrorContext,
    },

    /// The windowing queue could not accept a frame
    #[error("[BACKPRESSURE] Windowing queue saturated at capacity {capacity} ({})", .context.operation)]
    Backpressure {
        capacity: usize,
        context: ErrorContext,
    },

    /// Persistence failures on the raw or filtered path
    #[error("[SINK] {path} sink failure: {reason} ({})", .context.operation)]
    Sink {
        path: SinkPath,
        reason: String,
        #[source]
        source: Option<Box<dyn Error + Send + Sync>>,
        context: ErrorContext,
    },

    /// Frame source (transport) failures
    #[error("[SOURCE] Frame source error: {reason} ({})", .context.operation)]
    Source {
        reason: String,
        #[source]
        source: Option<Box<dyn Error + Send + Sync>>,
        context: ErrorContext,
    },

    /// Thread or runtime level failures
    #[error("[SYSTEM] {subsystem} error: {reason} ({})", .context.operation)]
    System {
        subsystem: String,
        reason: String,
        context: ErrorContext,
    },
}

/// Processing stages for error tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    Ingestion,
    Windowing,
    MotionClassification,
    WaveletDecomposition,
    Thresholding,
    Reconstruction,
    Stitching,
}

impl fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProcessingStage::Ingestion => "ingestion",
            ProcessingStage::Windowing => "windowing",
            ProcessingStage::MotionClassification => "motion-classification",
            ProcessingStage::WaveletDecomposition => "wavelet-decomposition",
            ProcessingStage::Thresholding => "thresholding",
            ProcessingStage::Reconstruction => "reconstruction",
            ProcessingStage::Stitching => "stitching",
        };
        f.write_str(name)
    }
}

/// Which persistence path a sink error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkPath {
    /// Audit-of-record raw stream. Failures here are fatal to the session.
    Raw,
    /// Stitched filtered stream. Failures here degrade gracefully.
    Filtered,
}

impl fmt::Display for SinkPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkPath::Raw => f.write_str("RAW"),
            SinkPath::Filtered => f.write_str("FILTERED"),
        }
    }
}

/// Error context for debugging and analysis
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub timestamp: SystemTime,
    pub thread_name: Option<String>,
    pub component: String,
    pub operation: String,
    pub file: Option<&'static str>,
    pub line: Option<u32>,
}

impl ErrorContext {
    /// Create a new error context
    pub fn new(component: &str, operation: &str) -> Self {
        Self {
            timestamp: SystemTime::now(),
            thread_name: std::thread::current().name().map(str::to_string),
            component: component.to_string(),
            operation: operation.to_string(),
            file: None,
            line: None,
        }
    }

    /// Create error context with file and line information
    pub fn with_location(component: &str, operation: &str, file: &'static str, line: u32) -> Self {
        let mut context = Self::new(component, operation);
        context.file = Some(file);
        context.line = Some(line);
        context
    }
}

/// Macro for creating error context with file and line info
#[macro_export]
macro_rules! error_context {
    ($component:expr, $operation:expr) => {
        $crate::error::ErrorContext::with_location($component, $operation, file!(), line!())
    };
}

/// Result type alias for Holter operations
pub type HolterResult<T> = Result<T, HolterError>;

impl HolterError {
    /// Configuration error for `component`
    pub fn configuration(component: &str, reason: impl Into<String>) -> Self {
        HolterError::Configuration {
            component: component.to_string(),
            reason: reason.into(),
            context: ErrorContext::new(component, "validate"),
        }
    }

    /// Invalid data error raised by `component` during `operation`
    pub fn invalid_data(component: &str, operation: &str, data_type: &str, reason: impl Into<String>) -> Self {
        HolterError::InvalidData {
            data_type: data_type.to_string(),
            reason: reason.into(),
            context: ErrorContext::new(component, operation),
        }
    }

    /// Processing error at `stage`
    pub fn processing(component: &str, stage: ProcessingStage, reason: impl Into<String>) -> Self {
        HolterError::Processing {
            stage,
            reason: reason.into(),
            context: ErrorContext::new(component, &stage.to_string()),
        }
    }

    /// Sink error on `path` wrapping the underlying failure
    pub fn sink<E>(path: SinkPath, operation: &str, err: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        HolterError::Sink {
            path,
            reason: err.to_string(),
            source: Some(Box::new(err)),
            context: ErrorContext::new("sink", operation),
        }
    }

    /// Frame source failure wrapping the transport error
    pub fn transport<E>(operation: &str, err: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        HolterError::Source {
            reason: err.to_string(),
            source: Some(Box::new(err)),
            context: ErrorContext::new("frame_source", operation),
        }
    }

    /// Windowing queue saturation
    pub fn backpressure(capacity: usize, operation: &str) -> Self {
        HolterError::Backpressure {
            capacity,
            context: ErrorContext::new("ingest_queue", operation),
        }
    }

    /// Whether the error invalidates the raw audit-of-record guarantee
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            HolterError::Sink { path: SinkPath::Raw, .. }
                | HolterError::Configuration { .. }
                | HolterError::Source { .. }
                | HolterError::System { .. }
        )
    }

    /// The context attached to this error
    pub fn context(&self) -> &ErrorContext {
        match self {
            HolterError::Configuration { context, .. }
            | HolterError::InvalidData { context, .. }
            | HolterError::Processing { context, .. }
            | HolterError::Backpressure { context, .. }
            | HolterError::Sink { context, .. }
            | HolterError::Source { context, .. }
            | HolterError::System { context, .. } => context,
        }
    }
}

/// Convenience trait for error building
pub trait IntoHolterError<T> {
    /// Map any error into a [`HolterError::System`] for `component`
    fn holter_err(self, component: &str, operation: &str) -> HolterResult<T>;
}

impl<T, E> IntoHolterError<T> for Result<T, E>
where
    E: Error + Send + Sync + 'static,
{
    fn holter_err(self, component: &str, operation: &str) -> HolterResult<T> {
        self.map_err(|err| HolterError::System {
            subsystem: component.to_string(),
            reason: err.to_string(),
            context: ErrorContext::new(component, operation),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_context_creation() {
        let context = ErrorContext::new("test_component", "test_operation");
        assert_eq!(context.component, "test_component");
        assert_eq!(context.operation, "test_operation");
        assert!(context.timestamp <= SystemTime::now());
    }

    #[test]
    fn test_error_context_macro_records_location() {
        let context = error_context!("windowing", "push");
        assert_eq!(context.file, Some(file!()));
        assert!(context.line.is_some());
    }

    #[test]
    fn test_sink_error_display_and_source() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only volume");
        let err = HolterError::sink(SinkPath::Raw, "append", io);

        let display = err.to_string();
        assert!(display.contains("RAW"));
        assert!(display.contains("read-only volume"));
        assert!(err.source().is_some());
        assert!(err.is_fatal());
    }

    #[test]
    fn test_filtered_sink_error_is_not_fatal() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err = HolterError::sink(SinkPath::Filtered, "append", io);
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_processing_error_display() {
        let err = HolterError::processing("adaptive_filter", ProcessingStage::Thresholding, "label count mismatch");
        let display = format!("{}", err);
        assert!(display.contains("thresholding"));
        assert!(display.contains("label count mismatch"));
    }

    #[test]
    fn test_error_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HolterError>();
    }

    #[test]
    fn test_into_holter_error_trait() {
        let result: Result<i32, std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "test error",
        ));

        match result.holter_err("test_component", "test_operation").unwrap_err() {
            HolterError::System { subsystem, reason, .. } => {
                assert_eq!(subsystem, "test_component");
                assert!(reason.contains("test error"));
            }
            other => panic!("Expected system error, got {other:?}"),
        }
    }
}

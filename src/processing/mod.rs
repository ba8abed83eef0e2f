//! Motion-adaptive wavelet denoising of the windowed ECG stream

pub mod adaptive_filter;
pub mod motion;
pub mod pipeline;
pub mod stitcher;
pub mod wavelets;
pub mod windowing;

pub use adaptive_filter::{AdaptiveWaveletFilter, BypassReason, FilterMode, FilterOutcome, FilterState, LeadResult};
pub use motion::{MotionClassifier, MotionLabel, MotionProfile};
pub use pipeline::{PerformanceMetrics, PipelineOutput, ProcessingPipeline, WindowReport};
pub use stitcher::WindowStitcher;
pub use wavelets::{WaveletDecomposition, WaveletTransform};
pub use windowing::{SlidingWindowBuffer, Window};

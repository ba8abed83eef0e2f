// src/config/mod.rs
//! Configuration management: TOML-backed system configuration with startup validation

pub mod constants;
pub mod loader;
pub mod processing_config;

pub use constants::*;
pub use loader::{ConfigError, ConfigLoader};
pub use processing_config::*;

use crate::error::{HolterError, HolterResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete system configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct SystemConfig {
    #[serde(default)]
    pub system: SystemSettings,
    #[serde(default)]
    pub acquisition: AcquisitionConfig,
    #[serde(default)]
    pub processing: ProcessingConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Stream-level settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SystemSettings {
    #[serde(default = "defaults::sample_rate_hz")]
    pub sample_rate_hz: u32,
}

/// Ingestion settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AcquisitionConfig {
    /// Bound of the windowing queue, in frames
    #[serde(default = "defaults::queue_capacity")]
    pub queue_capacity: usize,
    /// Queue depth at or below which shedding ends; defaults to half the capacity
    #[serde(default)]
    pub resume_watermark: Option<usize>,
    /// Allowed deviation between a reported and the derived acceleration magnitude
    #[serde(default = "defaults::magnitude_tolerance")]
    pub magnitude_tolerance: f64,
    #[serde(default = "defaults::udp_bind_addr")]
    pub udp_bind_addr: String,
    #[serde(default = "defaults::recv_timeout_ms")]
    pub recv_timeout_ms: u64,
}

/// Session output settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct OutputConfig {
    #[serde(default = "defaults::output_dir")]
    pub directory: PathBuf,
    #[serde(default = "defaults::raw_file_name")]
    pub raw_file_name: String,
    #[serde(default = "defaults::filtered_file_name")]
    pub filtered_file_name: String,
}

/// Default value providers using constants
mod defaults {
    use crate::config::constants::*;
    use std::path::PathBuf;

    pub fn sample_rate_hz() -> u32 { signal::DEFAULT_SAMPLE_RATE_HZ }

    pub fn queue_capacity() -> usize { acquisition::DEFAULT_QUEUE_CAPACITY }
    pub fn magnitude_tolerance() -> f64 { signal::DEFAULT_MAGNITUDE_TOLERANCE }
    pub fn udp_bind_addr() -> String { acquisition::DEFAULT_UDP_BIND_ADDR.to_string() }
    pub fn recv_timeout_ms() -> u64 { acquisition::DEFAULT_RECV_TIMEOUT_MS }

    pub fn output_dir() -> PathBuf { PathBuf::from(output::DEFAULT_OUTPUT_DIR) }
    pub fn raw_file_name() -> String { output::RAW_FILE_NAME.to_string() }
    pub fn filtered_file_name() -> String { output::FILTERED_FILE_NAME.to_string() }
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            sample_rate_hz: defaults::sample_rate_hz(),
        }
    }
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            queue_capacity: defaults::queue_capacity(),
            resume_watermark: None,
            magnitude_tolerance: defaults::magnitude_tolerance(),
            udp_bind_addr: defaults::udp_bind_addr(),
            recv_timeout_ms: defaults::recv_timeout_ms(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: defaults::output_dir(),
            raw_file_name: defaults::raw_file_name(),
            filtered_file_name: defaults::filtered_file_name(),
        }
    }
}

impl AcquisitionConfig {
    /// Effective resume watermark
    pub fn resume_watermark(&self) -> usize {
        self.resume_watermark.unwrap_or(self.queue_capacity / 2)
    }
}

/// Configuration utility functions
impl SystemConfig {
    /// Validate every section and the constraints between them
    pub fn validate_consistency(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        let rate = self.system.sample_rate_hz;
        if !(signal::MIN_SAMPLE_RATE_HZ..=signal::MAX_SAMPLE_RATE_HZ).contains(&rate) {
            errors.push(format!(
                "Sample rate {} Hz must be within [{}, {}] Hz",
                rate,
                signal::MIN_SAMPLE_RATE_HZ,
                signal::MAX_SAMPLE_RATE_HZ
            ));
        }

        if let Err(e) = validate_processing_config(&self.processing) {
            errors.push(e);
        }

        let acq = &self.acquisition;
        if acq.queue_capacity < acquisition::MIN_QUEUE_CAPACITY {
            errors.push(format!(
                "Queue capacity {} must be at least {}",
                acq.queue_capacity,
                acquisition::MIN_QUEUE_CAPACITY
            ));
        }
        if acq.resume_watermark() >= acq.queue_capacity {
            errors.push(format!(
                "Resume watermark ({}) must be below the queue capacity ({})",
                acq.resume_watermark(),
                acq.queue_capacity
            ));
        }
        if !acq.magnitude_tolerance.is_finite() || acq.magnitude_tolerance < 0.0 {
            errors.push(format!(
                "Magnitude tolerance {} must be a non-negative number",
                acq.magnitude_tolerance
            ));
        }
        if acq.udp_bind_addr.parse::<std::net::SocketAddr>().is_err() {
            errors.push(format!("UDP bind address '{}' is not a socket address", acq.udp_bind_addr));
        }
        if acq.recv_timeout_ms == 0 {
            errors.push("Receive timeout must be greater than 0 ms".to_string());
        }

        if self.output.raw_file_name == self.output.filtered_file_name {
            errors.push(format!(
                "Raw and filtered outputs must use different files (both '{}')",
                self.output.raw_file_name
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate and convert failures into a single configuration error
    pub fn validate(&self) -> HolterResult<()> {
        self.validate_consistency()
            .map_err(|errors| HolterError::configuration("system_config", errors.join("; ")))
    }

    /// Get configuration summary
    pub fn get_summary(&self) -> ConfigSummary {
        let rate = self.system.sample_rate_hz.max(1) as f64;
        let win = &self.processing.windowing;
        ConfigSummary {
            sample_rate_hz: self.system.sample_rate_hz,
            wavelet: self.processing.wavelet.family,
            decomposition_level: self.processing.wavelet.level,
            window_size: win.window_size,
            hop: win.hop(),
            startup_latency_s: win.window_size as f64 / rate,
            queue_capacity: self.acquisition.queue_capacity,
            queue_headroom_s: self.acquisition.queue_capacity as f64 / rate,
        }
    }
}

/// Configuration summary for display/logging
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSummary {
    pub sample_rate_hz: u32,
    pub wavelet: WaveletFamily,
    pub decomposition_level: usize,
    pub window_size: usize,
    pub hop: usize,
    pub startup_latency_s: f64,
    pub queue_capacity: usize,
    pub queue_headroom_s: f64,
}

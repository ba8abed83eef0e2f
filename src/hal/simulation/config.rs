//! Simulation configuration structures
//! Location: src/hal/simulation/config.rs

use crate::config::constants::{signal, simulation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SimulationConfig {
    #[serde(default = "defaults::sample_rate_hz")]
    pub sample_rate_hz: u32,
    /// Stop after this many frames; `None` streams until stopped
    #[serde(default)]
    pub total_samples: Option<u64>,
    #[serde(default)]
    pub start_timestamp: u64,
    #[serde(default = "defaults::seed")]
    pub seed: u64,
    /// Pace frames at the sample rate instead of generating as fast as possible
    #[serde(default)]
    pub realtime: bool,
    /// Emit the firmware's `SYSTEM_READY` line before the first frame
    #[serde(default)]
    pub announce_ready: bool,
    #[serde(default)]
    pub ecg: EcgConfig,
    #[serde(default)]
    pub artifacts: ArtifactConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EcgConfig {
    #[serde(default = "defaults::heart_rate_bpm")]
    pub heart_rate_bpm: f64,
    #[serde(default = "defaults::r_wave_amplitude_mv")]
    pub r_wave_amplitude_mv: f64,
    #[serde(default = "defaults::baseline_noise_std")]
    pub baseline_noise_std: f64,
    #[serde(default = "defaults::baseline_wander_mv")]
    pub baseline_wander_mv: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ArtifactConfig {
    /// Scheduled bursts, in sample indices
    #[serde(default)]
    pub bursts: Vec<MotionBurst>,
    /// Expected random bursts per minute; 0 disables random bursts
    #[serde(default)]
    pub random_bursts_per_minute: f64,
    #[serde(default = "defaults::random_burst_len")]
    pub random_burst_len: u64,
}

/// A stretch of patient movement: accelerometer energy plus ECG contamination
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct MotionBurst {
    pub start_sample: u64,
    pub len: u64,
    #[serde(default = "defaults::burst_acc_amplitude")]
    pub acc_amplitude: f64,
    #[serde(default = "defaults::burst_ecg_noise_mv")]
    pub ecg_noise_mv: f64,
}

impl MotionBurst {
    pub fn new(start_sample: u64, len: u64) -> Self {
        Self {
            start_sample,
            len,
            acc_amplitude: defaults::burst_acc_amplitude(),
            ecg_noise_mv: defaults::burst_ecg_noise_mv(),
        }
    }

    pub fn contains(&self, sample: u64) -> bool {
        sample >= self.start_sample && sample - self.start_sample < self.len
    }
}

mod defaults {
    use super::{signal, simulation};

    pub fn sample_rate_hz() -> u32 { signal::DEFAULT_SAMPLE_RATE_HZ }
    pub fn seed() -> u64 { simulation::DEFAULT_SEED }

    pub fn heart_rate_bpm() -> f64 { simulation::DEFAULT_HEART_RATE_BPM }
    pub fn r_wave_amplitude_mv() -> f64 { simulation::DEFAULT_R_WAVE_AMPLITUDE_MV }
    pub fn baseline_noise_std() -> f64 { simulation::DEFAULT_BASELINE_NOISE_STD }
    pub fn baseline_wander_mv() -> f64 { simulation::DEFAULT_BASELINE_WANDER_MV }

    pub fn random_burst_len() -> u64 { 100 }
    pub fn burst_acc_amplitude() -> f64 { simulation::DEFAULT_BURST_ACC_AMPLITUDE }
    pub fn burst_ecg_noise_mv() -> f64 { simulation::DEFAULT_BURST_ECG_NOISE_MV }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: defaults::sample_rate_hz(),
            total_samples: None,
            start_timestamp: 0,
            seed: defaults::seed(),
            realtime: false,
            announce_ready: false,
            ecg: EcgConfig::default(),
            artifacts: ArtifactConfig::default(),
        }
    }
}

impl Default for EcgConfig {
    fn default() -> Self {
        Self {
            heart_rate_bpm: defaults::heart_rate_bpm(),
            r_wave_amplitude_mv: defaults::r_wave_amplitude_mv(),
            baseline_noise_std: defaults::baseline_noise_std(),
            baseline_wander_mv: defaults::baseline_wander_mv(),
        }
    }
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            bursts: Vec::new(),
            random_bursts_per_minute: 0.0,
            random_burst_len: defaults::random_burst_len(),
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate_hz == 0 {
            return Err("Simulator sample rate must be greater than 0".to_string());
        }
        if !(self.ecg.heart_rate_bpm > 0.0 && self.ecg.heart_rate_bpm <= 300.0) {
            return Err(format!("Heart rate {} bpm must be within (0, 300]", self.ecg.heart_rate_bpm));
        }
        if !(self.ecg.baseline_noise_std >= 0.0) || !(self.artifacts.random_bursts_per_minute >= 0.0) {
            return Err("Noise levels and burst rates must be non-negative".to_string());
        }
        if self.artifacts.bursts.iter().any(|b| b.len == 0) {
            return Err("Motion bursts must be at least one sample long".to_string());
        }
        Ok(())
    }
}

//! Synthetic ECG morphology
//! Location: src/hal/simulation/ecg_model.rs
//!
//! Each beat is a sum of Gaussian bumps for the P, Q, R, S and T waves placed
//! on the beat phase. Lead I and lead II are scaled projections of the same
//! cardiac vector; lead III is derived as II - I like the firmware does.

use super::config::EcgConfig;
use crate::config::constants::simulation::BASELINE_WANDER_HZ;

/// (phase centre, width, amplitude relative to the R wave)
const WAVES: [(f64, f64, f64); 5] = [
    (0.20, 0.025, 0.12),  // P
    (0.36, 0.010, -0.15), // Q
    (0.39, 0.012, 1.00),  // R
    (0.42, 0.010, -0.25), // S
    (0.65, 0.045, 0.30),  // T
];

const LEAD_I_GAIN: f64 = 0.6;
const LEAD_II_GAIN: f64 = 1.0;

pub struct EcgModel {
    config: EcgConfig,
    sample_rate_hz: f64,
}

impl EcgModel {
    pub fn new(config: &EcgConfig, sample_rate_hz: u32) -> Self {
        Self {
            config: config.clone(),
            sample_rate_hz: sample_rate_hz as f64,
        }
    }

    /// Noise-free leads I, II, III at sample `index`
    pub fn clean_leads(&self, index: u64) -> [f64; 3] {
        let t = index as f64 / self.sample_rate_hz;
        let beat_period = 60.0 / self.config.heart_rate_bpm;
        let phase = (t / beat_period).fract();

        let cardiac: f64 = WAVES
            .iter()
            .map(|&(centre, width, amplitude)| {
                let d = phase - centre;
                amplitude * (-(d * d) / (2.0 * width * width)).exp()
            })
            .sum::<f64>()
            * self.config.r_wave_amplitude_mv;

        let wander = self.config.baseline_wander_mv * (2.0 * std::f64::consts::PI * BASELINE_WANDER_HZ * t).sin();

        let lead_i = LEAD_I_GAIN * cardiac + wander;
        let lead_ii = LEAD_II_GAIN * cardiac + wander;
        [lead_i, lead_ii, lead_ii - lead_i]
    }
}

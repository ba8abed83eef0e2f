//! Motion artifact injection for Holter simulation
//! Location: src/hal/simulation/artifact_injection.rs
//!
//! Outside bursts the accelerometer reads gravity plus a little jitter. During
//! a burst it swings with several g of body movement and the ECG leads pick up
//! broadband electrode-motion noise of matching intensity.

use super::config::{ArtifactConfig, MotionBurst};
use super::gaussian;
use crate::config::constants::simulation::{REST_ACCELERATION, REST_ACCELERATION_JITTER};
use rand::rngs::StdRng;
use rand::Rng;

/// Movement cadence during a burst, roughly a brisk walk
const MOVEMENT_HZ: [f64; 3] = [1.8, 2.3, 3.1];

/// Injected contribution for one sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArtifactSample {
    pub acc: [f64; 3],
    pub ecg_noise: [f64; 3],
    pub in_burst: bool,
}

pub struct ArtifactInjector {
    config: ArtifactConfig,
    sample_rate_hz: f64,
    random_burst: Option<MotionBurst>,
}

impl ArtifactInjector {
    pub fn new(config: &ArtifactConfig, sample_rate_hz: u32) -> Self {
        Self {
            config: config.clone(),
            sample_rate_hz: sample_rate_hz as f64,
            random_burst: None,
        }
    }

    pub fn sample(&mut self, index: u64, rng: &mut StdRng) -> ArtifactSample {
        let burst = self.active_burst(index, rng);
        let t = index as f64 / self.sample_rate_hz;

        let mut acc = REST_ACCELERATION;
        for axis in acc.iter_mut() {
            *axis += REST_ACCELERATION_JITTER * gaussian(rng);
        }

        let mut ecg_noise = [0.0; 3];
        if let Some(burst) = burst {
            for (axis, (value, freq)) in acc.iter_mut().zip(MOVEMENT_HZ).enumerate() {
                let phase = 2.0 * std::f64::consts::PI * freq * t + axis as f64;
                *value += burst.acc_amplitude * (phase.sin() + 0.3 * gaussian(rng));
            }
            for noise in ecg_noise.iter_mut() {
                *noise = burst.ecg_noise_mv * gaussian(rng);
            }
        }

        ArtifactSample {
            acc,
            ecg_noise,
            in_burst: burst.is_some(),
        }
    }

    pub fn reset_state(&mut self) {
        self.random_burst = None;
    }

    fn active_burst(&mut self, index: u64, rng: &mut StdRng) -> Option<MotionBurst> {
        if let Some(burst) = self.config.bursts.iter().find(|b| b.contains(index)) {
            return Some(*burst);
        }

        if let Some(burst) = self.random_burst {
            if burst.contains(index) {
                return Some(burst);
            }
            self.random_burst = None;
        }

        let per_sample = self.config.random_bursts_per_minute / (60.0 * self.sample_rate_hz);
        if per_sample > 0.0 && rng.gen_bool(per_sample.min(1.0)) {
            let burst = MotionBurst::new(index, self.config.random_burst_len.max(1));
            self.random_burst = Some(burst);
            return Some(burst);
        }

        None
    }
}

//! Holter stream simulator
//!
//! Generates a deterministic (seeded) three-lead ECG with accelerometer data
//! and optional motion bursts. Used by the demo binary, integration tests and
//! benchmarks in place of the UDP transport.

use crate::hal::simulation::{ArtifactInjector, EcgModel, SimulationConfig};
use crate::hal::simulation::gaussian;
use crate::hal::traits::{FrameSource, SourceEvent, SourceInfo, TransportKind};
use crate::hal::types::SampleFrame;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimulatorError {
    #[error("Invalid simulator configuration: {0}")]
    Configuration(String),
}

/// A simulated frame with its ground truth
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatedSample {
    pub frame: SampleFrame,
    /// Leads before baseline noise and motion artifacts
    pub clean_ecg: [f64; 3],
    pub in_burst: bool,
}

pub struct HolterSimulator {
    config: SimulationConfig,
    rng: StdRng,
    ecg: EcgModel,
    artifacts: ArtifactInjector,
    sample_index: u64,
    sample_period: Duration,
    started_at: Option<Instant>,
    announced: bool,
}

impl HolterSimulator {
    pub fn new(config: SimulationConfig) -> Result<Self, SimulatorError> {
        config.validate().map_err(SimulatorError::Configuration)?;

        Ok(Self {
            rng: StdRng::seed_from_u64(config.seed),
            ecg: EcgModel::new(&config.ecg, config.sample_rate_hz),
            artifacts: ArtifactInjector::new(&config.artifacts, config.sample_rate_hz),
            sample_period: Duration::from_secs_f64(1.0 / config.sample_rate_hz as f64),
            sample_index: 0,
            started_at: None,
            announced: false,
            config,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Frames generated so far
    pub fn samples_generated(&self) -> u64 {
        self.sample_index
    }

    pub fn is_exhausted(&self) -> bool {
        self.config.total_samples.map_or(false, |total| self.sample_index >= total)
    }

    /// Generate the next sample, ignoring pacing and the sample limit
    pub fn next_sample(&mut self) -> SimulatedSample {
        let index = self.sample_index;
        self.sample_index += 1;

        let clean_ecg = self.ecg.clean_leads(index);
        let artifact = self.artifacts.sample(index, &mut self.rng);

        let mut ecg = clean_ecg;
        for (lead, noise) in ecg.iter_mut().zip(artifact.ecg_noise) {
            *lead += noise + self.config.ecg.baseline_noise_std * gaussian(&mut self.rng);
        }
        // Lead III stays derived after contamination, as on the device
        ecg[2] = ecg[1] - ecg[0];

        let period_ms = 1000.0 / self.config.sample_rate_hz as f64;
        let timestamp = self.config.start_timestamp + (index as f64 * period_ms).round() as u64;

        SimulatedSample {
            frame: SampleFrame::new(timestamp, ecg, artifact.acc),
            clean_ecg,
            in_burst: artifact.in_burst,
        }
    }

    /// Generate up to `count` samples, honouring `total_samples`
    pub fn take_samples(&mut self, count: usize) -> Vec<SimulatedSample> {
        let mut samples = Vec::with_capacity(count);
        while samples.len() < count && !self.is_exhausted() {
            samples.push(self.next_sample());
        }
        samples
    }

    /// Restart the stream from the first sample with the same seed
    pub fn reset(&mut self) {
        self.rng = StdRng::seed_from_u64(self.config.seed);
        self.artifacts.reset_state();
        self.sample_index = 0;
        self.started_at = None;
        self.announced = false;
    }

    fn pace(&mut self) {
        let started_at = *self.started_at.get_or_insert_with(Instant::now);
        let due = started_at + self.sample_period.mul_f64(self.sample_index as f64);
        let now = Instant::now();
        if due > now {
            std::thread::sleep(due - now);
        }
    }
}

impl FrameSource for HolterSimulator {
    type Error = SimulatorError;

    fn poll(&mut self) -> Result<SourceEvent, Self::Error> {
        if self.config.announce_ready && !self.announced {
            self.announced = true;
            return Ok(SourceEvent::Line("SYSTEM_READY".to_string()));
        }
        if self.is_exhausted() {
            return Ok(SourceEvent::Closed);
        }
        if self.config.realtime {
            self.pace();
        }
        Ok(SourceEvent::Frame(self.next_sample().frame))
    }

    fn info(&self) -> SourceInfo {
        SourceInfo {
            name: format!("simulator(seed={})", self.config.seed),
            transport: TransportKind::Simulator,
            nominal_rate_hz: self.config.sample_rate_hz,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::simulation::{ArtifactConfig, MotionBurst};

    fn bounded_config(total: u64) -> SimulationConfig {
        SimulationConfig {
            total_samples: Some(total),
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn test_simulator_is_deterministic() {
        let mut a = HolterSimulator::new(bounded_config(300)).unwrap();
        let mut b = HolterSimulator::new(bounded_config(300)).unwrap();
        assert_eq!(a.take_samples(300), b.take_samples(300));

        a.reset();
        let first = a.next_sample();
        b.reset();
        assert_eq!(first, b.next_sample());
    }

    #[test]
    fn test_timestamps_strictly_increase_in_ms() {
        let mut sim = HolterSimulator::new(bounded_config(50)).unwrap();
        let samples = sim.take_samples(100);

        assert_eq!(samples.len(), 50);
        assert_eq!(sim.samples_generated(), 50);
        assert_eq!(samples[1].frame.timestamp - samples[0].frame.timestamp, 10);
        assert!(samples.windows(2).all(|w| w[1].frame.timestamp > w[0].frame.timestamp));
    }

    #[test]
    fn test_poll_announces_then_closes() {
        let config = SimulationConfig {
            announce_ready: true,
            ..bounded_config(2)
        };
        let mut sim = HolterSimulator::new(config).unwrap();

        assert_eq!(sim.poll().unwrap(), SourceEvent::Line("SYSTEM_READY".to_string()));
        assert!(matches!(sim.poll().unwrap(), SourceEvent::Frame(_)));
        assert!(matches!(sim.poll().unwrap(), SourceEvent::Frame(_)));
        assert_eq!(sim.poll().unwrap(), SourceEvent::Closed);
    }

    #[test]
    fn test_frames_are_consistent() {
        let config = SimulationConfig {
            artifacts: ArtifactConfig {
                bursts: vec![MotionBurst::new(10, 10)],
                ..ArtifactConfig::default()
            },
            ..bounded_config(40)
        };
        let mut sim = HolterSimulator::new(config).unwrap();

        for sample in sim.take_samples(40) {
            let frame = sample.frame;
            assert!(frame.is_finite());
            assert!((frame.ecg[2] - (frame.ecg[1] - frame.ecg[0])).abs() < 1e-12);
            let derived = frame.acc.iter().map(|a| a * a).sum::<f64>().sqrt();
            assert!((derived - frame.acc_magnitude).abs() < 1e-12);
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SimulationConfig {
            sample_rate_hz: 0,
            ..SimulationConfig::default()
        };
        assert!(HolterSimulator::new(config).is_err());
    }
}

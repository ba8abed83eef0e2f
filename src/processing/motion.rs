// src/processing/motion.rs
//! Per-window motion classification from accelerometer magnitude

use crate::config::processing_config::MotionConfig;
use crate::error::{HolterError, HolterResult, ProcessingStage};
use crate::processing::windowing::Window;
use crate::utils::stats::percentile;

/// Motion intensity of one sample relative to its window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotionLabel {
    High,
    Low,
}

/// Classification of one window
#[derive(Debug, Clone, PartialEq)]
pub struct MotionProfile {
    /// Percentile of the window's acceleration magnitudes
    pub threshold: f64,
    /// One label per sample, in window order
    pub labels: Vec<MotionLabel>,
    /// Share of High labels
    pub high_fraction: f64,
}

impl MotionProfile {
    pub fn high_count(&self) -> usize {
        self.labels.iter().filter(|&&l| l == MotionLabel::High).count()
    }
}

/// Labels samples whose magnitude exceeds the window's percentile threshold
///
/// The threshold is recomputed for every window; nothing carries over.
#[derive(Debug, Clone)]
pub struct MotionClassifier {
    percentile: f64,
}

impl MotionClassifier {
    pub fn new(config: &MotionConfig) -> HolterResult<Self> {
        if !(config.percentile > 0.0 && config.percentile <= 100.0) {
            return Err(HolterError::configuration(
                "motion_classifier",
                format!("percentile {} outside (0, 100]", config.percentile),
            ));
        }
        Ok(Self {
            percentile: config.percentile,
        })
    }

    pub fn classify(&self, window: &Window) -> HolterResult<MotionProfile> {
        self.classify_magnitudes(&window.magnitudes())
    }

    pub fn classify_magnitudes(&self, magnitudes: &[f64]) -> HolterResult<MotionProfile> {
        let threshold = percentile(magnitudes, self.percentile).ok_or_else(|| {
            HolterError::processing(
                "motion_classifier",
                ProcessingStage::MotionClassification,
                "cannot classify an empty window",
            )
        })?;

        let labels: Vec<MotionLabel> = magnitudes
            .iter()
            .map(|&m| if m > threshold { MotionLabel::High } else { MotionLabel::Low })
            .collect();
        let high = labels.iter().filter(|&&l| l == MotionLabel::High).count();

        Ok(MotionProfile {
            threshold,
            high_fraction: high as f64 / labels.len() as f64,
            labels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier(percentile: f64) -> MotionClassifier {
        MotionClassifier::new(&MotionConfig {
            percentile,
            ..MotionConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_top_quarter_is_high() {
        let magnitudes: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let profile = classifier(75.0).classify_magnitudes(&magnitudes).unwrap();

        // rank 0.75 * 99 = 74.25
        assert!((profile.threshold - 74.25).abs() < 1e-12);
        assert_eq!(profile.high_count(), 25);
        assert_eq!(profile.labels[74], MotionLabel::Low);
        assert_eq!(profile.labels[75], MotionLabel::High);
        assert!((profile.high_fraction - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_zero_variance_window_is_all_low() {
        let profile = classifier(75.0).classify_magnitudes(&[0.98; 500]).unwrap();
        assert_eq!(profile.threshold, 0.98);
        assert!(profile.labels.iter().all(|&l| l == MotionLabel::Low));
        assert_eq!(profile.high_fraction, 0.0);
    }

    #[test]
    fn test_hundredth_percentile_labels_nothing_high() {
        let magnitudes: Vec<f64> = (0..50).map(|i| (i % 7) as f64).collect();
        let profile = classifier(100.0).classify_magnitudes(&magnitudes).unwrap();
        assert_eq!(profile.high_count(), 0);
    }

    #[test]
    fn test_empty_window_is_an_error() {
        assert!(classifier(75.0).classify_magnitudes(&[]).is_err());
    }

    #[test]
    fn test_invalid_percentile_rejected() {
        let config = MotionConfig {
            percentile: 0.0,
            ..MotionConfig::default()
        };
        assert!(MotionClassifier::new(&config).is_err());
    }
}

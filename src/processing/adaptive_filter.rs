// src/processing/adaptive_filter.rs
//! Motion-adaptive wavelet shrinkage
//!
//! Per lead and window: decompose, estimate the noise floor from the finest
//! detail level, scale the universal threshold by the motion label of each
//! coefficient, soft-threshold the details and reconstruct.

use crate::config::constants::wavelet::MAD_NORMALIZATION;
use crate::config::processing_config::{MotionConfig, MotionScope, WaveletConfig};
use crate::error::{HolterError, HolterResult, ProcessingStage};
use crate::hal::Lead;
use crate::processing::motion::{MotionLabel, MotionProfile};
use crate::processing::wavelets::{coefficient_support, WaveletDecomposition, WaveletTransform};
use crate::processing::windowing::Window;
use crate::utils::stats::median_absolute;
use rayon::prelude::*;
use tracing::debug;

/// Transient per-lead state: coefficients, noise estimate and thresholds
#[derive(Debug, Clone)]
pub struct FilterState {
    pub decomposition: WaveletDecomposition,
    /// MAD-based noise standard deviation
    pub noise_sigma: f64,
    /// `noise_sigma * sqrt(2 ln N)`
    pub base_threshold: f64,
    /// Threshold per detail coefficient, finest level first
    pub thresholds: Vec<Vec<f64>>,
    /// Label assigned to each detail coefficient, finest level first
    pub coefficient_labels: Vec<Vec<MotionLabel>>,
}

/// How a lead was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    Denoised,
    /// Zero noise estimate: every threshold is 0 and reconstruction returns the input
    PassThrough,
    /// Input returned unchanged without decomposition
    Bypass(BypassReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BypassReason {
    NonFiniteInput,
    /// Not even one decomposition level fits the window
    WindowTooShort,
}

/// Summary of one lead's filtering, for logs and reports
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterOutcome {
    pub mode: FilterMode,
    pub levels: usize,
    pub noise_sigma: f64,
    pub base_threshold: f64,
    pub high_coefficients: usize,
    pub total_coefficients: usize,
}

/// Filtered signal of one lead with its outcome
#[derive(Debug, Clone)]
pub struct LeadResult {
    pub lead: Lead,
    pub signal: Vec<f64>,
    pub outcome: FilterOutcome,
}

/// Wavelet denoiser whose thresholds follow the motion profile
#[derive(Debug, Clone)]
pub struct AdaptiveWaveletFilter {
    transform: WaveletTransform,
    level: usize,
    level_gain: f64,
    high_multiplier: f64,
    low_multiplier: f64,
    scope: MotionScope,
    window_fraction: f64,
}

impl FilterState {
    /// Apply soft thresholding to every detail level; the approximation is untouched
    pub fn shrink(&mut self) {
        for (details, thresholds) in self.decomposition.details.iter_mut().zip(&self.thresholds) {
            for (coefficient, &threshold) in details.iter_mut().zip(thresholds) {
                *coefficient = soft_threshold(*coefficient, threshold);
            }
        }
    }
}

/// `sign(x) * max(|x| - t, 0)`
pub fn soft_threshold(value: f64, threshold: f64) -> f64 {
    let shrunk = value.abs() - threshold;
    if shrunk > 0.0 {
        shrunk.copysign(value)
    } else {
        0.0
    }
}

impl AdaptiveWaveletFilter {
    pub fn new(wavelet: &WaveletConfig, motion: &MotionConfig) -> HolterResult<Self> {
        if wavelet.level == 0 {
            return Err(HolterError::configuration(
                "adaptive_filter",
                "decomposition level must be at least 1",
            ));
        }
        if !(motion.high_multiplier >= 0.0 && motion.low_multiplier >= 0.0) {
            return Err(HolterError::configuration(
                "adaptive_filter",
                "motion multipliers must be non-negative",
            ));
        }

        Ok(Self {
            transform: WaveletTransform::new(wavelet.family),
            level: wavelet.level,
            level_gain: wavelet.level_gain,
            high_multiplier: motion.high_multiplier,
            low_multiplier: motion.low_multiplier,
            scope: motion.scope,
            window_fraction: motion.window_fraction,
        })
    }

    pub fn transform(&self) -> &WaveletTransform {
        &self.transform
    }

    /// Decomposition depth used for `signal_len` samples: the configured level, reduced to what fits
    pub fn effective_levels(&self, signal_len: usize) -> usize {
        self.level.min(self.transform.max_level(signal_len))
    }

    /// Filter the three leads of `window` in parallel
    pub fn filter_window(&self, window: &Window, profile: &MotionProfile) -> HolterResult<Vec<LeadResult>> {
        Lead::ALL
            .par_iter()
            .map(|&lead| {
                let signal = window.lead(lead);
                self.filter_lead(lead, &signal, &profile.labels, profile.high_fraction)
            })
            .collect()
    }

    /// Filter one lead
    ///
    /// `labels` holds one motion label per sample; `high_fraction` is only
    /// used with [`MotionScope::Window`].
    pub fn filter_lead(
        &self,
        lead: Lead,
        signal: &[f64],
        labels: &[MotionLabel],
        high_fraction: f64,
    ) -> HolterResult<LeadResult> {
        if let Some(reason) = self.bypass_reason(signal) {
            debug!(lead = %lead, reason = ?reason, "Bypassing wavelet filter");
            return Ok(LeadResult {
                lead,
                signal: signal.to_vec(),
                outcome: FilterOutcome {
                    mode: FilterMode::Bypass(reason),
                    levels: 0,
                    noise_sigma: 0.0,
                    base_threshold: 0.0,
                    high_coefficients: 0,
                    total_coefficients: 0,
                },
            });
        }

        let mut state = self.filter_state(signal, labels, high_fraction)?;
        let mode = if state.base_threshold > 0.0 {
            FilterMode::Denoised
        } else {
            debug!(lead = %lead, "Zero noise estimate, passing lead through");
            FilterMode::PassThrough
        };

        let outcome = FilterOutcome {
            mode,
            levels: state.decomposition.levels(),
            noise_sigma: state.noise_sigma,
            base_threshold: state.base_threshold,
            high_coefficients: state
                .coefficient_labels
                .iter()
                .flatten()
                .filter(|&&l| l == MotionLabel::High)
                .count(),
            total_coefficients: state.coefficient_labels.iter().map(Vec::len).sum(),
        };

        state.shrink();
        let filtered = self.transform.reconstruct(&state.decomposition)?;
        if filtered.len() != signal.len() {
            return Err(HolterError::processing(
                "adaptive_filter",
                ProcessingStage::Reconstruction,
                format!("reconstructed {} samples from {}", filtered.len(), signal.len()),
            ));
        }

        Ok(LeadResult {
            lead,
            signal: filtered,
            outcome,
        })
    }

    /// Why `signal` cannot be decomposed, if it cannot
    pub fn bypass_reason(&self, signal: &[f64]) -> Option<BypassReason> {
        if signal.iter().any(|v| !v.is_finite()) {
            Some(BypassReason::NonFiniteInput)
        } else if self.effective_levels(signal.len()) == 0 {
            Some(BypassReason::WindowTooShort)
        } else {
            None
        }
    }

    /// Decompose `signal` and derive a threshold for every detail coefficient
    pub fn filter_state(&self, signal: &[f64], labels: &[MotionLabel], high_fraction: f64) -> HolterResult<FilterState> {
        if labels.len() != signal.len() {
            return Err(HolterError::processing(
                "adaptive_filter",
                ProcessingStage::Thresholding,
                format!("{} motion labels for {} samples", labels.len(), signal.len()),
            ));
        }

        let levels = self.effective_levels(signal.len());
        if levels < self.level {
            debug!(
                configured = self.level,
                used = levels,
                samples = signal.len(),
                "Reducing decomposition depth to fit window"
            );
        }
        let decomposition = self.transform.decompose(signal, levels)?;

        let noise_sigma = median_absolute(decomposition.finest_details()).unwrap_or(0.0) / MAD_NORMALIZATION;
        let base_threshold = noise_sigma * (2.0 * (signal.len() as f64).ln()).sqrt();

        let window_label = if high_fraction > self.window_fraction {
            MotionLabel::High
        } else {
            MotionLabel::Low
        };
        let prefix_high = prefix_high_counts(labels);

        let mut thresholds = Vec::with_capacity(levels);
        let mut coefficient_labels = Vec::with_capacity(levels);
        for (i, details) in decomposition.details.iter().enumerate() {
            let level = i + 1;
            let level_scale = self.level_gain.powi(level as i32);

            let level_labels: Vec<MotionLabel> = match self.scope {
                MotionScope::Window => vec![window_label; details.len()],
                MotionScope::Coefficient => (0..details.len())
                    .map(|index| self.coefficient_label(&prefix_high, level, index))
                    .collect(),
            };

            thresholds.push(
                level_labels
                    .iter()
                    .map(|&label| base_threshold * self.multiplier(label) * level_scale)
                    .collect(),
            );
            coefficient_labels.push(level_labels);
        }

        Ok(FilterState {
            decomposition,
            noise_sigma,
            base_threshold,
            thresholds,
            coefficient_labels,
        })
    }

    fn multiplier(&self, label: MotionLabel) -> f64 {
        match label {
            MotionLabel::High => self.high_multiplier,
            MotionLabel::Low => self.low_multiplier,
        }
    }

    /// High when High samples make up at least half of the coefficient's support
    fn coefficient_label(&self, prefix_high: &[usize], level: usize, index: usize) -> MotionLabel {
        let signal_len = prefix_high.len() - 1;
        let support = coefficient_support(level, index, self.transform.filter_length(), signal_len);
        let (start, end) = (*support.start(), *support.end());

        let high = prefix_high[end + 1] - prefix_high[start];
        let total = end + 1 - start;
        if high * 2 >= total && high > 0 {
            MotionLabel::High
        } else {
            MotionLabel::Low
        }
    }
}

/// `out[i]` = number of High labels in `labels[..i]`
fn prefix_high_counts(labels: &[MotionLabel]) -> Vec<usize> {
    let mut prefix = Vec::with_capacity(labels.len() + 1);
    prefix.push(0);
    for label in labels {
        let last = prefix[prefix.len() - 1];
        prefix.push(last + usize::from(*label == MotionLabel::High));
    }
    prefix
}

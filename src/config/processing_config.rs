// src/config/processing_config.rs
//! Signal processing configuration structures

use crate::config::constants::{motion, wavelet, windowing};
use crate::processing::wavelets::max_decomposition_level;
use serde::{Deserialize, Serialize};

/// Complete processing pipeline configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct ProcessingConfig {
    #[serde(default)]
    pub windowing: WindowingConfig,
    #[serde(default)]
    pub wavelet: WaveletConfig,
    #[serde(default)]
    pub motion: MotionConfig,
}

/// Sliding window geometry
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct WindowingConfig {
    #[serde(default = "defaults::window_size")]
    pub window_size: usize,
    #[serde(default = "defaults::overlap")]
    pub overlap: usize,
}

/// Wavelet decomposition and thresholding
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct WaveletConfig {
    #[serde(default = "defaults::family")]
    pub family: WaveletFamily,
    #[serde(default = "defaults::level")]
    pub level: usize,
    /// Threshold multiplier growth per detail level, finest level = 1
    #[serde(default = "defaults::level_gain")]
    pub level_gain: f64,
}

/// Motion classification and threshold scaling
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MotionConfig {
    #[serde(default = "defaults::percentile")]
    pub percentile: f64,
    #[serde(default = "defaults::high_multiplier")]
    pub high_multiplier: f64,
    #[serde(default = "defaults::low_multiplier")]
    pub low_multiplier: f64,
    #[serde(default = "defaults::scope")]
    pub scope: MotionScope,
    /// Only used with [`MotionScope::Window`]
    #[serde(default = "defaults::window_fraction")]
    pub window_fraction: f64,
}

/// Supported wavelet families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaveletFamily {
    Haar,
    Db2,
    Db3,
    Db4,
    Db6,
    Sym4,
}

/// How per-sample motion labels are applied to wavelet coefficients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotionScope {
    /// Each detail coefficient takes the dominant label of the samples it covers
    Coefficient,
    /// The whole window is high motion once enough of its samples are
    Window,
}

impl WindowingConfig {
    /// Number of new samples between consecutive window starts
    pub fn hop(&self) -> usize {
        self.window_size.saturating_sub(self.overlap)
    }
}

impl std::fmt::Display for WaveletFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WaveletFamily::Haar => "haar",
            WaveletFamily::Db2 => "db2",
            WaveletFamily::Db3 => "db3",
            WaveletFamily::Db4 => "db4",
            WaveletFamily::Db6 => "db6",
            WaveletFamily::Sym4 => "sym4",
        };
        f.write_str(name)
    }
}

mod defaults {
    use super::{MotionScope, WaveletFamily};
    use crate::config::constants::{motion, wavelet, windowing};

    pub fn window_size() -> usize { windowing::DEFAULT_WINDOW_SIZE }
    pub fn overlap() -> usize { windowing::DEFAULT_OVERLAP }

    pub fn family() -> WaveletFamily { WaveletFamily::Db4 }
    pub fn level() -> usize { wavelet::DEFAULT_DECOMPOSITION_LEVEL }
    pub fn level_gain() -> f64 { wavelet::DEFAULT_LEVEL_GAIN }

    pub fn percentile() -> f64 { motion::DEFAULT_PERCENTILE }
    pub fn high_multiplier() -> f64 { motion::DEFAULT_HIGH_MOTION_MULTIPLIER }
    pub fn low_multiplier() -> f64 { motion::DEFAULT_LOW_MOTION_MULTIPLIER }
    pub fn scope() -> MotionScope { MotionScope::Coefficient }
    pub fn window_fraction() -> f64 { motion::DEFAULT_WINDOW_FRACTION }
}

impl Default for WindowingConfig {
    fn default() -> Self {
        Self {
            window_size: defaults::window_size(),
            overlap: defaults::overlap(),
        }
    }
}

impl Default for WaveletConfig {
    fn default() -> Self {
        Self {
            family: defaults::family(),
            level: defaults::level(),
            level_gain: defaults::level_gain(),
        }
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            percentile: defaults::percentile(),
            high_multiplier: defaults::high_multiplier(),
            low_multiplier: defaults::low_multiplier(),
            scope: defaults::scope(),
            window_fraction: defaults::window_fraction(),
        }
    }
}

/// Validate processing configuration
pub fn validate_processing_config(config: &ProcessingConfig) -> Result<(), String> {
    let win = &config.windowing;
    if win.window_size < windowing::MIN_WINDOW_SIZE || win.window_size > windowing::MAX_WINDOW_SIZE {
        return Err(format!(
            "Window size {} must be within [{}, {}] samples",
            win.window_size,
            windowing::MIN_WINDOW_SIZE,
            windowing::MAX_WINDOW_SIZE
        ));
    }
    if win.overlap >= win.window_size {
        return Err(format!(
            "Overlap ({}) must be smaller than the window size ({})",
            win.overlap, win.window_size
        ));
    }

    let wav = &config.wavelet;
    if wav.level == 0 || wav.level > wavelet::MAX_DECOMPOSITION_LEVEL {
        return Err(format!(
            "Decomposition level {} must be within [1, {}]",
            wav.level,
            wavelet::MAX_DECOMPOSITION_LEVEL
        ));
    }
    let supported = max_decomposition_level(win.window_size, wav.family.filter_length());
    if wav.level > supported {
        return Err(format!(
            "Decomposition level {} needs longer windows: {} samples support at most {} levels of {}",
            wav.level, win.window_size, supported, wav.family
        ));
    }
    if !wav.level_gain.is_finite() || wav.level_gain <= 0.0 || wav.level_gain > wavelet::MAX_LEVEL_GAIN {
        return Err(format!(
            "Level gain {} must be within (0, {}]",
            wav.level_gain,
            wavelet::MAX_LEVEL_GAIN
        ));
    }

    let mot = &config.motion;
    if !(mot.percentile > 0.0 && mot.percentile <= 100.0) {
        return Err(format!("Motion percentile {} must be within (0, 100]", mot.percentile));
    }
    for (name, value) in [("high", mot.high_multiplier), ("low", mot.low_multiplier)] {
        if !value.is_finite() || value < 0.0 || value > motion::MAX_MOTION_MULTIPLIER {
            return Err(format!(
                "{} motion multiplier {} must be within [0, {}]",
                name,
                value,
                motion::MAX_MOTION_MULTIPLIER
            ));
        }
    }
    if mot.high_multiplier < mot.low_multiplier {
        return Err(format!(
            "High motion multiplier ({}) must not be below the low motion multiplier ({})",
            mot.high_multiplier, mot.low_multiplier
        ));
    }
    if !(0.0..1.0).contains(&mot.window_fraction) {
        return Err(format!("Window fraction {} must be within [0, 1)", mot.window_fraction));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ProcessingConfig::default();
        assert!(validate_processing_config(&config).is_ok());
        assert_eq!(config.windowing.hop(), 250);
    }

    #[test]
    fn test_overlap_must_be_below_window_size() {
        let mut config = ProcessingConfig::default();
        config.windowing.overlap = config.windowing.window_size;
        assert!(validate_processing_config(&config).is_err());
    }

    #[test]
    fn test_depth_must_fit_window() {
        let mut config = ProcessingConfig::default();
        config.windowing.window_size = 64;
        config.windowing.overlap = 32;
        // 64 samples with an 8-tap filter support floor(log2(64 / 7)) = 3 levels
        config.wavelet.level = 4;
        let err = validate_processing_config(&config).unwrap_err();
        assert!(err.contains("at most 3"));

        config.wavelet.level = 3;
        assert!(validate_processing_config(&config).is_ok());
    }

    #[test]
    fn test_invalid_motion_config() {
        let mut config = ProcessingConfig::default();
        config.motion.percentile = 0.0;
        assert!(validate_processing_config(&config).is_err());

        let mut config = ProcessingConfig::default();
        config.motion.high_multiplier = 0.5;
        assert!(validate_processing_config(&config).is_err());

        let mut config = ProcessingConfig::default();
        config.motion.low_multiplier = f64::NAN;
        assert!(validate_processing_config(&config).is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = ProcessingConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("family = \"db4\""));
        assert!(toml_str.contains("scope = \"coefficient\""));

        let deserialized: ProcessingConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_partial_tables_fill_defaults() {
        let config: ProcessingConfig = toml::from_str("[wavelet]\nfamily = \"sym4\"\n").unwrap();
        assert_eq!(config.wavelet.family, WaveletFamily::Sym4);
        assert_eq!(config.wavelet.level, wavelet::DEFAULT_DECOMPOSITION_LEVEL);
        assert_eq!(config.windowing, WindowingConfig::default());
    }
}

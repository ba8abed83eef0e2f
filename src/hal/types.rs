// src/hal/types.rs
//! Core frame types exchanged between the transport and the processing core

use crate::config::constants::signal::{AXIS_COUNT, LEAD_COUNT};
use crate::error::{HolterError, HolterResult};
use serde::{Deserialize, Serialize};

/// One timestep of the wearable stream: three ECG leads plus triaxial acceleration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleFrame {
    /// Monotonic source clock (milliseconds for the reference firmware)
    pub timestamp: u64,
    /// Leads I, II and III; III is derived upstream as II - I
    pub ecg: [f64; LEAD_COUNT],
    /// Acceleration x, y, z
    pub acc: [f64; AXIS_COUNT],
    /// Euclidean norm of `acc`
    pub acc_magnitude: f64,
}

/// Filtered output for one timestep
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilteredFrame {
    pub timestamp: u64,
    pub ecg: [f64; LEAD_COUNT],
}

/// Timestamp range missing from the filtered stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FilterGap {
    /// First missing timestamp
    pub start_timestamp: u64,
    /// Last missing timestamp
    pub end_timestamp: u64,
    pub frames: u64,
    pub cause: GapCause,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GapCause {
    /// Frames withheld from the windowing path while its queue was saturated
    Backpressure,
    /// Frames buffered for a window that never completed
    DiscardedPartialWindow,
}

/// ECG lead selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Lead {
    I,
    II,
    III,
}

impl Lead {
    pub const ALL: [Lead; LEAD_COUNT] = [Lead::I, Lead::II, Lead::III];

    pub fn index(self) -> usize {
        match self {
            Lead::I => 0,
            Lead::II => 1,
            Lead::III => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Lead::I => "ECG_I",
            Lead::II => "ECG_II",
            Lead::III => "ECG_III",
        }
    }
}

impl std::fmt::Display for Lead {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Euclidean norm of an acceleration vector
pub fn acceleration_magnitude(acc: &[f64; AXIS_COUNT]) -> f64 {
    acc.iter().map(|a| a * a).sum::<f64>().sqrt()
}

impl SampleFrame {
    /// Frame with the magnitude derived from `acc`
    pub fn new(timestamp: u64, ecg: [f64; LEAD_COUNT], acc: [f64; AXIS_COUNT]) -> Self {
        Self {
            timestamp,
            ecg,
            acc,
            acc_magnitude: acceleration_magnitude(&acc),
        }
    }

    /// Frame with a reported magnitude, checked against the derived one
    pub fn with_magnitude(
        timestamp: u64,
        ecg: [f64; LEAD_COUNT],
        acc: [f64; AXIS_COUNT],
        acc_magnitude: f64,
        tolerance: f64,
    ) -> HolterResult<Self> {
        let frame = Self {
            timestamp,
            ecg,
            acc,
            acc_magnitude,
        };
        if !frame.is_finite() {
            return Err(HolterError::invalid_data(
                "sample_frame",
                "with_magnitude",
                "SampleFrame",
                format!("non-finite value at timestamp {}", timestamp),
            ));
        }

        let derived = acceleration_magnitude(&acc);
        if (derived - acc_magnitude).abs() > tolerance {
            return Err(HolterError::invalid_data(
                "sample_frame",
                "with_magnitude",
                "SampleFrame",
                format!(
                    "reported magnitude {:.4} deviates from derived {:.4} by more than {}",
                    acc_magnitude, derived, tolerance
                ),
            ));
        }

        Ok(frame)
    }

    pub fn lead(&self, lead: Lead) -> f64 {
        self.ecg[lead.index()]
    }

    /// Every ECG, acceleration and magnitude value is finite
    pub fn is_finite(&self) -> bool {
        self.ecg.iter().chain(&self.acc).all(|v| v.is_finite()) && self.acc_magnitude.is_finite()
    }
}

impl FilteredFrame {
    pub fn lead(&self, lead: Lead) -> f64 {
        self.ecg[lead.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_derives_magnitude() {
        let frame = SampleFrame::new(10, [0.1, 0.2, 0.1], [3.0, 4.0, 0.0]);
        assert_eq!(frame.acc_magnitude, 5.0);
        assert_eq!(frame.lead(Lead::II), 0.2);
    }

    #[test]
    fn test_with_magnitude_accepts_rounded_value() {
        // Firmware prints magnitude with 4 decimals
        let frame = SampleFrame::with_magnitude(1, [0.0; 3], [0.1, 0.2, 0.3], 0.3742, 0.01).unwrap();
        assert_eq!(frame.acc_magnitude, 0.3742);
    }

    #[test]
    fn test_with_magnitude_rejects_mismatch() {
        let result = SampleFrame::with_magnitude(1, [0.0; 3], [3.0, 4.0, 0.0], 6.0, 0.01);
        assert!(matches!(result, Err(HolterError::InvalidData { .. })));
    }

    #[test]
    fn test_with_magnitude_rejects_non_finite() {
        let result = SampleFrame::with_magnitude(1, [f64::NAN, 0.0, 0.0], [0.0; 3], 0.0, 0.01);
        assert!(result.is_err());
    }

    #[test]
    fn test_lead_indices() {
        let indices: Vec<usize> = Lead::ALL.iter().map(|l| l.index()).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(Lead::III.to_string(), "ECG_III");
    }
}

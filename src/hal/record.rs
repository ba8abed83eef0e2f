// src/hal/record.rs
//! Inbound text record parsing
//!
//! The firmware sends one line per datagram:
//! `timestamp,ECG_I,ECG_II,ECG_III,AccX,AccY,AccZ,AccMag`.
//! Lines starting with `SYSTEM` or `ERROR` are status messages, not samples.

use crate::config::constants::acquisition::{ERROR_PREFIX, SYSTEM_PREFIX};
use crate::hal::types::{acceleration_magnitude, SampleFrame};
use thiserror::Error;

/// Fields per data record
pub const RECORD_FIELD_COUNT: usize = 8;

const FIELD_NAMES: [&str; RECORD_FIELD_COUNT] = [
    "timestamp", "ECG_I", "ECG_II", "ECG_III", "AccX", "AccY", "AccZ", "AccMag",
];

/// A classified inbound line
#[derive(Debug, Clone, PartialEq)]
pub enum InboundLine {
    Frame(SampleFrame),
    Status(StatusLine),
}

/// Firmware status message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub level: StatusLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    /// `SYSTEM_READY` and similar lifecycle notices
    System,
    /// Firmware-side failures, e.g. `ERROR: LIS3DH not found`
    Error,
}

/// Why a line could not be turned into a frame
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("empty record")]
    Empty,

    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    #[error("field {field} is not a number: '{value}'")]
    InvalidNumber { field: &'static str, value: String },

    #[error("field {field} is not finite")]
    NonFinite { field: &'static str },

    #[error("reported magnitude {reported:.4} deviates from derived {derived:.4}")]
    MagnitudeMismatch { reported: f64, derived: f64 },
}

/// Parse one inbound line
///
/// `tolerance` bounds the allowed difference between the reported `AccMag`
/// and the Euclidean norm of the acceleration fields.
pub fn parse_record(line: &str, tolerance: f64) -> Result<InboundLine, RecordError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(RecordError::Empty);
    }

    if let Some(level) = status_level(line) {
        return Ok(InboundLine::Status(StatusLine {
            level,
            message: line.to_string(),
        }));
    }

    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != RECORD_FIELD_COUNT {
        return Err(RecordError::FieldCount {
            expected: RECORD_FIELD_COUNT,
            found: fields.len(),
        });
    }

    let timestamp = fields[0].parse::<u64>().map_err(|_| RecordError::InvalidNumber {
        field: FIELD_NAMES[0],
        value: fields[0].to_string(),
    })?;

    let mut values = [0.0f64; RECORD_FIELD_COUNT - 1];
    for (i, value) in values.iter_mut().enumerate() {
        let field = FIELD_NAMES[i + 1];
        let raw = fields[i + 1];
        *value = raw.parse::<f64>().map_err(|_| RecordError::InvalidNumber {
            field,
            value: raw.to_string(),
        })?;
        if !value.is_finite() {
            return Err(RecordError::NonFinite { field });
        }
    }

    let ecg = [values[0], values[1], values[2]];
    let acc = [values[3], values[4], values[5]];
    let reported = values[6];
    let derived = acceleration_magnitude(&acc);
    if (reported - derived).abs() > tolerance {
        return Err(RecordError::MagnitudeMismatch { reported, derived });
    }

    Ok(InboundLine::Frame(SampleFrame {
        timestamp,
        ecg,
        acc,
        acc_magnitude: reported,
    }))
}

fn status_level(line: &str) -> Option<StatusLevel> {
    if line.starts_with(SYSTEM_PREFIX) {
        Some(StatusLevel::System)
    } else if line.starts_with(ERROR_PREFIX) {
        Some(StatusLevel::Error)
    } else {
        None
    }
}

/// Format a frame the way the firmware does
pub fn format_record(frame: &SampleFrame) -> String {
    format!(
        "{},{:.6},{:.6},{:.6},{:.4},{:.4},{:.4},{:.4}",
        frame.timestamp,
        frame.ecg[0],
        frame.ecg[1],
        frame.ecg[2],
        frame.acc[0],
        frame.acc[1],
        frame.acc[2],
        frame.acc_magnitude
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 0.01;

    #[test]
    fn test_parse_valid_record() {
        let line = "12345,0.512000,0.734000,0.222000,0.0100,-0.0200,0.9800,0.9803\n";
        match parse_record(line, TOLERANCE).unwrap() {
            InboundLine::Frame(frame) => {
                assert_eq!(frame.timestamp, 12345);
                assert_eq!(frame.ecg, [0.512, 0.734, 0.222]);
                assert_eq!(frame.acc, [0.01, -0.02, 0.98]);
                assert_eq!(frame.acc_magnitude, 0.9803);
            }
            other => panic!("Expected frame, got {other:?}"),
        }
    }

    #[test]
    fn test_status_lines() {
        assert_eq!(
            parse_record("SYSTEM_READY", TOLERANCE).unwrap(),
            InboundLine::Status(StatusLine {
                level: StatusLevel::System,
                message: "SYSTEM_READY".to_string(),
            })
        );
        match parse_record("ERROR: LIS3DH not found", TOLERANCE).unwrap() {
            InboundLine::Status(status) => assert_eq!(status.level, StatusLevel::Error),
            other => panic!("Expected status, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_records() {
        assert_eq!(parse_record("   ", TOLERANCE), Err(RecordError::Empty));
        assert!(matches!(
            parse_record("1,2,3", TOLERANCE),
            Err(RecordError::FieldCount { expected: 8, found: 3 })
        ));
        assert!(matches!(
            parse_record("abc,0,0,0,0,0,0,0", TOLERANCE),
            Err(RecordError::InvalidNumber { field: "timestamp", .. })
        ));
        assert!(matches!(
            parse_record("1,0,x,0,0,0,0,0", TOLERANCE),
            Err(RecordError::InvalidNumber { field: "ECG_II", .. })
        ));
        assert!(matches!(
            parse_record("1,0,0,NaN,0,0,0,0", TOLERANCE),
            Err(RecordError::NonFinite { field: "ECG_III" })
        ));
    }

    #[test]
    fn test_magnitude_mismatch() {
        assert!(matches!(
            parse_record("1,0,0,0,3.0,4.0,0.0,7.0", TOLERANCE),
            Err(RecordError::MagnitudeMismatch { .. })
        ));
    }

    #[test]
    fn test_format_parse_round_trip() {
        let frame = SampleFrame::new(42, [0.1, -0.25, 0.125], [0.5, 0.25, 1.0]);
        let line = format_record(&frame);

        match parse_record(&line, TOLERANCE).unwrap() {
            InboundLine::Frame(parsed) => {
                assert_eq!(parsed.timestamp, 42);
                assert!((parsed.acc_magnitude - frame.acc_magnitude).abs() < 1e-4);
            }
            other => panic!("Expected frame, got {other:?}"),
        }
    }
}

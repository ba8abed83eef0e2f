// src/config/constants.rs
//! System-wide configuration constants

/// Signal and frame constants
pub mod signal {
    pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 100;
    pub const MIN_SAMPLE_RATE_HZ: u32 = 1;
    pub const MAX_SAMPLE_RATE_HZ: u32 = 10_000;

    /// ECG leads I, II and III
    pub const LEAD_COUNT: usize = 3;
    /// Accelerometer axes x, y and z
    pub const AXIS_COUNT: usize = 3;

    /// The reference firmware prints the magnitude with 4 decimals
    pub const DEFAULT_MAGNITUDE_TOLERANCE: f64 = 0.01;
}

/// Windowing constants
pub mod windowing {
    pub const DEFAULT_WINDOW_SIZE: usize = 500;
    pub const DEFAULT_OVERLAP: usize = 250;
    pub const MIN_WINDOW_SIZE: usize = 16;
    pub const MAX_WINDOW_SIZE: usize = 65_536;
}

/// Wavelet denoising constants
pub mod wavelet {
    pub const DEFAULT_DECOMPOSITION_LEVEL: usize = 5;
    pub const MAX_DECOMPOSITION_LEVEL: usize = 12;

    /// Converts the median absolute deviation of Gaussian noise into its standard deviation
    pub const MAD_NORMALIZATION: f64 = 0.6745;

    /// Per-level threshold growth; 1.0 keeps every level at the same threshold
    pub const DEFAULT_LEVEL_GAIN: f64 = 1.0;
    pub const MAX_LEVEL_GAIN: f64 = 4.0;
}

/// Motion classification constants
pub mod motion {
    pub const DEFAULT_PERCENTILE: f64 = 75.0;
    pub const DEFAULT_HIGH_MOTION_MULTIPLIER: f64 = 2.5;
    pub const DEFAULT_LOW_MOTION_MULTIPLIER: f64 = 1.0;
    pub const MAX_MOTION_MULTIPLIER: f64 = 100.0;

    /// Share of high-motion samples above which a whole window counts as high motion
    pub const DEFAULT_WINDOW_FRACTION: f64 = 0.3;
}

/// Acquisition and transport constants
pub mod acquisition {
    pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;
    pub const MIN_QUEUE_CAPACITY: usize = 2;
    pub const DEFAULT_UDP_BIND_ADDR: &str = "0.0.0.0:55000";
    pub const DEFAULT_RECV_TIMEOUT_MS: u64 = 1000;
    pub const MAX_DATAGRAM_BYTES: usize = 1024;

    /// Individual anomaly warnings logged per kind before switching to counters only
    pub const ANOMALY_LOG_LIMIT: u64 = 20;

    /// Back-to-back failed polls after which the source is considered lost
    pub const MAX_CONSECUTIVE_SOURCE_ERRORS: u32 = 50;

    /// Period of the ingest progress log line
    pub const STATUS_INTERVAL_S: u64 = 5;

    /// Firmware status line prefixes
    pub const SYSTEM_PREFIX: &str = "SYSTEM";
    pub const ERROR_PREFIX: &str = "ERROR";
}

/// Output constants
pub mod output {
    pub const DEFAULT_OUTPUT_DIR: &str = "holter_data";
    pub const SESSION_PREFIX: &str = "Session_";
    pub const SESSION_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
    pub const RAW_FILE_NAME: &str = "raw_data.csv";
    pub const FILTERED_FILE_NAME: &str = "filtered_data.csv";
    pub const REPORT_FILE_NAME: &str = "session_report.toml";

    pub const RAW_HEADER: [&str; 8] = [
        "timestamp", "ECG_I", "ECG_II", "ECG_III", "AccX", "AccY", "AccZ", "AccMag",
    ];
    pub const FILTERED_HEADER: [&str; 4] = ["timestamp", "ECG_I_filt", "ECG_II_filt", "ECG_III_filt"];
}

/// Synthetic stream defaults
pub mod simulation {
    pub const DEFAULT_HEART_RATE_BPM: f64 = 72.0;
    pub const DEFAULT_R_WAVE_AMPLITUDE_MV: f64 = 1.2;
    pub const DEFAULT_BASELINE_NOISE_STD: f64 = 0.01;
    pub const DEFAULT_BASELINE_WANDER_MV: f64 = 0.05;
    pub const BASELINE_WANDER_HZ: f64 = 0.25;

    /// Resting accelerometer reading in g, gravity on z
    pub const REST_ACCELERATION: [f64; 3] = [0.0, 0.0, 1.0];
    pub const REST_ACCELERATION_JITTER: f64 = 0.01;

    pub const DEFAULT_BURST_ACC_AMPLITUDE: f64 = 1.5;
    pub const DEFAULT_BURST_ECG_NOISE_MV: f64 = 0.5;
    pub const DEFAULT_SEED: u64 = 0x4845_4152_54;
}

/// File system paths
pub mod paths {
    pub const SYSTEM_CONFIG_PATH: &str = "/etc/holter/holter.toml";
    pub const LOCAL_CONFIG_FILE: &str = "holter.toml";
    pub const CONFIG_PATH_ENV: &str = "HOLTER_CONFIG";

    /// Prefix of `HOLTER__SECTION__KEY` style environment overrides
    pub const ENV_OVERRIDE_PREFIX: &str = "HOLTER__";
    pub const ENV_OVERRIDE_SEPARATOR: &str = "__";
}

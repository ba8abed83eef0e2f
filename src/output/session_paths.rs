// src/output/session_paths.rs
use crate::config::constants::output::{REPORT_FILE_NAME, SESSION_PREFIX, SESSION_TIMESTAMP_FORMAT};
use crate::config::OutputConfig;
use crate::error::{HolterResult, IntoHolterError};
use chrono::{DateTime, Local};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::info;

/// Files of one recording session under `<output>/Session_YYYYMMDD_HHMMSS/`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPaths {
    pub directory: PathBuf,
    pub raw: PathBuf,
    pub filtered: PathBuf,
    pub report: PathBuf,
}

impl SessionPaths {
    /// Create a session folder named after the current local time
    pub fn create(config: &OutputConfig) -> HolterResult<Self> {
        Self::create_at(config, Local::now())
    }

    /// Create a session folder for `started`
    ///
    /// A second session started within the same second gets a numeric suffix.
    pub fn create_at(config: &OutputConfig, started: DateTime<Local>) -> HolterResult<Self> {
        fs::create_dir_all(&config.directory).holter_err("session_paths", "create_output_dir")?;

        let base = format!("{}{}", SESSION_PREFIX, started.format(SESSION_TIMESTAMP_FORMAT));
        let mut directory = config.directory.join(&base);
        let mut attempt = 1;
        loop {
            match fs::create_dir(&directory) {
                Ok(()) => break,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    directory = config.directory.join(format!("{base}_{attempt}"));
                    attempt += 1;
                }
                Err(e) => return Err(e).holter_err("session_paths", "create_session_dir"),
            }
        }

        info!(directory = %directory.display(), "Created session folder");
        Ok(Self::in_directory(config, directory))
    }

    fn in_directory(config: &OutputConfig, directory: PathBuf) -> Self {
        Self {
            raw: directory.join(&config.raw_file_name),
            filtered: directory.join(&config.filtered_file_name),
            report: directory.join(REPORT_FILE_NAME),
            directory,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> OutputConfig {
        OutputConfig {
            directory: dir.path().join("holter_data"),
            ..OutputConfig::default()
        }
    }

    #[test]
    fn test_session_folder_layout() {
        let dir = TempDir::new().unwrap();
        let started = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let paths = SessionPaths::create_at(&config(&dir), started).unwrap();

        assert!(paths.directory.is_dir());
        assert!(paths.directory.ends_with("Session_20240309_140507"));
        assert_eq!(paths.raw, paths.directory.join("raw_data.csv"));
        assert_eq!(paths.filtered, paths.directory.join("filtered_data.csv"));
        assert_eq!(paths.report, paths.directory.join("session_report.toml"));
    }

    #[test]
    fn test_same_second_sessions_do_not_collide() {
        let dir = TempDir::new().unwrap();
        let started = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let first = SessionPaths::create_at(&config(&dir), started).unwrap();
        let second = SessionPaths::create_at(&config(&dir), started).unwrap();

        assert_ne!(first.directory, second.directory);
        assert!(second.directory.ends_with("Session_20240309_140507_1"));
    }
}

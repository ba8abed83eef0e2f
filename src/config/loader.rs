// src/config/loader.rs
//! Configuration loader: layered TOML files plus environment overrides

use crate::config::{constants::paths, SystemConfig};
use crate::error::HolterError;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Loads a [`SystemConfig`] from defaults, TOML files and the environment
///
/// Later sources override earlier ones key by key:
/// built-in defaults, then every existing file in `config_paths` in order,
/// then the explicit file, then `HOLTER__SECTION__KEY` environment variables.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
    explicit_path: Option<PathBuf>,
    env_overrides: bool,
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Configuration parse error in {origin}: {message}")]
    ParseError { origin: String, message: String },

    #[error("Configuration validation errors:\n  {}", .0.join("\n  "))]
    ValidationError(Vec<String>),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<ConfigError> for HolterError {
    fn from(err: ConfigError) -> Self {
        HolterError::configuration("config_loader", err.to_string())
    }
}

impl ConfigLoader {
    /// Loader over the standard discovery paths
    pub fn new() -> Self {
        Self {
            config_paths: Self::discover_config_paths(),
            explicit_path: None,
            env_overrides: true,
        }
    }

    /// Loader over an explicit list of files
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            config_paths: paths,
            explicit_path: None,
            env_overrides: true,
        }
    }

    /// Explicitly requested file; unlike discovered files it must exist
    pub fn with_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.explicit_path = Some(path.into());
        self
    }

    /// Ignore `HOLTER__*` environment variables
    pub fn without_env_overrides(mut self) -> Self {
        self.env_overrides = false;
        self
    }

    pub fn config_paths(&self) -> &[PathBuf] {
        &self.config_paths
    }

    /// Load, merge and validate the system configuration
    pub fn load_system_config(&self) -> Result<SystemConfig, ConfigError> {
        let config = self.load_and_merge_configs()?;
        config.validate_consistency().map_err(ConfigError::ValidationError)?;

        info!(
            sources = self.config_paths.iter().chain(&self.explicit_path).filter(|p| p.exists()).count(),
            window_size = config.processing.windowing.window_size,
            wavelet = %config.processing.wavelet.family,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Validate a single file on top of the defaults without loading it
    pub fn validate_config_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let mut merged = Self::default_value()?;
        Self::merge_toml_values(&mut merged, Self::load_config_file(path.as_ref())?);

        let config = Self::deserialize(merged, &path.as_ref().display().to_string())?;
        config.validate_consistency().map_err(ConfigError::ValidationError)
    }

    /// Export a configuration to file
    pub fn export_config<P: AsRef<Path>>(&self, config: &SystemConfig, path: P) -> Result<(), ConfigError> {
        let toml_content = toml::to_string_pretty(config).map_err(|e| ConfigError::ParseError {
            origin: "export".to_string(),
            message: e.to_string(),
        })?;

        std::fs::write(path, toml_content)?;
        Ok(())
    }

    fn load_and_merge_configs(&self) -> Result<SystemConfig, ConfigError> {
        let mut merged_config = Self::default_value()?;

        for config_path in &self.config_paths {
            match Self::load_config_file(config_path) {
                Ok(file_config) => {
                    debug!(path = %config_path.display(), "Merging configuration file");
                    Self::merge_toml_values(&mut merged_config, file_config);
                }
                Err(ConfigError::FileNotFound(_)) => continue, // Skip missing optional files
                Err(e) => return Err(e),
            }
        }

        if let Some(path) = &self.explicit_path {
            debug!(path = %path.display(), "Merging explicit configuration file");
            Self::merge_toml_values(&mut merged_config, Self::load_config_file(path)?);
        }

        if self.env_overrides {
            self.apply_environment_overrides(&mut merged_config);
        }

        Self::deserialize(merged_config, "merged configuration")
    }

    fn default_value() -> Result<toml::Value, ConfigError> {
        toml::Value::try_from(SystemConfig::default()).map_err(|e| ConfigError::ParseError {
            origin: "defaults".to_string(),
            message: e.to_string(),
        })
    }

    fn deserialize(value: toml::Value, origin: &str) -> Result<SystemConfig, ConfigError> {
        value.try_into().map_err(|e: toml::de::Error| ConfigError::ParseError {
            origin: origin.to_string(),
            message: e.to_string(),
        })
    }

    fn load_config_file(path: &Path) -> Result<toml::Value, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e: toml::de::Error| ConfigError::ParseError {
            origin: path.display().to_string(),
            message: e.to_string(),
        })
    }

    fn merge_toml_values(base: &mut toml::Value, overlay: toml::Value) {
        match (base, overlay) {
            (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
                for (key, value) in overlay_table {
                    if let Some(base_value) = base_table.get_mut(&key) {
                        Self::merge_toml_values(base_value, value);
                    } else {
                        base_table.insert(key, value);
                    }
                }
            }
            (base_value, overlay_value) => {
                *base_value = overlay_value;
            }
        }
    }

    fn apply_environment_overrides(&self, config: &mut toml::Value) {
        for (key, value) in std::env::vars() {
            let Some(rest) = key.strip_prefix(paths::ENV_OVERRIDE_PREFIX) else {
                continue;
            };
            let path: Vec<String> = rest
                .split(paths::ENV_OVERRIDE_SEPARATOR)
                .map(str::to_lowercase)
                .collect();
            if path.iter().any(String::is_empty) {
                continue;
            }

            debug!(variable = %key, "Applying environment override");
            Self::set_nested_value(config, &path, Self::parse_env_value(&value));
        }
    }

    fn parse_env_value(value: &str) -> toml::Value {
        if let Ok(int_val) = value.parse::<i64>() {
            toml::Value::Integer(int_val)
        } else if let Ok(float_val) = value.parse::<f64>() {
            toml::Value::Float(float_val)
        } else if let Ok(bool_val) = value.parse::<bool>() {
            toml::Value::Boolean(bool_val)
        } else {
            toml::Value::String(value.to_string())
        }
    }

    fn set_nested_value(config: &mut toml::Value, path: &[String], value: toml::Value) {
        let Some((last, parents)) = path.split_last() else {
            return;
        };

        let mut current = config;
        for part in parents {
            let toml::Value::Table(table) = current else {
                return;
            };
            current = table
                .entry(part.clone())
                .or_insert_with(|| toml::Value::Table(toml::value::Table::new()));
        }

        if let toml::Value::Table(table) = current {
            table.insert(last.clone(), value);
        }
    }

    fn discover_config_paths() -> Vec<PathBuf> {
        let mut found = vec![
            PathBuf::from(paths::SYSTEM_CONFIG_PATH),
            PathBuf::from(paths::LOCAL_CONFIG_FILE),
        ];

        if let Some(extra) = std::env::var_os(paths::CONFIG_PATH_ENV) {
            found.push(PathBuf::from(extra));
        }

        found
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

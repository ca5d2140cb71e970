//! TOML configuration for the streaming engine.
//!
//! # Example
//!
//! ```toml
//! typing_speed = 4
//! tick_interval_ms = 16
//! high_water_mark = 20000
//!
//! [typography]
//! columns = 96
//! line_height = 18
//! padding = 8
//! ```
//!
//! Every key is optional. A `typing_speed` outside `[1, 50]` is clamped
//! rather than rejected.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::estimate::Typography;
use crate::state::{DEFAULT_TYPING_SPEED, clamp_typing_speed};

/// Default reveal cadence, roughly one tick per 60 Hz frame.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 16;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML content.
    #[error("Failed to parse TOML in '{origin}': {source}")]
    ParseError {
        origin: String,
        #[source]
        source: toml::de::Error,
    },

    /// Invalid configuration value.
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Characters revealed per tick.
    pub typing_speed: usize,

    /// Milliseconds between reveal ticks.
    pub tick_interval_ms: u64,

    /// Maximum buffered characters before the overflow is revealed at once.
    /// `None` leaves the buffer unbounded.
    pub high_water_mark: Option<usize>,

    /// Measurement surface used for height estimates.
    pub typography: Typography,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            typing_speed: DEFAULT_TYPING_SPEED,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            high_water_mark: None,
            typography: Typography::default(),
        }
    }
}

impl EngineConfig {
    /// Loads and validates a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    /// Parses and validates TOML content.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Self::parse(content, "<inline>")
    }

    fn parse(content: &str, origin: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content).map_err(|source| ConfigError::ParseError {
            origin: origin.to_string(),
            source,
        })?;
        config.validate()
    }

    /// Checks values, clamping `typing_speed` into range.
    pub fn validate(mut self) -> ConfigResult<Self> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "tick_interval_ms".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        if self.high_water_mark == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "high_water_mark".to_string(),
                message: "must be greater than zero when set".to_string(),
            });
        }

        let clamped = clamp_typing_speed(self.typing_speed);
        if clamped != self.typing_speed {
            warn!(
                requested = self.typing_speed,
                clamped, "typing_speed out of range; clamping"
            );
            self.typing_speed = clamped;
        }

        Ok(self)
    }

    /// Sets the typing speed (clamped).
    pub fn with_typing_speed(mut self, speed: usize) -> Self {
        self.typing_speed = clamp_typing_speed(speed);
        self
    }

    /// Sets the high-water mark.
    pub fn with_high_water_mark(mut self, limit: Option<usize>) -> Self {
        self.high_water_mark = limit;
        self
    }

    /// Sets the measurement surface.
    pub fn with_typography(mut self, typography: Typography) -> Self {
        self.typography = typography;
        self
    }

    /// Reveal cadence as a [`Duration`].
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = EngineConfig::from_toml_str("").expect("should parse");
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.tick_interval(), Duration::from_millis(16));
    }

    #[test]
    fn test_full_config() {
        let config = EngineConfig::from_toml_str(
            r#"
typing_speed = 4
tick_interval_ms = 33
high_water_mark = 5000

[typography]
columns = 96
line_height = 18
"#,
        )
        .expect("should parse");

        assert_eq!(config.typing_speed, 4);
        assert_eq!(config.tick_interval_ms, 33);
        assert_eq!(config.high_water_mark, Some(5000));
        assert_eq!(
            config.typography,
            Typography {
                columns: 96,
                line_height: 18,
                padding: 0,
            }
        );
    }

    #[test]
    fn test_typing_speed_is_clamped() {
        let config = EngineConfig::from_toml_str("typing_speed = 1000").expect("should parse");
        assert_eq!(config.typing_speed, 50);

        let config = EngineConfig::from_toml_str("typing_speed = 0").expect("should parse");
        assert_eq!(config.typing_speed, 1);
    }

    #[test]
    fn test_zero_tick_interval_rejected() {
        let err = EngineConfig::from_toml_str("tick_interval_ms = 0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "tick_interval_ms"));
    }

    #[test]
    fn test_zero_high_water_mark_rejected() {
        let err = EngineConfig::from_toml_str("high_water_mark = 0").unwrap_err();
        assert!(err.to_string().contains("high_water_mark"));
    }

    #[test]
    fn test_parse_error_names_origin() {
        let err = EngineConfig::from_toml_str("typing_speed = \"fast\"").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        assert!(err.to_string().contains("<inline>"));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "typing_speed = 7").expect("write");

        let config = EngineConfig::from_file(file.path()).expect("should load");
        assert_eq!(config.typing_speed, 7);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = EngineConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }

    #[test]
    fn test_builders() {
        let config = EngineConfig::default()
            .with_typing_speed(0)
            .with_high_water_mark(Some(64));
        assert_eq!(config.typing_speed, 1);
        assert_eq!(config.high_water_mark, Some(64));
    }
}

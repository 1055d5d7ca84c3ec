//! Configuration management
//!
//! Strongly-typed configuration with TOML support. Every section has
//! defaults matching the documented behavior, so an empty file (or no file
//! at all) yields a working setup.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General application settings
    pub general: GeneralConfig,

    /// Synthetic traffic generator settings
    pub generator: GeneratorConfig,

    /// Indicator list settings
    pub indicators: IndicatorsConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| Error::ConfigNotFound {
            path: path.display().to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.generator.validate()
    }
}

/// How the traffic source is selected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    /// Use native capture when the platform supports it, else synthetic
    #[default]
    Auto,
    /// Require native capture; sessions fail where it is unavailable
    Native,
    /// Always use the synthetic generator
    Synthetic,
}

/// General application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Traffic source selection override
    pub capture: CaptureMode,
}

/// Synthetic traffic generator settings
///
/// Defaults match the documented generator behavior: inter-event delay
/// uniform in [1s, 3s), 15% of DNS events drawn from the indicator pool,
/// 30% of DNS events accompanied by a connection event, TCP chosen at 0.8.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Minimum inter-event delay in milliseconds (inclusive)
    pub min_delay_ms: u64,
    /// Maximum inter-event delay in milliseconds (exclusive)
    pub max_delay_ms: u64,
    /// Probability a DNS event is drawn from the indicator pool
    pub indicator_ratio: f64,
    /// Probability a DNS event is accompanied by a connection event
    pub connection_ratio: f64,
    /// Probability an accompanying connection uses TCP (else UDP)
    pub tcp_ratio: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 1_000,
            max_delay_ms: 3_000,
            indicator_ratio: 0.15,
            connection_ratio: 0.30,
            tcp_ratio: 0.80,
        }
    }
}

impl GeneratorConfig {
    /// Validate generator settings
    pub fn validate(&self) -> Result<()> {
        if self.min_delay_ms >= self.max_delay_ms {
            return Err(Error::config_value(
                "generator.min_delay_ms",
                format!(
                    "must be below max_delay_ms ({} >= {})",
                    self.min_delay_ms, self.max_delay_ms
                ),
            ));
        }

        for (key, value) in [
            ("generator.indicator_ratio", self.indicator_ratio),
            ("generator.connection_ratio", self.connection_ratio),
            ("generator.tcp_ratio", self.tcp_ratio),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::config_value(
                    key,
                    format!("must be within 0.0..=1.0, got {value}"),
                ));
            }
        }

        Ok(())
    }
}

/// Indicator list settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorsConfig {
    /// Indicator file path; the built-in table is used when absent
    pub file: Option<String>,
    /// Inline entries added on top of the file/built-in table,
    /// in the indicator file line format
    pub entries: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (text, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.generator.min_delay_ms, 1_000);
        assert_eq!(config.generator.max_delay_ms, 3_000);
        assert!((config.generator.indicator_ratio - 0.15).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = Config::from_toml(
            r#"
            [general]
            capture = "synthetic"

            [generator]
            min_delay_ms = 10
            max_delay_ms = 50
            "#,
        )
        .unwrap();

        assert_eq!(config.general.capture, CaptureMode::Synthetic);
        assert_eq!(config.generator.min_delay_ms, 10);
        // Untouched sections keep their defaults
        assert!((config.generator.tcp_ratio - 0.80).abs() < f64::EPSILON);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_invalid_ratio_rejected() {
        let result = Config::from_toml(
            r#"
            [generator]
            indicator_ratio = 1.5
            "#,
        );
        assert!(matches!(result, Err(Error::ConfigValue { .. })));
    }

    #[test]
    fn test_inverted_delays_rejected() {
        let result = Config::from_toml(
            r#"
            [generator]
            min_delay_ms = 5000
            max_delay_ms = 1000
            "#,
        );
        assert!(matches!(result, Err(Error::ConfigValue { .. })));
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/vigil.toml");
        assert!(matches!(result, Err(Error::ConfigNotFound { .. })));
    }
}

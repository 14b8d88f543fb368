//! Service Settings
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! `feature-service.{toml,yaml,json}` file in the working directory, then
//! `FEATURE_PRODUCER_*` environment variables.

use chrono_tz::Tz;
use config::{Config, ConfigError, Environment, File};
use feature_engine::ExtractorConfig;
use ingestion::HttpSourceConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "FEATURE_PRODUCER";

/// Settings file stem looked up in the working directory
pub const SETTINGS_FILE: &str = "feature-service";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to load settings: {0}")]
    Load(#[from] ConfigError),
    #[error("Invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the room-climate measurement API
    pub api_base_url: String,
    pub api_request_timeout_seconds: u64,
    /// Trailing window used when a request omits `start`
    pub default_time_window_hours: u32,
    pub default_measurement_format: String,
    pub bind_address: String,
    /// IANA zone for calendar features
    pub calendar_timezone: Tz,
    /// Directory with classifier artifacts; unset selects the mock classifier
    pub model_dir: Option<PathBuf>,
    pub log_format: LogFormat,
}

impl Default for Settings {
    fn default() -> Self {
        let source = HttpSourceConfig::default();
        Self {
            api_base_url: source.base_url,
            api_request_timeout_seconds: source.timeout_secs,
            default_time_window_hours: 3,
            default_measurement_format: source.format,
            bind_address: "0.0.0.0:8000".to_string(),
            calendar_timezone: Tz::UTC,
            model_dir: None,
            log_format: LogFormat::Pretty,
        }
    }
}

impl Settings {
    /// Load from the settings file and environment
    pub fn load() -> Result<Self, SettingsError> {
        let config = Config::builder()
            .add_source(File::with_name(SETTINGS_FILE).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;
        Self::from_config(config)
    }

    /// Deserialize and validate an already built configuration
    pub fn from_config(config: Config) -> Result<Self, SettingsError> {
        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.api_base_url.trim().is_empty() {
            return Err(SettingsError::Invalid {
                field: "api_base_url",
                reason: "must not be empty".into(),
            });
        }
        if self.api_request_timeout_seconds < 1 {
            return Err(SettingsError::Invalid {
                field: "api_request_timeout_seconds",
                reason: "must be at least 1".into(),
            });
        }
        if self.default_time_window_hours < 1 {
            return Err(SettingsError::Invalid {
                field: "default_time_window_hours",
                reason: "must be at least 1".into(),
            });
        }
        if self.default_measurement_format.trim().is_empty() {
            return Err(SettingsError::Invalid {
                field: "default_measurement_format",
                reason: "must not be empty".into(),
            });
        }
        self.socket_addr()?;
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, SettingsError> {
        self.bind_address
            .parse()
            .map_err(|e: std::net::AddrParseError| SettingsError::Invalid {
                field: "bind_address",
                reason: e.to_string(),
            })
    }

    pub fn source_config(&self) -> HttpSourceConfig {
        HttpSourceConfig {
            base_url: self.api_base_url.clone(),
            timeout_secs: self.api_request_timeout_seconds,
            format: self.default_measurement_format.clone(),
        }
    }

    pub fn extractor_config(&self) -> ExtractorConfig {
        ExtractorConfig::with_timezone(self.calendar_timezone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_overrides(pairs: &[(&str, &str)]) -> Result<Settings, SettingsError> {
        let mut builder = Config::builder();
        for (key, value) in pairs {
            builder = builder.set_override(*key, *value).unwrap();
        }
        Settings::from_config(builder.build().unwrap())
    }

    #[test]
    fn test_defaults() {
        let settings = with_overrides(&[]).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(
            settings.api_base_url,
            "https://hm-sense-open-data-api.kube.cs.hm.edu/api"
        );
        assert_eq!(settings.api_request_timeout_seconds, 30);
        assert_eq!(settings.default_time_window_hours, 3);
        assert_eq!(settings.socket_addr().unwrap().port(), 8000);
        assert_eq!(settings.calendar_timezone, Tz::UTC);
        assert!(settings.model_dir.is_none());
    }

    #[test]
    fn test_overrides() {
        let settings = with_overrides(&[
            ("calendar_timezone", "Europe/Berlin"),
            ("api_request_timeout_seconds", "5"),
            ("log_format", "json"),
            ("model_dir", "/srv/models"),
        ])
        .unwrap();

        assert_eq!(settings.calendar_timezone, chrono_tz::Europe::Berlin);
        assert_eq!(settings.extractor_config().timezone, chrono_tz::Europe::Berlin);
        assert_eq!(settings.source_config().timeout_secs, 5);
        assert_eq!(settings.log_format, LogFormat::Json);
        assert_eq!(settings.model_dir, Some(PathBuf::from("/srv/models")));
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(matches!(
            with_overrides(&[("api_request_timeout_seconds", "0")]),
            Err(SettingsError::Invalid { field: "api_request_timeout_seconds", .. })
        ));
        assert!(matches!(
            with_overrides(&[("default_time_window_hours", "0")]),
            Err(SettingsError::Invalid { field: "default_time_window_hours", .. })
        ));
        assert!(matches!(
            with_overrides(&[("bind_address", "not-an-address")]),
            Err(SettingsError::Invalid { field: "bind_address", .. })
        ));
        assert!(matches!(
            with_overrides(&[("calendar_timezone", "Mars/Olympus")]),
            Err(SettingsError::Load(_))
        ));
    }
}

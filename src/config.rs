//! Configuration module for the price relay.
//!
//! All configuration is loaded from environment variables with sensible defaults.
//! Vendor credentials are optional at startup; missing ones surface as warnings
//! and as per-request errors instead of refusing to boot.

use std::env;
use std::fmt;

use serde::Serialize;

/// Service version reported by `/health` and `/debug`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_OXYLABS_API_URL: &str = "https://realtime.oxylabs.io/v1/queries";
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Service configuration loaded from environment variables.
#[derive(Clone)]
pub struct Config {
    /// Gemini API key (`GEMINI_KEY` or `GEMINI_API_KEY`)
    pub gemini_api_key: Option<String>,
    /// Preferred Gemini model, tried before the built-in candidates
    pub gemini_model: Option<String>,
    /// Gemini REST base URL
    pub gemini_api_base: String,
    /// Per-call Gemini timeout in seconds
    pub gemini_timeout_secs: u64,
    pub oxylabs_username: Option<String>,
    pub oxylabs_password: Option<String>,
    /// Oxylabs realtime endpoint
    pub oxylabs_api_url: String,
    /// Per-call Oxylabs timeout in seconds
    pub oxylabs_timeout_secs: u64,
    /// HTTP API port
    pub port: u16,
    /// Prometheus metrics HTTP port
    pub metrics_port: u16,
    /// Bind address (supports IPv4, IPv6, or dual-stack)
    pub bind_address: String,
    pub debug: bool,
    /// Use the canned search provider instead of Oxylabs
    pub mock_vendors: bool,
    /// Deployment platform label
    pub platform: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: None,
            gemini_api_base: DEFAULT_GEMINI_API_BASE.to_string(),
            gemini_timeout_secs: 30,
            oxylabs_username: None,
            oxylabs_password: None,
            oxylabs_api_url: DEFAULT_OXYLABS_API_URL.to_string(),
            oxylabs_timeout_secs: 60,
            port: 5000,
            metrics_port: 9090,
            bind_address: "auto".to_string(),
            debug: false,
            mock_vendors: false,
            platform: "Railway".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `GEMINI_KEY` / `GEMINI_API_KEY` - Gemini credential (optional)
    /// - `GEMINI_MODEL` - Preferred Gemini model (optional)
    /// - `GEMINI_API_BASE` - Gemini REST base URL
    /// - `GEMINI_TIMEOUT` - Gemini timeout in seconds (default: 30)
    /// - `OXYLABS_USERNAME` / `OXYLABS_PASSWORD` - Oxylabs basic-auth credentials
    /// - `OXYLABS_API_URL` - Oxylabs realtime endpoint
    /// - `OXYLABS_TIMEOUT` - Oxylabs timeout in seconds (default: 60)
    /// - `PORT` - HTTP API port (default: 5000)
    /// - `METRICS_PORT` - Prometheus metrics port (default: 9090)
    /// - `BIND_ADDRESS` - Bind address (default: auto-detect [::] or 0.0.0.0)
    /// - `DEBUG` - Debug flag (default: false)
    /// - `MOCK_VENDORS` - Use canned search results (default: false)
    /// - `PLATFORM` - Deployment platform label (default: Railway)
    /// - `RUST_LOG` - Log level (default: info)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let gemini_api_key = env_var("GEMINI_KEY").or_else(|| env_var("GEMINI_API_KEY"));

        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.port);

        let metrics_port = env::var("METRICS_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.metrics_port);

        let gemini_timeout_secs = timeout_var("GEMINI_TIMEOUT", defaults.gemini_timeout_secs)?;
        let oxylabs_timeout_secs =
            timeout_var("OXYLABS_TIMEOUT", defaults.oxylabs_timeout_secs)?;

        Ok(Config {
            gemini_api_key,
            gemini_model: env_var("GEMINI_MODEL"),
            gemini_api_base: env_var("GEMINI_API_BASE").unwrap_or(defaults.gemini_api_base),
            gemini_timeout_secs,
            oxylabs_username: env_var("OXYLABS_USERNAME"),
            oxylabs_password: env_var("OXYLABS_PASSWORD"),
            oxylabs_api_url: env_var("OXYLABS_API_URL").unwrap_or(defaults.oxylabs_api_url),
            oxylabs_timeout_secs,
            port,
            metrics_port,
            bind_address: env_var("BIND_ADDRESS").unwrap_or(defaults.bind_address),
            debug: flag_var("DEBUG"),
            mock_vendors: flag_var("MOCK_VENDORS"),
            platform: env_var("PLATFORM").unwrap_or(defaults.platform),
            log_level: env_var("RUST_LOG").unwrap_or(defaults.log_level),
        })
    }

    /// Whether both Oxylabs credentials are present.
    pub fn oxylabs_configured(&self) -> bool {
        self.oxylabs_username.is_some() && self.oxylabs_password.is_some()
    }

    pub fn gemini_configured(&self) -> bool {
        self.gemini_api_key.is_some()
    }

    /// Non-fatal configuration problems, logged at startup.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if !self.gemini_configured() {
            warnings.push("GEMINI_API_KEY not set - AI analysis will be disabled".to_string());
        }

        if !self.oxylabs_configured() && !self.mock_vendors {
            warnings.push("Oxylabs credentials not set - price search will fail".to_string());
        }

        warnings
    }

    /// Configuration summary safe to expose over `/debug`.
    pub fn info(&self) -> ConfigInfo {
        ConfigInfo {
            gemini_api_key: mask_secret(self.gemini_api_key.as_deref()),
            oxylabs_username: mask_secret(self.oxylabs_username.as_deref()),
            oxylabs_password: mask_secret(self.oxylabs_password.as_deref()),
            port: self.port,
            debug: self.debug,
            version: VERSION,
            platform: self.platform.clone(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("gemini_api_key", &mask_secret(self.gemini_api_key.as_deref()))
            .field("gemini_model", &self.gemini_model)
            .field("gemini_api_base", &self.gemini_api_base)
            .field("gemini_timeout_secs", &self.gemini_timeout_secs)
            .field("oxylabs_username", &mask_secret(self.oxylabs_username.as_deref()))
            .field("oxylabs_password", &mask_secret(self.oxylabs_password.as_deref()))
            .field("oxylabs_api_url", &self.oxylabs_api_url)
            .field("oxylabs_timeout_secs", &self.oxylabs_timeout_secs)
            .field("port", &self.port)
            .field("metrics_port", &self.metrics_port)
            .field("bind_address", &self.bind_address)
            .field("debug", &self.debug)
            .field("mock_vendors", &self.mock_vendors)
            .field("platform", &self.platform)
            .field("log_level", &self.log_level)
            .finish()
    }
}

/// Configuration status without secret values.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigInfo {
    #[serde(rename = "GEMINI_API_KEY")]
    pub gemini_api_key: String,
    #[serde(rename = "OXYLABS_USERNAME")]
    pub oxylabs_username: String,
    #[serde(rename = "OXYLABS_PASSWORD")]
    pub oxylabs_password: String,
    #[serde(rename = "PORT")]
    pub port: u16,
    #[serde(rename = "DEBUG")]
    pub debug: bool,
    #[serde(rename = "VERSION")]
    pub version: &'static str,
    #[serde(rename = "PLATFORM")]
    pub platform: String,
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|s| !s.trim().is_empty())
}

fn flag_var(name: &str) -> bool {
    env::var(name)
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false)
}

fn timeout_var(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env_var(name) {
        None => Ok(default),
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(secs),
            _ => Err(ConfigError::InvalidValue {
                var: name,
                value: raw,
            }),
        },
    }
}

fn mask_secret(value: Option<&str>) -> String {
    match value {
        Some(v) => format!("SET ({} chars)", v.chars().count()),
        None => "NOT SET".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "GEMINI_KEY",
        "GEMINI_API_KEY",
        "OXYLABS_USERNAME",
        "OXYLABS_PASSWORD",
        "OXYLABS_TIMEOUT",
        "GEMINI_TIMEOUT",
        "PORT",
        "METRICS_PORT",
        "MOCK_VENDORS",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_config_defaults() {
        clear_env();

        let config = Config::from_env().unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.metrics_port, 9090);
        assert_eq!(config.oxylabs_timeout_secs, 60);
        assert_eq!(config.gemini_timeout_secs, 30);
        assert_eq!(config.oxylabs_api_url, DEFAULT_OXYLABS_API_URL);
        assert!(!config.oxylabs_configured());
        assert!(!config.mock_vendors);
    }

    #[test]
    #[serial]
    fn test_gemini_key_prefers_short_name() {
        clear_env();
        env::set_var("GEMINI_KEY", "short-key");
        env::set_var("GEMINI_API_KEY", "long-key");

        let config = Config::from_env().unwrap();
        assert_eq!(config.gemini_api_key.as_deref(), Some("short-key"));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_zero_timeout_is_rejected() {
        clear_env();
        env::set_var("OXYLABS_TIMEOUT", "0");

        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("OXYLABS_TIMEOUT"));

        clear_env();
    }

    #[test]
    fn test_validate_warns_about_missing_credentials() {
        let warnings = Config::default().validate();
        assert_eq!(warnings.len(), 2);

        let config = Config {
            gemini_api_key: Some("k".into()),
            oxylabs_username: Some("u".into()),
            oxylabs_password: Some("p".into()),
            ..Config::default()
        };
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_info_and_debug_mask_secrets() {
        let config = Config {
            gemini_api_key: Some("super-secret".into()),
            ..Config::default()
        };

        let info = config.info();
        assert_eq!(info.gemini_api_key, "SET (12 chars)");
        assert_eq!(info.oxylabs_password, "NOT SET");

        let debug_str = format!("{:?}", config);
        assert!(debug_str.contains("Config"));
        assert!(!debug_str.contains("super-secret"));
    }
}

//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

pub const BACKEND_URL_VAR: &str = "HIVE_BACKEND_URL";
pub const BACKEND_KEY_VAR: &str = "HIVE_BACKEND_KEY";

/// Application configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Backend service endpoint, without a trailing slash.
    pub backend_url: String,
    /// Public access key sent with every backend request.
    pub backend_key: SecretString,
    /// Port of the headless view API.
    pub http_port: u16,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
    /// Sign out after this long without user activity.
    pub inactivity_timeout: Duration,
    /// Background session refresh period.
    pub refresh_interval: Duration,
    /// Directory for rolling log files, if file logging is wanted.
    pub log_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Build config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    ///
    /// Both backend values are required; every other value falls back to a
    /// default when unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend_url = required(&lookup, BACKEND_URL_VAR)?;
        let parsed = reqwest::Url::parse(&backend_url).map_err(|e| ConfigError::InvalidValue {
            key: BACKEND_URL_VAR.to_string(),
            message: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidValue {
                key: BACKEND_URL_VAR.to_string(),
                message: format!("unsupported scheme {}", parsed.scheme()),
            });
        }

        let backend_key = SecretString::from(required(&lookup, BACKEND_KEY_VAR)?);

        Ok(Self {
            backend_url: backend_url.trim_end_matches('/').to_string(),
            backend_key,
            http_port: parse_or(&lookup, "HIVE_HTTP_PORT", 8080)?,
            request_timeout: Duration::from_secs(parse_or(&lookup, "HIVE_REQUEST_TIMEOUT_SECS", 15)?),
            inactivity_timeout: Duration::from_secs(parse_or(
                &lookup,
                "HIVE_INACTIVITY_TIMEOUT_SECS",
                1800,
            )?),
            refresh_interval: Duration::from_secs(parse_or(&lookup, "HIVE_REFRESH_INTERVAL_SECS", 300)?),
            log_dir: lookup("HIVE_LOG_DIR")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
        })
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })
        }
        _ => Ok(default),
    }
}

//! Client configuration parsed from environment variables.

use std::path::PathBuf;

pub const API_URL_VAR: &str = "PHOTOFOLIO_API_URL";
pub const STORE_PATH_VAR: &str = "PHOTOFOLIO_STORE_PATH";
pub const REQUEST_TIMEOUT_VAR: &str = "PHOTOFOLIO_REQUEST_TIMEOUT_SECS";
pub const CONNECT_TIMEOUT_VAR: &str = "PHOTOFOLIO_CONNECT_TIMEOUT_SECS";

pub const DEFAULT_STORE_PATH: &str = ".photofolio/session.json";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing {var}; set it in the environment or pass --api-url")]
    MissingApiUrl { var: &'static str },

    #[error("invalid API URL '{0}': expected http:// or https://")]
    InvalidApiUrl(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend base URL without a trailing slash.
    pub api_url: String,
    /// JSON file backing the durable key-value store.
    pub store_path: PathBuf,
    pub timeouts: Timeouts,
}

impl ClientConfig {
    /// Build config from environment variables only.
    ///
    /// Required:
    /// - `PHOTOFOLIO_API_URL`
    ///
    /// Optional:
    /// - `PHOTOFOLIO_STORE_PATH`: default `.photofolio/session.json`
    /// - `PHOTOFOLIO_REQUEST_TIMEOUT_SECS`: default 30
    /// - `PHOTOFOLIO_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns an error if the API URL is missing or not an http(s) URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::resolve(None, None)
    }

    /// Build config, preferring explicit overrides and falling back to the
    /// environment for anything not supplied.
    ///
    /// # Errors
    ///
    /// Returns an error if no API URL is available or it is not http(s).
    pub fn resolve(api_url: Option<String>, store_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let raw_url = match api_url {
            Some(url) => url,
            None => env_string(API_URL_VAR).ok_or(ConfigError::MissingApiUrl { var: API_URL_VAR })?,
        };
        let api_url = normalize_api_url(&raw_url)?;

        let store_path = store_path
            .or_else(|| env_string(STORE_PATH_VAR).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH));

        let timeouts = Timeouts {
            request_secs: env_parse_u64(REQUEST_TIMEOUT_VAR, DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse_u64(CONNECT_TIMEOUT_VAR, DEFAULT_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self { api_url, store_path, timeouts })
    }
}

pub(crate) fn normalize_api_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::InvalidApiUrl(raw.to_owned()));
    }
    Ok(trimmed.to_owned())
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

pub(crate) fn env_parse_u64(key: &str, default: u64) -> u64 {
    env_string(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

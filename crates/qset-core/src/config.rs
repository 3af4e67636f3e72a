//! Client configuration.

use std::time::Duration;

use crate::error::{QsetError, Result};
use crate::policy::RetryConfig;

pub const DEFAULT_API_URL: &str = "http://api.qset.ai:8000/v0";
pub const API_KEY_ENV: &str = "QSET_API_KEY";
pub const API_URL_ENV: &str = "QSET_API_URL";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root; endpoint paths are appended verbatim.
    pub api_url: String,
    pub api_key: Option<String>,
    pub retry: RetryConfig,
    /// Per-attempt timeout.
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            retry: RetryConfig::default(),
            request_timeout: Duration::from_secs(30),
            user_agent: concat!("qset-rs/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    /// Defaults overlaid with `QSET_API_KEY` and `QSET_API_URL`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(url) = lookup(API_URL_ENV).filter(|u| !u.is_empty()) {
            config.api_url = url;
        }
        config.api_key = lookup(API_KEY_ENV);
        config
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// The configured key, or [`QsetError::MissingCredentials`] if it is
    /// absent or blank.
    pub fn api_key(&self) -> Result<&str> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(QsetError::MissingCredentials),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ClientConfig::default();
        assert_eq!(c.api_url, "http://api.qset.ai:8000/v0");
        assert_eq!(c.retry.max_attempts, 10);
        assert!(matches!(c.api_key(), Err(QsetError::MissingCredentials)));
    }

    #[test]
    fn environment_overrides() {
        let c = ClientConfig::from_lookup(|k| match k {
            "QSET_API_KEY" => Some("secret".into()),
            "QSET_API_URL" => Some("http://localhost:8000/v0".into()),
            _ => None,
        });
        assert_eq!(c.api_key().unwrap(), "secret");
        assert_eq!(c.api_url, "http://localhost:8000/v0");
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let c = ClientConfig::from_lookup(|k| (k == API_KEY_ENV).then(|| "  ".to_string()));
        assert!(matches!(c.api_key(), Err(QsetError::MissingCredentials)));
        assert_eq!(c.api_url, DEFAULT_API_URL);
    }
}

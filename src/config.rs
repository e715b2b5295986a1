//! Configuration management
//!
//! Handles loading and parsing of JSON configuration files with environment
//! variable support for API credentials.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auth::Credentials;
use crate::client::{ClientConfig, CryptoComClient};
use crate::error::{Error, Result};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub exchange: ExchangeConfig,
    #[serde(default)]
    pub data: DataConfig,
}

impl Config {
    /// Load configuration from a JSON file
    ///
    /// `CRYPTOCOM_API_KEY` and `CRYPTOCOM_API_SECRET` override any
    /// credentials present in the file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let mut config: Config = serde_json::from_str(&contents)?;
        config.apply_env();
        Ok(config)
    }

    /// Load from an optional file path, falling back to defaults plus
    /// environment variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let mut config = Config::default();
                config.apply_env();
                Ok(config)
            }
        }
    }

    fn apply_env(&mut self) {
        if let Ok(api_key) = std::env::var("CRYPTOCOM_API_KEY") {
            self.exchange.api_key = Some(api_key);
        }
        if let Ok(api_secret) = std::env::var("CRYPTOCOM_API_SECRET") {
            self.exchange.api_secret = Some(api_secret);
        }
    }

    /// Credentials from this configuration, failing if either half is
    /// missing
    pub fn credentials(&self) -> Result<Credentials> {
        let api_key = self
            .exchange
            .api_key
            .clone()
            .ok_or_else(|| Error::Config("api_key is not configured".to_string()))?;
        let api_secret = self
            .exchange
            .api_secret
            .clone()
            .ok_or_else(|| Error::Config("api_secret is not configured".to_string()))?;
        Ok(Credentials::new(api_key, api_secret))
    }

    /// Build an authenticated client from this configuration
    pub fn client(&self) -> Result<CryptoComClient> {
        Ok(CryptoComClient::with_config(
            self.credentials()?,
            self.exchange.client_config(),
        ))
    }

    /// Build a client for public endpoints only (no credentials required)
    pub fn public_client(&self) -> CryptoComClient {
        CryptoComClient::with_config(
            Credentials::new(
                self.exchange.api_key.clone().unwrap_or_default(),
                self.exchange.api_secret.clone().unwrap_or_default(),
            ),
            self.exchange.client_config(),
        )
    }
}

/// Exchange connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_secret: Option<String>,
    /// Requests per second against the API
    pub rate_limit: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Retry attempts for transport failures
    pub max_retries: u32,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        ExchangeConfig {
            api_key: None,
            api_secret: None,
            rate_limit: 10,
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

impl ExchangeConfig {
    fn client_config(&self) -> ClientConfig {
        ClientConfig::default()
            .with_rate_limit(self.rate_limit)
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_max_retries(self.max_retries)
    }
}

/// Local data storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub data_dir: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            data_dir: "data".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.exchange.rate_limit, 10);
        assert_eq!(config.exchange.timeout_secs, 30);
        assert_eq!(config.data.data_dir, "data");
        assert!(config.exchange.api_key.is_none());
    }

    #[test]
    fn test_parse_partial_config() {
        let config: Config = serde_json::from_str(
            r#"{"exchange": {"api_key": "k", "api_secret": "s",
                "rate_limit": 5, "timeout_secs": 10, "max_retries": 1}}"#,
        )
        .unwrap();

        assert_eq!(config.exchange.api_key.as_deref(), Some("k"));
        assert_eq!(config.exchange.rate_limit, 5);
        // data section falls back to defaults
        assert_eq!(config.data.data_dir, "data");
    }

    #[test]
    fn test_credentials_require_both_halves() {
        let mut config = Config::default();
        config.exchange.api_key = Some("k".to_string());
        config.exchange.api_secret = None;

        assert!(matches!(
            config.credentials().unwrap_err(),
            Error::Config(_)
        ));

        config.exchange.api_secret = Some("s".to_string());
        assert!(config.credentials().is_ok());
    }
}

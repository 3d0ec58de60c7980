use serde::{Deserialize, Serialize};
use std::env;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub links: LinkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Connection settings for the S3-compatible store. All fields except
/// `region` are required; the region is ignored by Storj-style gateways
/// but the signing protocol demands one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    pub default_ttl_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key/value source. `from_env` goes
    /// through here so tests can feed variables without touching the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String, ConfigError> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingVar(key.to_string()))
        };

        let config = Config {
            server: ServerConfig {
                host: lookup("STORAGE_GATEWAY_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: lookup("STORAGE_GATEWAY_PORT")
                    .unwrap_or_else(|| "8080".to_string())
                    .parse()
                    .map_err(|_| ConfigError::InvalidPort)?,
            },
            storage: StorageConfig {
                endpoint: required("STORJ_ENDPOINT")?,
                region: lookup("STORJ_REGION").unwrap_or_else(|| "us-east-1".to_string()),
                access_key: required("STORJ_ACCESS_KEY")?,
                secret_key: required("STORJ_SECRET_KEY")?,
                bucket: required("STORJ_BUCKET")?,
            },
            links: LinkConfig {
                default_ttl_secs: lookup("DOWNLOAD_LINK_TTL_SECS")
                    .unwrap_or_else(|| "3600".to_string())
                    .parse()
                    .unwrap_or(3600),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidPort);
        }

        if !self.storage.endpoint.starts_with("http://") && !self.storage.endpoint.starts_with("https://") {
            return Err(ConfigError::InvalidConfig(
                "Endpoint must be an http(s) URL".to_string(),
            ));
        }

        if self.links.default_ttl_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "Download link TTL must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

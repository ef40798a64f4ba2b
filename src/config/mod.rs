//! Server configuration.
//!
//! Configuration comes from .env files, environment variables and an optional
//! YAML file. Priority: YAML > ENV vars > .env values > defaults. Per-business
//! assistant settings live in their own JSON directory, loaded by
//! [`BusinessDirectory`].
//!
//! # Example
//! ```rust,no_run
//! use leadline_gateway::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), leadline_gateway::config::ConfigError> {
//! // Environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // YAML file with environment variable base
//! let config = ServerConfig::from_file(&PathBuf::from("config.yaml"))?;
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

mod business;
mod yaml;

pub use business::{BusinessConfig, BusinessDirectory};

use thiserror::Error;

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// YAML file did not parse
    #[error("failed to parse config file {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    /// An environment variable held an unusable value
    #[error("invalid value for {name}: {reason}")]
    InvalidEnv { name: &'static str, reason: String },

    /// Final configuration failed validation
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// TLS configuration for HTTPS and WSS
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Server configuration
///
/// Contains everything needed to run the gateway: listen address and TLS,
/// the public hostname handed to the telephony provider, realtime backend
/// settings, the per-business config directory, lead delivery and the
/// security limits.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    /// Externally reachable hostname, used to build the websocket URL in the
    /// voice webhook response. No scheme, e.g. "gateway.example.com".
    pub public_host: String,

    /// OpenAI API key for the Realtime API
    pub openai_api_key: Option<String>,
    /// Realtime model identifier
    pub realtime_model: String,
    /// Seconds after which a stale in-flight model turn is reclaimed
    pub turn_timeout_secs: Option<u64>,

    /// Directory of per-business JSON configuration files
    pub clients_dir: PathBuf,

    /// Webhook endpoint for captured leads; log-only delivery when unset
    pub lead_webhook_url: Option<String>,

    // Rate limiting configuration
    /// Maximum requests per second per IP address
    /// Default: 60
    pub rate_limit_requests_per_second: u32,
    /// Maximum burst size for rate limiting
    /// Default: 10
    pub rate_limit_burst_size: u32,

    /// Maximum concurrent bridged calls
    /// Default: 50
    pub max_concurrent_calls: usize,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// The .env file is loaded in main.rs at application startup, so values
    /// from it appear here as ordinary environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            host: env_or("HOST", "0.0.0.0"),
            port: parse_env("PORT", 3000)?,
            tls: tls_from_env(),
            public_host: env_or("PUBLIC_HOST", "localhost:3000"),
            openai_api_key: std::env::var("OPENAI_API_KEY").ok().filter(|v| !v.is_empty()),
            realtime_model: env_or("REALTIME_MODEL", "gpt-4o-realtime-preview"),
            turn_timeout_secs: opt_parse_env("TURN_TIMEOUT_SECS")?,
            clients_dir: PathBuf::from(env_or("CLIENTS_DIR", "clients")),
            lead_webhook_url: std::env::var("LEAD_WEBHOOK_URL").ok().filter(|v| !v.is_empty()),
            rate_limit_requests_per_second: parse_env("RATE_LIMIT_REQUESTS_PER_SECOND", 60)?,
            rate_limit_burst_size: parse_env("RATE_LIMIT_BURST_SIZE", 10)?,
            max_concurrent_calls: parse_env("MAX_CONCURRENT_CALLS", 50)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base.
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let yaml = yaml::YamlConfig::from_file(path)?;

        let mut config = Self::from_env()?;
        yaml.apply_to(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Server address in "host:port" form.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether TLS configuration is present.
    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.public_host.is_empty() {
            return Err(ConfigError::Invalid("public_host must not be empty".to_string()));
        }
        if self.public_host.contains("://") {
            return Err(ConfigError::Invalid(
                "public_host must be a bare hostname, without a scheme".to_string(),
            ));
        }
        if self.rate_limit_requests_per_second == 0 {
            return Err(ConfigError::Invalid(
                "rate_limit_requests_per_second must be greater than zero".to_string(),
            ));
        }
        if self.max_concurrent_calls == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrent_calls must be greater than zero".to_string(),
            ));
        }
        if let Some(0) = self.turn_timeout_secs {
            return Err(ConfigError::Invalid(
                "turn_timeout_secs must be greater than zero when set".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => {
            value.parse().map_err(|err: T::Err| ConfigError::InvalidEnv {
                name,
                reason: err.to_string(),
            })
        }
        _ => Ok(default),
    }
}

fn opt_parse_env<T>(name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => value
            .parse()
            .map(Some)
            .map_err(|err: T::Err| ConfigError::InvalidEnv {
                name,
                reason: err.to_string(),
            }),
        _ => Ok(None),
    }
}

fn tls_from_env() -> Option<TlsConfig> {
    let cert = std::env::var("TLS_CERT_PATH").ok().filter(|v| !v.is_empty())?;
    let key = std::env::var("TLS_KEY_PATH").ok().filter(|v| !v.is_empty())?;
    Some(TlsConfig {
        cert_path: PathBuf::from(cert),
        key_path: PathBuf::from(key),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> ServerConfig {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 3000,
            tls: None,
            public_host: "gateway.example.com".to_string(),
            openai_api_key: Some("sk-test".to_string()),
            realtime_model: "gpt-4o-realtime-preview".to_string(),
            turn_timeout_secs: Some(30),
            clients_dir: PathBuf::from("clients"),
            lead_webhook_url: None,
            rate_limit_requests_per_second: 60,
            rate_limit_burst_size: 10,
            max_concurrent_calls: 50,
        }
    }

    #[test]
    fn test_address_format() {
        let config = base_config();
        assert_eq!(config.address(), "0.0.0.0:3000");
        assert!(!config.is_tls_enabled());
    }

    #[test]
    fn test_validate_rejects_scheme_in_public_host() {
        let mut config = base_config();
        config.public_host = "https://gateway.example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let mut config = base_config();
        config.max_concurrent_calls = 0;
        assert!(config.validate().is_err());

        let mut config = base_config();
        config.turn_timeout_secs = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(base_config().validate().is_ok());
    }
}

//! # Configuration Management
//!
//! Environment-driven configuration for the storage backend servers. Values
//! are read from `CAPACT_*` and `VAULT_*` variables (optionally preloaded from
//! a `.env` file by the binary) and validated before use.

pub mod settings;

pub use settings::{
    AppConfig, ObservabilityConfig, ReleaseBackendConfig, SecretBackendConfig, ServerConfig,
    VaultProviderConfig,
};

use crate::errors::{Error, Result};
use std::str::FromStr;

/// Application configuration loaded from the environment
pub type Config = AppConfig;

impl AppConfig {
    /// Create configuration from environment variables and validate it
    pub fn from_env() -> Result<Self> {
        let config = Self {
            server: ServerConfig::from_env()?,
            observability: ObservabilityConfig::from_env()?,
            secret: SecretBackendConfig::from_env(),
            release: ReleaseBackendConfig::from_env(),
        };

        config.validate()?;
        Ok(config)
    }
}

impl ServerConfig {
    /// Create ServerConfig from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            bind_address: env_or("CAPACT_BACKEND_BIND_ADDRESS", defaults.bind_address),
            port: parse_env("CAPACT_BACKEND_PORT", defaults.port)?,
            request_timeout_seconds: parse_env(
                "CAPACT_BACKEND_REQUEST_TIMEOUT_SECONDS",
                defaults.request_timeout_seconds,
            )?,
        })
    }
}

impl ObservabilityConfig {
    /// Create ObservabilityConfig from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            enable_metrics: bool_env("CAPACT_METRICS_ENABLED", defaults.enable_metrics),
            metrics_port: parse_env("CAPACT_METRICS_PORT", defaults.metrics_port)?,
            service_name: env_or("CAPACT_SERVICE_NAME", defaults.service_name),
            log_level: env_or("CAPACT_LOG_LEVEL", defaults.log_level),
            json_logging: bool_env("CAPACT_LOG_JSON", defaults.json_logging),
        })
    }
}

impl SecretBackendConfig {
    /// Create SecretBackendConfig from environment variables
    ///
    /// Uses:
    /// - `CAPACT_SECRET_PROVIDERS` (comma-separated, default: "vault")
    /// - `CAPACT_SECRET_PATH_PREFIX` (default: "capact")
    /// - `VAULT_ADDR`, `VAULT_TOKEN`, `VAULT_NAMESPACE`, `VAULT_MOUNT_PATH`
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let providers = std::env::var("CAPACT_SECRET_PROVIDERS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or(defaults.providers);

        Self {
            providers,
            path_prefix: env_or("CAPACT_SECRET_PATH_PREFIX", defaults.path_prefix),
            vault: VaultProviderConfig::from_env(),
        }
    }
}

impl VaultProviderConfig {
    /// Load Vault settings; `None` when `VAULT_ADDR` is not set
    pub fn from_env() -> Option<Self> {
        let address = std::env::var("VAULT_ADDR").ok()?;

        Some(Self {
            address,
            token: std::env::var("VAULT_TOKEN").ok(),
            namespace: std::env::var("VAULT_NAMESPACE").ok(),
            mount_path: env_or("VAULT_MOUNT_PATH", "secret".to_string()),
        })
    }
}

impl ReleaseBackendConfig {
    /// Create ReleaseBackendConfig from environment variables
    pub fn from_env() -> Self {
        Self { default_driver: env_or("CAPACT_HELM_DRIVER", Self::default().default_driver) }
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn bool_env(key: &str, default: bool) -> bool {
    std::env::var(key).map(|s| s.eq_ignore_ascii_case("true") || s == "1").unwrap_or(default)
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.parse().map_err(|e| Error::config(format!("Invalid {}: {}", key, e))),
        Err(_) => Ok(default),
    }
}

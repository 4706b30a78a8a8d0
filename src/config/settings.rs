//! # Configuration Settings
//!
//! Defines the configuration structure for the storage backend servers.

use crate::errors::{Error, Result};
use crate::secrets::SecretProviderKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use validator::Validate;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct AppConfig {
    /// gRPC server configuration
    #[validate(nested)]
    pub server: ServerConfig,

    /// Observability configuration
    #[validate(nested)]
    pub observability: ObservabilityConfig,

    /// Secret storage backend configuration
    #[validate(nested)]
    pub secret: SecretBackendConfig,

    /// Helm release storage backend configuration
    #[validate(nested)]
    pub release: ReleaseBackendConfig,
}

impl AppConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self)?;
        self.validate_custom()
    }

    /// Checks that the field-level validators cannot express
    fn validate_custom(&self) -> Result<()> {
        if self.observability.enable_metrics && self.observability.metrics_port == self.server.port
        {
            return Err(Error::config("gRPC server and metrics ports cannot be the same"));
        }

        self.secret.validate_providers()
    }
}

/// gRPC server configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    /// Server bind address
    #[validate(length(min = 1, message = "Bind address cannot be empty"))]
    pub bind_address: String,

    /// Server port
    #[validate(range(min = 1, message = "Port must be between 1 and 65535"))]
    pub port: u16,

    /// Per-request timeout in seconds
    #[validate(range(min = 1, max = 300, message = "Timeout must be between 1 and 300 seconds"))]
    pub request_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_address: "0.0.0.0".to_string(), port: 50051, request_timeout_seconds: 30 }
    }
}

impl ServerConfig {
    /// Get the `host:port` string the server binds to
    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

/// Observability configuration for logging and metrics
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ObservabilityConfig {
    /// Enable the Prometheus metrics exporter
    pub enable_metrics: bool,

    /// Metrics server port (0 = disabled)
    pub metrics_port: u16,

    /// Service name attached to metrics as a global label
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service_name: String,

    /// Log level (trace, debug, info, warn, error)
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            enable_metrics: false,
            metrics_port: 9090,
            service_name: "typeinstance-backends".to_string(),
            log_level: "info".to_string(),
            json_logging: false,
        }
    }
}

impl ObservabilityConfig {
    /// Get metrics bind address (None if disabled)
    pub fn metrics_bind_address(&self) -> Option<String> {
        if self.metrics_port == 0 {
            None
        } else {
            Some(format!("0.0.0.0:{}", self.metrics_port))
        }
    }
}

/// Secret storage backend configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SecretBackendConfig {
    /// Names of the secret providers to load
    #[validate(length(min = 1, message = "At least one secret provider must be configured"))]
    pub providers: Vec<String>,

    /// First segment of every TypeInstance secret path
    #[validate(length(min = 1, message = "Secret path prefix cannot be empty"))]
    pub path_prefix: String,

    /// Vault settings, required when the `vault` provider is enabled
    #[validate(nested)]
    pub vault: Option<VaultProviderConfig>,
}

impl Default for SecretBackendConfig {
    fn default() -> Self {
        Self {
            providers: vec![SecretProviderKind::Vault.as_str().to_string()],
            path_prefix: "capact".to_string(),
            vault: None,
        }
    }
}

impl SecretBackendConfig {
    /// Parse the configured provider names, rejecting unknown and duplicate entries
    pub fn provider_kinds(&self) -> Result<Vec<SecretProviderKind>> {
        let mut seen = HashSet::new();
        let mut kinds = Vec::with_capacity(self.providers.len());

        for name in &self.providers {
            let kind: SecretProviderKind = name.parse().map_err(Error::config)?;
            if !seen.insert(kind) {
                return Err(Error::config(format!("Secret provider '{}' configured twice", name)));
            }
            kinds.push(kind);
        }

        Ok(kinds)
    }

    fn validate_providers(&self) -> Result<()> {
        let kinds = self.provider_kinds()?;
        if kinds.contains(&SecretProviderKind::Vault) && self.vault.is_none() {
            return Err(Error::config("The vault secret provider requires VAULT_ADDR to be set"));
        }
        Ok(())
    }
}

/// Configuration for the Vault KV v2 secret provider
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VaultProviderConfig {
    /// Vault server address
    #[validate(length(min = 1, message = "Vault address cannot be empty"))]
    pub address: String,

    /// Vault authentication token
    #[serde(skip_serializing)]
    pub token: Option<String>,

    /// Vault namespace (for Enterprise)
    pub namespace: Option<String>,

    /// KV v2 mount path
    #[validate(length(min = 1, message = "KV mount path cannot be empty"))]
    pub mount_path: String,
}

/// Helm release storage backend configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReleaseBackendConfig {
    /// Storage driver used when the request context does not name one
    #[validate(length(min = 1, message = "Default Helm driver cannot be empty"))]
    pub default_driver: String,
}

impl Default for ReleaseBackendConfig {
    fn default() -> Self {
        Self { default_driver: "secrets".to_string() }
    }
}

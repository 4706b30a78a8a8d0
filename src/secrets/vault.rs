//! Vault secret provider implementation
//!
//! Stores TypeInstance mappings in a HashiCorp Vault KV v2 engine. Each secret
//! path becomes one KV entry whose data is the flat field map.

use super::error::{ProviderError, Result};
use super::provider::{SecretMapping, SecretProvider, SecretProviderKind};
use crate::config::VaultProviderConfig;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};
use vaultrs::api;
use vaultrs::api::kv2::requests::{ReadSecretRequest, SetSecretRequestOptions};
use vaultrs::client::{VaultClient, VaultClientSettingsBuilder};
use vaultrs::error::ClientError;
use vaultrs::kv2;

/// HashiCorp Vault secret provider
pub struct VaultSecretProvider {
    client: VaultClient,
    mount_path: String,
}

impl std::fmt::Debug for VaultSecretProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultSecretProvider")
            .field("mount_path", &self.mount_path)
            .field("client", &"[VaultClient]")
            .finish()
    }
}

impl VaultSecretProvider {
    /// Create a new Vault provider with the given configuration
    pub fn new(config: &VaultProviderConfig) -> Result<Self> {
        let mut settings_builder = VaultClientSettingsBuilder::default();
        settings_builder.address(&config.address);

        if let Some(ref token) = config.token {
            settings_builder.token(token);
        }

        if let Some(ref namespace) = config.namespace {
            settings_builder.namespace(Some(namespace.clone()));
        }

        let settings = settings_builder.build().map_err(|e| {
            ProviderError::config_error(format!("Invalid Vault provider configuration: {}", e))
        })?;

        let client = VaultClient::new(settings).map_err(|e| {
            ProviderError::connection_failed(format!("Failed to create Vault client: {}", e))
        })?;

        info!(address = %config.address, kv_mount = %config.mount_path, "Initialized Vault secret provider");

        Ok(Self { client, mount_path: config.mount_path.clone() })
    }

    /// Read the mapping together with the KV version it was read at
    async fn read(&self, path: &str) -> Result<Option<VersionedMapping>> {
        let endpoint = ReadSecretRequest::builder()
            .mount(self.mount_path.as_str())
            .path(kv_key(path))
            .build()
            .map_err(|e| {
                ProviderError::backend_error(format!("Invalid Vault read request for '{}': {}", path, e))
            })?;

        let response = match api::exec_with_result(&self.client, endpoint).await {
            Ok(response) => response,
            Err(ClientError::APIError { code: 404, .. }) => {
                debug!(path = %path, "Secret path not found in Vault");
                return Ok(None);
            }
            Err(e) => {
                error!(error = %e, path = %path, "Failed to read secret from Vault");
                return Err(ProviderError::backend_error(format!(
                    "Failed to read secret '{}': {}",
                    path, e
                )));
            }
        };

        let data: BTreeMap<String, serde_json::Value> = serde_json::from_value(response.data)?;

        Ok(Some(VersionedMapping {
            mapping: data.into_iter().map(|(field, value)| (field, field_to_string(value))).collect(),
            version: response.metadata.version,
        }))
    }

    /// Write the whole mapping, failing if the entry moved past `version`.
    ///
    /// Version 0 means the entry must not exist yet.
    async fn write(&self, path: &str, mapping: &SecretMapping, version: u64) -> Result<()> {
        let cas = u32::try_from(version).map_err(|_| {
            ProviderError::backend_error(format!(
                "Secret '{}' version {} exceeds the check-and-set range",
                path, version
            ))
        })?;

        let options = SetSecretRequestOptions { cas };
        kv2::set_with_options(&self.client, &self.mount_path, kv_key(path), mapping, options)
            .await
            .map_err(|e| match e {
                ClientError::APIError { code: 400, .. } => {
                    warn!(path = %path, version, "Secret changed concurrently in Vault");
                    ProviderError::backend_error(format!(
                        "Secret '{}' was modified concurrently (expected version {}): {}",
                        path, version, e
                    ))
                }
                e => {
                    error!(error = %e, path = %path, "Failed to write secret to Vault");
                    ProviderError::backend_error(format!("Failed to store secret '{}': {}", path, e))
                }
            })?;
        Ok(())
    }
}

/// Field map read from Vault and the KV version it belongs to
#[derive(Debug)]
struct VersionedMapping {
    mapping: SecretMapping,
    version: u64,
}

#[async_trait]
impl SecretProvider for VaultSecretProvider {
    fn name(&self) -> &str {
        SecretProviderKind::Vault.as_str()
    }

    async fn get_mapping(&self, path: &str) -> Result<Option<SecretMapping>> {
        Ok(self.read(path).await?.map(|entry| entry.mapping))
    }

    async fn put(&self, path: &str, field: &str, value: &str) -> Result<()> {
        let (mut mapping, version) = match self.read(path).await? {
            Some(entry) => (entry.mapping, entry.version),
            None => (SecretMapping::new(), 0),
        };
        mapping.insert(field.to_string(), value.to_string());
        self.write(path, &mapping, version).await
    }

    async fn delete_field(&self, path: &str, field: &str) -> Result<()> {
        let Some(VersionedMapping { mut mapping, version }) = self.read(path).await? else {
            return Ok(());
        };

        if mapping.remove(field).is_some() {
            self.write(path, &mapping, version).await?;
        }
        Ok(())
    }

    async fn delete_mapping(&self, path: &str) -> Result<()> {
        // Metadata delete removes every version of the entry
        kv2::delete_metadata(&self.client, &self.mount_path, kv_key(path)).await.map_err(|e| {
            error!(error = %e, path = %path, "Failed to delete secret from Vault");
            ProviderError::backend_error(format!("Failed to delete secret '{}': {}", path, e))
        })?;

        debug!(path = %path, mount_path = %self.mount_path, "Deleted secret from Vault");
        Ok(())
    }
}

/// KV paths are relative to the mount, without a leading slash
fn kv_key(path: &str) -> &str {
    path.trim_start_matches('/')
}

fn field_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

//! # Secret Storage Backend
//!
//! Stores TypeInstance values and lock state in secret providers.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐    context {"provider": ..}   ┌──────────────────────┐
//! │ SecretStorageBackend │ ────────────────────────────► │ SecretProviderRouter │
//! └──────────────────────┘                               └──────────┬───────────┘
//!                                                                   │
//!                                              ┌────────────────────┼───────────────┐
//!                                              ▼                                    ▼
//!                                   ┌─────────────────────┐          ┌────────────────────────┐
//!                                   │ VaultSecretProvider │          │ InMemorySecretProvider │
//!                                   └─────────────────────┘          └────────────────────────┘
//! ```

pub mod error;
pub mod handler;
pub mod memory;
pub mod provider;
pub mod router;
pub mod vault;

pub use error::ProviderError;
pub use handler::{SecretStorageBackend, FIRST_RESOURCE_VERSION, LOCKED_BY_FIELD};
pub use memory::InMemorySecretProvider;
pub use provider::{SecretMapping, SecretProvider, SecretProviderKind};
pub use router::{select_provider, SecretContext, SecretProviderRouter};
pub use vault::VaultSecretProvider;

use crate::config::SecretBackendConfig;
use crate::errors::{Error, Result};
use std::sync::Arc;

/// Build the provider router for the configured provider names.
///
/// Fails when a configured provider cannot be initialized.
pub fn load_providers(config: &SecretBackendConfig) -> Result<SecretProviderRouter> {
    let mut router = SecretProviderRouter::new();

    for kind in config.provider_kinds()? {
        let provider: Arc<dyn SecretProvider> = match kind {
            SecretProviderKind::Vault => {
                let vault = config.vault.as_ref().ok_or_else(|| {
                    Error::config("The vault secret provider requires VAULT_ADDR to be set")
                })?;
                Arc::new(VaultSecretProvider::new(vault)?)
            }
            SecretProviderKind::Memory => Arc::new(InMemorySecretProvider::new(kind.as_str())),
        };
        router.register(provider);
    }

    if router.is_empty() {
        return Err(Error::config("No secret providers configured"));
    }

    Ok(router)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VaultProviderConfig;

    #[test]
    fn test_load_memory_provider() {
        let config =
            SecretBackendConfig { providers: vec!["memory".to_string()], ..Default::default() };
        let router = load_providers(&config).unwrap();
        assert_eq!(router.provider_names(), vec!["memory"]);
    }

    #[tokio::test]
    async fn test_load_vault_and_memory_providers() {
        let config = SecretBackendConfig {
            providers: vec!["vault".to_string(), "memory".to_string()],
            vault: Some(VaultProviderConfig {
                address: "http://127.0.0.1:8200".to_string(),
                token: Some("root".to_string()),
                namespace: None,
                mount_path: "secret".to_string(),
            }),
            ..Default::default()
        };
        let router = load_providers(&config).unwrap();
        assert_eq!(router.provider_names(), vec!["memory", "vault"]);
    }

    #[test]
    fn test_vault_without_address_fails() {
        let config = SecretBackendConfig::default();
        assert!(matches!(load_providers(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_no_providers_fails() {
        let config = SecretBackendConfig { providers: Vec::new(), ..Default::default() };
        assert!(load_providers(&config).is_err());
    }
}

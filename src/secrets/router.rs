//! Secret provider routing
//!
//! Picks the provider that serves a request based on its JSON context. The
//! provider set is fixed when the router is built.

use super::provider::SecretProvider;
use crate::storage_backend::{decode_context, BackendResult, StorageBackendError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// Request context understood by the secret storage backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretContext {
    #[serde(default)]
    pub provider: String,
}

/// Named set of loaded secret providers
#[derive(Debug, Clone, Default)]
pub struct SecretProviderRouter {
    providers: BTreeMap<String, Arc<dyn SecretProvider>>,
}

impl SecretProviderRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under its own name, replacing any previous one
    pub fn register(&mut self, provider: Arc<dyn SecretProvider>) {
        let name = provider.name().to_string();
        info!(provider = %name, "Registering secret provider");
        self.providers.insert(name, provider);
    }

    /// Builder-style variant of [`register`](Self::register)
    pub fn with_provider(mut self, provider: Arc<dyn SecretProvider>) -> Self {
        self.register(provider);
        self
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Resolve the provider for a raw request context
    pub fn provider_for(&self, context: &[u8]) -> BackendResult<Arc<dyn SecretProvider>> {
        select_provider(&self.providers, context)
    }
}

/// Select a provider for `context` out of `providers`.
///
/// An empty context, or one without a provider name, falls back to the only
/// configured provider.
pub fn select_provider(
    providers: &BTreeMap<String, Arc<dyn SecretProvider>>,
    context: &[u8],
) -> BackendResult<Arc<dyn SecretProvider>> {
    let ctx: SecretContext = decode_context(context)?.unwrap_or_default();

    if ctx.provider.is_empty() {
        return default_provider(providers).map_err(|reason| {
            StorageBackendError::failed_precondition(format!(
                "while getting default provider based on empty context: {}",
                reason
            ))
        });
    }

    providers.get(&ctx.provider).cloned().ok_or_else(|| {
        StorageBackendError::failed_precondition(format!(
            "missing loaded provider with name {:?}",
            ctx.provider
        ))
    })
}

fn default_provider(
    providers: &BTreeMap<String, Arc<dyn SecretProvider>>,
) -> Result<Arc<dyn SecretProvider>, String> {
    match providers.values().next() {
        Some(provider) if providers.len() == 1 => Ok(provider.clone()),
        _ => Err(format!(
            "invalid number of providers configured to get default one: expected: 1, actual: {}",
            providers.len()
        )),
    }
}

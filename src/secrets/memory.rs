//! In-memory secret provider
//!
//! Keeps mappings in a process-local map. Used for local development and as
//! the provider behind handler tests.

use super::error::Result;
use super::provider::{SecretMapping, SecretProvider};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
pub struct InMemorySecretProvider {
    name: String,
    secrets: Arc<RwLock<HashMap<String, SecretMapping>>>,
}

impl InMemorySecretProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_secrets(name, HashMap::new())
    }

    /// Create a provider pre-populated with `secrets`
    pub fn with_secrets(name: impl Into<String>, secrets: HashMap<String, SecretMapping>) -> Self {
        Self { name: name.into(), secrets: Arc::new(RwLock::new(secrets)) }
    }

    /// Copy of everything currently stored
    pub async fn snapshot(&self) -> HashMap<String, SecretMapping> {
        self.secrets.read().await.clone()
    }
}

#[async_trait]
impl SecretProvider for InMemorySecretProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_mapping(&self, path: &str) -> Result<Option<SecretMapping>> {
        Ok(self.secrets.read().await.get(path).cloned())
    }

    async fn put(&self, path: &str, field: &str, value: &str) -> Result<()> {
        self.secrets
            .write()
            .await
            .entry(path.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn delete_field(&self, path: &str, field: &str) -> Result<()> {
        if let Some(mapping) = self.secrets.write().await.get_mut(path) {
            mapping.remove(field);
        }
        Ok(())
    }

    async fn delete_mapping(&self, path: &str) -> Result<()> {
        self.secrets.write().await.remove(path);
        Ok(())
    }
}

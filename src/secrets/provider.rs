//! Secret provider trait and types
//!
//! A secret provider stores flat string mappings under hierarchical paths.
//! TypeInstance values and lock markers are fields of such a mapping.

use super::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Fields stored under a single secret path
pub type SecretMapping = BTreeMap<String, String>;

/// Type of secret provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretProviderKind {
    /// HashiCorp Vault KV v2
    Vault,
    /// Process-local map, lost on restart
    Memory,
}

impl SecretProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vault => "vault",
            Self::Memory => "memory",
        }
    }
}

impl FromStr for SecretProviderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "vault" => Ok(Self::Vault),
            "memory" => Ok(Self::Memory),
            _ => Err(format!("Unknown secret provider: {}", s)),
        }
    }
}

impl fmt::Display for SecretProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Trait for secret providers
///
/// Implementations must be Send + Sync for use in async contexts. None of the
/// operations retry; failures are reported to the caller as they happen.
#[async_trait]
pub trait SecretProvider: Send + Sync + fmt::Debug {
    /// Name under which the provider is selected by request contexts
    fn name(&self) -> &str;

    /// Read every field stored under `path`.
    ///
    /// Returns `None` when nothing exists at the path.
    async fn get_mapping(&self, path: &str) -> Result<Option<SecretMapping>>;

    /// Set a single field, creating the path if needed
    async fn put(&self, path: &str, field: &str, value: &str) -> Result<()>;

    /// Remove a single field; removing a missing field is not an error
    async fn delete_field(&self, path: &str, field: &str) -> Result<()>;

    /// Remove the path together with all of its fields
    async fn delete_mapping(&self, path: &str) -> Result<()>;
}

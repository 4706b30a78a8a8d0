//! Manifest references and TypeInstance backend types shared across the crate.

pub mod backend_collection;

pub use backend_collection::{
    TypeInstanceBackendCollection, TypeInstanceBackendCollectionBuilder, MAX_PATTERN_ITERATIONS,
};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Path prefix every manifest path carries
pub const OCF_PATH_PREFIX: &str = "cap.";

/// Type that storage backend TypeInstances extend
pub const HUB_STORAGE_TYPE_PATH: &str = "cap.core.type.hub.storage";

/// Full path and revision of a Type.
///
/// An empty revision stands for "latest".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeRef {
    pub path: String,
    #[serde(default)]
    pub revision: String,
}

/// Reference to any manifest by path and revision
pub type ManifestRef = TypeRef;

impl TypeRef {
    pub fn new(path: impl Into<String>, revision: impl Into<String>) -> Self {
        Self { path: path.into(), revision: revision.into() }
    }

    /// Reference to the latest revision of `path`
    pub fn latest(path: impl Into<String>) -> Self {
        Self { path: path.into(), revision: String::new() }
    }

    /// Both path and revision are set
    pub fn is_complete(&self) -> bool {
        !self.path.is_empty() && !self.revision.is_empty()
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.revision.is_empty() {
            write!(f, "{}", self.path)
        } else {
            write!(f, "{}:{}", self.path, self.revision)
        }
    }
}

/// Manifest reference with an optional revision, as written in policies
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManifestRefWithOptRevision {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
}

impl From<&ManifestRefWithOptRevision> for TypeRef {
    fn from(r: &ManifestRefWithOptRevision) -> Self {
        Self { path: r.path.clone(), revision: r.revision.clone().unwrap_or_default() }
    }
}

/// Storage backend a TypeInstance is written to.
///
/// A backend with an empty ID is unconfigured.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeInstanceBackend {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TypeInstanceBackend {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), description: None }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_configured(&self) -> bool {
        !self.id.is_empty()
    }
}

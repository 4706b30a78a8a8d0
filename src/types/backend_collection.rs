//! Resolution of the storage backend responsible for a Type.
//!
//! Entries are keyed by `path:revision`, or by bare `path` when the revision
//! is empty. Paths may end in `.*` to cover a whole subtree. Lookups fall
//! back from the exact TypeRef through ever shorter subtree patterns to the
//! default backend:
//!
//! ```text
//! cap.type.capactio.examples.message:0.1.0
//! cap.type.capactio.examples.*:0.1.0   cap.type.capactio.examples.*
//! cap.type.capactio.*:0.1.0            cap.type.capactio.*
//! cap.type.*:0.1.0                     cap.type.*
//! cap.*:0.1.0                          cap.*
//! <default>
//! ```

use super::{TypeInstanceBackend, TypeRef};
use crate::policy::Policy;
use std::collections::HashMap;

/// Upper bound on the subtree patterns tried for one lookup
pub const MAX_PATTERN_ITERATIONS: usize = 30;

const ROOT_PATH: &str = "cap";

fn key(type_ref: &TypeRef) -> String {
    type_ref.to_string()
}

/// Immutable TypeRef to backend lookup table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeInstanceBackendCollection {
    by_type_ref: HashMap<String, TypeInstanceBackend>,
    by_alias: HashMap<String, TypeInstanceBackend>,
    default_backend: Option<TypeInstanceBackend>,
}

impl TypeInstanceBackendCollection {
    pub fn builder() -> TypeInstanceBackendCollectionBuilder {
        TypeInstanceBackendCollectionBuilder::default()
    }

    /// Backend for `type_ref`. Falls back to the default backend, and to an
    /// unconfigured backend when no default is set.
    pub fn get_by_type_ref(&self, type_ref: &TypeRef) -> TypeInstanceBackend {
        if let Some(backend) = self.by_type_ref.get(&key(type_ref)) {
            return backend.clone();
        }

        let mut path = type_ref.path.as_str();
        for _ in 0..MAX_PATTERN_ITERATIONS {
            if path == ROOT_PATH {
                break;
            }
            let Some((parent, _)) = path.rsplit_once('.') else {
                break;
            };
            path = parent;

            let pattern = TypeRef::new(format!("{}.*", path), type_ref.revision.as_str());
            if let Some(backend) = self.by_type_ref.get(&key(&pattern)) {
                return backend.clone();
            }
            if !pattern.revision.is_empty() {
                if let Some(backend) = self.by_type_ref.get(&pattern.path) {
                    return backend.clone();
                }
            }
        }

        self.default_backend.clone().unwrap_or_default()
    }

    pub fn get_by_alias(&self, alias: &str) -> Option<TypeInstanceBackend> {
        self.by_alias.get(alias).cloned()
    }

    pub fn default_backend(&self) -> Option<&TypeInstanceBackend> {
        self.default_backend.as_ref()
    }

    pub fn len(&self) -> usize {
        self.by_type_ref.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type_ref.is_empty()
    }
}

/// Builder for [`TypeInstanceBackendCollection`]. Later entries for the same
/// key replace earlier ones.
#[derive(Debug, Clone, Default)]
pub struct TypeInstanceBackendCollectionBuilder {
    collection: TypeInstanceBackendCollection,
}

impl TypeInstanceBackendCollectionBuilder {
    pub fn set_by_type_ref(mut self, type_ref: TypeRef, backend: TypeInstanceBackend) -> Self {
        self.collection.by_type_ref.insert(key(&type_ref), backend);
        self
    }

    pub fn set_by_alias(mut self, alias: impl Into<String>, backend: TypeInstanceBackend) -> Self {
        self.collection.by_alias.insert(alias.into(), backend);
        self
    }

    pub fn set_default(mut self, backend: TypeInstanceBackend) -> Self {
        self.collection.default_backend = Some(backend);
        self
    }

    /// Register the backend of every TypeInstance rule in `policy`
    pub fn with_policy(self, policy: &Policy) -> Self {
        policy.type_instance.rules.iter().fold(self, |builder, rule| {
            builder.set_by_type_ref(TypeRef::from(&rule.type_ref), rule.backend.to_backend())
        })
    }

    pub fn build(self) -> TypeInstanceBackendCollection {
        self.collection
    }
}

//! # Policy
//!
//! In-memory policy document: Interface rules selecting Implementations and
//! injecting TypeInstances, and TypeInstance rules choosing the storage
//! backend per Type.
//!
//! ```yaml
//! interface:
//!   rules:
//!     - interface:
//!         path: cap.interface.database.postgresql.install
//!       oneOf:
//!         - implementationConstraints:
//!             path: cap.implementation.bitnami.postgresql.install
//!           inject:
//!             requiredTypeInstances:
//!               - id: 9038dcdc-e959-41c4-a690-d8ebf929ac0c
//!                 description: Helm storage
//! typeInstance:
//!   rules:
//!     - typeRef:
//!         path: cap.type.helm.*
//!       backend:
//!         id: 9038dcdc-e959-41c4-a690-d8ebf929ac0c
//! ```

pub mod metadata;

pub use metadata::{HubClient, ResolveError, Resolver};

use crate::errors::{Error, Result};
use crate::types::{ManifestRefWithOptRevision, TypeInstanceBackend, TypeRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    #[serde(default)]
    pub interface: InterfacePolicy,
    #[serde(default)]
    pub type_instance: TypeInstancePolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterfacePolicy {
    #[serde(default)]
    pub rules: Vec<RulesForInterface>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulesForInterface {
    pub interface: ManifestRefWithOptRevision,
    #[serde(default)]
    pub one_of: Vec<PolicyRule>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation_constraints: Option<ImplementationConstraints>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inject: Option<InjectData>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImplementationConstraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires: Option<Vec<ManifestRefWithOptRevision>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<ManifestRefWithOptRevision>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectData {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_type_instances: Vec<TypeInstanceReference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_parameters: Vec<AdditionalParameter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_type_instances: Vec<AdditionalTypeInstanceReference>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdditionalParameter {
    pub name: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdditionalTypeInstanceReference {
    pub name: String,
    #[serde(flatten)]
    pub reference: TypeInstanceReference,
}

/// TypeInstance referenced by ID, with metadata filled in by the [`Resolver`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeInstanceReference {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_ref: Option<TypeRef>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub extends_hub_storage: bool,
}

impl TypeInstanceReference {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), ..Default::default() }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Human readable form used in error messages
    pub fn describe(&self) -> String {
        match &self.description {
            Some(description) => {
                format!("TypeInstance {:?} (description: {:?})", self.id, description)
            }
            None => format!("TypeInstance {:?}", self.id),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.type_ref.as_ref().is_some_and(TypeRef::is_complete)
    }
}

impl fmt::Display for TypeInstanceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeInstancePolicy {
    #[serde(default)]
    pub rules: Vec<RulesForTypeInstance>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulesForTypeInstance {
    pub type_ref: ManifestRefWithOptRevision,
    pub backend: TypeInstanceBackendRule,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeInstanceBackendRule {
    #[serde(flatten)]
    pub reference: TypeInstanceReference,
}

impl TypeInstanceBackendRule {
    pub fn to_backend(&self) -> TypeInstanceBackend {
        TypeInstanceBackend {
            id: self.reference.id.clone(),
            description: self.reference.description.clone(),
        }
    }
}

impl Policy {
    pub fn from_yaml(input: &str) -> Result<Self> {
        serde_yaml::from_str(input).map_err(|e| Error::yaml(e, "while parsing YAML policy"))
    }

    pub fn from_json(input: &str) -> Result<Self> {
        serde_json::from_str(input).map_err(|e| Error::serialization(e, "while parsing JSON policy"))
    }

    /// Load a policy file. `.json` files are parsed as JSON, anything else as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::io(e, format!("while reading policy file {}", path.display())))?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Self::from_json(&content)
        } else {
            Self::from_yaml(&content)
        }
    }

    /// Every TypeInstance reference in the policy, in document order
    pub fn type_instance_references(&self) -> impl Iterator<Item = &TypeInstanceReference> {
        let injected = self
            .interface
            .rules
            .iter()
            .flat_map(|rule| rule.one_of.iter())
            .filter_map(|rule| rule.inject.as_ref())
            .flat_map(|inject| {
                inject
                    .required_type_instances
                    .iter()
                    .chain(inject.additional_type_instances.iter().map(|ti| &ti.reference))
            });

        let backends = self.type_instance.rules.iter().map(|rule| &rule.backend.reference);

        injected.chain(backends)
    }

    /// Mutable counterpart of [`Policy::type_instance_references`]
    pub fn type_instance_references_mut(
        &mut self,
    ) -> impl Iterator<Item = &mut TypeInstanceReference> {
        let injected = self
            .interface
            .rules
            .iter_mut()
            .flat_map(|rule| rule.one_of.iter_mut())
            .filter_map(|rule| rule.inject.as_mut())
            .flat_map(|inject| {
                inject
                    .required_type_instances
                    .iter_mut()
                    .chain(inject.additional_type_instances.iter_mut().map(|ti| &mut ti.reference))
            });

        let backends = self.type_instance.rules.iter_mut().map(|rule| &mut rule.backend.reference);

        injected.chain(backends)
    }
}

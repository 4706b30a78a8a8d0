//! Resolution of TypeInstance metadata referenced by a policy.
//!
//! Policies reference TypeInstances by ID only. Before the policy is used the
//! resolver asks the Hub for each TypeInstance's TypeRef and whether that Type
//! extends the Hub storage Type, and writes both back into the policy.

use super::Policy;
use crate::errors::MultiError;
use crate::hub::HubError;
use crate::types::{TypeRef, HUB_STORAGE_TYPE_PATH};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info};

/// Hub lookups needed to resolve policy metadata
#[async_trait]
pub trait HubClient: Send + Sync {
    /// TypeRefs of the given TypeInstances. IDs unknown to the Hub are absent
    /// from the result.
    async fn find_type_instances_type_ref(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, TypeRef>, HubError>;

    /// `additionalRefs` of every Type revision whose path matches `path_pattern`
    async fn list_types_additional_refs(
        &self,
        path_pattern: &str,
    ) -> Result<HashMap<TypeRef, Vec<String>>, HubError>;
}

#[derive(thiserror::Error, Debug)]
pub enum ResolveError {
    #[error("{context}: {source}")]
    Hub {
        context: String,
        #[source]
        source: HubError,
    },

    #[error(transparent)]
    MissingTypeRefs(#[from] MultiError),
}

impl ResolveError {
    fn hub(source: HubError, context: impl Into<String>) -> Self {
        Self::Hub { context: context.into(), source }
    }
}

/// Resolves policy TypeInstance metadata against the Hub
#[derive(Clone)]
pub struct Resolver {
    hub: Arc<dyn HubClient>,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver").finish_non_exhaustive()
    }
}

impl Resolver {
    pub fn new(hub: Arc<dyn HubClient>) -> Self {
        Self { hub }
    }

    /// Fill in `type_ref` and `extends_hub_storage` for every unresolved
    /// TypeInstance reference in `policy`.
    ///
    /// All lookups happen before the policy is touched; on error it is left
    /// unchanged.
    pub async fn resolve_type_instance_metadata(
        &self,
        policy: &mut Policy,
    ) -> Result<(), ResolveError> {
        let mut seen = BTreeSet::new();
        let unresolved: Vec<_> = policy
            .type_instance_references()
            .filter(|reference| !reference.is_resolved())
            .filter(|reference| seen.insert(reference.id.clone()))
            .cloned()
            .collect();

        if unresolved.is_empty() {
            debug!("All policy TypeInstances already resolved");
            return Ok(());
        }

        let ids: Vec<String> = unresolved.iter().map(|reference| reference.id.clone()).collect();
        let type_refs = self
            .hub
            .find_type_instances_type_ref(&ids)
            .await
            .map_err(|e| ResolveError::hub(e, "while finding TypeRef for TypeInstances"))?;

        let mut missing = MultiError::new();
        for reference in &unresolved {
            match type_refs.get(&reference.id) {
                Some(type_ref) if type_ref.is_complete() => {}
                _ => missing.push(format!("missing Type reference for {}", reference.describe())),
            }
        }
        missing.into_result()?;

        let paths: BTreeSet<&str> = ids
            .iter()
            .filter_map(|id| type_refs.get(id))
            .map(|type_ref| type_ref.path.as_str())
            .collect();
        let additional_refs = self
            .hub
            .list_types_additional_refs(&exact_paths_pattern(paths))
            .await
            .map_err(|e| {
                ResolveError::hub(e, "while listing additional references for TypeInstance Types")
            })?;

        let mut updated = 0;
        for reference in policy.type_instance_references_mut() {
            if reference.is_resolved() {
                continue;
            }
            let Some(type_ref) = type_refs.get(&reference.id) else {
                continue;
            };

            reference.extends_hub_storage = additional_refs
                .get(type_ref)
                .is_some_and(|refs| refs.iter().any(|r| r == HUB_STORAGE_TYPE_PATH));
            reference.type_ref = Some(type_ref.clone());
            updated += 1;
        }

        info!(type_instances = ids.len(), references = updated, "Resolved policy TypeInstance metadata");
        Ok(())
    }
}

/// Regex matching exactly the given paths
fn exact_paths_pattern<'a>(paths: impl IntoIterator<Item = &'a str>) -> String {
    let alternatives: Vec<String> = paths.into_iter().map(regex::escape).collect();
    format!("^({})$", alternatives.join("|"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{
        AdditionalTypeInstanceReference, InjectData, PolicyRule, RulesForInterface,
        RulesForTypeInstance, TypeInstanceBackendRule, TypeInstanceReference,
    };
    use crate::types::ManifestRefWithOptRevision;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeHub {
        type_instances: HashMap<String, TypeRef>,
        types: HashMap<TypeRef, Vec<String>>,
        fail_find: bool,
        find_calls: Mutex<Vec<Vec<String>>>,
        patterns: Mutex<Vec<String>>,
    }

    impl FakeHub {
        fn with_type_instance(mut self, id: &str, type_ref: TypeRef) -> Self {
            self.type_instances.insert(id.to_string(), type_ref);
            self
        }

        fn with_type(mut self, type_ref: TypeRef, additional_refs: &[&str]) -> Self {
            self.types.insert(type_ref, additional_refs.iter().map(|r| r.to_string()).collect());
            self
        }
    }

    #[async_trait]
    impl HubClient for FakeHub {
        async fn find_type_instances_type_ref(
            &self,
            ids: &[String],
        ) -> Result<HashMap<String, TypeRef>, HubError> {
            self.find_calls.lock().unwrap().push(ids.to_vec());
            if self.fail_find {
                return Err(HubError::MissingData);
            }
            Ok(ids
                .iter()
                .filter_map(|id| self.type_instances.get(id).map(|tr| (id.clone(), tr.clone())))
                .collect())
        }

        async fn list_types_additional_refs(
            &self,
            path_pattern: &str,
        ) -> Result<HashMap<TypeRef, Vec<String>>, HubError> {
            self.patterns.lock().unwrap().push(path_pattern.to_string());
            let re = regex::Regex::new(path_pattern).unwrap();
            Ok(self
                .types
                .iter()
                .filter(|(type_ref, _)| re.is_match(&type_ref.path))
                .map(|(type_ref, refs)| (type_ref.clone(), refs.clone()))
                .collect())
        }
    }

    fn policy() -> Policy {
        Policy {
            interface: crate::policy::InterfacePolicy {
                rules: vec![RulesForInterface {
                    interface: ManifestRefWithOptRevision {
                        path: "cap.interface.database.postgresql.install".into(),
                        revision: None,
                    },
                    one_of: vec![PolicyRule {
                        implementation_constraints: None,
                        inject: Some(InjectData {
                            required_type_instances: vec![
                                TypeInstanceReference::new("sa").with_description("GCP SA"),
                            ],
                            additional_parameters: Vec::new(),
                            additional_type_instances: vec![AdditionalTypeInstanceReference {
                                name: "storage".into(),
                                reference: TypeInstanceReference::new("helm"),
                            }],
                        }),
                    }],
                }],
            },
            type_instance: crate::policy::TypeInstancePolicy {
                rules: vec![RulesForTypeInstance {
                    type_ref: ManifestRefWithOptRevision { path: "cap.type.helm.*".into(), revision: None },
                    backend: TypeInstanceBackendRule {
                        reference: TypeInstanceReference::new("helm").with_description("Helm"),
                    },
                }],
            },
        }
    }

    fn sa_ref() -> TypeRef {
        TypeRef::new("cap.type.gcp.auth.sa", "0.1.0")
    }

    fn helm_ref() -> TypeRef {
        TypeRef::new("cap.type.helm.release.storage", "0.1.0")
    }

    fn resolved_hub() -> FakeHub {
        FakeHub::default()
            .with_type_instance("sa", sa_ref())
            .with_type_instance("helm", helm_ref())
            .with_type(sa_ref(), &[])
            .with_type(helm_ref(), &[HUB_STORAGE_TYPE_PATH])
    }

    #[tokio::test]
    async fn test_resolves_all_references() {
        let hub = Arc::new(resolved_hub());
        let mut policy = policy();

        Resolver::new(hub.clone()).resolve_type_instance_metadata(&mut policy).await.unwrap();

        let inject = policy.interface.rules[0].one_of[0].inject.as_ref().unwrap();
        assert_eq!(inject.required_type_instances[0].type_ref, Some(sa_ref()));
        assert!(!inject.required_type_instances[0].extends_hub_storage);
        assert_eq!(inject.additional_type_instances[0].reference.type_ref, Some(helm_ref()));
        assert!(inject.additional_type_instances[0].reference.extends_hub_storage);

        let backend = &policy.type_instance.rules[0].backend.reference;
        assert_eq!(backend.type_ref, Some(helm_ref()));
        assert!(backend.extends_hub_storage);

        assert_eq!(*hub.find_calls.lock().unwrap(), vec![vec!["sa".to_string(), "helm".to_string()]]);
        assert_eq!(
            *hub.patterns.lock().unwrap(),
            vec![r"^(cap\.type\.gcp\.auth\.sa|cap\.type\.helm\.release\.storage)$"]
        );
    }

    #[tokio::test]
    async fn test_missing_type_refs_are_aggregated() {
        let hub = Arc::new(
            FakeHub::default().with_type_instance("helm", TypeRef::new("cap.type.helm.release.storage", "")),
        );
        let mut policy = policy();
        let before = policy.clone();

        let err = Resolver::new(hub.clone())
            .resolve_type_instance_metadata(&mut policy)
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "2 errors occurred:\n\t* missing Type reference for TypeInstance \"sa\" (description: \"GCP SA\")\n\t* missing Type reference for TypeInstance \"helm\""
        );
        assert_eq!(policy, before);
        assert!(hub.patterns.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_hub_error_leaves_policy_untouched() {
        let hub = Arc::new(FakeHub { fail_find: true, ..Default::default() });
        let mut policy = policy();
        let before = policy.clone();

        let err = Resolver::new(hub).resolve_type_instance_metadata(&mut policy).await.unwrap_err();

        assert!(matches!(err, ResolveError::Hub { .. }));
        assert_eq!(
            err.to_string(),
            "while finding TypeRef for TypeInstances: Hub response does not contain data"
        );
        assert_eq!(policy, before);
    }

    #[tokio::test]
    async fn test_already_resolved_policy_skips_hub() {
        let hub = Arc::new(resolved_hub());
        let mut policy = policy();
        Resolver::new(hub.clone()).resolve_type_instance_metadata(&mut policy).await.unwrap();
        let resolved = policy.clone();

        Resolver::new(hub.clone()).resolve_type_instance_metadata(&mut policy).await.unwrap();

        assert_eq!(policy, resolved);
        assert_eq!(hub.find_calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_policy_is_noop() {
        let hub = Arc::new(FakeHub::default());
        let mut policy = Policy::default();

        Resolver::new(hub.clone()).resolve_type_instance_metadata(&mut policy).await.unwrap();
        assert!(hub.find_calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_exact_paths_pattern() {
        assert_eq!(exact_paths_pattern(["cap.a", "cap.b"]), r"^(cap\.a|cap\.b)$");
        let re = regex::Regex::new(&exact_paths_pattern(["cap.a"])).unwrap();
        assert!(re.is_match("cap.a"));
        assert!(!re.is_match("capXa"));
        assert!(!re.is_match("cap.a.b"));
    }
}

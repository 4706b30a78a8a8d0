//! Policy loading, metadata resolution and backend lookup end to end.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tempfile::NamedTempFile;
use typeinstance_backends::cli::resolve_backend;
use typeinstance_backends::hub::GraphQlHubClient;
use typeinstance_backends::policy::{Policy, Resolver};
use typeinstance_backends::types::{TypeInstanceBackendCollection, TypeRef};
use wiremock::matchers::{body_string_contains, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

const POLICY: &str = r#"
interface:
  rules:
    - interface:
        path: cap.interface.database.postgresql.install
      oneOf:
        - inject:
            requiredTypeInstances:
              - id: helm-storage
                description: Helm release storage
typeInstance:
  rules:
    - typeRef:
        path: cap.type.helm.*
      backend:
        id: helm-storage
        description: Helm release storage
    - typeRef:
        path: cap.type.aws.auth.credentials
        revision: 0.1.0
      backend:
        id: vault-storage
"#;

fn policy_file(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[tokio::test]
async fn resolves_backend_from_yaml_policy() {
    let file = policy_file(".yaml", POLICY);

    let backend = resolve_backend(
        file.path(),
        &TypeRef::new("cap.type.helm.release", "0.1.0"),
        Some("default-storage".into()),
        None,
    )
    .await
    .unwrap();
    assert_eq!(backend.id, "helm-storage");
    assert_eq!(backend.description.as_deref(), Some("Helm release storage"));

    let backend = resolve_backend(
        file.path(),
        &TypeRef::new("cap.type.aws.auth.credentials", "0.1.0"),
        None,
        None,
    )
    .await
    .unwrap();
    assert_eq!(backend.id, "vault-storage");

    let backend = resolve_backend(
        file.path(),
        &TypeRef::latest("cap.type.aws.auth.credentials"),
        Some("default-storage".into()),
        None,
    )
    .await
    .unwrap();
    assert_eq!(backend.id, "default-storage");
}

#[tokio::test]
async fn resolves_backend_from_json_policy() {
    let file = policy_file(
        ".json",
        r#"{"typeInstance":{"rules":[{"typeRef":{"path":"cap.*"},"backend":{"id":"catch-all"}}]}}"#,
    );

    let backend =
        resolve_backend(file.path(), &TypeRef::latest("cap.type.anything"), None, None)
            .await
            .unwrap();
    assert_eq!(backend.id, "catch-all");
}

#[tokio::test]
async fn unreadable_policy_is_reported() {
    let file = policy_file(".yaml", "typeInstance: [");
    let err = resolve_backend(file.path(), &TypeRef::latest("cap.type.x"), None, None)
        .await
        .unwrap_err();
    assert!(err.to_string().starts_with("while loading policy"));
}

async fn hub() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("FindTypeInstancesTypeRef"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"ti0": {"id": "helm-storage", "typeRef": {"path": "cap.type.helm.release.storage", "revision": "0.1.0"}}}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("ListTypes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"types": [{
                "path": "cap.type.helm.release.storage",
                "revisions": [{"revision": "0.1.0", "spec": {"additionalRefs": ["cap.core.type.hub.storage"]}}]
            }]}
        })))
        .expect(1)
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn resolver_enriches_policy_through_hub() {
    let server = hub().await;
    let client = GraphQlHubClient::new(server.uri(), Duration::from_secs(5)).unwrap();

    let mut policy = Policy::from_yaml(POLICY).unwrap();
    policy.type_instance.rules.retain(|rule| rule.backend.reference.id == "helm-storage");

    Resolver::new(Arc::new(client)).resolve_type_instance_metadata(&mut policy).await.unwrap();

    let expected = Some(TypeRef::new("cap.type.helm.release.storage", "0.1.0"));
    for reference in policy.type_instance_references() {
        assert_eq!(reference.type_ref, expected);
        assert!(reference.extends_hub_storage);
    }

    let collection = TypeInstanceBackendCollection::builder().with_policy(&policy).build();
    assert_eq!(collection.get_by_type_ref(&TypeRef::latest("cap.type.helm.chart")).id, "helm-storage");
}

#[tokio::test]
async fn missing_hub_metadata_fails_resolution() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"ti0": null, "ti1": null}})))
        .mount(&server)
        .await;

    let file = policy_file(".yml", POLICY);
    let err = resolve_backend(
        file.path(),
        &TypeRef::latest("cap.type.helm.release"),
        None,
        Some(server.uri()),
    )
    .await
    .unwrap_err();

    let cause = format!("{:#}", err);
    assert!(cause.contains("while resolving policy TypeInstance metadata"));
    assert!(cause.contains("2 errors occurred:"));
    assert!(cause.contains(r#"missing Type reference for TypeInstance "vault-storage""#));
}

//! gRPC round trips against real storage backend servers on loopback.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tonic::transport::Channel;
use tonic::Code;
use typeinstance_backends::release::{
    HelmRelease, InMemoryReleaseClientProducer, ReleaseDetails, ReleaseStorageBackend,
};
use typeinstance_backends::release::types::{HelmChart, HelmChartMetadata};
use typeinstance_backends::secrets::{
    InMemorySecretProvider, SecretProviderRouter, SecretStorageBackend,
};
use typeinstance_backends::storage_backend::proto::{
    GetLockedByRequest, GetValueRequest, OnCreateRequest, OnDeleteRequest, OnLockRequest,
    OnUnlockRequest, OnUpdateRequest,
};
use typeinstance_backends::storage_backend::{
    serve_with_listener, StorageBackend, StorageBackendClient,
};

struct TestServer {
    client: StorageBackendClient<Channel>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<typeinstance_backends::Result<()>>,
}

impl TestServer {
    async fn start<H: StorageBackend>(handler: H) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(serve_with_listener(
            handler,
            listener,
            Duration::from_secs(5),
            async move {
                let _ = rx.await;
            },
        ));

        let client = StorageBackendClient::connect(format!("http://{}", addr)).await.unwrap();
        Self { client, shutdown: Some(tx), handle }
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.handle.await.unwrap().unwrap();
    }
}

fn secret_backend(providers: &[&str]) -> SecretStorageBackend {
    let router = providers.iter().fold(SecretProviderRouter::new(), |router, name| {
        router.with_provider(Arc::new(InMemorySecretProvider::new(*name)))
    });
    SecretStorageBackend::new(router)
}

#[tokio::test]
async fn secret_backend_lifecycle() {
    let server = TestServer::start(secret_backend(&["memory"])).await;
    let mut client = server.client.clone();
    let id = "7c9c5d1e-3a8c-4d1a-9d0a-9d3e2f1b0a11";

    client
        .on_create(OnCreateRequest {
            type_instance_id: id.into(),
            value: br#"{"user":"admin"}"#.to_vec(),
            context: Vec::new(),
        })
        .await
        .unwrap();

    let value = client
        .get_value(GetValueRequest {
            type_instance_id: id.into(),
            resource_version: 1,
            context: br#"{"provider":"memory"}"#.to_vec(),
        })
        .await
        .unwrap()
        .into_inner();
    assert_eq!(value.value.as_deref(), Some(br#"{"user":"admin"}"#.as_slice()));

    client
        .on_lock(OnLockRequest {
            type_instance_id: id.into(),
            context: Vec::new(),
            locked_by: "service/foo".into(),
        })
        .await
        .unwrap();

    let locked_by = client
        .get_locked_by(GetLockedByRequest { type_instance_id: id.into(), context: Vec::new() })
        .await
        .unwrap()
        .into_inner();
    assert_eq!(locked_by.locked_by.as_deref(), Some("service/foo"));

    let status = client
        .on_update(OnUpdateRequest {
            type_instance_id: id.into(),
            new_resource_version: 2,
            new_value: b"updated".to_vec(),
            context: Vec::new(),
        })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::FailedPrecondition);
    assert_eq!(
        status.message(),
        format!(
            "typeInstance locked: path \"/capact/{}\" contains \"locked_by\" property with value \"service/foo\"",
            id
        )
    );

    client
        .on_unlock(OnUnlockRequest { type_instance_id: id.into(), context: Vec::new() })
        .await
        .unwrap();
    client
        .on_update(OnUpdateRequest {
            type_instance_id: id.into(),
            new_resource_version: 2,
            new_value: b"updated".to_vec(),
            context: Vec::new(),
        })
        .await
        .unwrap();

    let value = client
        .get_value(GetValueRequest {
            type_instance_id: id.into(),
            resource_version: 2,
            context: Vec::new(),
        })
        .await
        .unwrap()
        .into_inner();
    assert_eq!(value.value.as_deref(), Some(b"updated".as_slice()));

    client
        .on_delete(OnDeleteRequest { type_instance_id: id.into(), context: Vec::new() })
        .await
        .unwrap();

    let status = client
        .get_value(GetValueRequest {
            type_instance_id: id.into(),
            resource_version: 1,
            context: Vec::new(),
        })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::NotFound);
    assert_eq!(status.message(), format!("TypeInstance \"{}\" in revision 1 was not found", id));

    server.stop().await;
}

#[tokio::test]
async fn secret_backend_provider_selection_errors() {
    let server = TestServer::start(secret_backend(&["memory", "vault"])).await;
    let mut client = server.client.clone();

    let status = client
        .get_value(GetValueRequest {
            type_instance_id: "uuid".into(),
            resource_version: 1,
            context: Vec::new(),
        })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::FailedPrecondition);
    assert_eq!(
        status.message(),
        "while getting default provider based on empty context: invalid number of providers configured to get default one: expected: 1, actual: 2"
    );

    let status = client
        .get_value(GetValueRequest {
            type_instance_id: "uuid".into(),
            resource_version: 1,
            context: br#"{"provider":"aws"}"#.to_vec(),
        })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::FailedPrecondition);
    assert_eq!(status.message(), r#"missing loaded provider with name "aws""#);

    let status = client
        .on_delete(OnDeleteRequest { type_instance_id: "uuid".into(), context: b"{".to_vec() })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::Internal);
    assert!(status.message().starts_with("while unmarshaling context: "));

    server.stop().await;
}

#[tokio::test]
async fn release_backend_serves_release_details() {
    let release = HelmRelease {
        name: "psql".into(),
        namespace: "default".into(),
        version: 2,
        chart: HelmChart {
            metadata: HelmChartMetadata { name: "postgresql".into(), version: "10.2.0".into() },
        },
    };
    let producer = Arc::new(InMemoryReleaseClientProducer::new().with_release(release.clone()));
    let server = TestServer::start(ReleaseStorageBackend::new(producer.clone())).await;
    let mut client = server.client.clone();

    let context =
        br#"{"name":"psql","namespace":"default","chartLocation":"https://charts.bitnami.com/bitnami"}"#
            .to_vec();

    let value = client
        .get_value(GetValueRequest {
            type_instance_id: "helm-ti".into(),
            resource_version: 42,
            context: context.clone(),
        })
        .await
        .unwrap()
        .into_inner()
        .value
        .unwrap();
    let details: ReleaseDetails = serde_json::from_slice(&value).unwrap();
    assert_eq!(details, ReleaseDetails::from_release(&release, "https://charts.bitnami.com/bitnami"));

    let status = client
        .get_value(GetValueRequest {
            type_instance_id: "helm-ti".into(),
            resource_version: 1,
            context: br#"{"name":"redis","namespace":"default","chartLocation":""}"#.to_vec(),
        })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::NotFound);
    assert_eq!(
        status.message(),
        "Helm release 'default/redis' for TypeInstance 'helm-ti' was not found"
    );

    client
        .on_lock(OnLockRequest {
            type_instance_id: "helm-ti".into(),
            context,
            locked_by: "service/foo".into(),
        })
        .await
        .unwrap();
    assert_eq!(producer.requested_drivers(), vec!["secrets", "secrets"]);

    server.stop().await;
}

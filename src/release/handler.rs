//! Helm release storage backend
//!
//! Exposes Helm releases as read-only TypeInstance values. Helm owns the
//! release data, so writes only verify that the release exists and locking is
//! a no-op.

use super::client::{ReleaseClientProducer, ReleaseReader};
use super::types::{HelmRelease, ReleaseContext, ReleaseDetails};
use crate::storage_backend::proto::{
    GetLockedByRequest, GetLockedByResponse, GetValueRequest, GetValueResponse, OnCreateRequest,
    OnCreateResponse, OnDeleteRequest, OnDeleteResponse, OnLockRequest, OnLockResponse,
    OnUnlockRequest, OnUnlockResponse, OnUpdateRequest, OnUpdateResponse,
};
use crate::storage_backend::{decode_context, BackendResult, StorageBackend, StorageBackendError};
use crate::storage_span;
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::{debug, Instrument};

pub const DEFAULT_DRIVER: &str = "secrets";

#[derive(Clone)]
pub struct ReleaseStorageBackend {
    producer: Arc<dyn ReleaseClientProducer>,
    default_driver: String,
}

impl std::fmt::Debug for ReleaseStorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseStorageBackend")
            .field("default_driver", &self.default_driver)
            .finish_non_exhaustive()
    }
}

impl ReleaseStorageBackend {
    pub fn new(producer: Arc<dyn ReleaseClientProducer>) -> Self {
        Self::with_default_driver(producer, DEFAULT_DRIVER)
    }

    pub fn with_default_driver(
        producer: Arc<dyn ReleaseClientProducer>,
        default_driver: impl Into<String>,
    ) -> Self {
        Self { producer, default_driver: default_driver.into() }
    }

    /// Release details for the TypeInstance described by `context`
    pub async fn release_details(
        &self,
        type_instance_id: &str,
        context: &[u8],
    ) -> BackendResult<ReleaseDetails> {
        let ctx = release_context(context)?;
        let release = self.fetch_release(type_instance_id, &ctx).await?;
        Ok(ReleaseDetails::from_release(&release, &ctx.chart_location))
    }

    /// Fail with NotFound unless the release behind `context` exists
    pub async fn ensure_release_exists(
        &self,
        type_instance_id: &str,
        context: &[u8],
    ) -> BackendResult<()> {
        let ctx = release_context(context)?;
        self.fetch_release(type_instance_id, &ctx).await.map(|_| ())
    }

    async fn fetch_release(
        &self,
        type_instance_id: &str,
        ctx: &ReleaseContext,
    ) -> BackendResult<HelmRelease> {
        let driver = match ctx.driver.as_deref() {
            Some(driver) if !driver.is_empty() => driver,
            _ => self.default_driver.as_str(),
        };

        let reader: Arc<dyn ReleaseReader> =
            self.producer.produce(driver, &ctx.namespace).map_err(|e| {
                StorageBackendError::internal(format!(
                    "while creating Helm get release client: {}",
                    e
                ))
            })?;

        let release = reader.latest(&ctx.name).await.map_err(|e| {
            StorageBackendError::internal(format!("while getting Helm release: {}", e))
        })?;

        match release {
            Some(release) => {
                debug!(release = %ctx.name, namespace = %ctx.namespace, version = release.version, "Found Helm release");
                Ok(release)
            }
            None => Err(StorageBackendError::not_found(format!(
                "Helm release '{}/{}' for TypeInstance '{}' was not found",
                ctx.namespace, ctx.name, type_instance_id
            ))),
        }
    }
}

fn release_context(context: &[u8]) -> BackendResult<ReleaseContext> {
    decode_context(context)?.ok_or_else(|| {
        StorageBackendError::internal("while unmarshaling context: missing Helm release context")
    })
}

#[tonic::async_trait]
impl StorageBackend for ReleaseStorageBackend {
    async fn get_value(
        &self,
        request: Request<GetValueRequest>,
    ) -> Result<Response<GetValueResponse>, Status> {
        let req = request.into_inner();
        let span = storage_span!("get_value", req.type_instance_id);

        // Helm keeps its own revisions; the requested resource version is ignored
        let details =
            self.release_details(&req.type_instance_id, &req.context).instrument(span).await?;
        let value = serde_json::to_vec(&details).map_err(|e| {
            StorageBackendError::internal(format!("while marshaling release details: {}", e))
        })?;

        Ok(Response::new(GetValueResponse { value: Some(value) }))
    }

    async fn get_locked_by(
        &self,
        _request: Request<GetLockedByRequest>,
    ) -> Result<Response<GetLockedByResponse>, Status> {
        Ok(Response::new(GetLockedByResponse { locked_by: None }))
    }

    async fn on_create(
        &self,
        request: Request<OnCreateRequest>,
    ) -> Result<Response<OnCreateResponse>, Status> {
        let req = request.into_inner();
        let span = storage_span!("on_create", req.type_instance_id);

        self.ensure_release_exists(&req.type_instance_id, &req.context).instrument(span).await?;
        Ok(Response::new(OnCreateResponse { context: None }))
    }

    async fn on_update(
        &self,
        request: Request<OnUpdateRequest>,
    ) -> Result<Response<OnUpdateResponse>, Status> {
        let req = request.into_inner();
        let span = storage_span!("on_update", req.type_instance_id);

        self.ensure_release_exists(&req.type_instance_id, &req.context).instrument(span).await?;
        Ok(Response::new(OnUpdateResponse { context: None }))
    }

    async fn on_delete(
        &self,
        _request: Request<OnDeleteRequest>,
    ) -> Result<Response<OnDeleteResponse>, Status> {
        Ok(Response::new(OnDeleteResponse {}))
    }

    async fn on_lock(
        &self,
        _request: Request<OnLockRequest>,
    ) -> Result<Response<OnLockResponse>, Status> {
        Ok(Response::new(OnLockResponse {}))
    }

    async fn on_unlock(
        &self,
        _request: Request<OnUnlockRequest>,
    ) -> Result<Response<OnUnlockResponse>, Status> {
        Ok(Response::new(OnUnlockResponse {}))
    }
}

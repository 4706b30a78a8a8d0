//! Secret storage backend
//!
//! Implements the StorageBackend service on top of secret providers. A
//! TypeInstance lives at `/<prefix>/<id>`; each revision of its value is a
//! field named after the resource version, and the lock holder is kept in the
//! `locked_by` field.

use super::provider::{SecretMapping, SecretProvider};
use super::router::SecretProviderRouter;
use crate::observability::MetricsRecorder;
use crate::storage_backend::proto::{
    GetLockedByRequest, GetLockedByResponse, GetValueRequest, GetValueResponse, OnCreateRequest,
    OnCreateResponse, OnDeleteRequest, OnDeleteResponse, OnLockRequest, OnLockResponse,
    OnUnlockRequest, OnUnlockResponse, OnUpdateRequest, OnUpdateResponse,
};
use crate::storage_backend::{BackendResult, StorageBackend, StorageBackendError};
use crate::storage_span;
use tonic::{Request, Response, Status};
use tracing::{debug, Instrument};

/// Field holding the lock owner
pub const LOCKED_BY_FIELD: &str = "locked_by";

/// Resource version written by OnCreate
pub const FIRST_RESOURCE_VERSION: u32 = 1;

pub const DEFAULT_PATH_PREFIX: &str = "capact";

#[derive(Debug, Clone)]
pub struct SecretStorageBackend {
    router: SecretProviderRouter,
    path_prefix: String,
    metrics: MetricsRecorder,
}

impl SecretStorageBackend {
    pub fn new(router: SecretProviderRouter) -> Self {
        Self::with_path_prefix(router, DEFAULT_PATH_PREFIX)
    }

    pub fn with_path_prefix(router: SecretProviderRouter, path_prefix: impl Into<String>) -> Self {
        Self { router, path_prefix: path_prefix.into(), metrics: MetricsRecorder::new() }
    }

    /// Secret path under which a TypeInstance is stored
    pub fn secret_path(&self, type_instance_id: &str) -> String {
        format!("/{}/{}", self.path_prefix, type_instance_id)
    }

    pub async fn get_value_for(&self, req: &GetValueRequest) -> BackendResult<Vec<u8>> {
        let provider = self.router.provider_for(&req.context)?;
        let path = self.secret_path(&req.type_instance_id);
        let field = req.resource_version.to_string();

        let mapping = self.mapping(provider.as_ref(), &path).await?;
        match mapping.as_ref().and_then(|m| m.get(&field)) {
            Some(value) => Ok(value.clone().into_bytes()),
            None => Err(StorageBackendError::not_found(format!(
                "TypeInstance {:?} in revision {} was not found",
                req.type_instance_id, req.resource_version
            ))),
        }
    }

    pub async fn locked_by_for(&self, req: &GetLockedByRequest) -> BackendResult<Option<String>> {
        let provider = self.router.provider_for(&req.context)?;
        let path = self.secret_path(&req.type_instance_id);

        let mapping = self.mapping(provider.as_ref(), &path).await?;
        match non_empty(mapping) {
            Some(mapping) => Ok(lock_holder(&mapping).map(str::to_string)),
            None => Err(StorageBackendError::not_found(format!(
                "TypeInstance {:?} not found: secret from path {:?} is empty",
                req.type_instance_id, path
            ))),
        }
    }

    pub async fn create(&self, req: &OnCreateRequest) -> BackendResult<()> {
        let provider = self.router.provider_for(&req.context)?;
        let path = self.secret_path(&req.type_instance_id);

        let mapping = self.mapping(provider.as_ref(), &path).await?.unwrap_or_default();
        ensure_not_locked(&mapping, &path)?;

        let has_value = mapping.keys().any(|field| field != LOCKED_BY_FIELD);
        if has_value {
            return Err(StorageBackendError::already_exists(format!(
                "path {:?} in provider {:?} already exist",
                path,
                provider.name()
            )));
        }

        let value = utf8_value(&req.type_instance_id, &req.value)?;
        self.put(provider.as_ref(), &path, &FIRST_RESOURCE_VERSION.to_string(), value).await
    }

    pub async fn update(&self, req: &OnUpdateRequest) -> BackendResult<()> {
        let provider = self.router.provider_for(&req.context)?;
        let path = self.secret_path(&req.type_instance_id);

        let mapping = self.existing_mapping(provider.as_ref(), &path).await?;
        ensure_not_locked(&mapping, &path)?;

        let field = req.new_resource_version.to_string();
        if mapping.contains_key(&field) {
            return Err(StorageBackendError::already_exists(format!(
                "field {:?} for path {:?} in provider {:?} already exist",
                field,
                path,
                provider.name()
            )));
        }

        let value = utf8_value(&req.type_instance_id, &req.new_value)?;
        self.put(provider.as_ref(), &path, &field, value).await
    }

    pub async fn delete(&self, req: &OnDeleteRequest) -> BackendResult<()> {
        let provider = self.router.provider_for(&req.context)?;
        let path = self.secret_path(&req.type_instance_id);

        let mapping = self.existing_mapping(provider.as_ref(), &path).await?;
        ensure_not_locked(&mapping, &path)?;

        let result = provider.delete_mapping(&path).await;
        self.metrics.record_provider_operation(provider.name(), "delete_mapping", result.is_ok());
        result.map_err(|e| {
            StorageBackendError::internal(format!(
                "while deleting path {:?} in provider {:?}: {}",
                path,
                provider.name(),
                e
            ))
        })
    }

    pub async fn lock(&self, req: &OnLockRequest) -> BackendResult<()> {
        let provider = self.router.provider_for(&req.context)?;
        let path = self.secret_path(&req.type_instance_id);

        if let Some(mapping) = self.mapping(provider.as_ref(), &path).await? {
            ensure_not_locked(&mapping, &path)?;
        }

        self.put(provider.as_ref(), &path, LOCKED_BY_FIELD, &req.locked_by).await
    }

    pub async fn unlock(&self, req: &OnUnlockRequest) -> BackendResult<()> {
        let provider = self.router.provider_for(&req.context)?;
        let path = self.secret_path(&req.type_instance_id);

        self.existing_mapping(provider.as_ref(), &path).await?;

        let result = provider.delete_field(&path, LOCKED_BY_FIELD).await;
        self.metrics.record_provider_operation(provider.name(), "delete_field", result.is_ok());
        result.map_err(|e| {
            StorageBackendError::internal(format!(
                "while deleting field {:?} for path {:?} in provider {:?}: {}",
                LOCKED_BY_FIELD,
                path,
                provider.name(),
                e
            ))
        })
    }

    async fn mapping(
        &self,
        provider: &dyn SecretProvider,
        path: &str,
    ) -> BackendResult<Option<SecretMapping>> {
        let result = provider.get_mapping(path).await;
        self.metrics.record_provider_operation(provider.name(), "get_mapping", result.is_ok());
        result.map_err(|e| {
            StorageBackendError::internal(format!(
                "while getting secret mapping for path {:?} in provider {:?}: {}",
                path,
                provider.name(),
                e
            ))
        })
    }

    /// Like [`mapping`](Self::mapping), but an absent or empty path is NotFound
    async fn existing_mapping(
        &self,
        provider: &dyn SecretProvider,
        path: &str,
    ) -> BackendResult<SecretMapping> {
        non_empty(self.mapping(provider, path).await?).ok_or_else(|| {
            StorageBackendError::not_found(format!(
                "path {:?} in provider {:?} not found",
                path,
                provider.name()
            ))
        })
    }

    async fn put(
        &self,
        provider: &dyn SecretProvider,
        path: &str,
        field: &str,
        value: &str,
    ) -> BackendResult<()> {
        let result = provider.put(path, field, value).await;
        self.metrics.record_provider_operation(provider.name(), "put", result.is_ok());
        result.map_err(|e| {
            StorageBackendError::internal(format!(
                "while setting field {:?} for path {:?} in provider {:?}: {}",
                field,
                path,
                provider.name(),
                e
            ))
        })?;

        debug!(path = %path, field = %field, provider = %provider.name(), "Stored secret field");
        Ok(())
    }
}

fn non_empty(mapping: Option<SecretMapping>) -> Option<SecretMapping> {
    mapping.filter(|m| !m.is_empty())
}

fn lock_holder(mapping: &SecretMapping) -> Option<&str> {
    mapping.get(LOCKED_BY_FIELD).map(String::as_str).filter(|holder| !holder.is_empty())
}

fn ensure_not_locked(mapping: &SecretMapping, path: &str) -> BackendResult<()> {
    match lock_holder(mapping) {
        Some(holder) => Err(StorageBackendError::failed_precondition(format!(
            "typeInstance locked: path {:?} contains {:?} property with value {:?}",
            path, LOCKED_BY_FIELD, holder
        ))),
        None => Ok(()),
    }
}

fn utf8_value<'a>(type_instance_id: &str, value: &'a [u8]) -> BackendResult<&'a str> {
    std::str::from_utf8(value).map_err(|e| {
        StorageBackendError::internal(format!(
            "while converting value of TypeInstance {:?} to string: {}",
            type_instance_id, e
        ))
    })
}

#[tonic::async_trait]
impl StorageBackend for SecretStorageBackend {
    async fn get_value(
        &self,
        request: Request<GetValueRequest>,
    ) -> Result<Response<GetValueResponse>, Status> {
        let req = request.into_inner();
        let span = storage_span!("get_value", req.type_instance_id, resource_version = req.resource_version);

        let value = self.get_value_for(&req).instrument(span).await?;
        Ok(Response::new(GetValueResponse { value: Some(value) }))
    }

    async fn get_locked_by(
        &self,
        request: Request<GetLockedByRequest>,
    ) -> Result<Response<GetLockedByResponse>, Status> {
        let req = request.into_inner();
        let span = storage_span!("get_locked_by", req.type_instance_id);

        let locked_by = self.locked_by_for(&req).instrument(span).await?;
        Ok(Response::new(GetLockedByResponse { locked_by }))
    }

    async fn on_create(
        &self,
        request: Request<OnCreateRequest>,
    ) -> Result<Response<OnCreateResponse>, Status> {
        let req = request.into_inner();
        let span = storage_span!("on_create", req.type_instance_id);

        self.create(&req).instrument(span).await?;
        Ok(Response::new(OnCreateResponse { context: None }))
    }

    async fn on_update(
        &self,
        request: Request<OnUpdateRequest>,
    ) -> Result<Response<OnUpdateResponse>, Status> {
        let req = request.into_inner();
        let span = storage_span!(
            "on_update",
            req.type_instance_id,
            resource_version = req.new_resource_version
        );

        self.update(&req).instrument(span).await?;
        Ok(Response::new(OnUpdateResponse { context: None }))
    }

    async fn on_delete(
        &self,
        request: Request<OnDeleteRequest>,
    ) -> Result<Response<OnDeleteResponse>, Status> {
        let req = request.into_inner();
        let span = storage_span!("on_delete", req.type_instance_id);

        self.delete(&req).instrument(span).await?;
        Ok(Response::new(OnDeleteResponse {}))
    }

    async fn on_lock(
        &self,
        request: Request<OnLockRequest>,
    ) -> Result<Response<OnLockResponse>, Status> {
        let req = request.into_inner();
        let span = storage_span!("on_lock", req.type_instance_id, locked_by = %req.locked_by);

        self.lock(&req).instrument(span).await?;
        Ok(Response::new(OnLockResponse {}))
    }

    async fn on_unlock(
        &self,
        request: Request<OnUnlockRequest>,
    ) -> Result<Response<OnUnlockResponse>, Status> {
        let req = request.into_inner();
        let span = storage_span!("on_unlock", req.type_instance_id);

        self.unlock(&req).instrument(span).await?;
        Ok(Response::new(OnUnlockResponse {}))
    }
}

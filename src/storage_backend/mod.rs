//! # Storage Backend Protocol
//!
//! The `storage_backend.StorageBackend` gRPC service every TypeInstance storage
//! backend implements, the protocol error type, and server bootstrap.
//!
//! Each request carries an opaque JSON `context` that only the targeted
//! backend interprets; [`decode_context`] is the shared entry point for that.

pub mod error;
pub mod proto;
pub mod server;

pub use error::{BackendResult, StorageBackendError};
pub use proto::storage_backend_client::StorageBackendClient;
pub use proto::storage_backend_server::{StorageBackend, StorageBackendServer};
pub use server::{serve, serve_with_listener};

use serde::de::DeserializeOwned;

/// Decode a request context, returning `None` when it is empty or `null`.
pub fn decode_context<T: DeserializeOwned>(context: &[u8]) -> BackendResult<Option<T>> {
    if context.is_empty() {
        return Ok(None);
    }

    serde_json::from_slice::<Option<T>>(context)
        .map_err(|e| StorageBackendError::internal(format!("while unmarshaling context: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Ctx {
        provider: String,
    }

    #[test]
    fn test_decode_empty_context() {
        assert_eq!(decode_context::<Ctx>(b"").unwrap(), None);
    }

    #[test]
    fn test_decode_null_context() {
        assert_eq!(decode_context::<Ctx>(b"null").unwrap(), None);
    }

    #[test]
    fn test_decode_context() {
        let ctx = decode_context::<Ctx>(br#"{"provider":"vault"}"#).unwrap();
        assert_eq!(ctx, Some(Ctx { provider: "vault".into() }));
    }

    #[test]
    fn test_decode_malformed_context_is_internal() {
        let err = decode_context::<Ctx>(b"{").unwrap_err();
        assert_eq!(err.code(), tonic::Code::Internal);
        assert!(err.message().starts_with("while unmarshaling context: "));
    }
}

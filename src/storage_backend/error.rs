//! Protocol errors returned by storage backend handlers.

use tonic::{Code, Status};

/// Result type for storage backend handler operations.
pub type BackendResult<T> = std::result::Result<T, StorageBackendError>;

/// Errors a storage backend reports to its caller.
///
/// Every variant maps onto one gRPC status code; the message is sent to the
/// client unchanged.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageBackendError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    AlreadyExists(String),

    #[error("{0}")]
    FailedPrecondition(String),

    #[error("{0}")]
    Internal(String),
}

impl StorageBackendError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::AlreadyExists(message.into())
    }

    pub fn failed_precondition(message: impl Into<String>) -> Self {
        Self::FailedPrecondition(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// gRPC status code for this error
    pub fn code(&self) -> Code {
        match self {
            Self::NotFound(_) => Code::NotFound,
            Self::AlreadyExists(_) => Code::AlreadyExists,
            Self::FailedPrecondition(_) => Code::FailedPrecondition,
            Self::Internal(_) => Code::Internal,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(m)
            | Self::AlreadyExists(m)
            | Self::FailedPrecondition(m)
            | Self::Internal(m) => m,
        }
    }
}

impl From<StorageBackendError> for Status {
    fn from(err: StorageBackendError) -> Self {
        let code = err.code();
        match err {
            StorageBackendError::NotFound(m)
            | StorageBackendError::AlreadyExists(m)
            | StorageBackendError::FailedPrecondition(m)
            | StorageBackendError::Internal(m) => Status::new(code, m),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_conversion_keeps_message() {
        let status: Status = StorageBackendError::not_found("TypeInstance \"a\" was not found").into();
        assert_eq!(status.code(), Code::NotFound);
        assert_eq!(status.message(), "TypeInstance \"a\" was not found");
    }

    #[test]
    fn test_codes() {
        assert_eq!(StorageBackendError::already_exists("x").code(), Code::AlreadyExists);
        assert_eq!(StorageBackendError::failed_precondition("x").code(), Code::FailedPrecondition);
        assert_eq!(StorageBackendError::internal("x").code(), Code::Internal);
    }
}

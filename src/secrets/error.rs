//! Error types for secret provider operations.

use thiserror::Error;

/// Result type for secret provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Errors that can occur while talking to a secret provider.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Failed to connect to the provider.
    #[error("Backend connection failed: {message}")]
    ConnectionFailed { message: String },

    /// Provider-specific error.
    #[error("Backend error: {message}")]
    BackendError { message: String },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl ProviderError {
    /// Create a connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed { message: message.into() }
    }

    /// Create a backend error.
    pub fn backend_error(message: impl Into<String>) -> Self {
        Self::BackendError { message: message.into() }
    }

    /// Create a config error.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError { message: message.into() }
    }
}

impl From<ProviderError> for crate::errors::Error {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::ConfigError { message } => Self::config(message),
            other => Self::internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_constructors() {
        let err = ProviderError::connection_failed("timeout");
        assert!(matches!(err, ProviderError::ConnectionFailed { .. }));
        assert_eq!(err.to_string(), "Backend connection failed: timeout");

        let err = ProviderError::backend_error("permission denied");
        assert_eq!(err.to_string(), "Backend error: permission denied");
    }

    #[test]
    fn test_config_error_converts_to_crate_config_error() {
        let err: crate::errors::Error = ProviderError::config_error("bad address").into();
        assert!(matches!(err, crate::errors::Error::Config(_)));
    }
}

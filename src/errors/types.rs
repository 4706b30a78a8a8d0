//! # Error Types
//!
//! Crate-level error type shared by configuration, startup, policy loading and
//! the Helm release client.

/// Custom result type for storage backend operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the storage backends
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network transport errors (gRPC, HTTP)
    #[error("Transport error: {0}")]
    Transport(String),

    /// I/O errors with additional context
    #[error("I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {context}")]
    Serialization {
        #[source]
        source: serde_json::Error,
        context: String,
    },

    /// YAML deserialization errors
    #[error("YAML error: {context}")]
    Yaml {
        #[source]
        source: serde_yaml::Error,
        context: String,
    },

    /// Kubernetes API errors
    #[error("Kubernetes error: {context}")]
    Kube {
        #[source]
        source: kube::Error,
        context: String,
    },

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new transport error
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Create an I/O error with context
    pub fn io<S: Into<String>>(source: std::io::Error, context: S) -> Self {
        Self::Io { source, context: context.into() }
    }

    /// Create a serialization error with context
    pub fn serialization<S: Into<String>>(source: serde_json::Error, context: S) -> Self {
        Self::Serialization { source, context: context.into() }
    }

    /// Create a YAML error with context
    pub fn yaml<S: Into<String>>(source: serde_yaml::Error, context: S) -> Self {
        Self::Yaml { source, context: context.into() }
    }

    /// Create a Kubernetes API error with context
    pub fn kube<S: Into<String>>(source: kube::Error, context: S) -> Self {
        Self::Kube { source, context: context.into() }
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::io(source, "I/O operation failed")
    }
}

impl From<serde_json::Error> for Error {
    fn from(source: serde_json::Error) -> Self {
        Self::serialization(source, "JSON processing failed")
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::config(format!("Validation failed: {}", errors))
    }
}

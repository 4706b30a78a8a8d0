//! # Error Handling
//!
//! Error types for the TypeInstance storage backends, built on `thiserror`.
//! Protocol-level errors that map onto gRPC status codes live in
//! [`crate::storage_backend::StorageBackendError`].

pub mod multi;
pub mod types;

pub use multi::MultiError;
pub use types::{Error, Result};

//! # TypeInstance Backends
//!
//! gRPC storage backends for TypeInstances and the engine that decides which
//! backend stores a given Type.
//!
//! ## Architecture
//!
//! ```text
//! Engine ──gRPC──► StorageBackend service ──► Secret providers (Vault, memory)
//!                                        └──► Helm release records (Kubernetes)
//!
//! Policy ──► Metadata Resolver (Hub) ──► TypeInstance Backend Collection
//! ```
//!
//! ## Core Components
//!
//! - **Storage Backend protocol**: the `storage_backend.StorageBackend` service,
//!   its error codes and the server bootstrap
//! - **Secret backend**: values and lock state kept in named secret providers
//! - **Release backend**: read-only view of Helm releases
//! - **Backend collection**: TypeRef to backend resolution with subtree patterns
//! - **Policy metadata resolver**: fills in TypeRefs of policy TypeInstances
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use typeinstance_backends::release::{KubeReleaseClientProducer, ReleaseStorageBackend};
//! use typeinstance_backends::{storage_backend, Config, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::from_env()?;
//!     let producer = KubeReleaseClientProducer::try_default().await?;
//!     let backend = ReleaseStorageBackend::new(Arc::new(producer));
//!     storage_backend::serve(backend, &config.server, async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await
//! }
//! ```

pub mod cli;
pub mod config;
pub mod errors;
pub mod hub;
pub mod observability;
pub mod policy;
pub mod release;
pub mod secrets;
pub mod storage_backend;
pub mod types;

// Re-export commonly used types and traits
pub use config::Config;
pub use errors::{Error, MultiError, Result};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

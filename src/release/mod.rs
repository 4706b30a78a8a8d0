//! # Helm Release Storage Backend
//!
//! Read-only storage backend mapping a TypeInstance onto a Helm release.
//! The request context names the release:
//!
//! ```json
//! {"name": "psql", "namespace": "default", "chartLocation": "https://charts.bitnami.com/bitnami", "driver": "secrets"}
//! ```
//!
//! The value is the projection `{name, namespace, chart: {name, version, repo}}`
//! of the latest release revision.

pub mod client;
pub mod handler;
pub mod types;

pub use client::{
    decode_release, InMemoryReleaseClient, InMemoryReleaseClientProducer,
    KubeReleaseClientProducer, ReleaseClientProducer, ReleaseReader,
};
pub use handler::{ReleaseStorageBackend, DEFAULT_DRIVER};
pub use types::{ChartDetails, HelmRelease, ReleaseContext, ReleaseDetails, ReleaseDriver};

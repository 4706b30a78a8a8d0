//! # Command Line Interface
//!
//! Serves one of the storage backends, or resolves the backend a policy
//! assigns to a Type.

use crate::config::{AppConfig, ObservabilityConfig, ReleaseBackendConfig, ServerConfig};
use crate::hub::GraphQlHubClient;
use crate::observability::{init_logging, init_observability, log_config_info};
use crate::policy::{Policy, Resolver};
use crate::release::{KubeReleaseClientProducer, ReleaseStorageBackend};
use crate::secrets::{load_providers, SecretStorageBackend};
use crate::storage_backend::serve;
use crate::types::{TypeInstanceBackend, TypeInstanceBackendCollection, TypeRef};
use crate::{APP_NAME, VERSION};
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};

const HUB_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(name = "typeinstance-backends")]
#[command(about = "TypeInstance storage backends")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the secret storage backend
    Secret,

    /// Serve the Helm release storage backend
    Release,

    /// Print the storage backend a policy assigns to a Type
    ResolveBackend {
        /// Policy document (YAML, or JSON with a .json extension)
        #[arg(long)]
        policy: PathBuf,

        /// Type path, e.g. cap.type.helm.release
        path: String,

        /// Type revision
        #[arg(long)]
        revision: Option<String>,

        /// Backend ID used when no rule matches
        #[arg(long)]
        default_backend: Option<String>,

        /// Hub GraphQL endpoint used to resolve the policy's TypeInstance metadata first
        #[arg(long)]
        hub_endpoint: Option<String>,
    },
}

/// Run CLI commands
pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Secret => run_secret_backend().await,
        Commands::Release => run_release_backend().await,
        Commands::ResolveBackend { policy, path, revision, default_backend, hub_endpoint } => {
            let observability = ObservabilityConfig::from_env()?;
            init_logging(&observability)?;

            let type_ref = TypeRef::new(path, revision.unwrap_or_default());
            let backend =
                resolve_backend(&policy, &type_ref, default_backend, hub_endpoint).await?;
            println!("{}", serde_json::to_string_pretty(&backend)?);
            Ok(())
        }
    }
}

async fn run_secret_backend() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    init_observability(&config.observability)?;
    info!(app_name = APP_NAME, version = VERSION, "Starting secret storage backend");
    log_config_info(&config);

    let router = load_providers(&config.secret)?;
    info!(providers = ?router.provider_names(), "Loaded secret providers");

    let backend = SecretStorageBackend::with_path_prefix(router, config.secret.path_prefix.clone());
    serve(backend, &config.server, shutdown_signal()).await?;
    Ok(())
}

async fn run_release_backend() -> anyhow::Result<()> {
    let server = ServerConfig::from_env()?;
    let observability = ObservabilityConfig::from_env()?;
    let release = ReleaseBackendConfig::from_env();
    init_observability(&observability)?;
    info!(
        app_name = APP_NAME,
        version = VERSION,
        server_address = %server.socket_address(),
        helm_default_driver = %release.default_driver,
        "Starting Helm release storage backend"
    );

    let producer = KubeReleaseClientProducer::try_default().await?;
    let backend = ReleaseStorageBackend::with_default_driver(Arc::new(producer), release.default_driver);
    serve(backend, &server, shutdown_signal()).await?;
    Ok(())
}

/// Load a policy, optionally resolve its metadata, and look up the backend for `type_ref`
pub async fn resolve_backend(
    policy_path: &Path,
    type_ref: &TypeRef,
    default_backend: Option<String>,
    hub_endpoint: Option<String>,
) -> anyhow::Result<TypeInstanceBackend> {
    let mut policy = Policy::from_file(policy_path)
        .with_context(|| format!("while loading policy {}", policy_path.display()))?;

    if let Some(endpoint) = hub_endpoint {
        let hub = GraphQlHubClient::new(endpoint, HUB_REQUEST_TIMEOUT)?;
        Resolver::new(Arc::new(hub))
            .resolve_type_instance_metadata(&mut policy)
            .await
            .context("while resolving policy TypeInstance metadata")?;
    }

    let mut builder = TypeInstanceBackendCollection::builder().with_policy(&policy);
    if let Some(id) = default_backend {
        builder = builder.set_default(TypeInstanceBackend::new(id));
    }
    let collection = builder.build();

    let backend = collection.get_by_type_ref(type_ref);
    info!(type_ref = %type_ref, backend = %backend.id, "Resolved TypeInstance backend");
    Ok(backend)
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    info!("Shutdown signal received");
}

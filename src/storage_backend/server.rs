//! gRPC server bootstrap for a storage backend handler.

use super::proto::storage_backend_server::{StorageBackend, StorageBackendServer};
use crate::config::ServerConfig;
use crate::errors::{Error, Result};
use crate::observability::GrpcTracingLayer;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tracing::info;

/// Serve `handler` on the configured address until `shutdown_signal` resolves.
pub async fn serve<H, F>(handler: H, config: &ServerConfig, shutdown_signal: F) -> Result<()>
where
    H: StorageBackend,
    F: Future<Output = ()> + Send + 'static,
{
    let addr: SocketAddr = config
        .socket_address()
        .parse()
        .map_err(|e| Error::config(format!("Invalid storage backend address: {}", e)))?;

    info!(address = %addr, "Starting storage backend gRPC server");

    Server::builder()
        .timeout(config.request_timeout())
        .layer(GrpcTracingLayer::new())
        .add_service(StorageBackendServer::new(handler))
        .serve_with_shutdown(addr, shutdown_signal)
        .await
        .map_err(|e| {
            let error_msg = e.to_string();
            if error_msg.contains("Address already in use") || error_msg.contains("bind") {
                Error::transport(format!(
                    "Storage backend failed to bind to {}: Port {} is already in use",
                    addr,
                    addr.port()
                ))
            } else {
                Error::transport(format!("Storage backend server failed: {}", e))
            }
        })?;

    info!("Storage backend gRPC server stopped");
    Ok(())
}

/// Serve `handler` on an already bound listener.
///
/// Lets callers bind port 0 and learn the address before the server starts.
pub async fn serve_with_listener<H, F>(
    handler: H,
    listener: TcpListener,
    request_timeout: Duration,
    shutdown_signal: F,
) -> Result<()>
where
    H: StorageBackend,
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(address = %addr, "Starting storage backend gRPC server");
    }

    Server::builder()
        .timeout(request_timeout)
        .layer(GrpcTracingLayer::new())
        .add_service(StorageBackendServer::new(handler))
        .serve_with_incoming_shutdown(TcpListenerStream::new(listener), shutdown_signal)
        .await
        .map_err(|e| Error::transport(format!("Storage backend server failed: {}", e)))
}

//! # Metrics Collection
//!
//! Provides Prometheus metrics collection for the storage backends.

use crate::config::ObservabilityConfig;
use crate::errors::{Error, Result};
use ::tracing::{info, warn};
use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Metrics recorder that tracks application metrics
#[derive(Debug, Clone, Default)]
pub struct MetricsRecorder;

impl MetricsRecorder {
    /// Create a new metrics recorder instance
    pub fn new() -> Self {
        Self
    }

    /// Record a completed gRPC call
    pub fn record_grpc_request(&self, method: &str, status: &str, duration: f64) {
        let labels = [("method", method.to_string()), ("status", status.to_string())];
        counter!("storage_backend_requests_total", &labels).increment(1);

        let duration_labels = [("method", method.to_string())];
        histogram!("storage_backend_request_duration_seconds", &duration_labels).record(duration);
    }

    /// Record which secret provider served a request
    pub fn record_provider_operation(&self, provider: &str, operation: &str, success: bool) {
        let status = if success { "success" } else { "error" };
        let labels = [
            ("provider", provider.to_string()),
            ("operation", operation.to_string()),
            ("status", status.to_string()),
        ];
        counter!("secret_provider_operations_total", &labels).increment(1);
    }

    /// Register metric descriptions with the installed recorder
    pub fn register_storage_backend_metrics(&self) {
        describe_counter!(
            "storage_backend_requests_total",
            Unit::Count,
            "Storage backend gRPC calls by method and status"
        );
        describe_histogram!(
            "storage_backend_request_duration_seconds",
            Unit::Seconds,
            "Storage backend gRPC call latency"
        );
        describe_counter!(
            "secret_provider_operations_total",
            Unit::Count,
            "Secret provider operations by provider, operation and status"
        );
    }
}

/// Initialize metrics collection and Prometheus exporter
pub fn init_metrics(config: &ObservabilityConfig) -> Result<()> {
    if !config.enable_metrics {
        return Ok(());
    }

    let metrics_addr = match config.metrics_bind_address() {
        Some(addr) => addr,
        None => {
            warn!("Metrics disabled: no bind address configured");
            return Ok(());
        }
    };

    let socket_addr: SocketAddr = metrics_addr.parse().map_err(|e| {
        Error::config(format!("Invalid metrics bind address '{}': {}", metrics_addr, e))
    })?;

    PrometheusBuilder::new()
        .with_http_listener(socket_addr)
        .add_global_label("service", &config.service_name)
        .install()
        .map_err(|e| Error::config(format!("Failed to initialize metrics exporter: {}", e)))?;

    MetricsRecorder::new().register_storage_backend_metrics();

    info!(
        metrics_addr = %metrics_addr,
        service_name = %config.service_name,
        "Metrics collection initialized"
    );

    Ok(())
}

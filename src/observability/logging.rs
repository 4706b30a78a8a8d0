//! # Structured Logging
//!
//! Subscriber setup and span macros built on the tracing ecosystem.
//!
//! `RUST_LOG` takes precedence over the configured log level, so operators can
//! raise verbosity for a single module without touching the service config.

use crate::config::{AppConfig, ObservabilityConfig};
use crate::errors::{Error, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Create a tracing span for a storage backend operation.
///
/// ```rust,ignore
/// let span = storage_span!("on_lock", &request.type_instance_id);
/// let span = storage_span!("get_value", &id, resource_version = 2);
/// ```
#[macro_export]
macro_rules! storage_span {
    ($operation:expr, $type_instance_id:expr) => {
        tracing::info_span!(
            "storage_operation",
            operation = %$operation,
            type_instance_id = %$type_instance_id,
            operation_id = %uuid::Uuid::new_v4()
        )
    };
    ($operation:expr, $type_instance_id:expr, $($field:tt)*) => {
        tracing::info_span!(
            "storage_operation",
            operation = %$operation,
            type_instance_id = %$type_instance_id,
            operation_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Install the global tracing subscriber.
///
/// Fails if a global subscriber has already been set.
pub fn init_logging(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| Error::config(format!("Invalid log level '{}': {}", config.log_level, e)))?;

    let registry = tracing_subscriber::registry().with(filter);

    let result = if config.json_logging {
        registry.with(fmt::layer().json().with_current_span(true)).try_init()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()
    };

    result.map_err(|e| Error::internal(format!("Failed to install tracing subscriber: {}", e)))
}

/// Log configuration at startup
pub fn log_config_info(config: &AppConfig) {
    tracing::info!(
        server_address = %config.server.socket_address(),
        request_timeout_seconds = config.server.request_timeout_seconds,
        secret_providers = ?config.secret.providers,
        secret_path_prefix = %config.secret.path_prefix,
        helm_default_driver = %config.release.default_driver,
        metrics_enabled = %config.observability.enable_metrics,
        "Storage backend configuration"
    );
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_macros_compile() {
        let _span = storage_span!("get_value", "uuid");
        let _span = storage_span!("on_update", "uuid", resource_version = 3);
    }
}

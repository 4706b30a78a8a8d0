//! gRPC Tracing Interceptor
//!
//! Tower middleware that wraps the StorageBackend gRPC service, opening a span
//! for each call and recording the resulting gRPC status and latency.

use super::metrics::MetricsRecorder;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;
use tonic::codegen::http::{HeaderMap, Request, Response};
use tonic::Code;
use tower::{Layer, Service};
use tracing::{info_span, Instrument, Span};

/// Tower layer that provides automatic tracing for gRPC services.
///
/// This layer:
/// - Creates a span for each gRPC call
/// - Records method name, status, and duration
/// - Feeds request counters and latency histograms
#[derive(Clone, Default)]
pub struct GrpcTracingLayer {
    metrics: MetricsRecorder,
}

impl GrpcTracingLayer {
    /// Create a new gRPC tracing layer
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S> Layer<S> for GrpcTracingLayer {
    type Service = GrpcTracingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        GrpcTracingService { inner, metrics: self.metrics.clone() }
    }
}

/// Service wrapper that instruments gRPC calls with tracing spans.
#[derive(Clone)]
pub struct GrpcTracingService<S> {
    inner: S,
    metrics: MetricsRecorder,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for GrpcTracingService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    ReqBody: Send + 'static,
    ResBody: Default + Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        let (service_name, method_name) = parse_grpc_path(request.uri().path());
        let span = create_grpc_span(&service_name, &method_name);

        // Take the service that was driven to readiness and leave a fresh clone behind
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let metrics = self.metrics.clone();

        Box::pin(
            async move {
                let start = Instant::now();
                let result = inner.call(request).await;
                let elapsed = start.elapsed();

                let status = match &result {
                    Ok(response) => grpc_status(response.headers()),
                    Err(_) => "TRANSPORT_ERROR",
                };

                let current = Span::current();
                current.record("grpc.duration_ms", elapsed.as_millis() as f64);
                current.record("grpc.status", status);
                metrics.record_grpc_request(&method_name, status, elapsed.as_secs_f64());

                result
            }
            .instrument(span),
        )
    }
}

/// Read the gRPC status from response headers.
///
/// Error responses are trailers-only, so the status shows up in the headers;
/// a missing `grpc-status` header means the call completed normally.
fn grpc_status(headers: &HeaderMap) -> &'static str {
    let code = headers
        .get("grpc-status")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<i32>().ok())
        .map(Code::from_i32)
        .unwrap_or(Code::Ok);

    code_name(code)
}

fn code_name(code: Code) -> &'static str {
    match code {
        Code::Ok => "OK",
        Code::Cancelled => "CANCELLED",
        Code::Unknown => "UNKNOWN",
        Code::InvalidArgument => "INVALID_ARGUMENT",
        Code::DeadlineExceeded => "DEADLINE_EXCEEDED",
        Code::NotFound => "NOT_FOUND",
        Code::AlreadyExists => "ALREADY_EXISTS",
        Code::PermissionDenied => "PERMISSION_DENIED",
        Code::ResourceExhausted => "RESOURCE_EXHAUSTED",
        Code::FailedPrecondition => "FAILED_PRECONDITION",
        Code::Aborted => "ABORTED",
        Code::OutOfRange => "OUT_OF_RANGE",
        Code::Unimplemented => "UNIMPLEMENTED",
        Code::Internal => "INTERNAL",
        Code::Unavailable => "UNAVAILABLE",
        Code::DataLoss => "DATA_LOSS",
        Code::Unauthenticated => "UNAUTHENTICATED",
    }
}

/// Parse gRPC path into service and method names
///
/// gRPC paths are formatted as `/package.ServiceName/MethodName`
fn parse_grpc_path(path: &str) -> (String, String) {
    let parts: Vec<&str> = path.trim_start_matches('/').split('/').collect();

    match parts.as_slice() {
        [service, method] => (service.to_string(), method.to_string()),
        [single] if !single.is_empty() => (single.to_string(), "unknown".to_string()),
        _ => ("unknown".to_string(), "unknown".to_string()),
    }
}

/// Create a span for a gRPC call
fn create_grpc_span(service: &str, method: &str) -> Span {
    info_span!(
        "grpc.server",
        rpc.system = "grpc",
        rpc.service = %service,
        rpc.method = %method,
        grpc.status = tracing::field::Empty,
        grpc.duration_ms = tracing::field::Empty,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::codegen::http::HeaderValue;

    #[test]
    fn test_parse_grpc_path_standard() {
        let (service, method) = parse_grpc_path("/storage_backend.StorageBackend/GetValue");
        assert_eq!(service, "storage_backend.StorageBackend");
        assert_eq!(method, "GetValue");
    }

    #[test]
    fn test_parse_grpc_path_empty() {
        let (service, method) = parse_grpc_path("/");
        assert_eq!(service, "unknown");
        assert_eq!(method, "unknown");
    }

    #[test]
    fn test_parse_grpc_path_single_component() {
        let (service, method) = parse_grpc_path("/ServiceOnly");
        assert_eq!(service, "ServiceOnly");
        assert_eq!(method, "unknown");
    }

    #[test]
    fn test_grpc_status_defaults_to_ok() {
        assert_eq!(grpc_status(&HeaderMap::new()), "OK");
    }

    #[test]
    fn test_grpc_status_from_trailers_only_response() {
        let mut headers = HeaderMap::new();
        headers.insert("grpc-status", HeaderValue::from_static("9"));
        assert_eq!(grpc_status(&headers), "FAILED_PRECONDITION");

        headers.insert("grpc-status", HeaderValue::from_static("5"));
        assert_eq!(grpc_status(&headers), "NOT_FOUND");
    }
}

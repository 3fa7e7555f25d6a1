//! HTTP observability middleware
//!
//! Implemented as a Tower Layer/Service so it can sit outside the auth
//! filter without consuming axum's `from_fn` layer budget. Records request
//! counts, durations, and in-flight gauge, and propagates `x-request-id`.

use axum::{body::Body, http::Request, response::Response};
use metrics::{counter, gauge, histogram};
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Instant,
};
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

/// Tower Layer for HTTP observability (request ID + metrics).
#[derive(Clone)]
pub struct HttpTelemetryLayer;

impl<S> Layer<S> for HttpTelemetryLayer {
    type Service = HttpTelemetryService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        HttpTelemetryService { inner }
    }
}

/// Tower Service that records HTTP metrics and propagates request IDs.
#[derive(Clone)]
pub struct HttpTelemetryService<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for HttpTelemetryService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let method = request.method().to_string();
        let path = normalize_path(request.uri().path());

        let request_id = request
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        gauge!("patio_http_requests_in_flight").increment(1.0);
        let start = Instant::now();

        let mut inner = self.inner.clone();
        let span = tracing::info_span!("request", request_id = %request_id);

        Box::pin(
            async move {
                let response = inner.call(request).await?;

                let duration = start.elapsed().as_secs_f64();
                let status = response.status().as_u16().to_string();

                counter!(
                    "patio_http_requests_total",
                    "method" => method.clone(),
                    "path" => path.clone(),
                    "status" => status
                )
                .increment(1);
                histogram!(
                    "patio_http_request_duration_seconds",
                    "method" => method,
                    "path" => path
                )
                .record(duration);
                gauge!("patio_http_requests_in_flight").decrement(1.0);

                let mut response = response;
                if let Ok(value) = request_id.parse() {
                    response.headers_mut().insert("x-request-id", value);
                }

                Ok(response)
            }
            .instrument(span),
        )
    }
}

/// Collapse identifier-like path segments (UUIDs, bare numbers, share
/// tokens) to `{id}` to keep label cardinality bounded.
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|seg| if looks_like_id(seg) { "{id}" } else { seg })
        .collect::<Vec<_>>()
        .join("/")
}

fn looks_like_id(seg: &str) -> bool {
    if seg.len() == 36 && seg.chars().all(|c| c.is_ascii_hexdigit() || c == '-') {
        return true;
    }
    !seg.is_empty() && seg.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_with_uuid() {
        let path = "/api/v1/share-links/550e8400-e29b-41d4-a716-446655440000";
        assert_eq!(normalize_path(path), "/api/v1/share-links/{id}");
    }

    #[test]
    fn test_normalize_path_with_numeric_id() {
        assert_eq!(normalize_path("/users/12345/friends"), "/users/{id}/friends");
    }

    #[test]
    fn test_normalize_path_without_ids() {
        let path = "/api/v1/auth/email-verification/send";
        assert_eq!(normalize_path(path), path);
    }

    #[test]
    fn test_looks_like_id() {
        assert!(looks_like_id("550e8400-e29b-41d4-a716-446655440000"));
        assert!(looks_like_id("98765"));
        assert!(!looks_like_id("v1"));
        assert!(!looks_like_id("friends"));
        assert!(!looks_like_id(""));
    }
}

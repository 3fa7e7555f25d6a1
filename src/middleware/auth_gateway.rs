//! Edge authentication filter
//!
//! Admits or rejects every inbound request: open paths pass through, all
//! others need a bearer token that survives signature, expiry, issuer,
//! audience, and token-type checks. On success the verified subject is
//! written to `X-User-Id`, replacing anything the client sent, so downstream
//! services can trust the header without re-verifying. Mounted outermost
//! among the request-processing layers, so nothing downstream ever sees an
//! unauthenticated request for a protected path.

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use metrics::counter;
use serde::Serialize;
use std::sync::Arc;

use crate::jwt::{JwtCodec, TokenError, TokenKind};
use crate::middleware::open_paths;

/// Header carrying the gateway-verified subject to downstream services
pub const USER_ID_HEADER: &str = "x-user-id";

/// Shared state for the gateway filter
#[derive(Clone)]
pub struct AuthGatewayState {
    codec: Arc<JwtCodec>,
}

impl AuthGatewayState {
    pub fn new(codec: Arc<JwtCodec>) -> Self {
        Self { codec }
    }
}

/// Why a request was turned away
#[derive(Debug)]
enum RejectReason {
    MissingBearer,
    Expired,
    Malformed(String),
    WrongIssuer,
    WrongAudience,
    WrongTokenType,
    VerifierUnavailable,
}

impl RejectReason {
    fn detail(&self) -> String {
        match self {
            RejectReason::MissingBearer => "missing or invalid Authorization header".to_string(),
            RejectReason::Expired => "token expired".to_string(),
            RejectReason::Malformed(detail) => format!("invalid token: {}", detail),
            RejectReason::WrongIssuer => "token issuer is not recognized".to_string(),
            RejectReason::WrongAudience => {
                "token audience does not include this service".to_string()
            }
            RejectReason::WrongTokenType => "token type is not valid for API access".to_string(),
            RejectReason::VerifierUnavailable => "token verification is not configured".to_string(),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            RejectReason::MissingBearer => "missing_bearer",
            RejectReason::Expired => "expired",
            RejectReason::Malformed(_) => "malformed",
            RejectReason::WrongIssuer => "wrong_issuer",
            RejectReason::WrongAudience => "wrong_audience",
            RejectReason::WrongTokenType => "wrong_token_type",
            RejectReason::VerifierUnavailable => "verifier_unavailable",
        }
    }
}

/// Gateway authentication middleware
pub async fn auth_gateway_middleware(
    State(state): State<AuthGatewayState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    if open_paths::is_open(&path) {
        counter!("patio_gateway_requests_total", "outcome" => "open").increment(1);
        return next.run(request).await;
    }

    let method = request.method().clone();

    let subject = match authenticate(&state, request.headers()) {
        Ok(subject) => subject,
        Err(reason) => return reject(&method, &path, reason),
    };

    // The subject becomes a header value; anything unrepresentable is treated
    // like a bad token rather than forwarded mangled.
    let value = match HeaderValue::from_str(&subject) {
        Ok(value) => value,
        Err(_) => {
            return reject(
                &method,
                &path,
                RejectReason::Malformed("subject is not header-safe".to_string()),
            )
        }
    };
    request.headers_mut().insert(USER_ID_HEADER, value);

    counter!("patio_gateway_requests_total", "outcome" => "forwarded").increment(1);
    next.run(request).await
}

/// Full admission check: bearer extraction, signature/expiry verification,
/// then the semantic issuer/audience/type checks the codec leaves to us.
fn authenticate(state: &AuthGatewayState, headers: &HeaderMap) -> Result<String, RejectReason> {
    let token = extract_bearer_token(headers).ok_or(RejectReason::MissingBearer)?;

    let claims = state.codec.verify(token).map_err(|e| match e {
        TokenError::Expired => RejectReason::Expired,
        TokenError::Malformed(detail) => RejectReason::Malformed(detail),
        TokenError::KeyMissing => RejectReason::VerifierUnavailable,
    })?;

    if claims.iss != state.codec.issuer() {
        return Err(RejectReason::WrongIssuer);
    }
    if !claims.aud.iter().any(|aud| aud == state.codec.audience()) {
        return Err(RejectReason::WrongAudience);
    }
    if claims.token_type != TokenKind::Access {
        return Err(RejectReason::WrongTokenType);
    }

    Ok(claims.sub)
}

/// Pull the token out of `Authorization: Bearer <token>`
fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Fixed rejection body; field order is part of the contract clients match on.
#[derive(Serialize)]
struct RejectionBody {
    error: &'static str,
    detail: String,
}

/// Uniform 401; logs method, path, and reason but never the token itself.
fn reject(method: &Method, path: &str, reason: RejectReason) -> Response {
    let detail = reason.detail();
    tracing::warn!(
        method = %method,
        path = %path,
        reason = %detail,
        "Rejected unauthenticated request"
    );
    counter!(
        "patio_gateway_requests_total",
        "outcome" => "rejected",
        "reason" => reason.label()
    )
    .increment(1);

    (
        StatusCode::UNAUTHORIZED,
        Json(RejectionBody {
            error: "Authentication required",
            detail,
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use axum::{body::Body, http::Request, routing::get, Router};
    use tower::ServiceExt;

    fn test_codec() -> JwtCodec {
        JwtCodec::new(&AuthConfig {
            signing_secret: Some("test-secret-key-for-gateway-tests".to_string()),
            issuer: "patio-auth".to_string(),
            audience: "patio".to_string(),
            access_token_ttl_secs: 3600,
            refresh_token_ttl_secs: 604800,
            email_token_ttl_secs: 86400,
        })
    }

    async fn echo_user_id(headers: HeaderMap) -> String {
        headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("<none>")
            .to_string()
    }

    fn test_app(codec: JwtCodec) -> Router {
        let state = AuthGatewayState::new(Arc::new(codec));
        Router::new()
            .route("/api/v1/me", get(echo_user_id))
            .route("/health", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn_with_state(
                state,
                auth_gateway_middleware,
            ))
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_open_path_forwards_without_header() {
        let app = test_app(test_codec());

        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_protected_path_without_header_returns_401() {
        let app = test_app(test_codec());

        let request = Request::builder()
            .uri("/api/v1/me")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_string(response).await;
        assert!(body.contains("\"error\":\"Authentication required\""));
        assert!(body.contains("missing or invalid Authorization header"));
    }

    #[tokio::test]
    async fn test_non_bearer_scheme_returns_401() {
        let app = test_app(test_codec());

        let request = Request::builder()
            .uri("/api/v1/me")
            .header("Authorization", "Basic dXNlcjpwYXNz")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_valid_token_injects_subject() {
        let codec = test_codec();
        let token = codec.issue_access_token("user-77").unwrap();
        let app = test_app(codec);

        let request = Request::builder()
            .uri("/api/v1/me")
            .header("Authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "user-77");
    }

    #[tokio::test]
    async fn test_client_supplied_identity_header_is_overwritten() {
        let codec = test_codec();
        let token = codec.issue_access_token("real-user").unwrap();
        let app = test_app(codec);

        let request = Request::builder()
            .uri("/api/v1/me")
            .header("Authorization", format!("Bearer {}", token))
            .header("X-User-Id", "spoofed-admin")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "real-user");
    }

    #[tokio::test]
    async fn test_refresh_token_is_rejected_for_api_access() {
        let codec = test_codec();
        let token = codec.issue_refresh_token("user-77").unwrap();
        let app = test_app(codec);

        let request = Request::builder()
            .uri("/api/v1/me")
            .header("Authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_string(response).await;
        assert!(body.contains("token type is not valid for API access"));
    }

    #[tokio::test]
    async fn test_keyless_codec_rejects_protected_traffic() {
        let app = test_app(JwtCodec::new(&AuthConfig {
            signing_secret: None,
            issuer: "patio-auth".to_string(),
            audience: "patio".to_string(),
            access_token_ttl_secs: 3600,
            refresh_token_ttl_secs: 604800,
            email_token_ttl_secs: 86400,
        }));

        let request = Request::builder()
            .uri("/api/v1/me")
            .header("Authorization", "Bearer whatever")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_string(response).await;
        assert!(body.contains("token verification is not configured"));
    }
}

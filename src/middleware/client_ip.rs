//! Client IP derivation for rate-limit keys
//!
//! The first `X-Forwarded-For` entry wins, then `X-Real-IP`, then the socket
//! address. The result keys rate-limit windows only; it is never an
//! authentication signal.

use axum::{
    extract::{ConnectInfo, Request},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;

/// Resolve the client IP from proxy headers.
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return Some(first.to_string());
            }
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Middleware that backfills `X-Real-IP` from the socket address when no
/// proxy headers are present, so `client_ip()` always has something to read
/// on direct connections.
pub async fn inject_client_ip(mut request: Request, next: Next) -> Response {
    if client_ip(request.headers()).is_none() {
        if let Some(addr) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
            let ip = addr.0.ip().to_string();
            if let Ok(value) = ip.parse() {
                request.headers_mut().insert("x-real-ip", value);
            }
        }
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                axum::http::HeaderName::try_from(*name).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn test_first_forwarded_entry_wins() {
        let map = headers(&[
            ("x-forwarded-for", "203.0.113.7, 10.0.0.1, 10.0.0.2"),
            ("x-real-ip", "10.0.0.9"),
        ]);
        assert_eq!(client_ip(&map), Some("203.0.113.7".to_string()));
    }

    #[test]
    fn test_real_ip_fallback() {
        let map = headers(&[("x-real-ip", "198.51.100.4")]);
        assert_eq!(client_ip(&map), Some("198.51.100.4".to_string()));
    }

    #[test]
    fn test_empty_forwarded_falls_through() {
        let map = headers(&[("x-forwarded-for", "  "), ("x-real-ip", "198.51.100.4")]);
        assert_eq!(client_ip(&map), Some("198.51.100.4".to_string()));
    }

    #[test]
    fn test_no_headers_yields_none() {
        assert_eq!(client_ip(&HeaderMap::new()), None);
    }
}

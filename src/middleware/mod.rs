//! HTTP middleware for Patio Core
//!
//! Middleware components for the gateway surface:
//! - Edge authentication filter and open-path tables
//! - Client IP derivation and per-IP rate limiting
//! - HTTP observability (request IDs + metrics)

pub mod auth_gateway;
pub mod client_ip;
pub mod observability;
pub mod open_paths;
pub mod rate_limit;

pub use auth_gateway::{auth_gateway_middleware, AuthGatewayState, USER_ID_HEADER};
pub use client_ip::inject_client_ip;
pub use observability::HttpTelemetryLayer;
pub use rate_limit::{rate_limit_middleware, RateLimiter};

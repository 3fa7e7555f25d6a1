//! Patio Core - shared platform backbone
//!
//! This crate provides the pieces the Patio services share while the old
//! monolith is carved up: the edge auth gateway, the resilient user-service
//! client, the Redis event bus, and the email verification flow.

pub mod api;
pub mod clients;
pub mod config;
pub mod domain;
pub mod email;
pub mod error;
pub mod events;
pub mod jwt;
pub mod middleware;
pub mod openapi;
pub mod server;
pub mod telemetry;
pub mod verification;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, Result};

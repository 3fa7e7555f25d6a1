//! HTTP API handlers
//!
//! Thin axum handlers over the service layer. Handlers validate input,
//! call into `AppState`, and map outcomes through `crate::error::AppError`.

pub mod health;
pub mod me;
pub mod metrics;
pub mod verification;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Message response (for acknowledgements, etc.)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

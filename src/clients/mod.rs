//! Typed HTTP clients for peer Patio services.

pub mod user_service;

pub use user_service::UserServiceClient;

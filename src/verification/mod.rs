//! Email verification: code issuing, delivery, and checking.

pub mod service;
pub mod store;

pub use service::{generate_code, VerificationService};
pub use store::{InMemoryVerificationStore, VerificationStore};

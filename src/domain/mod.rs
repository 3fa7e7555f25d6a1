//! Domain models for Patio Core.
//!
//! Plain data shapes and pure state transitions, free of transport and
//! storage concerns. Wire-facing types serialize to camelCase to match the
//! JSON contract shared across Patio services.

pub mod events;
pub mod user;
pub mod verification;

pub use events::{DefaultActivityTypesInitializedEvent, UserCreatedEvent};
pub use user::{UserExists, UserProfile, UserSummary};
pub use verification::{
    apply_check, apply_send, BackoffPolicy, CheckCodeInput, CheckOutcome, SendCodeInput,
    SendOutcome, VerificationAttempt,
};

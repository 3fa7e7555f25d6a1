//! Event bus plumbing shared by Patio services.
//!
//! Events travel over Redis pub/sub as JSON envelopes on fixed channels.
//! Publishing is fire-and-forget; a background subscriber bridges bus
//! traffic onto a local broadcast channel for in-process listeners.

pub mod channels;
pub mod envelope;
pub mod listeners;
pub mod publisher;
pub mod subscriber;

pub use envelope::{DomainEvent, EventEnvelope};
pub use listeners::{
    spawn_activity_defaults_listener, ActivityDefaultsSeeder, StaticActivityDefaults,
};
pub use publisher::EventPublisher;
pub use subscriber::{spawn_subscriber, LOCAL_BUS_CAPACITY};

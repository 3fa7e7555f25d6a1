//! JSON envelope shared by both ends of the event bus.

use crate::domain::{DefaultActivityTypesInitializedEvent, UserCreatedEvent};
use crate::events::channels;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Every event kind that crosses the bus. The serialized form carries a
/// `type` tag next to the event fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DomainEvent {
    UserRegistered(UserCreatedEvent),
    ActivityDefaultsInitialized(DefaultActivityTypesInitializedEvent),
}

impl DomainEvent {
    /// Channel this event is published on.
    pub fn channel(&self) -> &'static str {
        match self {
            DomainEvent::UserRegistered(_) => channels::USER_REGISTERED,
            DomainEvent::ActivityDefaultsInitialized(_) => {
                channels::ACTIVITY_DEFAULTS_INITIALIZED
            }
        }
    }

    /// Stable kind label, used for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            DomainEvent::UserRegistered(_) => "user-registered",
            DomainEvent::ActivityDefaultsInitialized(_) => "activity-defaults-initialized",
        }
    }
}

/// Wire envelope: the event payload plus the channel it was addressed to
/// and the instant it left the publisher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    pub channel: String,
    pub published_at: DateTime<Utc>,
    pub payload: DomainEvent,
}

impl EventEnvelope {
    pub fn new(payload: DomainEvent) -> Self {
        Self {
            channel: payload.channel().to_string(),
            published_at: Utc::now(),
            payload,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(payload: &str) -> serde_json::Result<Self> {
        serde_json::from_str(payload)
    }
}

//! Fire-and-forget event publishing.
//!
//! Delivery is at most once: a failed publish is logged and counted, never
//! retried and never surfaced to the caller. Request handling must not
//! stall or fail because the bus is down.

use crate::domain::{DefaultActivityTypesInitializedEvent, UserCreatedEvent};
use crate::events::envelope::{DomainEvent, EventEnvelope};
use metrics::counter;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

#[derive(Clone)]
pub struct EventPublisher {
    redis: ConnectionManager,
}

impl EventPublisher {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    pub async fn publish_user_registered(&self, event: UserCreatedEvent) {
        self.publish(DomainEvent::UserRegistered(event)).await;
    }

    pub async fn publish_activity_defaults_initialized(
        &self,
        event: DefaultActivityTypesInitializedEvent,
    ) {
        self.publish(DomainEvent::ActivityDefaultsInitialized(event))
            .await;
    }

    /// Publish one event on its channel.
    pub async fn publish(&self, event: DomainEvent) {
        let envelope = EventEnvelope::new(event);
        let channel = envelope.channel.clone();
        let kind = envelope.payload.kind();

        let encoded = match envelope.to_json() {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::error!(channel, kind, error = %e, "failed to encode event, dropping");
                counter!("patio_events_publish_failures_total", "channel" => channel)
                    .increment(1);
                return;
            }
        };

        let mut conn = self.redis.clone();
        match conn.publish::<_, _, ()>(&channel, encoded).await {
            Ok(()) => {
                tracing::debug!(channel, kind, "event published");
                counter!("patio_events_published_total", "channel" => channel).increment(1);
            }
            Err(e) => {
                tracing::error!(channel, kind, error = %e, "failed to publish event, dropping");
                counter!("patio_events_publish_failures_total", "channel" => channel)
                    .increment(1);
            }
        }
    }
}

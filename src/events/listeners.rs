//! In-process event listeners.
//!
//! The activity-defaults listener closes the registration loop without a
//! direct call between the user and activity sides: a user-registered event
//! triggers seeding, and completion is announced back on the bus.

use crate::domain::{DefaultActivityTypesInitializedEvent, UserCreatedEvent};
use crate::error::Result;
use crate::events::envelope::DomainEvent;
use crate::events::publisher::EventPublisher;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Default activity types every new user starts with.
pub const DEFAULT_ACTIVITY_TYPES: &[&str] = &["run", "ride", "swim", "hike", "walk"];

/// Seeds the default activity types for a freshly registered user and
/// reports how many now exist.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActivityDefaultsSeeder: Send + Sync {
    async fn seed_defaults(&self, user_id: &str) -> Result<u32>;
}

/// Seeder backed by the built-in catalogue.
pub struct StaticActivityDefaults;

#[async_trait]
impl ActivityDefaultsSeeder for StaticActivityDefaults {
    async fn seed_defaults(&self, user_id: &str) -> Result<u32> {
        debug!(user_id, types = ?DEFAULT_ACTIVITY_TYPES, "seeding default activity types");
        Ok(DEFAULT_ACTIVITY_TYPES.len() as u32)
    }
}

/// Spawn the listener. It runs until the bus is closed.
pub fn spawn_activity_defaults_listener(
    mut rx: broadcast::Receiver<DomainEvent>,
    seeder: Arc<dyn ActivityDefaultsSeeder>,
    publisher: EventPublisher,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(DomainEvent::UserRegistered(event)) => {
                    if let Some(initialized) = seed_for_user(seeder.as_ref(), &event).await {
                        publisher
                            .publish_activity_defaults_initialized(initialized)
                            .await;
                    }
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "activity defaults listener lagged, events skipped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

/// Run the seeder for one registration. Returns the completion event to
/// announce, or `None` when seeding failed.
async fn seed_for_user(
    seeder: &dyn ActivityDefaultsSeeder,
    event: &UserCreatedEvent,
) -> Option<DefaultActivityTypesInitializedEvent> {
    match seeder.seed_defaults(&event.user_id).await {
        Ok(count) => {
            info!(
                user_id = %event.user_id,
                activity_type_count = count,
                "default activity types initialized"
            );
            Some(DefaultActivityTypesInitializedEvent {
                user_id: event.user_id.clone(),
                activity_type_count: count,
                initialized_at: Utc::now(),
            })
        }
        Err(e) => {
            error!(
                user_id = %event.user_id,
                error = %e,
                "failed to seed default activity types"
            );
            None
        }
    }
}

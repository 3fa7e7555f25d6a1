//! Cross-service domain event payloads.
//!
//! These are the facts services announce to each other over the event bus.
//! The user service publishes [`UserCreatedEvent`] when a registration
//! commits; the activity side reacts by seeding default activity types and
//! announces completion with [`DefaultActivityTypesInitializedEvent`].
//! Neither service calls the other directly for this exchange.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A new user account was created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCreatedEvent {
    pub user_id: String,
    pub email: String,
    pub username: String,
    pub registered_at: DateTime<Utc>,
}

/// Default activity types now exist for a freshly registered user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultActivityTypesInitializedEvent {
    pub user_id: String,
    pub activity_type_count: u32,
    pub initialized_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn user_created_event_uses_camel_case_on_the_wire() {
        let event = UserCreatedEvent {
            user_id: "u-42".into(),
            email: "new@example.com".into(),
            username: "newcomer".into(),
            registered_at: Utc.with_ymd_and_hms(2024, 3, 15, 8, 0, 0).unwrap(),
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["userId"], "u-42");
        assert_eq!(value["registeredAt"], "2024-03-15T08:00:00Z");

        let back: UserCreatedEvent = serde_json::from_value(value).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn defaults_initialized_event_round_trips() {
        let event = DefaultActivityTypesInitializedEvent {
            user_id: "u-42".into(),
            activity_type_count: 5,
            initialized_at: Utc.with_ymd_and_hms(2024, 3, 15, 8, 0, 1).unwrap(),
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["activityTypeCount"], 5);

        let back: DefaultActivityTypesInitializedEvent =
            serde_json::from_value(value).unwrap();
        assert_eq!(back, event);
    }
}

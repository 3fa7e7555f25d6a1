//! Fixed channel registry for the event bus.
//!
//! Event kinds map to channels at compile time so publisher and subscriber
//! agree by construction; nothing derives channel names at runtime.

/// A user account was created.
pub const USER_REGISTERED: &str = "events:user-registered";

/// Default activity types were seeded for a new user.
pub const ACTIVITY_DEFAULTS_INITIALIZED: &str = "events:activity-defaults-initialized";

/// Every channel the subscriber bridge listens on.
pub const ALL: &[&str] = &[USER_REGISTERED, ACTIVITY_DEFAULTS_INITIALIZED];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_covers_every_channel() {
        assert_eq!(ALL, &[USER_REGISTERED, ACTIVITY_DEFAULTS_INITIALIZED]);
    }

    #[test]
    fn channels_share_the_events_namespace() {
        for channel in ALL {
            assert!(channel.starts_with("events:"), "unexpected channel {channel}");
        }
    }
}

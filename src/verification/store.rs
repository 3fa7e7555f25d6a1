//! Attempt record storage.

use crate::config::VerificationConfig;
use crate::domain::{
    apply_check, apply_send, BackoffPolicy, CheckOutcome, SendOutcome, VerificationAttempt,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

/// Applies verification transitions atomically per email.
///
/// `now` is a parameter rather than read inside so outcomes are
/// deterministic under test.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VerificationStore: Send + Sync {
    /// Record a send attempt for `email`, storing `code` when accepted.
    async fn register_send(&self, email: &str, code: &str, now: DateTime<Utc>) -> SendOutcome;

    /// Record a check attempt for `email`, consuming the record on success.
    async fn register_check(&self, email: &str, code: &str, now: DateTime<Utc>) -> CheckOutcome;
}

/// In-process store. One mutex guards the map; transitions are pure and
/// never await, so the critical section stays short and each email's
/// read-modify-write is atomic.
pub struct InMemoryVerificationStore {
    records: Mutex<HashMap<String, VerificationAttempt>>,
    send_policy: BackoffPolicy,
    check_policy: BackoffPolicy,
    code_ttl: Duration,
}

impl InMemoryVerificationStore {
    pub fn new(config: &VerificationConfig) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            send_policy: BackoffPolicy::new(config.send_backoff_base_secs, config.backoff_cap_secs),
            check_policy: BackoffPolicy::new(
                config.check_backoff_base_secs,
                config.backoff_cap_secs,
            ),
            code_ttl: Duration::seconds(config.code_ttl_secs.max(0)),
        }
    }

    fn apply<T>(
        &self,
        email: &str,
        transition: impl FnOnce(Option<&VerificationAttempt>) -> (Option<VerificationAttempt>, T),
    ) -> T {
        let mut records = self
            .records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let (next, outcome) = transition(records.get(email));
        match next {
            Some(record) => {
                records.insert(email.to_string(), record);
            }
            None => {
                records.remove(email);
            }
        }
        outcome
    }
}

#[async_trait]
impl VerificationStore for InMemoryVerificationStore {
    async fn register_send(&self, email: &str, code: &str, now: DateTime<Utc>) -> SendOutcome {
        self.apply(email, |existing| {
            apply_send(existing, email, code, now, &self.send_policy, self.code_ttl)
        })
    }

    async fn register_check(&self, email: &str, code: &str, now: DateTime<Utc>) -> CheckOutcome {
        self.apply(email, |existing| {
            apply_check(existing, code, now, &self.check_policy)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    const EMAIL: &str = "pat@example.com";

    fn store() -> InMemoryVerificationStore {
        InMemoryVerificationStore::new(&VerificationConfig::default())
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn send_then_verify_consumes_the_record() {
        let store = store();

        let outcome = store.register_send(EMAIL, "482916", t0()).await;
        assert!(matches!(outcome, SendOutcome::Accepted { .. }));

        let outcome = store
            .register_check(EMAIL, "482916", t0() + Duration::seconds(5))
            .await;
        assert_eq!(outcome, CheckOutcome::Verified);

        let outcome = store
            .register_check(EMAIL, "482916", t0() + Duration::seconds(6))
            .await;
        assert_eq!(outcome, CheckOutcome::NotFound, "verification is one-shot");
    }

    #[tokio::test]
    async fn emails_are_throttled_independently() {
        let store = store();

        store.register_send("a@example.com", "111111", t0()).await;
        let outcome = store.register_send("b@example.com", "222222", t0()).await;

        assert!(matches!(outcome, SendOutcome::Accepted { .. }));
    }

    #[tokio::test]
    async fn resend_is_gated_by_the_send_window() {
        let store = store();

        store.register_send(EMAIL, "482916", t0()).await;
        let outcome = store
            .register_send(EMAIL, "734512", t0() + Duration::seconds(10))
            .await;

        assert_eq!(
            outcome,
            SendOutcome::Throttled {
                seconds_until_next_attempt: 20
            }
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_sends_accept_exactly_one() {
        let store = Arc::new(store());
        let now = t0();

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.register_send(EMAIL, &format!("{i:06}"), now).await
            }));
        }

        let mut accepted = 0;
        let mut throttled = 0;
        for handle in handles {
            match handle.await.unwrap() {
                SendOutcome::Accepted { .. } => accepted += 1,
                SendOutcome::Throttled { .. } => throttled += 1,
            }
        }

        assert_eq!(accepted, 1);
        assert_eq!(throttled, 15);
    }

    #[tokio::test]
    async fn check_backoff_uses_the_check_policy() {
        let config = VerificationConfig {
            check_backoff_base_secs: 7,
            ..VerificationConfig::default()
        };
        let store = InMemoryVerificationStore::new(&config);

        store.register_send(EMAIL, "482916", t0()).await;
        store
            .register_check(EMAIL, "000000", t0() + Duration::seconds(1))
            .await;

        let outcome = store
            .register_check(EMAIL, "482916", t0() + Duration::seconds(2))
            .await;
        assert_eq!(
            outcome,
            CheckOutcome::Throttled {
                seconds_until_next_attempt: 6
            }
        );
    }
}

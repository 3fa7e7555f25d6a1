//! Email verification attempt tracking.
//!
//! One [`VerificationAttempt`] record exists per email address while a
//! verification is in flight. The transitions here are pure functions over
//! `(record, now)` so the store can apply them inside its critical section
//! and tests can drive the clock explicitly. A returned state of `None`
//! means the record is deleted.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

/// Doubling retry schedule for repeated attempts against one email.
///
/// After the nth accepted attempt the next one must wait
/// `base * 2^(n-1)` seconds, capped at `cap`. With the default 30s base
/// that yields 30s, 60s, 120s, ... up to the one-hour cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    base_secs: i64,
    cap_secs: i64,
}

impl BackoffPolicy {
    /// A base below one second would never reopen the window correctly, so
    /// it is clamped up; a negative cap disables backoff entirely.
    pub fn new(base_secs: i64, cap_secs: i64) -> Self {
        Self {
            base_secs: base_secs.max(1),
            cap_secs: cap_secs.max(0),
        }
    }

    /// Delay imposed after the given 1-based attempt number.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let mut secs = self.base_secs;
        for _ in 1..attempt {
            if secs >= self.cap_secs {
                break;
            }
            secs = secs.saturating_mul(2);
        }
        Duration::seconds(secs.min(self.cap_secs))
    }
}

/// Per-email verification state.
///
/// Send and check attempts are throttled independently: rotating the code
/// via a new send never loosens the check window, and vice versa.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationAttempt {
    pub email: String,
    pub send_attempts: u32,
    pub last_send_attempt_at: DateTime<Utc>,
    pub next_send_attempt_at: DateTime<Utc>,
    pub check_attempts: u32,
    pub last_check_attempt_at: Option<DateTime<Utc>>,
    pub next_check_attempt_at: Option<DateTime<Utc>>,
    pub verification_code: String,
    pub code_expires_at: DateTime<Utc>,
}

/// Result of applying a send attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// The attempt was accepted; the freshly stored code is valid until the
    /// returned instant.
    Accepted { code_expires_at: DateTime<Utc> },
    /// The attempt arrived before the per-email send window reopened.
    Throttled { seconds_until_next_attempt: u64 },
}

/// Result of applying a check attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    /// The supplied code matched; the record has been consumed.
    Verified,
    /// No verification is in flight for this email.
    NotFound,
    /// The active code lapsed before the check arrived.
    Expired,
    /// The attempt arrived before the per-email check window reopened.
    Throttled { seconds_until_next_attempt: u64 },
    /// The supplied code did not match the active one.
    Mismatch,
}

/// Applies a send attempt, rotating the code and rescheduling the send
/// window when accepted.
pub fn apply_send(
    existing: Option<&VerificationAttempt>,
    email: &str,
    code: &str,
    now: DateTime<Utc>,
    policy: &BackoffPolicy,
    code_ttl: Duration,
) -> (Option<VerificationAttempt>, SendOutcome) {
    if let Some(record) = existing {
        if now < record.next_send_attempt_at {
            let outcome = SendOutcome::Throttled {
                seconds_until_next_attempt: seconds_until(now, record.next_send_attempt_at),
            };
            return (Some(record.clone()), outcome);
        }
    }

    let send_attempts = existing.map_or(0, |r| r.send_attempts).saturating_add(1);
    let record = VerificationAttempt {
        email: email.to_owned(),
        send_attempts,
        last_send_attempt_at: now,
        next_send_attempt_at: now + policy.delay_after(send_attempts),
        check_attempts: existing.map_or(0, |r| r.check_attempts),
        last_check_attempt_at: existing.and_then(|r| r.last_check_attempt_at),
        next_check_attempt_at: existing.and_then(|r| r.next_check_attempt_at),
        verification_code: code.to_owned(),
        code_expires_at: now + code_ttl,
    };
    let outcome = SendOutcome::Accepted {
        code_expires_at: record.code_expires_at,
    };
    (Some(record), outcome)
}

/// Applies a check attempt. Expiry is reported before throttling, and only
/// attempts that reach the code comparison consume the check window.
pub fn apply_check(
    existing: Option<&VerificationAttempt>,
    code: &str,
    now: DateTime<Utc>,
    policy: &BackoffPolicy,
) -> (Option<VerificationAttempt>, CheckOutcome) {
    let Some(record) = existing else {
        return (None, CheckOutcome::NotFound);
    };

    if now > record.code_expires_at {
        return (Some(record.clone()), CheckOutcome::Expired);
    }

    if let Some(next) = record.next_check_attempt_at {
        if now < next {
            let outcome = CheckOutcome::Throttled {
                seconds_until_next_attempt: seconds_until(now, next),
            };
            return (Some(record.clone()), outcome);
        }
    }

    if code == record.verification_code {
        return (None, CheckOutcome::Verified);
    }

    let check_attempts = record.check_attempts.saturating_add(1);
    let mut updated = record.clone();
    updated.check_attempts = check_attempts;
    updated.last_check_attempt_at = Some(now);
    updated.next_check_attempt_at = Some(now + policy.delay_after(check_attempts));
    (Some(updated), CheckOutcome::Mismatch)
}

/// Whole seconds remaining until `next`, rounded up so callers never retry
/// inside the window.
fn seconds_until(now: DateTime<Utc>, next: DateTime<Utc>) -> u64 {
    let millis = (next - now).num_milliseconds().max(0);
    ((millis + 999) / 1000) as u64
}

/// Request body for sending a verification code.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SendCodeInput {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
}

/// Request body for checking a verification code.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CheckCodeInput {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 4, max = 10, message = "must be between 4 and 10 characters"))]
    pub code: String,
}

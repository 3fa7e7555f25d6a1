//! Verification flows.

use crate::config::VerificationConfig;
use crate::domain::{CheckOutcome, SendOutcome};
use crate::email::EmailSender;
use crate::error::{AppError, Result};
use crate::verification::store::VerificationStore;
use chrono::Utc;
use metrics::counter;
use rand::Rng;
use std::sync::Arc;

/// Orchestrates the send and check flows on top of a store and a mailer.
pub struct VerificationService<S: VerificationStore> {
    store: Arc<S>,
    mailer: Arc<dyn EmailSender>,
    code_length: u32,
    code_valid_minutes: i64,
}

impl<S: VerificationStore> VerificationService<S> {
    pub fn new(store: Arc<S>, mailer: Arc<dyn EmailSender>, config: &VerificationConfig) -> Self {
        Self {
            store,
            mailer,
            code_length: config.code_length,
            code_valid_minutes: (config.code_ttl_secs.max(0) + 59) / 60,
        }
    }

    /// Generate a fresh code for `email` and deliver it.
    ///
    /// The attempt is claimed in the store before mail goes out, so a
    /// delivery failure still leaves the send window closed; the caller
    /// retries through the normal backoff.
    pub async fn send_code(&self, email: &str) -> Result<()> {
        let email = normalize_email(email);
        let code = generate_code(self.code_length);

        match self.store.register_send(&email, &code, Utc::now()).await {
            SendOutcome::Throttled {
                seconds_until_next_attempt,
            } => {
                counter!("patio_verification_sends_total", "outcome" => "throttled").increment(1);
                Err(AppError::TooManyRequests {
                    seconds_until_next_attempt,
                })
            }
            SendOutcome::Accepted { code_expires_at } => {
                if let Err(e) = self
                    .mailer
                    .send_verification_code(&email, &code, self.code_valid_minutes)
                    .await
                {
                    counter!("patio_verification_sends_total", "outcome" => "delivery_failed")
                        .increment(1);
                    return Err(AppError::Internal(
                        anyhow::Error::new(e).context("failed to send verification email"),
                    ));
                }

                tracing::info!(email, code_expires_at = %code_expires_at, "verification code sent");
                counter!("patio_verification_sends_total", "outcome" => "sent").increment(1);
                Ok(())
            }
        }
    }

    /// Check a code for `email`. Success consumes the verification.
    pub async fn check_code(&self, email: &str, code: &str) -> Result<()> {
        let email = normalize_email(email);

        match self.store.register_check(&email, code, Utc::now()).await {
            CheckOutcome::Verified => {
                tracing::info!(email, "verification code accepted");
                counter!("patio_verification_checks_total", "outcome" => "verified").increment(1);
                Ok(())
            }
            CheckOutcome::NotFound => {
                counter!("patio_verification_checks_total", "outcome" => "not_found").increment(1);
                Err(AppError::NotFound(
                    "no verification in progress for this email".to_string(),
                ))
            }
            CheckOutcome::Expired => {
                counter!("patio_verification_checks_total", "outcome" => "expired").increment(1);
                Err(AppError::CodeExpired)
            }
            CheckOutcome::Throttled {
                seconds_until_next_attempt,
            } => {
                counter!("patio_verification_checks_total", "outcome" => "throttled").increment(1);
                Err(AppError::TooManyRequests {
                    seconds_until_next_attempt,
                })
            }
            CheckOutcome::Mismatch => {
                counter!("patio_verification_checks_total", "outcome" => "mismatch").increment(1);
                Err(AppError::InvalidCode)
            }
        }
    }
}

/// Zero-padded numeric code of the given length.
pub fn generate_code(length: u32) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::{EmailError, MockEmailSender};
    use crate::verification::store::MockVerificationStore;
    use chrono::{Duration, Utc};
    use pretty_assertions::assert_eq;

    fn service(
        store: MockVerificationStore,
        mailer: MockEmailSender,
    ) -> VerificationService<MockVerificationStore> {
        VerificationService::new(
            Arc::new(store),
            Arc::new(mailer),
            &VerificationConfig::default(),
        )
    }

    #[test]
    fn generated_codes_are_numeric_and_padded() {
        for _ in 0..50 {
            let code = generate_code(6);
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()), "code {code}");
        }
    }

    #[test]
    fn normalization_trims_and_lowercases() {
        assert_eq!(normalize_email("  Pat@Example.COM "), "pat@example.com");
    }

    #[tokio::test]
    async fn send_registers_normalized_email_and_fresh_code() {
        let mut store = MockVerificationStore::new();
        store
            .expect_register_send()
            .withf(|email, code, _| {
                email == "pat@example.com" && code.len() == 6
            })
            .once()
            .returning(|_, _, now| SendOutcome::Accepted {
                code_expires_at: now + Duration::minutes(10),
            });

        let mut mailer = MockEmailSender::new();
        mailer
            .expect_send_verification_code()
            .withf(|to, code, valid_minutes| {
                to == "pat@example.com" && code.len() == 6 && *valid_minutes == 10
            })
            .once()
            .returning(|_, _, _| Ok(()));

        let result = service(store, mailer).send_code("  Pat@Example.COM ").await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn throttled_send_skips_delivery() {
        let mut store = MockVerificationStore::new();
        store.expect_register_send().once().returning(|_, _, _| {
            SendOutcome::Throttled {
                seconds_until_next_attempt: 42,
            }
        });

        let mut mailer = MockEmailSender::new();
        mailer.expect_send_verification_code().never();

        let err = service(store, mailer)
            .send_code("pat@example.com")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::TooManyRequests {
                seconds_until_next_attempt: 42
            }
        ));
    }

    #[tokio::test]
    async fn delivery_failure_surfaces_as_internal_error() {
        let mut store = MockVerificationStore::new();
        store.expect_register_send().once().returning(|_, _, now| {
            SendOutcome::Accepted {
                code_expires_at: now + Duration::minutes(10),
            }
        });

        let mut mailer = MockEmailSender::new();
        mailer
            .expect_send_verification_code()
            .once()
            .returning(|_, _, _| Err(EmailError::Connection("relay unreachable".to_string())));

        let err = service(store, mailer)
            .send_code("pat@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[tokio::test]
    async fn check_maps_verified_to_ok() {
        let mut store = MockVerificationStore::new();
        store
            .expect_register_check()
            .withf(|email, code, _| email == "pat@example.com" && code == "482916")
            .once()
            .returning(|_, _, _| CheckOutcome::Verified);

        let result = service(store, MockEmailSender::new())
            .check_code("Pat@example.com", "482916")
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn check_maps_not_found() {
        let mut store = MockVerificationStore::new();
        store
            .expect_register_check()
            .once()
            .returning(|_, _, _| CheckOutcome::NotFound);

        let err = service(store, MockEmailSender::new())
            .check_code("pat@example.com", "482916")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn check_maps_expired() {
        let mut store = MockVerificationStore::new();
        store
            .expect_register_check()
            .once()
            .returning(|_, _, _| CheckOutcome::Expired);

        let err = service(store, MockEmailSender::new())
            .check_code("pat@example.com", "482916")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::CodeExpired));
    }

    #[tokio::test]
    async fn check_maps_throttle_with_remaining_seconds() {
        let mut store = MockVerificationStore::new();
        store.expect_register_check().once().returning(|_, _, _| {
            CheckOutcome::Throttled {
                seconds_until_next_attempt: 17,
            }
        });

        let err = service(store, MockEmailSender::new())
            .check_code("pat@example.com", "482916")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::TooManyRequests {
                seconds_until_next_attempt: 17
            }
        ));
    }

    #[tokio::test]
    async fn check_maps_mismatch_to_invalid_code() {
        let mut store = MockVerificationStore::new();
        store
            .expect_register_check()
            .once()
            .returning(|_, _, _| CheckOutcome::Mismatch);

        let err = service(store, MockEmailSender::new())
            .check_code("pat@example.com", "482916")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCode));
    }

    #[tokio::test]
    async fn service_passes_current_time_to_the_store() {
        let before = Utc::now();
        let mut store = MockVerificationStore::new();
        store
            .expect_register_check()
            .withf(move |_, _, now| *now >= before && *now <= before + Duration::seconds(5))
            .once()
            .returning(|_, _, _| CheckOutcome::Verified);

        let result = service(store, MockEmailSender::new())
            .check_code("pat@example.com", "482916")
            .await;
        assert!(result.is_ok());
    }
}

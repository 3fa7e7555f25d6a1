//! Outbound verification mail.

pub mod smtp;

pub use smtp::SmtpEmailSender;

use async_trait::async_trait;
use thiserror::Error;

/// Email delivery error types
#[derive(Error, Debug)]
pub enum EmailError {
    #[error("invalid email configuration: {0}")]
    InvalidConfiguration(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Delivers verification codes to end users.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Send `code` to `to`, stating that it stays valid for `valid_minutes`.
    async fn send_verification_code(
        &self,
        to: &str,
        code: &str,
        valid_minutes: i64,
    ) -> Result<(), EmailError>;
}

/// Stand-in sender for environments without SMTP credentials. The code is
/// written to the log instead of delivered, which is only acceptable for
/// local development.
pub struct LogOnlyEmailSender;

#[async_trait]
impl EmailSender for LogOnlyEmailSender {
    async fn send_verification_code(
        &self,
        to: &str,
        code: &str,
        valid_minutes: i64,
    ) -> Result<(), EmailError> {
        tracing::warn!(
            to,
            code,
            valid_minutes,
            "SMTP not configured, logging verification code instead of sending it"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_only_sender_always_succeeds() {
        let sender = LogOnlyEmailSender;
        assert!(sender
            .send_verification_code("pat@example.com", "482916", 10)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn mock_sender_reports_failures() {
        let mut mock = MockEmailSender::new();
        mock.expect_send_verification_code()
            .returning(|_, _, _| Err(EmailError::Connection("relay unreachable".to_string())));

        let result = mock
            .send_verification_code("pat@example.com", "482916", 10)
            .await;
        assert!(matches!(result, Err(EmailError::Connection(_))));
    }

    #[test]
    fn error_display_is_informative() {
        let errors = vec![
            EmailError::InvalidConfiguration("missing host".to_string()),
            EmailError::Connection("timeout".to_string()),
            EmailError::SendFailed("recipient rejected".to_string()),
        ];

        for err in errors {
            assert!(!err.to_string().is_empty());
        }
    }
}

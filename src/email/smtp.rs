//! SMTP delivery using lettre.

use crate::config::SmtpConfig;
use crate::email::{EmailError, EmailSender};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

/// Sender backed by an SMTP relay.
pub struct SmtpEmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpEmailSender {
    pub fn from_config(config: &SmtpConfig) -> Result<Self, EmailError> {
        let mut builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| EmailError::InvalidConfiguration(e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };

        builder = builder.port(config.port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        let from = build_from_mailbox(config)?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send_verification_code(
        &self,
        to: &str,
        code: &str,
        valid_minutes: i64,
    ) -> Result<(), EmailError> {
        let to: Mailbox = to
            .parse()
            .map_err(|e| EmailError::InvalidConfiguration(format!("invalid to address: {e}")))?;

        let body = format!(
            "Your Patio verification code is {code}.\n\n\
             It expires in {valid_minutes} minutes. If you did not request it, \
             you can ignore this message.\n"
        );

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject("Your Patio verification code")
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| EmailError::SendFailed(e.to_string()))?;

        match self.transport.send(email).await {
            Ok(_) => Ok(()),
            Err(e) => {
                let message = e.to_string();
                if message.contains("connection") || message.contains("timeout") {
                    Err(EmailError::Connection(message))
                } else {
                    Err(EmailError::SendFailed(message))
                }
            }
        }
    }
}

fn build_from_mailbox(config: &SmtpConfig) -> Result<Mailbox, EmailError> {
    let mailbox = if let Some(name) = &config.from_name {
        format!("{} <{}>", name, config.from_email)
    } else {
        config.from_email.clone()
    };

    mailbox
        .parse()
        .map_err(|e| EmailError::InvalidConfiguration(format!("invalid from address: {e}")))
}

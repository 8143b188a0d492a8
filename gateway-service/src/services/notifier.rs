use std::time::Duration;

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport, Transport,
};

use super::ServiceError;
use crate::config::SmtpConfig;

/// Out-of-band delivery of links and temporary credentials.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_invite(&self, email: &str, link: &str) -> Result<(), ServiceError>;

    async fn send_temporary_credentials(
        &self,
        email: &str,
        temporary_password: &str,
    ) -> Result<(), ServiceError>;

    async fn send_password_reset(&self, email: &str, link: &str) -> Result<(), ServiceError>;
}

/// Development notifier. Records that a delivery was skipped; links and
/// passwords carry secrets and are never written.
#[derive(Clone, Default)]
pub struct LoggingNotifier;

impl LoggingNotifier {
    fn skipped(email: &str, kind: &'static str) {
        tracing::warn!(to = %email, kind = kind, "Notification not delivered (logging notifier)");
    }
}

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn send_invite(&self, email: &str, _link: &str) -> Result<(), ServiceError> {
        Self::skipped(email, "invite");
        Ok(())
    }

    async fn send_temporary_credentials(
        &self,
        email: &str,
        _temporary_password: &str,
    ) -> Result<(), ServiceError> {
        Self::skipped(email, "temporary_credentials");
        Ok(())
    }

    async fn send_password_reset(&self, email: &str, _link: &str) -> Result<(), ServiceError> {
        Self::skipped(email, "password_reset");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailContent {
    pub subject: &'static str,
    pub plain: String,
    pub html: String,
}

pub fn invite_email(link: &str) -> EmailContent {
    EmailContent {
        subject: "You have been invited",
        plain: format!(
            "You have been invited to join a workspace.\n\nAccept the invitation here:\n\n{}\n\nIf you were not expecting this, ignore this email.",
            link
        ),
        html: format!(
            r#"<html><body style="font-family: Arial, sans-serif;">
<h2>You have been invited</h2>
<p>You have been invited to join a workspace.</p>
<p><a href="{0}">Accept invitation</a></p>
<p style="color: #666; font-size: 12px;">If you were not expecting this, ignore this email.</p>
</body></html>"#,
            link
        ),
    }
}

pub fn temporary_credentials_email(temporary_password: &str) -> EmailContent {
    EmailContent {
        subject: "Your new account",
        plain: format!(
            "An account was created for you.\n\nTemporary password: {}\n\nYou will be asked to choose a new password when you sign in.",
            temporary_password
        ),
        html: format!(
            r#"<html><body style="font-family: Arial, sans-serif;">
<h2>Your new account</h2>
<p>An account was created for you. Your temporary password is:</p>
<p><code>{0}</code></p>
<p>You will be asked to choose a new password when you sign in.</p>
</body></html>"#,
            temporary_password
        ),
    }
}

pub fn password_reset_email(link: &str) -> EmailContent {
    EmailContent {
        subject: "Reset your password",
        plain: format!(
            "We received a request to reset your password.\n\nSet a new password here:\n\n{}\n\nIf you didn't request this, ignore this email.",
            link
        ),
        html: format!(
            r#"<html><body style="font-family: Arial, sans-serif;">
<h2>Password reset request</h2>
<p>We received a request to reset your password.</p>
<p><a href="{0}">Reset password</a></p>
<p style="color: #666; font-size: 12px;">If you didn't request this, ignore this email.</p>
</body></html>"#,
            link
        ),
    }
}

/// Sends mail through an SMTP relay. Port 465 uses implicit TLS, anything
/// else upgrades with STARTTLS.
#[derive(Clone)]
pub struct SmtpNotifier {
    mailer: SmtpTransport,
    from: Mailbox,
}

impl SmtpNotifier {
    pub fn new(config: &SmtpConfig) -> Result<Self, ServiceError> {
        let builder = if config.port == 465 {
            SmtpTransport::relay(&config.host)
        } else {
            SmtpTransport::starttls_relay(&config.host)
        }
        .map_err(|e| ServiceError::Delivery(e.to_string()))?;

        let mailer = builder
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .port(config.port)
            .timeout(Some(Duration::from_secs(10)))
            .build();

        let from = config
            .from_address
            .parse::<Mailbox>()
            .map_err(|e| ServiceError::Delivery(format!("invalid SMTP_FROM: {}", e)))?;

        tracing::info!(host = %config.host, port = config.port, "SMTP notifier initialized");
        Ok(Self { mailer, from })
    }

    pub fn compose(&self, to: &str, content: &EmailContent) -> Result<Message, ServiceError> {
        let to = to
            .parse::<Mailbox>()
            .map_err(|e| ServiceError::Delivery(format!("invalid recipient: {}", e)))?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(content.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(content.plain.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(content.html.clone()),
                    ),
            )
            .map_err(|e| ServiceError::Delivery(e.to_string()))
    }

    async fn deliver(&self, to: &str, content: EmailContent) -> Result<(), ServiceError> {
        let message = self.compose(to, &content)?;

        // SmtpTransport blocks; keep it off the runtime threads.
        let mailer = self.mailer.clone();
        let result = tokio::task::spawn_blocking(move || mailer.send(&message))
            .await
            .map_err(|e| ServiceError::Delivery(e.to_string()))?;

        match result {
            Ok(_) => {
                tracing::info!(to = %to, subject = %content.subject, "Email sent");
                Ok(())
            }
            Err(e) => {
                tracing::error!(to = %to, error = %e, "Failed to send email");
                Err(ServiceError::Delivery(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send_invite(&self, email: &str, link: &str) -> Result<(), ServiceError> {
        self.deliver(email, invite_email(link)).await
    }

    async fn send_temporary_credentials(
        &self,
        email: &str,
        temporary_password: &str,
    ) -> Result<(), ServiceError> {
        self.deliver(email, temporary_credentials_email(temporary_password))
            .await
    }

    async fn send_password_reset(&self, email: &str, link: &str) -> Result<(), ServiceError> {
        self.deliver(email, password_reset_email(link)).await
    }
}

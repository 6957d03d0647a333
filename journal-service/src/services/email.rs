use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport, Transport,
};
use service_core::error::AppError;
use std::sync::Mutex;
use std::time::Duration;

use crate::config::SmtpConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertSeverity {
    Warning,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Warning => "WARNING",
            AlertSeverity::Critical => "CRITICAL",
        }
    }
}

/// Content of a security alert email.
#[derive(Debug, Clone)]
pub struct SecurityAlert {
    pub severity: AlertSeverity,
    pub ip_address: String,
    pub failed_attempts: i64,
    pub email_attempted: String,
    pub details: String,
}

#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send_verification_email(&self, to_email: &str, code: &str) -> Result<(), AppError>;

    async fn send_password_reset_email(&self, to_email: &str, code: &str)
        -> Result<(), AppError>;

    async fn send_welcome_email(
        &self,
        to_email: &str,
        display_name: &str,
        frontend_url: &str,
    ) -> Result<(), AppError>;

    async fn send_security_alert(
        &self,
        to_email: &str,
        alert: &SecurityAlert,
    ) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct EmailService {
    mailer: SmtpTransport,
    from_email: String,
}

impl EmailService {
    pub fn new(config: &SmtpConfig) -> Result<Self, AppError> {
        let builder = if config.username.is_empty() {
            // Local relays (mailhog, postfix on localhost) take plain SMTP.
            SmtpTransport::builder_dangerous(&config.host)
        } else {
            SmtpTransport::starttls_relay(&config.host)
                .map_err(|e| AppError::InternalError(anyhow::anyhow!(e.to_string())))?
                .credentials(Credentials::new(
                    config.username.clone(),
                    config.password.clone(),
                ))
        };

        let mailer = builder
            .port(config.port)
            .timeout(Some(Duration::from_secs(10)))
            .build();

        tracing::info!(host = %config.host, port = config.port, "Email service initialized");

        Ok(Self {
            mailer,
            from_email: config.from_email.clone(),
        })
    }

    async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        plain_body: &str,
        html_body: &str,
    ) -> Result<(), AppError> {
        let email = Message::builder()
            .from(
                self.from_email
                    .parse()
                    .map_err(|e: lettre::address::AddressError| AppError::InternalError(e.into()))?,
            )
            .to(to_email
                .parse()
                .map_err(|e: lettre::address::AddressError| AppError::InternalError(e.into()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(plain_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        // Send email in blocking thread pool to avoid blocking async runtime
        let mailer = self.mailer.clone();
        let result = tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::InternalError(e.into()))?;

        match result {
            Ok(_) => {
                tracing::info!(to = %to_email, subject = %subject, "Email sent successfully");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, to = %to_email, "Failed to send email");
                Err(AppError::EmailError(e.to_string()))
            }
        }
    }
}

fn wrap_html(title: &str, body: &str) -> String {
    format!(
        r#"<html>
  <body style="font-family: Arial, sans-serif; color: #1f2933;">
    <h2>{}</h2>
    {}
    <p style="color: #666; font-size: 12px;">Trading Journal</p>
  </body>
</html>"#,
        title, body
    )
}

#[async_trait]
impl EmailProvider for EmailService {
    async fn send_verification_email(&self, to_email: &str, code: &str) -> Result<(), AppError> {
        let html_body = wrap_html(
            "Verify your email",
            &format!(
                r#"<p>Your verification code is:</p>
    <p style="font-size: 24px; letter-spacing: 4px;"><strong>{}</strong></p>
    <p>The code expires in 24 hours.</p>"#,
                code
            ),
        );
        let plain_body = format!(
            "Verify your email\n\nYour verification code is: {}\n\nThe code expires in 24 hours.",
            code
        );

        self.send_email(to_email, "Verify Your Email Address", &plain_body, &html_body)
            .await
    }

    async fn send_password_reset_email(
        &self,
        to_email: &str,
        code: &str,
    ) -> Result<(), AppError> {
        let html_body = wrap_html(
            "Password reset request",
            &format!(
                r#"<p>Use this code to set a new password:</p>
    <p style="font-size: 24px; letter-spacing: 4px;"><strong>{}</strong></p>
    <p>The code expires in 1 hour. If you didn't request this, ignore this email.</p>"#,
                code
            ),
        );
        let plain_body = format!(
            "Password reset request\n\nUse this code to set a new password: {}\n\n\
             The code expires in 1 hour. If you didn't request this, ignore this email.",
            code
        );

        self.send_email(to_email, "Reset Your Password", &plain_body, &html_body)
            .await
    }

    async fn send_welcome_email(
        &self,
        to_email: &str,
        display_name: &str,
        frontend_url: &str,
    ) -> Result<(), AppError> {
        let html_body = wrap_html(
            &format!("Welcome, {}!", display_name),
            &format!(
                r#"<p>Your trading journal is ready. A default profile has been created for you.</p>
    <p><a href="{}">Open your journal</a></p>"#,
                frontend_url
            ),
        );
        let plain_body = format!(
            "Welcome, {}!\n\nYour trading journal is ready. A default profile has been created for you.\n\n{}",
            display_name, frontend_url
        );

        self.send_email(to_email, "Welcome to your Trading Journal", &plain_body, &html_body)
            .await
    }

    async fn send_security_alert(
        &self,
        to_email: &str,
        alert: &SecurityAlert,
    ) -> Result<(), AppError> {
        let subject = format!(
            "[{}] Security alert: failed logins from {}",
            alert.severity.as_str(),
            alert.ip_address
        );
        let html_body = wrap_html(
            &format!("{} security alert", alert.severity.as_str()),
            &format!(
                r#"<table>
      <tr><td>IP address</td><td>{}</td></tr>
      <tr><td>Failed attempts</td><td>{}</td></tr>
      <tr><td>Last email attempted</td><td>{}</td></tr>
    </table>
    <p>{}</p>"#,
                alert.ip_address, alert.failed_attempts, alert.email_attempted, alert.details
            ),
        );
        let plain_body = format!(
            "{} security alert\n\nIP address: {}\nFailed attempts: {}\nLast email attempted: {}\n\n{}",
            alert.severity.as_str(),
            alert.ip_address,
            alert.failed_attempts,
            alert.email_attempted,
            alert.details
        );

        self.send_email(to_email, &subject, &plain_body, &html_body)
            .await
    }
}

/// A message captured by [`MockEmailService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentEmail {
    Verification { to: String, code: String },
    PasswordReset { to: String, code: String },
    Welcome { to: String },
    SecurityAlert { to: String, ip_address: String, critical: bool },
}

/// Records outgoing mail instead of sending it.
#[derive(Default)]
pub struct MockEmailService {
    pub sent: Mutex<Vec<SentEmail>>,
}

impl MockEmailService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn record(&self, email: SentEmail) -> Result<(), AppError> {
        self.sent
            .lock()
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("Mock mailbox poisoned: {}", e)))?
            .push(email);
        Ok(())
    }
}

#[async_trait]
impl EmailProvider for MockEmailService {
    async fn send_verification_email(&self, to_email: &str, code: &str) -> Result<(), AppError> {
        self.record(SentEmail::Verification {
            to: to_email.to_string(),
            code: code.to_string(),
        })
    }

    async fn send_password_reset_email(
        &self,
        to_email: &str,
        code: &str,
    ) -> Result<(), AppError> {
        self.record(SentEmail::PasswordReset {
            to: to_email.to_string(),
            code: code.to_string(),
        })
    }

    async fn send_welcome_email(
        &self,
        to_email: &str,
        _display_name: &str,
        _frontend_url: &str,
    ) -> Result<(), AppError> {
        self.record(SentEmail::Welcome {
            to: to_email.to_string(),
        })
    }

    async fn send_security_alert(
        &self,
        to_email: &str,
        alert: &SecurityAlert,
    ) -> Result<(), AppError> {
        self.record(SentEmail::SecurityAlert {
            to: to_email.to_string(),
            ip_address: alert.ip_address.clone(),
            critical: alert.severity == AlertSeverity::Critical,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_service_creation() {
        let config = SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            username: "journal@example.com".to_string(),
            password: "app-password".to_string(),
            from_email: "journal@example.com".to_string(),
        };

        assert!(EmailService::new(&config).is_ok());
    }

    #[tokio::test]
    async fn test_mock_records_alerts() {
        let mock = MockEmailService::new();
        let alert = SecurityAlert {
            severity: AlertSeverity::Critical,
            ip_address: "10.0.0.9".to_string(),
            failed_attempts: 10,
            email_attempted: "victim@example.com".to_string(),
            details: "blocked".to_string(),
        };
        mock.send_security_alert("ops@example.com", &alert).await.unwrap();

        assert_eq!(
            mock.sent(),
            vec![SentEmail::SecurityAlert {
                to: "ops@example.com".to_string(),
                ip_address: "10.0.0.9".to_string(),
                critical: true,
            }]
        );
    }
}

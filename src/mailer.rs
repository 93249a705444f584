//! Verification email delivery.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::types::VerificationEmail;

/// Error type for email delivery.
#[derive(Debug, thiserror::Error)]
pub enum MailerError {
    /// Transport rejected or dropped the message.
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// Outbox write failed.
    #[cfg(feature = "postgres")]
    #[error("Outbox error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Sends the verification email to the site owner.
#[async_trait]
pub trait VerificationMailer: Send + Sync {
    /// Dispatch one verification email. Not retried by the caller.
    async fn send_verification_email(&self, email: &VerificationEmail) -> Result<(), MailerError>;
}

/// Mailer that renders the email into the log.
#[derive(Debug, Clone)]
pub struct TracingMailer {
    site_url: String,
}

impl TracingMailer {
    /// Create a mailer rendering against `site_url`.
    pub fn new(site_url: impl Into<String>) -> Self {
        Self {
            site_url: site_url.into(),
        }
    }
}

#[async_trait]
impl VerificationMailer for TracingMailer {
    async fn send_verification_email(&self, email: &VerificationEmail) -> Result<(), MailerError> {
        tracing::info!(
            target: "verification_trigger::mail",
            subject = %email.subject,
            amount_triggered = email.amount_triggered,
            site_url = %self.site_url,
            "{}",
            email.render(&self.site_url)
        );
        Ok(())
    }
}

/// Mailer that records what it was asked to send.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<VerificationEmail>>,
    fail: AtomicBool,
}

impl RecordingMailer {
    /// Create a mailer that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mailer that rejects everything.
    pub fn failing() -> Self {
        let mailer = Self::new();
        mailer.fail(true);
        mailer
    }

    /// Toggle failure mode.
    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Emails accepted so far.
    pub fn sent(&self) -> Vec<VerificationEmail> {
        self.sent.lock().clone()
    }

    /// Number of emails accepted.
    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }

    /// Most recent email accepted.
    pub fn last_sent(&self) -> Option<VerificationEmail> {
        self.sent.lock().last().cloned()
    }
}

#[async_trait]
impl VerificationMailer for RecordingMailer {
    async fn send_verification_email(&self, email: &VerificationEmail) -> Result<(), MailerError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MailerError::Delivery("mail transport unavailable".to_string()));
        }
        self.sent.lock().push(email.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TriggerSource;

    #[tokio::test]
    async fn test_recording_mailer_records() {
        let mailer = RecordingMailer::new();
        let email = VerificationEmail::for_source(TriggerSource::Admin, 5);

        mailer.send_verification_email(&email).await.unwrap();
        let second = VerificationEmail::for_source(TriggerSource::Api, 7);
        mailer.send_verification_email(&second).await.unwrap();

        assert_eq!(mailer.sent_count(), 2);
        assert_eq!(mailer.sent(), vec![email, second.clone()]);
        assert_eq!(mailer.last_sent(), Some(second));
    }

    #[tokio::test]
    async fn test_failing_mailer_records_nothing() {
        let mailer = RecordingMailer::failing();
        let email = VerificationEmail::for_source(TriggerSource::Import, 5);

        let result = mailer.send_verification_email(&email).await;

        assert!(matches!(result, Err(MailerError::Delivery(_))));
        assert_eq!(mailer.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_tracing_mailer_accepts() {
        let mailer = TracingMailer::new("https://example.com");
        let email = VerificationEmail::for_source(TriggerSource::Api, 5);
        assert!(mailer.send_verification_email(&email).await.is_ok());
    }
}

//! Errors surfaced by strict evaluations.

use crate::mailer::MailerError;
use crate::store::StoreError;
use crate::types::TriggerSource;

/// Error returned by an evaluation running under [`crate::TriggerPolicy::Strict`].
#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
    /// Settings, stats or event query failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Verification email could not be dispatched.
    #[error("Verification email failed: {0}")]
    Mailer(#[from] MailerError),

    /// Threshold crossed; the site owner must verify their email first.
    #[error("Email verification required: {amount} members added via {trigger_source} in the last 30 days")]
    VerificationRequired {
        /// Source that crossed its threshold.
        trigger_source: TriggerSource,
        /// Member count that crossed it.
        amount: u64,
    },
}

impl TriggerError {
    /// Machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Store(_) => "STORE_UNAVAILABLE",
            Self::Mailer(_) => "EMAIL_DISPATCH_FAILED",
            Self::VerificationRequired { .. } => "VERIFICATION_REQUIRED",
        }
    }

    /// Check if this is the fresh-trigger rejection rather than a failure.
    pub fn is_verification_required(&self) -> bool {
        matches!(self, Self::VerificationRequired { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        let required = TriggerError::VerificationRequired {
            trigger_source: TriggerSource::Import,
            amount: 10,
        };
        assert_eq!(required.code(), "VERIFICATION_REQUIRED");
        assert!(required.is_verification_required());

        let store = TriggerError::from(StoreError::Unavailable("down".to_string()));
        assert_eq!(store.code(), "STORE_UNAVAILABLE");
        assert!(!store.is_verification_required());
    }

    #[test]
    fn test_message_names_source_and_amount() {
        let required = TriggerError::VerificationRequired {
            trigger_source: TriggerSource::Admin,
            amount: 12,
        };
        assert_eq!(
            required.to_string(),
            "Email verification required: 12 members added via admin in the last 30 days"
        );
    }

    #[test]
    fn test_only_wrapped_failures_have_a_cause() {
        use std::error::Error;

        let required = TriggerError::VerificationRequired {
            trigger_source: TriggerSource::Api,
            amount: 3,
        };
        assert!(required.source().is_none());

        let mailer = TriggerError::from(MailerError::Delivery("smtp down".to_string()));
        assert_eq!(
            mailer.source().map(|e| e.to_string()),
            Some("Delivery failed: smtp down".to_string())
        );
    }
}

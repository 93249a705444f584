//! Verification process: the shared guard and the flag-then-email sequence.
//!
//! ```text
//! Verified ────────────► no-op (needs_verification = false)
//! PendingVerification ─► no-op (needs_verification = false)
//! Clear ──► write email_verify_required = true ──► send email ──► needs_verification = true
//! ```
//!
//! The guard is check-then-act, not atomic. Two evaluations racing from
//! `Clear` can both send. The flag write is not rolled back if the email
//! fails afterwards.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::TriggerError;
use crate::mailer::VerificationMailer;
use crate::store::{SettingKey, SettingsStore, StoreError};
use crate::types::{
    TriggerOutcome, TriggerPolicy, TriggerSource, VerificationEmail, VerificationState,
};

/// Read/write access to the verification flags, shared by every trigger path.
#[derive(Clone)]
pub struct VerificationGuard {
    settings: Arc<dyn SettingsStore>,
}

impl VerificationGuard {
    /// Create a guard over a settings store.
    pub fn new(settings: Arc<dyn SettingsStore>) -> Self {
        Self { settings }
    }

    /// Current state. `is_verified` is checked first and short-circuits.
    pub async fn state(&self) -> Result<VerificationState, StoreError> {
        if self.settings.is_verified().await? {
            return Ok(VerificationState::Verified);
        }
        let required = self.settings.is_verification_required().await?;
        Ok(VerificationState::from_flags(false, required))
    }

    /// Persist `email_verify_required = true`. The only write this crate makes.
    pub async fn mark_required(&self) -> Result<(), StoreError> {
        self.settings.edit(SettingKey::EmailVerifyRequired, true).await
    }
}

impl std::fmt::Debug for VerificationGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationGuard").finish_non_exhaustive()
    }
}

/// Request to start verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRequest {
    /// Member count that crossed the threshold.
    pub amount: u64,
    /// Source whose template is used.
    #[serde(default = "default_source")]
    pub source: TriggerSource,
    /// Failure policy.
    #[serde(default)]
    pub policy: TriggerPolicy,
}

fn default_source() -> TriggerSource {
    TriggerSource::Import
}

impl VerificationRequest {
    /// Lenient import request for `amount` members.
    pub fn new(amount: u64) -> Self {
        Self {
            amount,
            source: default_source(),
            policy: TriggerPolicy::default(),
        }
    }

    /// Set the source.
    pub fn with_source(mut self, source: TriggerSource) -> Self {
        self.source = source;
        self
    }

    /// Set the policy.
    pub fn with_policy(mut self, policy: TriggerPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Shorthand for `with_policy(TriggerPolicy::from_throw_on_trigger(..))`.
    pub fn throw_on_trigger(self, throw: bool) -> Self {
        self.with_policy(TriggerPolicy::from_throw_on_trigger(throw))
    }
}

/// Runs the guarded flag write and email dispatch.
#[derive(Clone)]
pub struct VerificationProcess {
    guard: VerificationGuard,
    mailer: Arc<dyn VerificationMailer>,
}

impl VerificationProcess {
    /// Create a process over a guard and a mailer.
    pub fn new(guard: VerificationGuard, mailer: Arc<dyn VerificationMailer>) -> Self {
        Self { guard, mailer }
    }

    /// Shared guard.
    pub fn guard(&self) -> &VerificationGuard {
        &self.guard
    }

    /// Start verification if the site is `Clear`.
    ///
    /// Under [`TriggerPolicy::Strict`] a fresh trigger returns
    /// [`TriggerError::VerificationRequired`] after the flag and email are
    /// done, and any collaborator failure is returned as-is.
    pub async fn start(
        &self,
        request: VerificationRequest,
    ) -> Result<TriggerOutcome, TriggerError> {
        let VerificationRequest { amount, source, policy } = request;

        let state = match self.guard.state().await {
            Ok(state) => state,
            Err(e) => return settle(policy, source, TriggerOutcome::idle(), e.into()),
        };

        if !state.can_trigger() {
            tracing::debug!(
                source = %source,
                amount = amount,
                state = %state,
                "Verification not started"
            );
            return Ok(TriggerOutcome::idle());
        }

        if let Err(e) = self.guard.mark_required().await {
            return settle(policy, source, TriggerOutcome::idle(), e.into());
        }

        let email = VerificationEmail::for_source(source, amount);
        if let Err(e) = self.mailer.send_verification_email(&email).await {
            // Flag stays set.
            return settle(policy, source, TriggerOutcome::triggered(), e.into());
        }

        tracing::info!(
            source = %source,
            amount = amount,
            "Email verification required; verification email sent"
        );

        if policy.is_strict() {
            return Err(TriggerError::VerificationRequired {
                trigger_source: source,
                amount,
            });
        }
        Ok(TriggerOutcome::triggered())
    }
}

impl std::fmt::Debug for VerificationProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationProcess")
            .field("guard", &self.guard)
            .finish_non_exhaustive()
    }
}

/// Propagate under `Strict`, log and fall back under `Lenient`.
pub(crate) fn settle(
    policy: TriggerPolicy,
    source: TriggerSource,
    fallback: TriggerOutcome,
    error: TriggerError,
) -> Result<TriggerOutcome, TriggerError> {
    match policy {
        TriggerPolicy::Strict => Err(error),
        TriggerPolicy::Lenient => {
            tracing::error!(
                source = %source,
                code = error.code(),
                error = %error,
                needs_verification = fallback.needs_verification,
                "Verification trigger failed; continuing"
            );
            Ok(fallback)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailer::RecordingMailer;
    use crate::store::InMemorySettings;

    fn process(
        settings: &Arc<InMemorySettings>,
        mailer: &Arc<RecordingMailer>,
    ) -> VerificationProcess {
        VerificationProcess::new(VerificationGuard::new(settings.clone()), mailer.clone())
    }

    #[tokio::test]
    async fn test_guard_state() {
        let settings = Arc::new(InMemorySettings::with_flags(true, true));
        let guard = VerificationGuard::new(settings.clone());
        assert_eq!(guard.state().await.unwrap(), VerificationState::Verified);

        settings.set_verified(false);
        assert_eq!(guard.state().await.unwrap(), VerificationState::PendingVerification);

        settings.set_verification_required(false);
        assert_eq!(guard.state().await.unwrap(), VerificationState::Clear);
    }

    #[tokio::test]
    async fn test_fresh_trigger_writes_flag_and_sends() {
        let settings = Arc::new(InMemorySettings::new());
        let mailer = Arc::new(RecordingMailer::new());

        let outcome = process(&settings, &mailer)
            .start(VerificationRequest::new(10))
            .await
            .unwrap();

        assert!(outcome.needs_verification);
        assert_eq!(settings.edits(), vec![(SettingKey::EmailVerifyRequired, true)]);
        assert_eq!(mailer.sent_count(), 1);
    }

    #[tokio::test]
    async fn test_second_trigger_is_noop() {
        let settings = Arc::new(InMemorySettings::new());
        let mailer = Arc::new(RecordingMailer::new());
        let process = process(&settings, &mailer);

        process.start(VerificationRequest::new(10)).await.unwrap();
        let second = process.start(VerificationRequest::new(11)).await.unwrap();

        assert!(!second.needs_verification);
        assert_eq!(settings.edit_count(), 1);
        assert_eq!(mailer.sent_count(), 1);
    }

    #[tokio::test]
    async fn test_lenient_email_failure_keeps_flag() {
        let settings = Arc::new(InMemorySettings::new());
        let mailer = Arc::new(RecordingMailer::failing());

        let outcome = process(&settings, &mailer)
            .start(VerificationRequest::new(10))
            .await
            .unwrap();

        assert!(outcome.needs_verification);
        assert_eq!(settings.edit_count(), 1);
        assert_eq!(mailer.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_strict_email_failure_propagates() {
        let settings = Arc::new(InMemorySettings::new());
        let mailer = Arc::new(RecordingMailer::failing());

        let result = process(&settings, &mailer)
            .start(VerificationRequest::new(10).throw_on_trigger(true))
            .await;

        assert!(matches!(result, Err(TriggerError::Mailer(_))));
        assert_eq!(settings.edit_count(), 1);
    }

    #[tokio::test]
    async fn test_lenient_write_failure_sends_nothing() {
        let settings = Arc::new(InMemorySettings::new());
        settings.fail_writes(true);
        let mailer = Arc::new(RecordingMailer::new());

        let outcome = process(&settings, &mailer)
            .start(VerificationRequest::new(10))
            .await
            .unwrap();

        assert!(!outcome.needs_verification);
        assert_eq!(mailer.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_strict_read_failure_propagates() {
        let settings = Arc::new(InMemorySettings::new());
        settings.fail_reads(true);
        let mailer = Arc::new(RecordingMailer::new());

        let result = process(&settings, &mailer)
            .start(VerificationRequest::new(10).with_policy(TriggerPolicy::Strict))
            .await;

        assert!(matches!(result, Err(TriggerError::Store(_))));
        assert_eq!(mailer.sent_count(), 0);
    }

    #[test]
    fn test_request_deserialize_defaults() {
        let request: VerificationRequest = serde_json::from_str(r#"{"amount": 5}"#).unwrap();
        assert_eq!(request, VerificationRequest::new(5));
    }
}

//! Threshold evaluation for the three trigger sources.
//!
//! One evaluator serves every [`TriggerSource`]. Sources differ in:
//! - threshold: import uses the resolved floor, api/admin use the configured value
//! - input: import is checked explicitly after a batch, api/admin per event
//! - template: see [`TriggerSource::message_template`]

use std::sync::Arc;

use crate::config::TriggerConfig;
use crate::counter::ActivityCounter;
use crate::error::TriggerError;
use crate::mailer::VerificationMailer;
use crate::process::{settle, VerificationGuard, VerificationProcess, VerificationRequest};
use crate::resolver::ThresholdResolver;
use crate::store::{MemberEventRepository, MemberStats, SettingsStore, StoreError};
use crate::types::{
    MemberCreatedEvent, Threshold, TriggerOutcome, TriggerPolicy, TriggerSource, VerificationState,
};

/// External collaborators the trigger needs.
#[derive(Clone)]
pub struct Collaborators {
    /// Verification flags.
    pub settings: Arc<dyn SettingsStore>,
    /// Member totals.
    pub stats: Arc<dyn MemberStats>,
    /// Member-created event counts.
    pub events: Arc<dyn MemberEventRepository>,
    /// Verification email delivery.
    pub mailer: Arc<dyn VerificationMailer>,
}

/// Decides whether member-creation volume requires owner email verification.
///
/// Construction has no side effects. Event-driven sources only fire once the
/// owning process calls [`crate::spawn_member_listener`].
#[derive(Debug, Clone)]
pub struct VerificationTrigger {
    config: TriggerConfig,
    counter: ActivityCounter,
    resolver: ThresholdResolver,
    process: VerificationProcess,
}

impl VerificationTrigger {
    /// Create a trigger from thresholds and collaborators.
    pub fn new(config: TriggerConfig, collaborators: Collaborators) -> Self {
        let Collaborators {
            settings,
            stats,
            events,
            mailer,
        } = collaborators;

        Self {
            config,
            counter: ActivityCounter::new(events),
            resolver: ThresholdResolver::new(config.import_threshold, stats),
            process: VerificationProcess::new(VerificationGuard::new(settings), mailer),
        }
    }

    /// Configured thresholds.
    pub fn config(&self) -> &TriggerConfig {
        &self.config
    }

    /// Current verification state.
    pub async fn verification_state(&self) -> Result<VerificationState, StoreError> {
        self.process.guard().state().await
    }

    /// `max(configured import threshold, total members)`, or disabled.
    pub async fn compute_effective_import_threshold(&self) -> Result<Threshold, StoreError> {
        self.resolver.resolve_import_threshold().await
    }

    /// Explicit import volume check, run after (or before accepting) a batch.
    pub async fn check_import_volume(
        &self,
        policy: TriggerPolicy,
    ) -> Result<TriggerOutcome, TriggerError> {
        self.evaluate(TriggerSource::Import, policy).await
    }

    /// Route a member-created event to its source's evaluation.
    ///
    /// Only api and admin events are evaluated. Failures are logged and
    /// never reach the member-creation flow.
    pub async fn handle_member_created(&self, event: &MemberCreatedEvent) -> TriggerOutcome {
        let source = match TriggerSource::from_member_source(event.source) {
            Some(source) if source.is_event_driven() => source,
            _ => {
                tracing::trace!(source = %event.source, "Ignoring member-created event");
                return TriggerOutcome::idle();
            }
        };

        self.evaluate(source, TriggerPolicy::Lenient)
            .await
            .unwrap_or_default()
    }

    /// Count recent activity for `source` and start verification if it
    /// exceeds the source's threshold.
    ///
    /// A disabled threshold returns before any query is made.
    pub async fn evaluate(
        &self,
        source: TriggerSource,
        policy: TriggerPolicy,
    ) -> Result<TriggerOutcome, TriggerError> {
        let configured = self.config.threshold(source);
        if !configured.is_enabled() {
            return Ok(TriggerOutcome::idle());
        }

        let count = match self.counter.count_recent(source.member_source()).await {
            Ok(count) => count,
            Err(e) => return settle(policy, source, TriggerOutcome::idle(), e.into()),
        };

        let threshold = match source {
            TriggerSource::Import => match self.resolver.import_check_threshold(count).await {
                Ok(threshold) => threshold,
                Err(e) => return settle(policy, source, TriggerOutcome::idle(), e.into()),
            },
            TriggerSource::Api | TriggerSource::Admin => configured,
        };

        if !threshold.is_exceeded_by(count) {
            tracing::debug!(
                source = %source,
                count = count,
                threshold = %threshold,
                "Member volume within threshold"
            );
            return Ok(TriggerOutcome::idle());
        }

        tracing::warn!(
            source = %source,
            count = count,
            threshold = %threshold,
            "Member volume exceeded threshold"
        );

        self.start_verification_process(
            VerificationRequest::new(count)
                .with_source(source)
                .with_policy(policy),
        )
        .await
    }

    /// Start verification directly, e.g. when an importer already knows the
    /// size of the batch it is about to accept.
    pub async fn start_verification_process(
        &self,
        request: VerificationRequest,
    ) -> Result<TriggerOutcome, TriggerError> {
        self.process.start(request).await
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailer::RecordingMailer;
    use crate::store::{InMemoryEventLog, InMemoryMemberStats, InMemorySettings};
    use crate::types::MemberSource;

    struct Fixture {
        settings: Arc<InMemorySettings>,
        stats: Arc<InMemoryMemberStats>,
        events: Arc<InMemoryEventLog>,
        mailer: Arc<RecordingMailer>,
    }

    impl Fixture {
        fn new(total_members: u64, event_total: u64) -> Self {
            Self {
                settings: Arc::new(InMemorySettings::new()),
                stats: Arc::new(InMemoryMemberStats::new(total_members)),
                events: Arc::new(InMemoryEventLog::with_fixed_total(event_total)),
                mailer: Arc::new(RecordingMailer::new()),
            }
        }

        fn trigger(&self, config: TriggerConfig) -> VerificationTrigger {
            VerificationTrigger::new(
                config,
                Collaborators {
                    settings: self.settings.clone(),
                    stats: self.stats.clone(),
                    events: self.events.clone(),
                    mailer: self.mailer.clone(),
                },
            )
        }
    }

    #[tokio::test]
    async fn test_at_threshold_does_not_trigger() {
        let fx = Fixture::new(0, 5);
        let trigger = fx.trigger(TriggerConfig::disabled().with_admin_threshold(5));

        let outcome = trigger.evaluate(TriggerSource::Admin, TriggerPolicy::Lenient).await.unwrap();

        assert!(!outcome.needs_verification);
        assert_eq!(fx.events.query_count(), 1);
        assert_eq!(fx.mailer.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_one_over_threshold_triggers() {
        let fx = Fixture::new(0, 6);
        let trigger = fx.trigger(TriggerConfig::disabled().with_admin_threshold(5));

        let outcome = trigger.evaluate(TriggerSource::Admin, TriggerPolicy::Lenient).await.unwrap();

        assert!(outcome.needs_verification);
        assert_eq!(fx.mailer.last_sent().unwrap().amount_triggered, 6);
    }

    #[tokio::test]
    async fn test_disabled_source_never_queries() {
        let fx = Fixture::new(15, 1_000);
        let trigger = fx.trigger(TriggerConfig::disabled());

        for source in TriggerSource::ALL {
            let outcome = trigger.evaluate(source, TriggerPolicy::Strict).await.unwrap();
            assert!(!outcome.needs_verification);
        }

        assert_eq!(fx.events.query_count(), 0);
        assert_eq!(fx.stats.call_count(), 0);
        assert_eq!(fx.mailer.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_ignores_untracked_event_sources() {
        let fx = Fixture::new(0, 100);
        let trigger = fx.trigger(
            TriggerConfig::disabled()
                .with_api_threshold(1)
                .with_admin_threshold(1)
                .with_import_threshold(1),
        );

        for source in [
            MemberSource::Member,
            MemberSource::System,
            MemberSource::Other,
            MemberSource::Import,
        ] {
            let outcome = trigger
                .handle_member_created(&MemberCreatedEvent::new("m", source))
                .await;
            assert!(!outcome.needs_verification);
        }

        assert_eq!(fx.events.query_count(), 0);
    }

    #[tokio::test]
    async fn test_event_path_absorbs_query_failure() {
        let fx = Fixture::new(0, 100);
        fx.events.fail(true);
        let trigger = fx.trigger(TriggerConfig::disabled().with_api_threshold(1));

        let outcome = trigger
            .handle_member_created(&MemberCreatedEvent::new("m", MemberSource::Api))
            .await;

        assert!(!outcome.needs_verification);
        assert_eq!(fx.settings.edit_count(), 0);
    }

    #[tokio::test]
    async fn test_strict_import_check_propagates_stats_failure() {
        let fx = Fixture::new(0, 100);
        fx.stats.fail(true);
        let trigger = fx.trigger(TriggerConfig::disabled().with_import_threshold(1));

        let result = trigger.check_import_volume(TriggerPolicy::Strict).await;

        assert!(matches!(result, Err(TriggerError::Store(_))));
    }

    #[tokio::test]
    async fn test_strict_import_check_rejects_fresh_trigger() {
        let fx = Fixture::new(15, 10);
        let trigger = fx.trigger(TriggerConfig::disabled().with_import_threshold(2));

        let result = trigger.check_import_volume(TriggerPolicy::Strict).await;

        match result {
            Err(TriggerError::VerificationRequired { trigger_source, amount }) => {
                assert_eq!(trigger_source, TriggerSource::Import);
                assert_eq!(amount, 10);
            }
            other => panic!("expected VerificationRequired, got {:?}", other),
        }
        assert_eq!(fx.mailer.sent_count(), 1);
    }

    #[tokio::test]
    async fn test_import_within_organic_size_does_not_trigger() {
        // 100 members, 10 imported: bar is max(2, 90) = 90.
        let fx = Fixture::new(100, 10);
        let trigger = fx.trigger(TriggerConfig::disabled().with_import_threshold(2));

        let outcome = trigger.check_import_volume(TriggerPolicy::Lenient).await.unwrap();

        assert!(!outcome.needs_verification);
        assert_eq!(fx.mailer.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_verification_state_reflects_trigger() {
        let fx = Fixture::new(0, 3);
        let trigger = fx.trigger(TriggerConfig::disabled().with_api_threshold(2));
        assert_eq!(trigger.verification_state().await.unwrap(), VerificationState::Clear);

        trigger.evaluate(TriggerSource::Api, TriggerPolicy::Lenient).await.unwrap();

        assert_eq!(
            trigger.verification_state().await.unwrap(),
            VerificationState::PendingVerification
        );
    }
}

//! Service state management.
//!
//! Bundles the trigger, the member event bus and the Postgres store that
//! backs every collaborator.

use std::sync::Arc;

use crate::bus::MemberEventBus;
use crate::config::TriggerConfig;
use crate::mailer::VerificationMailer;
use crate::store::PostgresStore;
use crate::trigger::{Collaborators, VerificationTrigger};

/// Shared service state.
#[derive(Clone)]
pub struct ServiceState {
    /// Threshold evaluator.
    pub trigger: Arc<VerificationTrigger>,
    /// Process-wide member-created bus.
    pub bus: MemberEventBus,
    /// Backing store (settings, stats, events).
    pub store: Arc<PostgresStore>,
}

impl ServiceState {
    /// Build state where the store also queues verification emails in its outbox.
    pub fn new(config: TriggerConfig, store: PostgresStore) -> Self {
        let store = Arc::new(store);
        let mailer: Arc<dyn VerificationMailer> = store.clone();
        Self::with_mailer(config, store, mailer)
    }

    /// Build state with a separate mailer.
    pub fn with_mailer(
        config: TriggerConfig,
        store: Arc<PostgresStore>,
        mailer: Arc<dyn VerificationMailer>,
    ) -> Self {
        let trigger = VerificationTrigger::new(
            config,
            Collaborators {
                settings: store.clone(),
                stats: store.clone(),
                events: store.clone(),
                mailer,
            },
        );

        Self {
            trigger: Arc::new(trigger),
            bus: MemberEventBus::new(),
            store,
        }
    }
}

impl std::fmt::Debug for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceState")
            .field("config", self.trigger.config())
            .field("bus", &self.bus)
            .finish_non_exhaustive()
    }
}

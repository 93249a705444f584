//! In-memory collaborators for testing and local runs.
//!
//! Every backend records the calls it receives and can be switched into a
//! failing mode, so tests can assert both on effects and on call counts.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use crate::types::{CreatedEventsFilter, MemberCreatedEvent};
use super::{MemberEventRepository, MemberStats, SettingKey, SettingsStore, StoreError};

/// In-memory settings flags.
#[derive(Debug, Default)]
pub struct InMemorySettings {
    verified: AtomicBool,
    verification_required: AtomicBool,
    /// Every successful `edit` call, in order.
    edits: Mutex<Vec<(SettingKey, bool)>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl InMemorySettings {
    /// Create settings with both flags cleared.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create settings with explicit flags.
    pub fn with_flags(verified: bool, verification_required: bool) -> Self {
        let settings = Self::new();
        settings.verified.store(verified, Ordering::SeqCst);
        settings
            .verification_required
            .store(verification_required, Ordering::SeqCst);
        settings
    }

    /// Operator action: mark the owner verified (or not).
    pub fn set_verified(&self, verified: bool) {
        self.verified.store(verified, Ordering::SeqCst);
    }

    /// Operator action: clear or set the pending flag without recording an edit.
    pub fn set_verification_required(&self, required: bool) {
        self.verification_required.store(required, Ordering::SeqCst);
    }

    /// Make flag reads fail.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make `edit` fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Recorded edits.
    pub fn edits(&self) -> Vec<(SettingKey, bool)> {
        self.edits.lock().clone()
    }

    /// Number of recorded edits.
    pub fn edit_count(&self) -> usize {
        self.edits.lock().len()
    }

    fn check_read(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("settings read failed".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for InMemorySettings {
    async fn is_verified(&self) -> Result<bool, StoreError> {
        self.check_read()?;
        Ok(self.verified.load(Ordering::SeqCst))
    }

    async fn is_verification_required(&self) -> Result<bool, StoreError> {
        self.check_read()?;
        Ok(self.verification_required.load(Ordering::SeqCst))
    }

    async fn edit(&self, key: SettingKey, value: bool) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("settings write failed".to_string()));
        }
        match key {
            SettingKey::EmailVerified => self.verified.store(value, Ordering::SeqCst),
            SettingKey::EmailVerifyRequired => {
                self.verification_required.store(value, Ordering::SeqCst)
            }
        }
        self.edits.lock().push((key, value));
        Ok(())
    }
}

/// In-memory member statistics.
#[derive(Debug, Default)]
pub struct InMemoryMemberStats {
    total: AtomicU64,
    calls: AtomicUsize,
    fail: AtomicBool,
}

impl InMemoryMemberStats {
    /// Create stats reporting `total` members.
    pub fn new(total: u64) -> Self {
        Self {
            total: AtomicU64::new(total),
            ..Self::default()
        }
    }

    /// Change the reported total.
    pub fn set_total(&self, total: u64) {
        self.total.store(total, Ordering::SeqCst);
    }

    /// Make `total_members` fail.
    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Number of `total_members` calls.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MemberStats for InMemoryMemberStats {
    async fn total_members(&self) -> Result<u64, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("member stats failed".to_string()));
        }
        Ok(self.total.load(Ordering::SeqCst))
    }
}

/// In-memory member-created event log.
///
/// Counts recorded events against the filter, unless a fixed total is set,
/// in which case every query answers with that total.
#[derive(Debug, Default)]
pub struct InMemoryEventLog {
    events: RwLock<Vec<MemberCreatedEvent>>,
    fixed_total: Mutex<Option<u64>>,
    /// Every filter received, in order.
    queries: Mutex<Vec<CreatedEventsFilter>>,
    fail: AtomicBool,
}

impl InMemoryEventLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a log that answers every query with `total`.
    pub fn with_fixed_total(total: u64) -> Self {
        let log = Self::new();
        *log.fixed_total.lock() = Some(total);
        log
    }

    /// Record an event.
    pub fn record(&self, event: MemberCreatedEvent) {
        self.events.write().push(event);
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Check if no events are recorded.
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Make queries fail.
    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Filters received so far.
    pub fn queries(&self) -> Vec<CreatedEventsFilter> {
        self.queries.lock().clone()
    }

    /// Number of queries received.
    pub fn query_count(&self) -> usize {
        self.queries.lock().len()
    }

    /// Most recent filter received.
    pub fn last_query(&self) -> Option<CreatedEventsFilter> {
        self.queries.lock().last().cloned()
    }
}

#[async_trait]
impl MemberEventRepository for InMemoryEventLog {
    async fn count_created_events(&self, filter: &CreatedEventsFilter) -> Result<u64, StoreError> {
        self.queries.lock().push(filter.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("event query failed".to_string()));
        }
        if let Some(total) = *self.fixed_total.lock() {
            return Ok(total);
        }
        let count = self.events.read().iter().filter(|e| filter.matches(e)).count();
        Ok(count as u64)
    }
}

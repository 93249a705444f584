//! Storage collaborators: settings flags, member stats, created-event counts.

pub mod memory;

#[cfg(feature = "postgres")]
pub mod postgres;

use std::fmt;

use async_trait::async_trait;

use crate::types::CreatedEventsFilter;

/// Error type for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Backend could not serve the request.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Database error.
    #[cfg(feature = "postgres")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Settings keys this component reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SettingKey {
    /// Operator confirmed the owner's email.
    EmailVerified,
    /// A verification request is pending.
    ///
    /// This is the site's `verification_required` flag. It is persisted as
    /// `email_verify_required`, the key existing site settings already use.
    EmailVerifyRequired,
}

impl SettingKey {
    /// Key as persisted.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmailVerified => "email_verified",
            Self::EmailVerifyRequired => "email_verify_required",
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Site settings holding the verification flags.
///
/// This component only ever writes `EmailVerifyRequired = true`. Clearing
/// either flag is an operator action.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Operator has confirmed the owner's identity.
    async fn is_verified(&self) -> Result<bool, StoreError>;

    /// A verification request is currently pending.
    async fn is_verification_required(&self) -> Result<bool, StoreError>;

    /// Persist a boolean setting.
    async fn edit(&self, key: SettingKey, value: bool) -> Result<(), StoreError>;
}

/// Member statistics.
#[async_trait]
pub trait MemberStats: Send + Sync {
    /// Total member count of the site.
    async fn total_members(&self) -> Result<u64, StoreError>;
}

/// Member-created event history.
#[async_trait]
pub trait MemberEventRepository: Send + Sync {
    /// Count (not fetch) the created events matching `filter`.
    async fn count_created_events(&self, filter: &CreatedEventsFilter) -> Result<u64, StoreError>;
}

pub use memory::{InMemoryEventLog, InMemoryMemberStats, InMemorySettings};

#[cfg(feature = "postgres")]
pub use postgres::{PostgresConfig, PostgresStore};

//! PostgreSQL collaborators for production use.
//!
//! One store serves settings flags, member totals, created-event counts and
//! the verification email outbox.
//!
//! ## Configuration
//!
//! All settings can be configured via environment variables:
//! - `DATABASE_URL`: PostgreSQL connection string (required)
//! - `DB_MAX_CONNECTIONS`: Maximum pool size (default: 10)
//! - `DB_MIN_CONNECTIONS`: Minimum idle connections (default: 2)
//! - `DB_CONNECT_TIMEOUT_SECS`: Connection timeout (default: 10)
//! - `DB_IDLE_TIMEOUT_SECS`: Idle connection timeout (default: 300)
//! - `DB_MAX_LIFETIME_SECS`: Max connection lifetime (default: 1800)

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Executor, Row};
use std::time::Duration;

use crate::mailer::{MailerError, VerificationMailer};
use crate::types::{CreatedEventsFilter, MemberCreatedEvent, VerificationEmail};
use super::{MemberEventRepository, MemberStats, SettingKey, SettingsStore, StoreError};

/// SQL schema for the tables this store reads and writes.
pub const VERIFICATION_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS members (
    id TEXT PRIMARY KEY,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS members_created_events (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    member_id TEXT NOT NULL,
    source TEXT NOT NULL,
    -- UTC, no zone: compared against second-precision window strings
    created_at TIMESTAMP NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_members_created_events_source_created
    ON members_created_events(source, created_at);

CREATE TABLE IF NOT EXISTS verification_email_outbox (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    subject TEXT NOT NULL,
    message TEXT NOT NULL,
    amount_triggered BIGINT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    sent_at TIMESTAMPTZ
);

CREATE INDEX IF NOT EXISTS idx_verification_email_outbox_unsent
    ON verification_email_outbox(created_at) WHERE sent_at IS NULL;
"#;

/// Configuration for PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL.
    pub database_url: String,
    /// Maximum connections in pool (default: 10).
    pub max_connections: u32,
    /// Minimum idle connections to keep warm (default: 2).
    pub min_connections: u32,
    /// Connection acquire timeout in seconds (default: 10).
    pub connect_timeout_secs: u64,
    /// Idle connection timeout in seconds (default: 300 = 5 min).
    pub idle_timeout_secs: u64,
    /// Maximum connection lifetime in seconds (default: 1800 = 30 min).
    pub max_lifetime_secs: u64,
}

impl PostgresConfig {
    /// Load configuration from environment variables with production defaults.
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/site".to_string()),
            max_connections: env_or("DB_MAX_CONNECTIONS", 10),
            min_connections: env_or("DB_MIN_CONNECTIONS", 2),
            connect_timeout_secs: env_or("DB_CONNECT_TIMEOUT_SECS", 10),
            idle_timeout_secs: env_or("DB_IDLE_TIMEOUT_SECS", 300),
            max_lifetime_secs: env_or("DB_MAX_LIFETIME_SECS", 1800),
        }
    }
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_or<T: std::str::FromStr>(var: &str, default: T) -> T {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// PostgreSQL store.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new store with the given configuration.
    pub async fn new(config: PostgresConfig) -> Result<Self, sqlx::Error> {
        tracing::info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            connect_timeout_secs = config.connect_timeout_secs,
            idle_timeout_secs = config.idle_timeout_secs,
            max_lifetime_secs = config.max_lifetime_secs,
            "Initializing PostgreSQL connection pool"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .test_before_acquire(true)
            .connect(&config.database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Create a store from environment variables.
    pub async fn from_env() -> Result<Self, sqlx::Error> {
        Self::new(PostgresConfig::from_env()).await
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the tables if they do not exist.
    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        self.pool.execute(VERIFICATION_SCHEMA).await?;
        Ok(())
    }

    /// Check if the database is reachable.
    pub async fn is_healthy(&self) -> bool {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }

    /// Get pool statistics for monitoring.
    pub fn pool_stats(&self) -> PoolStats {
        PoolStats {
            size: self.pool.size(),
            idle: self.pool.num_idle(),
            max: self.pool.options().get_max_connections(),
        }
    }

    /// Record a created member and append the event to the history.
    ///
    /// Both writes share one transaction so `total_members` and the event
    /// counts never drift apart. Re-recording a known member only appends
    /// the event.
    pub async fn record_member_created(
        &self,
        event: &MemberCreatedEvent,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO members (id, created_at)
            VALUES ($1, $2)
            ON CONFLICT (id) DO NOTHING
            "#
        )
        .bind(&event.member_id)
        .bind(event.created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO members_created_events (member_id, source, created_at)
            VALUES ($1, $2, $3)
            "#
        )
        .bind(&event.member_id)
        .bind(event.source.as_str())
        .bind(event.created_at.naive_utc())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!(
            member_id = %event.member_id,
            source = %event.source,
            "Member created event recorded"
        );
        Ok(())
    }

    async fn read_flag(&self, key: SettingKey) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT value FROM settings WHERE key = $1")
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await?;

        Ok(match row {
            Some(ref r) => {
                let value: String = r.try_get("value")?;
                value == "true"
            }
            None => false,
        })
    }
}

/// Pool statistics for monitoring.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PoolStats {
    /// Current pool size.
    pub size: u32,
    /// Number of idle connections.
    pub idle: usize,
    /// Maximum pool size.
    pub max: u32,
}

#[async_trait]
impl SettingsStore for PostgresStore {
    async fn is_verified(&self) -> Result<bool, StoreError> {
        self.read_flag(SettingKey::EmailVerified).await
    }

    async fn is_verification_required(&self) -> Result<bool, StoreError> {
        self.read_flag(SettingKey::EmailVerifyRequired).await
    }

    async fn edit(&self, key: SettingKey, value: bool) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
            "#
        )
        .bind(key.as_str())
        .bind(value.to_string())
        .execute(&self.pool)
        .await?;

        tracing::debug!(key = %key, value = value, "Setting updated");
        Ok(())
    }
}

#[async_trait]
impl MemberStats for PostgresStore {
    async fn total_members(&self) -> Result<u64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM members")
            .fetch_one(&self.pool)
            .await?;
        let total: i64 = row.try_get("total")?;
        Ok(total.max(0) as u64)
    }
}

#[async_trait]
impl MemberEventRepository for PostgresStore {
    async fn count_created_events(&self, filter: &CreatedEventsFilter) -> Result<u64, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total
            FROM members_created_events
            WHERE source = $1 AND created_at > $2::timestamp
            "#
        )
        .bind(filter.source.as_str())
        .bind(&filter.created_after)
        .fetch_one(&self.pool)
        .await?;

        let total: i64 = row.try_get("total")?;
        Ok(total.max(0) as u64)
    }
}

#[async_trait]
impl VerificationMailer for PostgresStore {
    /// Queue the email in the outbox; a separate sender delivers it.
    async fn send_verification_email(&self, email: &VerificationEmail) -> Result<(), MailerError> {
        sqlx::query(
            r#"
            INSERT INTO verification_email_outbox (subject, message, amount_triggered)
            VALUES ($1, $2, $3)
            "#
        )
        .bind(&email.subject)
        .bind(&email.message)
        .bind(i64::try_from(email.amount_triggered).unwrap_or(i64::MAX))
        .execute(&self.pool)
        .await?;

        tracing::info!(
            amount_triggered = email.amount_triggered,
            "Verification email queued in outbox"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MemberSource;

    async fn test_store() -> PostgresStore {
        let store = PostgresStore::from_env().await.unwrap();
        store.ensure_schema().await.unwrap();
        store
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_recording_events_grows_member_total() {
        let store = test_store().await;
        let before = store.total_members().await.unwrap();

        let member_id = uuid::Uuid::new_v4().to_string();
        let other_id = uuid::Uuid::new_v4().to_string();
        store
            .record_member_created(&MemberCreatedEvent::new(member_id.clone(), MemberSource::Api))
            .await
            .unwrap();
        store
            .record_member_created(&MemberCreatedEvent::new(other_id, MemberSource::Admin))
            .await
            .unwrap();
        // Same member again: one more event, no new member.
        store
            .record_member_created(&MemberCreatedEvent::new(member_id, MemberSource::Api))
            .await
            .unwrap();

        assert_eq!(store.total_members().await.unwrap(), before + 2);
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_settings_flags_round_trip() {
        let store = test_store().await;

        store.edit(SettingKey::EmailVerifyRequired, true).await.unwrap();
        assert!(store.is_verification_required().await.unwrap());

        store.edit(SettingKey::EmailVerifyRequired, false).await.unwrap();
        assert!(!store.is_verification_required().await.unwrap());
    }
}

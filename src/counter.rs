//! Counts recent member-created events for one source.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::store::{MemberEventRepository, StoreError};
use crate::types::{CreatedEventsFilter, MemberSource};

/// Length of the activity window, in days.
pub const ACTIVITY_WINDOW_DAYS: i64 = 30;

/// Asks the event repository how many members a source created recently.
///
/// No caching: every call re-queries.
#[derive(Clone)]
pub struct ActivityCounter {
    events: Arc<dyn MemberEventRepository>,
    window: Duration,
}

impl ActivityCounter {
    /// Create a counter over the standard 30-day window.
    pub fn new(events: Arc<dyn MemberEventRepository>) -> Self {
        Self {
            events,
            window: Duration::days(ACTIVITY_WINDOW_DAYS),
        }
    }

    /// Window length.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Start of the window ending at `now`.
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.window
    }

    /// Count events for `source` in the window ending now.
    pub async fn count_recent(&self, source: MemberSource) -> Result<u64, StoreError> {
        self.count_recent_at(source, Utc::now()).await
    }

    /// Count events for `source` in the window ending at `now`.
    pub async fn count_recent_at(
        &self,
        source: MemberSource,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let filter = CreatedEventsFilter::since(source, self.window_start(now));
        let count = self.events.count_created_events(&filter).await?;

        tracing::debug!(
            source = %source,
            created_after = %filter.created_after,
            count = count,
            "Counted recent member-created events"
        );

        Ok(count)
    }
}

impl std::fmt::Debug for ActivityCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityCounter")
            .field("window_days", &self.window.num_days())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryEventLog;
    use crate::types::MemberCreatedEvent;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_filter_bound_is_thirty_days_back() {
        let log = Arc::new(InMemoryEventLog::new());
        let counter = ActivityCounter::new(log.clone());
        assert_eq!(counter.window(), Duration::days(ACTIVITY_WINDOW_DAYS));
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 12, 0, 30).unwrap();

        counter.count_recent_at(MemberSource::Api, now).await.unwrap();

        let filter = log.last_query().unwrap();
        assert_eq!(filter.source, MemberSource::Api);
        assert_eq!(filter.created_after, "2024-03-01 12:00:30");
    }

    #[tokio::test]
    async fn test_counts_only_window_and_source() {
        let log = Arc::new(InMemoryEventLog::new());
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap();
        for i in 0..4 {
            log.record(MemberCreatedEvent::at(
                format!("in{}", i),
                MemberSource::Admin,
                now - Duration::days(i),
            ));
        }
        log.record(MemberCreatedEvent::at("old", MemberSource::Admin, now - Duration::days(31)));
        log.record(MemberCreatedEvent::at("other", MemberSource::Api, now));

        let counter = ActivityCounter::new(log.clone());
        let count = counter.count_recent_at(MemberSource::Admin, now).await.unwrap();

        assert_eq!(count, 4);
    }

    #[tokio::test]
    async fn test_propagates_query_failure() {
        let log = Arc::new(InMemoryEventLog::new());
        log.fail(true);
        let counter = ActivityCounter::new(log);

        assert!(counter.count_recent(MemberSource::Import).await.is_err());
    }
}

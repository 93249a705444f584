//! Member-created events and the query filter used to count them.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use super::source::MemberSource;

/// Timestamp format used for the window boundary (second precision).
pub const WINDOW_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A member was created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberCreatedEvent {
    /// Member identifier.
    pub member_id: String,
    /// Where the member came from.
    pub source: MemberSource,
    /// When the member was created.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl MemberCreatedEvent {
    /// Create an event timestamped now.
    pub fn new(member_id: impl Into<String>, source: MemberSource) -> Self {
        Self::at(member_id, source, Utc::now())
    }

    /// Create an event with an explicit timestamp.
    pub fn at(
        member_id: impl Into<String>,
        source: MemberSource,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            member_id: member_id.into(),
            source,
            created_at,
        }
    }
}

/// Filter for counting created events: `source = ? AND created_at > ?`.
///
/// Serializes to `{"source": "api", "created_at": {"$gt": "YYYY-MM-DD HH:MM:SS"}}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedEventsFilter {
    /// Source tag to match.
    pub source: MemberSource,
    /// Exclusive lower bound, formatted with [`WINDOW_TIMESTAMP_FORMAT`].
    pub created_after: String,
}

impl CreatedEventsFilter {
    /// Build a filter whose bound is `window_start` truncated to whole seconds.
    pub fn since(source: MemberSource, window_start: DateTime<Utc>) -> Self {
        Self {
            source,
            created_after: window_start.format(WINDOW_TIMESTAMP_FORMAT).to_string(),
        }
    }

    /// Parse the bound back into a naive UTC timestamp.
    pub fn created_after_timestamp(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.created_after, WINDOW_TIMESTAMP_FORMAT).ok()
    }

    /// Check whether an event falls inside this filter.
    pub fn matches(&self, event: &MemberCreatedEvent) -> bool {
        if event.source != self.source {
            return false;
        }
        match self.created_after_timestamp() {
            Some(bound) => event.created_at.naive_utc() > bound,
            None => false,
        }
    }
}

impl Serialize for CreatedEventsFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct Gt<'a>(&'a str);

        impl Serialize for Gt<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("$gt", self.0)?;
                map.end()
            }
        }

        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("source", &self.source)?;
        map.serialize_entry("created_at", &Gt(&self.created_after))?;
        map.end()
    }
}

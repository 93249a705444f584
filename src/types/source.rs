//! Member-creation sources and the trigger variants built on them.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::email::VERIFICATION_EMAIL_SUBJECT;

/// Source tag carried by a member-created event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberSource {
    /// Member signed up themselves.
    Member,
    /// Bulk import.
    Import,
    /// Created internally by the system.
    System,
    /// Public/integration API.
    Api,
    /// Admin UI.
    Admin,
    /// Any tag this component does not know about.
    #[serde(other)]
    Other,
}

impl MemberSource {
    /// Tag as stored by the event repository.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Import => "import",
            Self::System => "system",
            Self::Api => "api",
            Self::Admin => "admin",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for MemberSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source whose volume is watched by a trigger.
///
/// Import is pull-driven (checked explicitly after a batch), Api and Admin
/// are push-driven (checked on every member-created event).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    /// Bulk import.
    Import,
    /// Public/integration API.
    Api,
    /// Admin UI.
    Admin,
}

impl TriggerSource {
    /// All trigger sources.
    pub const ALL: [TriggerSource; 3] = [Self::Import, Self::Api, Self::Admin];

    /// Event source tag this trigger counts.
    pub fn member_source(&self) -> MemberSource {
        match self {
            Self::Import => MemberSource::Import,
            Self::Api => MemberSource::Api,
            Self::Admin => MemberSource::Admin,
        }
    }

    /// Map an event tag to the trigger watching it.
    pub fn from_member_source(source: MemberSource) -> Option<Self> {
        match source {
            MemberSource::Import => Some(Self::Import),
            MemberSource::Api => Some(Self::Api),
            MemberSource::Admin => Some(Self::Admin),
            MemberSource::Member | MemberSource::System | MemberSource::Other => None,
        }
    }

    /// Whether this source is fed by the live event stream.
    pub fn is_event_driven(&self) -> bool {
        !matches!(self, Self::Import)
    }

    /// Email subject. Identical for every source.
    pub fn subject(&self) -> &'static str {
        VERIFICATION_EMAIL_SUBJECT
    }

    /// Message template with `{siteUrl}` and `{amountTriggered}` placeholders.
    pub fn message_template(&self) -> &'static str {
        match self {
            Self::Import => {
                "Email verification needed for site: {siteUrl}, has imported: {amountTriggered} members in the last 30 days."
            }
            Self::Api => {
                "Email verification needed for site: {siteUrl} has added: {amountTriggered} members through the API in the last 30 days."
            }
            Self::Admin => {
                "Email verification needed for site: {siteUrl} has added: {amountTriggered} members through the Admin client in the last 30 days."
            }
        }
    }
}

impl fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.member_source().as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_tag_deserializes_to_other() {
        let source: MemberSource = serde_json::from_str("\"webhook\"").unwrap();
        assert_eq!(source, MemberSource::Other);
        assert_eq!(TriggerSource::from_member_source(source), None);
    }

    #[test]
    fn test_member_source_round_trips_tag() {
        let source: MemberSource = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(source, MemberSource::Admin);
        assert_eq!(source.as_str(), "admin");
    }

    #[test]
    fn test_trigger_sources_map_back() {
        for source in TriggerSource::ALL {
            assert_eq!(TriggerSource::from_member_source(source.member_source()), Some(source));
        }
        assert_eq!(TriggerSource::from_member_source(MemberSource::Member), None);
        assert_eq!(TriggerSource::from_member_source(MemberSource::System), None);
    }

    #[test]
    fn test_only_import_is_pull_driven() {
        assert!(!TriggerSource::Import.is_event_driven());
        assert!(TriggerSource::Api.is_event_driven());
        assert!(TriggerSource::Admin.is_event_driven());
    }

    #[test]
    fn test_templates_differ_per_source() {
        assert!(TriggerSource::Import.message_template().contains("has imported"));
        assert!(TriggerSource::Api.message_template().contains("through the API"));
        assert!(TriggerSource::Admin.message_template().contains("through the Admin client"));
    }
}

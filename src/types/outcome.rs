//! Verification state, trigger policy and trigger outcome.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where the site stands with respect to owner email verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationState {
    /// Operator confirmed the owner's email. Nothing ever triggers.
    Verified,
    /// A request is already pending. Nothing triggers until it is cleared.
    PendingVerification,
    /// Eligible to trigger.
    Clear,
}

impl VerificationState {
    /// Derive the state from the two settings flags. `verified` wins.
    pub fn from_flags(verified: bool, verification_required: bool) -> Self {
        if verified {
            Self::Verified
        } else if verification_required {
            Self::PendingVerification
        } else {
            Self::Clear
        }
    }

    /// Check if a trigger from this state would start a verification.
    pub fn can_trigger(&self) -> bool {
        matches!(self, Self::Clear)
    }
}

impl fmt::Display for VerificationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verified => write!(f, "verified"),
            Self::PendingVerification => write!(f, "pending_verification"),
            Self::Clear => write!(f, "clear"),
        }
    }
}

/// What to do with failures and fresh triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerPolicy {
    /// Log and absorb failures. Used by the event path.
    #[default]
    Lenient,
    /// Reject on any failure, and on a fresh trigger, so the caller can
    /// abort the action that crossed the threshold.
    Strict,
}

impl TriggerPolicy {
    /// Build from a `throw_on_trigger` style flag.
    pub fn from_throw_on_trigger(throw_on_trigger: bool) -> Self {
        if throw_on_trigger {
            Self::Strict
        } else {
            Self::Lenient
        }
    }

    /// Check if failures propagate.
    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Strict)
    }
}

/// Result of one evaluation.
///
/// `needs_verification` is true only when this call moved the site from
/// [`VerificationState::Clear`] to pending. Already pending or verified
/// sites report false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TriggerOutcome {
    /// Whether this call requested verification.
    pub needs_verification: bool,
}

impl TriggerOutcome {
    /// Verification was just requested.
    pub fn triggered() -> Self {
        Self {
            needs_verification: true,
        }
    }

    /// Nothing to do.
    pub fn idle() -> Self {
        Self {
            needs_verification: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_from_flags() {
        assert_eq!(VerificationState::from_flags(true, true), VerificationState::Verified);
        assert_eq!(VerificationState::from_flags(true, false), VerificationState::Verified);
        assert_eq!(
            VerificationState::from_flags(false, true),
            VerificationState::PendingVerification
        );
        assert_eq!(VerificationState::from_flags(false, false), VerificationState::Clear);
    }

    #[test]
    fn test_only_clear_can_trigger() {
        assert!(VerificationState::Clear.can_trigger());
        assert!(!VerificationState::Verified.can_trigger());
        assert!(!VerificationState::PendingVerification.can_trigger());
    }

    #[test]
    fn test_policy_default_is_lenient() {
        assert_eq!(TriggerPolicy::default(), TriggerPolicy::Lenient);
        assert!(TriggerPolicy::from_throw_on_trigger(true).is_strict());
        assert!(!TriggerPolicy::from_throw_on_trigger(false).is_strict());
    }

    #[test]
    fn test_outcome_default_is_idle() {
        assert_eq!(TriggerOutcome::default(), TriggerOutcome::idle());
        assert!(TriggerOutcome::triggered().needs_verification);
    }
}

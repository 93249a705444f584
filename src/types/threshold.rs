//! Member-creation thresholds.
//!
//! A threshold is either a finite limit or disabled. A disabled threshold
//! never counts and never triggers, so callers must check
//! [`Threshold::limit`] before issuing any counting query.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Error returned when a threshold string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid threshold {0:?}: expected a non-negative integer or \"disabled\"")]
pub struct ThresholdParseError(pub String);

/// Operator-configured threshold for one trigger source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Threshold {
    /// Trigger once the activity count is strictly greater than this value.
    Limit(u64),
    /// Never count, never trigger.
    #[default]
    Disabled,
}

impl Threshold {
    /// Finite limit, or `None` when disabled.
    pub fn limit(&self) -> Option<u64> {
        match self {
            Self::Limit(limit) => Some(*limit),
            Self::Disabled => None,
        }
    }

    /// Check if this threshold can ever trigger.
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Limit(_))
    }

    /// Strict comparison: meeting the limit does not exceed it.
    pub fn is_exceeded_by(&self, count: u64) -> bool {
        match self {
            Self::Limit(limit) => count > *limit,
            Self::Disabled => false,
        }
    }

    /// Raise a finite limit to at least `floor`. Disabled stays disabled.
    pub fn raised_to(self, floor: u64) -> Self {
        match self {
            Self::Limit(limit) => Self::Limit(limit.max(floor)),
            Self::Disabled => Self::Disabled,
        }
    }
}

impl From<u64> for Threshold {
    fn from(limit: u64) -> Self {
        Self::Limit(limit)
    }
}

impl From<Option<u64>> for Threshold {
    fn from(limit: Option<u64>) -> Self {
        limit.map_or(Self::Disabled, Self::Limit)
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limit(limit) => write!(f, "{}", limit),
            Self::Disabled => write!(f, "disabled"),
        }
    }
}

impl FromStr for Threshold {
    type Err = ThresholdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "" | "disabled" | "infinity" | "inf" => Ok(Self::Disabled),
            other => other
                .parse::<u64>()
                .map(Self::Limit)
                .map_err(|_| ThresholdParseError(trimmed.to_string())),
        }
    }
}

impl Serialize for Threshold {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Limit(limit) => serializer.serialize_u64(*limit),
            Self::Disabled => serializer.serialize_str("disabled"),
        }
    }
}

impl<'de> Deserialize<'de> for Threshold {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
            Missing(()),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(limit) => Ok(Self::Limit(limit)),
            Raw::Text(text) => text.parse().map_err(serde::de::Error::custom),
            Raw::Missing(()) => Ok(Self::Disabled),
        }
    }
}

//! Trigger configuration.
//!
//! ## Configuration
//!
//! All thresholds can be configured via environment variables:
//! - `VERIFICATION_IMPORT_THRESHOLD`: import volume threshold (default: disabled)
//! - `VERIFICATION_API_THRESHOLD`: API volume threshold (default: disabled)
//! - `VERIFICATION_ADMIN_THRESHOLD`: Admin volume threshold (default: disabled)
//!
//! Each value is a non-negative integer or `disabled`.

use serde::{Deserialize, Serialize};

use crate::types::{Threshold, TriggerSource};

/// Thresholds for the three trigger sources. Fixed for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    /// Bulk import threshold (floor; raised to the site's organic size).
    pub import_threshold: Threshold,
    /// Public API threshold.
    pub api_threshold: Threshold,
    /// Admin UI threshold.
    pub admin_threshold: Threshold,
}

impl TriggerConfig {
    /// Create a config with every threshold disabled.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Set the import threshold.
    pub fn with_import_threshold(mut self, threshold: impl Into<Threshold>) -> Self {
        self.import_threshold = threshold.into();
        self
    }

    /// Set the API threshold.
    pub fn with_api_threshold(mut self, threshold: impl Into<Threshold>) -> Self {
        self.api_threshold = threshold.into();
        self
    }

    /// Set the Admin threshold.
    pub fn with_admin_threshold(mut self, threshold: impl Into<Threshold>) -> Self {
        self.admin_threshold = threshold.into();
        self
    }

    /// Load thresholds from environment variables.
    pub fn from_env() -> Self {
        Self {
            import_threshold: threshold_from_env("VERIFICATION_IMPORT_THRESHOLD"),
            api_threshold: threshold_from_env("VERIFICATION_API_THRESHOLD"),
            admin_threshold: threshold_from_env("VERIFICATION_ADMIN_THRESHOLD"),
        }
    }

    /// Configured threshold for a source.
    pub fn threshold(&self, source: TriggerSource) -> Threshold {
        match source {
            TriggerSource::Import => self.import_threshold,
            TriggerSource::Api => self.api_threshold,
            TriggerSource::Admin => self.admin_threshold,
        }
    }

    /// Whether any event-driven source is enabled, i.e. the listener is needed.
    pub fn listens_for_events(&self) -> bool {
        self.api_threshold.is_enabled() || self.admin_threshold.is_enabled()
    }
}

fn threshold_from_env(var: &str) -> Threshold {
    match std::env::var(var) {
        Ok(raw) => raw.parse().unwrap_or_else(|e| {
            tracing::warn!(
                var = var,
                error = %e,
                "Ignoring invalid threshold, treating as disabled"
            );
            Threshold::Disabled
        }),
        Err(_) => Threshold::Disabled,
    }
}

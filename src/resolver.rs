//! Effective import threshold.
//!
//! The configured import threshold is a floor. A site that already has many
//! members legitimately should not be flagged for importing up to its own
//! size, so the bar rises with the member count.

use std::sync::Arc;

use crate::store::{MemberStats, StoreError};
use crate::types::Threshold;

/// Resolves the import threshold against current member stats.
#[derive(Clone)]
pub struct ThresholdResolver {
    configured: Threshold,
    stats: Arc<dyn MemberStats>,
}

impl ThresholdResolver {
    /// Create a resolver for a configured import threshold.
    pub fn new(configured: Threshold, stats: Arc<dyn MemberStats>) -> Self {
        Self { configured, stats }
    }

    /// Configured floor.
    pub fn configured(&self) -> Threshold {
        self.configured
    }

    /// `max(configured, total_members)`, or disabled without touching stats.
    pub async fn resolve_import_threshold(&self) -> Result<Threshold, StoreError> {
        if !self.configured.is_enabled() {
            return Ok(Threshold::Disabled);
        }
        let total = self.stats.total_members().await?;
        Ok(self.configured.raised_to(total))
    }

    /// Bar for a volume check that counted `recently_imported` import events.
    ///
    /// Members created by those imports are discounted from the total, so a
    /// batch cannot raise the bar it is being judged against.
    pub async fn import_check_threshold(
        &self,
        recently_imported: u64,
    ) -> Result<Threshold, StoreError> {
        if !self.configured.is_enabled() {
            return Ok(Threshold::Disabled);
        }
        let total = self.stats.total_members().await?;
        Ok(self.configured.raised_to(total.saturating_sub(recently_imported)))
    }
}

impl std::fmt::Debug for ThresholdResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThresholdResolver")
            .field("configured", &self.configured)
            .finish()
    }
}

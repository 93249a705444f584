//! Verification email payload.

use serde::{Deserialize, Serialize};

use super::source::TriggerSource;

/// Subject line of every verification email.
pub const VERIFICATION_EMAIL_SUBJECT: &str = "Email needs verification";

/// Placeholder replaced with the site URL when rendering.
pub const SITE_URL_PLACEHOLDER: &str = "{siteUrl}";

/// Placeholder replaced with the triggering amount when rendering.
pub const AMOUNT_PLACEHOLDER: &str = "{amountTriggered}";

/// Email asking the site owner to verify their address.
///
/// `message` keeps its placeholders; mailers call [`VerificationEmail::render`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationEmail {
    /// Subject line.
    pub subject: String,
    /// Message template.
    pub message: String,
    /// Member count that crossed the threshold.
    pub amount_triggered: u64,
}

impl VerificationEmail {
    /// Build the email for a trigger source.
    pub fn for_source(source: TriggerSource, amount: u64) -> Self {
        Self {
            subject: source.subject().to_string(),
            message: source.message_template().to_string(),
            amount_triggered: amount,
        }
    }

    /// Substitute the site URL and amount into the message.
    pub fn render(&self, site_url: &str) -> String {
        self.message
            .replace(SITE_URL_PLACEHOLDER, site_url)
            .replace(AMOUNT_PLACEHOLDER, &self.amount_triggered.to_string())
    }
}

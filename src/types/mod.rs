//! Core types for the verification trigger.

pub mod threshold;
pub mod source;
pub mod event;
pub mod email;
pub mod outcome;

pub use threshold::{Threshold, ThresholdParseError};
pub use source::{MemberSource, TriggerSource};
pub use event::{CreatedEventsFilter, MemberCreatedEvent, WINDOW_TIMESTAMP_FORMAT};
pub use email::{
    VerificationEmail, AMOUNT_PLACEHOLDER, SITE_URL_PLACEHOLDER, VERIFICATION_EMAIL_SUBJECT,
};
pub use outcome::{TriggerOutcome, TriggerPolicy, VerificationState};

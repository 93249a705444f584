//! # verification-trigger
//!
//! Decides whether a site's rate of adding members looks abusive enough to
//! require re-verifying the owner's email.
//!
//! The trigger answers one question:
//!
//! > Has import, API or Admin member creation over the last 30 days
//! > exceeded its threshold while the site is neither verified nor pending?
//!
//! ## Core Contract
//!
//! 1. Each source (import, api, admin) has its own threshold, or is disabled
//! 2. Crossing a threshold (strictly greater) sets `email_verify_required` and sends one email
//! 3. Nothing more happens until an operator clears the flag
//!
//! ## Architecture
//!
//! ```text
//! MemberEventBus ─► listener ─┐
//!                             ├─► VerificationTrigger ─► ActivityCounter ─► MemberEventRepository
//! check_import_volume() ──────┘          │                ThresholdResolver ─► MemberStats
//!                                        ▼
//!                              VerificationProcess ─► VerificationGuard ─► SettingsStore
//!                                                  └► VerificationMailer
//! ```
//!
//! ## Failure Policy
//!
//! - `Lenient` (event path): failures are logged, member creation is never blocked
//! - `Strict` (request path): failures and fresh triggers are returned as errors

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod config;
pub mod error;
pub mod store;
pub mod mailer;
pub mod counter;
pub mod resolver;
pub mod process;
pub mod trigger;
pub mod bus;
pub mod listener;

#[cfg(feature = "service")]
pub mod service;

// Re-exports
pub use types::{
    Threshold, ThresholdParseError, MemberSource, TriggerSource,
    MemberCreatedEvent, CreatedEventsFilter, VerificationEmail,
    TriggerOutcome, TriggerPolicy, VerificationState,
    VERIFICATION_EMAIL_SUBJECT, WINDOW_TIMESTAMP_FORMAT,
};
pub use config::TriggerConfig;
pub use error::TriggerError;
pub use store::{
    SettingsStore, MemberStats, MemberEventRepository, SettingKey, StoreError,
    InMemorySettings, InMemoryMemberStats, InMemoryEventLog,
};
#[cfg(feature = "postgres")]
pub use store::{PostgresConfig, PostgresStore};
pub use mailer::{VerificationMailer, MailerError, RecordingMailer, TracingMailer};
pub use counter::{ActivityCounter, ACTIVITY_WINDOW_DAYS};
pub use resolver::ThresholdResolver;
pub use process::{VerificationGuard, VerificationProcess, VerificationRequest};
pub use trigger::{Collaborators, VerificationTrigger};
pub use bus::MemberEventBus;
pub use listener::spawn_member_listener;

// Service re-exports (when service feature is enabled)
#[cfg(feature = "service")]
pub use service::{create_router, ServiceState};

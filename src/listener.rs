//! One-time registration of the member-created listener.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::bus::MemberEventBus;
use crate::trigger::VerificationTrigger;

/// Subscribe `trigger` to the member-created stream, if it needs to be.
///
/// Returns `None` without subscribing when both the api and admin thresholds
/// are disabled. Otherwise subscribes once and returns the listener task,
/// which runs until the bus is dropped. Each event is evaluated on its own
/// task so a slow collaborator only stalls that evaluation.
///
/// Call once per process. There is no unsubscribe.
pub fn spawn_member_listener(
    trigger: Arc<VerificationTrigger>,
    bus: &MemberEventBus,
) -> Option<JoinHandle<()>> {
    let config = trigger.config();
    if !config.listens_for_events() {
        tracing::debug!("API and Admin thresholds disabled; not listening for member events");
        return None;
    }

    tracing::info!(
        api_threshold = %config.api_threshold,
        admin_threshold = %config.admin_threshold,
        "Listening for member-created events"
    );

    let mut receiver = bus.subscribe();
    Some(tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    let trigger = Arc::clone(&trigger);
                    tokio::spawn(async move {
                        trigger.handle_member_created(&event).await;
                    });
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped = skipped, "Member event listener lagged");
                }
                Err(RecvError::Closed) => {
                    tracing::info!("Member event bus closed; listener stopping");
                    break;
                }
            }
        }
    }))
}

//! Debounced welcome notifier.
//!
//! For every known match, fire at most one notification per identity per
//! cooldown window. The cooldown record is written before the notification
//! is queued and is kept whatever the delivery outcome.

use crate::channel::Notification;
use crate::cooldown::{Claim, CooldownStore, DEFAULT_COOLDOWN_SECS};
use crate::dispatch::{DispatchError, DispatchHandle};
use chrono::{DateTime, Duration, Utc};
use rollcall_core::MatchResult;
use std::sync::Arc;
use uuid::Uuid;

/// What the notifier did with one match result.
#[derive(Debug, Clone, PartialEq)]
pub enum NotifyDecision {
    /// The match was unknown; nothing to notify.
    Ignored,
    /// Within the cooldown window of a notification sent at `last`.
    Suppressed { last: DateTime<Utc> },
    /// Claimed and queued for delivery.
    Fired { id: Uuid },
    /// Claimed, but the queue refused it. The claim stands.
    DispatchFailed { id: Uuid, error: DispatchError },
}

impl NotifyDecision {
    /// True when this call consumed the identity's window.
    pub fn claimed(&self) -> bool {
        matches!(self, Self::Fired { .. } | Self::DispatchFailed { .. })
    }
}

#[derive(Clone)]
pub struct Notifier {
    store: Arc<dyn CooldownStore>,
    dispatch: DispatchHandle,
    cooldown: Duration,
}

impl Notifier {
    pub fn new(store: Arc<dyn CooldownStore>, dispatch: DispatchHandle) -> Self {
        Self::with_cooldown(store, dispatch, Duration::seconds(DEFAULT_COOLDOWN_SECS))
    }

    pub fn with_cooldown(
        store: Arc<dyn CooldownStore>,
        dispatch: DispatchHandle,
        cooldown: Duration,
    ) -> Self {
        Self {
            store,
            dispatch,
            cooldown,
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn store(&self) -> &Arc<dyn CooldownStore> {
        &self.store
    }

    pub fn dispatch(&self) -> &DispatchHandle {
        &self.dispatch
    }

    /// Decide and, if due, fire a notification for `result` as of `now`.
    pub fn notify(&self, result: &MatchResult, now: DateTime<Utc>) -> NotifyDecision {
        let Some(identity) = result.identity() else {
            return NotifyDecision::Ignored;
        };

        match self.store.try_claim(&identity.email, now, self.cooldown) {
            Claim::Cooling { last } => {
                tracing::trace!(name = %identity.name, %last, "notification suppressed by cooldown");
                NotifyDecision::Suppressed { last }
            }
            Claim::Granted => {
                let notification = Notification::new(&identity.email, &identity.name, now);
                let id = notification.id;
                match self.dispatch.enqueue(notification) {
                    Ok(()) => {
                        tracing::info!(%id, name = %identity.name, email = %identity.email, "welcome notification queued");
                        NotifyDecision::Fired { id }
                    }
                    Err(error) => {
                        tracing::warn!(%id, name = %identity.name, error = %error, "welcome notification dropped");
                        NotifyDecision::DispatchFailed { id, error }
                    }
                }
            }
        }
    }
}

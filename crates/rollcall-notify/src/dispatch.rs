//! Notification dispatch queue.
//!
//! Notifications are handed to a worker task through a bounded queue. The
//! worker delivers each one on its own task, at most `max_in_flight` at a
//! time, so a stalled delivery never holds up other identities. Every
//! attempt is bounded by [`RetryPolicy::attempt_timeout`]. A
//! [`DispatchOutcome`] is published per notification, in completion order.
//! Enqueueing never blocks the caller.

use crate::channel::{ChannelError, Notification, NotificationChannel};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, Semaphore};

/// Capacity of the outcome broadcast; slow subscribers skip older outcomes.
const OUTCOME_CAPACITY: usize = 64;

/// Deliveries allowed in flight at once by default.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 8;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("dispatch queue full")]
    QueueFull,
    #[error("dispatch worker exited")]
    Closed,
}

/// Bounded retry policy. Zero retries means at most one attempt.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
    /// Upper bound on a single `send`; an attempt exceeding it fails with
    /// [`ChannelError::Timeout`].
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::from_secs(1),
            attempt_timeout: Duration::from_secs(30),
        }
    }
}

/// Final result of delivering one notification.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub notification: Notification,
    pub attempts: u32,
    pub result: Result<String, ChannelError>,
}

impl DispatchOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Clone-safe handle to the dispatch worker.
#[derive(Clone)]
pub struct DispatchHandle {
    tx: mpsc::Sender<Notification>,
    outcomes: broadcast::Sender<DispatchOutcome>,
}

impl DispatchHandle {
    /// Queue a notification without waiting.
    pub fn enqueue(&self, notification: Notification) -> Result<(), DispatchError> {
        self.tx.try_send(notification).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DispatchError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => DispatchError::Closed,
        })
    }

    /// Subscribe to outcomes of notifications delivered from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<DispatchOutcome> {
        self.outcomes.subscribe()
    }
}

/// Spawn the dispatch worker on the current tokio runtime.
///
/// The worker stops accepting work once every [`DispatchHandle`] has been
/// dropped and the queue is drained; deliveries already started run to
/// completion.
pub fn spawn_dispatcher(
    channel: Arc<dyn NotificationChannel>,
    policy: RetryPolicy,
    queue_len: usize,
    max_in_flight: usize,
) -> DispatchHandle {
    let (tx, mut rx) = mpsc::channel::<Notification>(queue_len.max(1));
    let (outcomes, _) = broadcast::channel(OUTCOME_CAPACITY);
    let publisher = outcomes.clone();
    let slots = Arc::new(Semaphore::new(max_in_flight.max(1)));

    tokio::spawn(async move {
        tracing::debug!(max_in_flight, "dispatch worker started");
        while let Some(notification) = rx.recv().await {
            // The semaphore is never closed.
            let Ok(permit) = Arc::clone(&slots).acquire_owned().await else {
                break;
            };
            let channel = Arc::clone(&channel);
            let publisher = publisher.clone();
            tokio::spawn(async move {
                let outcome = deliver(channel.as_ref(), notification, policy).await;
                drop(permit);
                report(&outcome);
                // No subscribers is fine.
                let _ = publisher.send(outcome);
            });
        }
        tracing::debug!("dispatch worker exiting");
    });

    DispatchHandle { tx, outcomes }
}

fn report(outcome: &DispatchOutcome) {
    match &outcome.result {
        Ok(message) => tracing::info!(
            id = %outcome.notification.id,
            email = %outcome.notification.email,
            attempts = outcome.attempts,
            message = %message,
            "notification delivered"
        ),
        Err(err) => tracing::warn!(
            id = %outcome.notification.id,
            email = %outcome.notification.email,
            attempts = outcome.attempts,
            error = %err,
            "notification failed"
        ),
    }
}

async fn deliver(
    channel: &dyn NotificationChannel,
    notification: Notification,
    policy: RetryPolicy,
) -> DispatchOutcome {
    let mut attempts = 0;
    loop {
        attempts += 1;
        let attempt = tokio::time::timeout(policy.attempt_timeout, channel.send(&notification));
        let result = match attempt.await {
            Ok(result) => result,
            Err(_) => Err(ChannelError::Timeout(policy.attempt_timeout)),
        };
        if result.is_ok() || attempts > policy.max_retries {
            return DispatchOutcome {
                notification,
                attempts,
                result,
            };
        }
        tracing::debug!(
            id = %notification.id,
            attempt = attempts,
            "notification attempt failed; retrying"
        );
        tokio::time::sleep(policy.backoff).await;
    }
}

//! rollcall-notify — Debounced welcome notifications.
//!
//! A [`Notifier`] claims a per-email cooldown slot in an injected
//! [`CooldownStore`] and hands fired notifications to a dispatch worker
//! that delivers them through a [`NotificationChannel`].

pub mod channel;
pub mod cooldown;
pub mod dispatch;
pub mod notifier;

pub use channel::{
    ChannelError, HttpChannel, Notification, NotificationChannel, WelcomeRequest, WelcomeResponse,
};
pub use cooldown::{Claim, CooldownStore, MemoryCooldownStore};
pub use dispatch::{
    spawn_dispatcher, DispatchError, DispatchHandle, DispatchOutcome, RetryPolicy, DEFAULT_MAX_IN_FLIGHT,
};
pub use notifier::{NotifyDecision, Notifier};

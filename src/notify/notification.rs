use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

pub const DEFAULT_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NotificationKind {
    Success,
    Error,
}

/// A transient message shown to the user.
#[derive(Debug, Clone)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    pub raised_at: Instant,
    pub ttl: Duration,
}

impl Notification {
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.raised_at) >= self.ttl
    }
}

/// Collects notifications raised during a session.
///
/// Nothing is ever escalated beyond this list; callers decide how and when
/// to display what is still active.
#[derive(Debug)]
pub struct Notifier {
    ttl: Duration,
    items: Vec<Notification>,
}

impl Notifier {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            items: Vec::new(),
        }
    }

    pub fn success(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!(%message, "notification");
        self.push(NotificationKind::Success, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(%message, "notification");
        self.push(NotificationKind::Error, message);
    }

    fn push(&mut self, kind: NotificationKind, message: String) {
        self.items.push(Notification {
            kind,
            message,
            raised_at: Instant::now(),
            ttl: self.ttl,
        });
    }

    /// Every notification raised so far, expired or not.
    pub fn all(&self) -> &[Notification] {
        &self.items
    }

    pub fn active(&self, now: Instant) -> Vec<&Notification> {
        self.items.iter().filter(|n| !n.is_expired(now)).collect()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Notification> {
        self.items
            .iter()
            .filter(|n| n.kind == NotificationKind::Error)
    }

    /// Drop expired notifications, as the close timer would.
    pub fn prune(&mut self, now: Instant) {
        self.items.retain(|n| !n.is_expired(now));
    }

    /// Remove and return everything, e.g. after printing.
    pub fn drain(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.items)
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

//! User-facing feedback sinks.

use std::panic::{self, AssertUnwindSafe};

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "message", rename_all = "snake_case")]
pub enum Notification {
    Success(String),
    Error(String),
}

/// Fire-and-forget toast channel.
pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
}

/// Logs notifications. Used when no sink is configured.
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn success(&self, message: &str) {
        info!(text = message, "notify: success");
    }

    fn error(&self, message: &str) {
        warn!(text = message, "notify: error");
    }
}

pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn success(&self, _message: &str) {}

    fn error(&self, _message: &str) {}
}

/// Fans notifications out to any number of UI subscribers.
pub struct BroadcastNotifier {
    events: broadcast::Sender<Notification>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self { events }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.events.subscribe()
    }
}

impl Notifier for BroadcastNotifier {
    fn success(&self, message: &str) {
        // No subscribers is not an error for a toast channel.
        let _ = self.events.send(Notification::Success(message.to_string()));
    }

    fn error(&self, message: &str) {
        let _ = self.events.send(Notification::Error(message.to_string()));
    }
}

/// Delivers one notification. A panicking sink is contained and logged.
pub(crate) fn deliver(notifier: &dyn Notifier, notification: &Notification) {
    let delivered = panic::catch_unwind(AssertUnwindSafe(|| match notification {
        Notification::Success(message) => notifier.success(message),
        Notification::Error(message) => notifier.error(message),
    }));
    if delivered.is_err() {
        error!(?notification, "notify: sink panicked; notification dropped");
    }
}

//! Notifier port.
//!
//! Lifecycle events are pushed through this trait; sinks decide what to
//! do with them (log them, forward them to a chat bridge, collect them in
//! tests). Delivery is fire-and-forget, a sink must never fail the caller.

use async_trait::async_trait;
use tokio::sync::Mutex;

use rung_domain::Notification;

/// Sink for lifecycle notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one notification.
    async fn notify(&self, notification: Notification);
}

/// Notifier that remembers everything it receives. Test double.
#[derive(Default)]
pub struct RecordingNotifier {
    received: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything received so far.
    pub async fn received(&self) -> Vec<Notification> {
        self.received.lock().await.clone()
    }

    /// Number of notifications received.
    pub async fn len(&self) -> usize {
        self.received.lock().await.len()
    }

    /// True when nothing has been received.
    pub async fn is_empty(&self) -> bool {
        self.received.lock().await.is_empty()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: Notification) {
        self.received.lock().await.push(notification);
    }
}

// =============================================================================
// Tests
// =============================================================================

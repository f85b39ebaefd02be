//! Broadcast channel for new-work notifications.
//!
//! [`JobBus`] wraps a [`tokio::sync::broadcast`] channel. A pool session
//! publishes every superseding [`WorkTemplate`] through its bus, and each
//! pending long-poll request subscribes to be woken when work changes.

use tokio::sync::broadcast;

use super::WorkTemplate;

/// Broadcast bus for [`WorkTemplate`] updates.
///
/// Backed by a `tokio::broadcast` channel with a configurable capacity.
/// When the ring buffer is full, the oldest templates are dropped for
/// lagging receivers; a long-poll waiter only cares that *something* new
/// arrived, so lag is harmless on this bus.
#[derive(Debug, Clone)]
pub struct JobBus {
    sender: broadcast::Sender<WorkTemplate>,
}

impl JobBus {
    /// Creates a new `JobBus` with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes a new work template to all pending waiters.
    ///
    /// Returns the number of receivers that were woken. If no long-poll is
    /// pending, the template is silently dropped.
    pub fn publish(&self, template: WorkTemplate) -> usize {
        self.sender.send(template).unwrap_or(0)
    }

    /// Creates a new receiver that observes all future work templates.
    ///
    /// Each long-poll request subscribes once, before comparing snapshots,
    /// so a template published during the comparison is never missed.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<WorkTemplate> {
        self.sender.subscribe()
    }

    /// Returns the current number of pending waiters.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn make_template(tag: &str) -> WorkTemplate {
        WorkTemplate::new(format!("{tag}{}", "0".repeat(8)), "f".repeat(8))
    }

    #[test]
    fn publish_without_waiters_returns_zero() {
        let bus = JobBus::new(16);
        assert_eq!(bus.publish(make_template("aa")), 0);
    }

    #[tokio::test]
    async fn waiter_receives_template() {
        let bus = JobBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(make_template("ab"));

        let received = rx.recv().await;
        let Ok(received) = received else {
            panic!("expected a template");
        };
        assert!(received.data.starts_with("ab"));
    }

    #[tokio::test]
    async fn all_waiters_are_woken() {
        let bus = JobBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let woken = bus.publish(make_template("cd"));
        assert_eq!(woken, 2);

        assert!(rx1.recv().await.is_ok());
        assert!(rx2.recv().await.is_ok());
    }

    #[test]
    fn receiver_count_tracks_waiters() {
        let bus = JobBus::new(16);
        assert_eq!(bus.receiver_count(), 0);
        let rx = bus.subscribe();
        assert_eq!(bus.receiver_count(), 1);
        drop(rx);
        assert_eq!(bus.receiver_count(), 0);
    }
}

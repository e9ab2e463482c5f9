//! In-process event bus for subscription fan-out
//!
//! One publish is delivered to every subscriber currently registered on the
//! topic; with no subscribers the event is dropped (at-most-once, no
//! persistence, no backfill). Each subscriber owns its own ring buffer, so a
//! slow consumer lags and drops its oldest events rather than blocking the
//! publisher.

use tokio::sync::broadcast;

use crate::db::{PhotoRecord, UserRecord};

/// Per-subscriber ring buffer size
const TOPIC_CAPACITY: usize = 256;

/// A single named fan-out channel
pub struct Topic<T> {
    name: &'static str,
    tx: broadcast::Sender<T>,
}

impl<T: Clone> Topic<T> {
    fn new(name: &'static str) -> Self {
        let (tx, _) = broadcast::channel(TOPIC_CAPACITY);
        Self { name, tx }
    }

    /// Deliver `event` to every currently-registered subscriber, in publish
    /// order per subscriber. Returns the number of subscribers reached.
    pub fn publish(&self, event: T) -> usize {
        match self.tx.send(event) {
            Ok(count) => {
                tracing::debug!(topic = self.name, subscribers = count, "event published");
                count
            }
            Err(_) => {
                tracing::debug!(topic = self.name, "event dropped, no subscribers");
                0
            }
        }
    }

    /// Register a new subscriber. Only events published after this call are
    /// delivered; dropping the receiver removes the registration.
    pub fn subscribe(&self) -> broadcast::Receiver<T> {
        self.tx.subscribe()
    }

    /// Number of currently-registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Process-wide event bus. Constructed once at startup and handed to the
/// schema and services that publish or subscribe; nothing here is a
/// module-level singleton.
pub struct EventBus {
    pub new_user: Topic<UserRecord>,
    pub photo_added: Topic<PhotoRecord>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            new_user: Topic::new("new-user"),
            photo_added: Topic::new("photo-added"),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(login: &str) -> UserRecord {
        UserRecord {
            id: format!("id-{login}"),
            github_login: login.to_string(),
            name: None,
            avatar: None,
            github_token: format!("token-{login}"),
            created_at: "2024-01-01T00:00:00+00:00".to_string(),
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_registered_subscriber() {
        let bus = EventBus::new();
        let mut rx = bus.new_user.subscribe();

        assert_eq!(bus.new_user.publish(user("gPlake")), 1);

        let received = rx.recv().await.unwrap();
        assert_eq!(received.github_login, "gPlake");
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_dropped() {
        let bus = EventBus::new();
        assert_eq!(bus.new_user.publish(user("nobody")), 0);

        // A late subscriber must not see the earlier event
        let mut rx = bus.new_user.subscribe();
        bus.new_user.publish(user("later"));
        let received = rx.recv().await.unwrap();
        assert_eq!(received.github_login, "later");
    }

    #[tokio::test]
    async fn test_per_subscriber_delivery_preserves_publish_order() {
        let bus = EventBus::new();
        let mut rx = bus.new_user.subscribe();

        for login in ["a", "b", "c"] {
            bus.new_user.publish(user(login));
        }

        for expected in ["a", "b", "c"] {
            assert_eq!(rx.recv().await.unwrap().github_login, expected);
        }
    }

    #[tokio::test]
    async fn test_topics_are_independent() {
        let bus = EventBus::new();
        let mut users = bus.new_user.subscribe();

        bus.photo_added.publish(PhotoRecord {
            id: "p1".to_string(),
            name: "x".to_string(),
            description: None,
            category: "SELFIE".to_string(),
            posted_by: "gPlake".to_string(),
            created: "2024-01-01T00:00:00+00:00".to_string(),
        });
        bus.new_user.publish(user("gPlake"));

        // The user topic only ever sees user events
        assert_eq!(users.recv().await.unwrap().github_login, "gPlake");
        assert!(users.try_recv().is_err());
    }
}

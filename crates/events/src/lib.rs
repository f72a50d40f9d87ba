//! In-process topic event bus.
//!
//! Messages are broadcast to every live subscriber; publishing with nobody
//! listening is not an error.

use tokio::sync::broadcast;

/// Topic receiving the JSON of every newly saved book.
pub const PUBLISH_BOOK: &str = "publish-book";

const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    pub payload: String,
}

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Message>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish `payload` on `topic`, returning how many subscribers got it.
    pub fn publish(&self, topic: &str, payload: impl Into<String>) -> usize {
        let message = Message {
            topic: topic.to_string(),
            payload: payload.into(),
        };
        tracing::info!(topic, payload = %message.payload, "publishing message");

        self.sender.send(message).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Message> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

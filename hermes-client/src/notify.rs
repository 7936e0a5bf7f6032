use std::sync::Arc;

use hermes_protocol::Event;
use tokio::sync::broadcast;

use crate::capture::RawException;

/// Capacity of the notification channel. Slow subscribers miss older notifications.
const NOTIFICATION_CAPACITY: usize = 64;

/// Lifecycle notifications of the capture pipeline.
#[derive(Clone, Debug)]
pub enum Notification {
    /// An exception was handed to the pipeline.
    Handled {
        /// The captured exception.
        exception: Arc<RawException>,
    },
    /// The collector accepted an event.
    Success {
        /// The payload that was sent.
        event: Arc<Event>,
        /// The endpoint the payload was sent to.
        url: String,
    },
    /// An event could not be delivered.
    Failure {
        /// The payload that failed to send.
        event: Arc<Event>,
        /// The endpoint the payload was sent to.
        url: String,
        /// Description of the error.
        error: String,
    },
}

/// Broadcasts notifications to all subscribers.
#[derive(Debug)]
pub struct Notifier {
    sender: broadcast::Sender<Notification>,
}

impl Notifier {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    /// Sends a notification. Without subscribers, the notification is discarded.
    pub fn notify(&self, notification: Notification) {
        self.sender.send(notification).ok();
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

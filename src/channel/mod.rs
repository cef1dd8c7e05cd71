//! Cross-window event channel
//!
//! The only path between windows. Every message is broadcast to every
//! subscriber, the sender's own subscriptions included. Messages are not
//! persisted: a subscriber only sees what is published after it subscribed.

mod topics;

pub use topics::{ChannelEvent, Topic};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Default broadcast capacity; lagging subscribers skip the oldest messages
pub const DEFAULT_CAPACITY: usize = 256;

/// Identity of a window, carried on every message as its origin
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowLabel(String);

impl WindowLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WindowLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WindowLabel {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

/// A published message with its provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub origin: WindowLabel,
    pub event: ChannelEvent,
}

impl Envelope {
    pub fn topic(&self) -> Topic {
        self.event.topic()
    }

    pub fn is_from(&self, label: &WindowLabel) -> bool {
        &self.origin == label
    }
}

/// Publish seam. Publishing is fire-and-forget and never fails the caller.
pub trait EventSink: Send + Sync {
    fn publish(&self, origin: &WindowLabel, event: ChannelEvent);
}

/// Broadcast event channel shared by every window of the application
#[derive(Clone)]
pub struct EventChannel {
    inner: Arc<ChannelInner>,
}

struct ChannelInner {
    tx: broadcast::Sender<Arc<Envelope>>,
    published: AtomicU64,
}

impl EventChannel {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(ChannelInner {
                tx,
                published: AtomicU64::new(0),
            }),
        }
    }

    /// Receive every message published from now on, on every topic
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.inner.tx.subscribe(),
            topic: None,
        }
    }

    /// Receive messages of a single topic published from now on
    #[must_use]
    pub fn subscribe_topic(&self, topic: Topic) -> Subscription {
        Subscription {
            rx: self.inner.tx.subscribe(),
            topic: Some(topic),
        }
    }

    /// Run `handler` once per message on `topic` until unlistened.
    ///
    /// Must be called from within a tokio runtime.
    pub fn listen<F>(&self, topic: Topic, mut handler: F) -> Listener
    where
        F: FnMut(Arc<Envelope>) + Send + 'static,
    {
        let mut subscription = self.subscribe_topic(topic);
        let task = tokio::spawn(async move {
            while let Some(envelope) = subscription.recv().await {
                handler(envelope);
            }
        });
        Listener { task: Some(task) }
    }

    /// Number of messages handed to the broadcast layer so far
    pub fn published_count(&self) -> u64 {
        self.inner.published.load(Ordering::Relaxed)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.tx.receiver_count()
    }
}

impl Default for EventChannel {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventSink for EventChannel {
    fn publish(&self, origin: &WindowLabel, event: ChannelEvent) {
        let topic = event.topic();
        let envelope = Arc::new(Envelope {
            origin: origin.clone(),
            event,
        });
        self.inner.published.fetch_add(1, Ordering::Relaxed);

        match self.inner.tx.send(envelope) {
            Ok(receivers) => {
                tracing::trace!("{} published {} to {} receivers", origin, topic, receivers);
            }
            Err(_) => {
                tracing::trace!("{} published {} with no receivers", origin, topic);
            }
        }
    }
}

/// Receiving end of the channel, optionally narrowed to one topic
pub struct Subscription {
    rx: broadcast::Receiver<Arc<Envelope>>,
    topic: Option<Topic>,
}

impl Subscription {
    /// Next matching message; `None` once every sender is gone.
    ///
    /// Lagged messages are skipped with a warning.
    pub async fn recv(&mut self) -> Option<Arc<Envelope>> {
        loop {
            match self.rx.recv().await {
                Ok(envelope) => {
                    if self.accepts(&envelope) {
                        return Some(envelope);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Subscriber lagged, skipped {} messages", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Next matching message if one is already queued
    pub fn try_recv(&mut self) -> Option<Arc<Envelope>> {
        loop {
            match self.rx.try_recv() {
                Ok(envelope) => {
                    if self.accepts(&envelope) {
                        return Some(envelope);
                    }
                }
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    tracing::warn!("Subscriber lagged, skipped {} messages", skipped);
                }
                Err(_) => return None,
            }
        }
    }

    fn accepts(&self, envelope: &Envelope) -> bool {
        self.topic.map_or(true, |topic| envelope.topic() == topic)
    }
}

/// Handle of a running `listen` handler
pub struct Listener {
    task: Option<JoinHandle<()>>,
}

impl Listener {
    /// Stop the handler. Safe to call repeatedly or after the channel is gone.
    pub fn unlisten(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_listening(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.unlisten();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    #[tokio::test]
    async fn test_sender_receives_own_messages() {
        let channel = EventChannel::new(16);
        let me = WindowLabel::new("main");
        let mut sub = channel.subscribe();

        channel.publish(&me, ChannelEvent::OverlayClear);
        let envelope = sub.recv().await.unwrap();
        assert!(envelope.is_from(&me));
        assert_eq!(envelope.topic(), Topic::OverlayClear);
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_earlier_messages() {
        let channel = EventChannel::new(16);
        let me = WindowLabel::new("main");
        channel.publish(&me, ChannelEvent::OverlayClear);

        let mut late = channel.subscribe();
        assert!(late.try_recv().is_none());
        assert_eq!(channel.published_count(), 1);
    }

    #[tokio::test]
    async fn test_topic_subscription_and_order() {
        let channel = EventChannel::new(16);
        let me = WindowLabel::new("overlay");
        let mut closes = channel.subscribe_topic(Topic::OverlayCloseRequest);

        channel.publish(&me, ChannelEvent::OverlayClear);
        channel.publish(&me, ChannelEvent::OverlayCloseRequest);
        channel.publish(&me, ChannelEvent::OverlayClosed);
        channel.publish(&me, ChannelEvent::OverlayCloseRequest);

        assert_eq!(closes.try_recv().unwrap().topic(), Topic::OverlayCloseRequest);
        assert_eq!(closes.try_recv().unwrap().topic(), Topic::OverlayCloseRequest);
        assert!(closes.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_listener_unlisten_is_idempotent() {
        let channel = EventChannel::new(16);
        let me = WindowLabel::new("main");
        let seen = Arc::new(Mutex::new(0usize));

        let counter = seen.clone();
        let mut listener = channel.listen(Topic::OverlayClear, move |_| {
            *counter.lock().unwrap() += 1;
        });

        channel.publish(&me, ChannelEvent::OverlayClear);
        channel.publish(&me, ChannelEvent::OverlayClosed);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(*seen.lock().unwrap(), 1);

        listener.unlisten();
        listener.unlisten();
        assert!(!listener.is_listening());

        channel.publish(&me, ChannelEvent::OverlayClear);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(*seen.lock().unwrap(), 1);

        drop(channel);
        listener.unlisten();
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let channel = EventChannel::default();
        channel.publish(&WindowLabel::new("main"), ChannelEvent::OverlayClosed);
        assert_eq!(channel.published_count(), 1);
        assert_eq!(channel.subscriber_count(), 0);
    }
}

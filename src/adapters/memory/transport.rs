//! In-memory broker transport for testing.
//!
//! Deterministic stand-in for the STOMP transport: tests script connect
//! refusals and broker-side drops, publish frames, and count transport
//! subscribe/unsubscribe calls to assert multiplexer behavior.
//!
//! # Security Note
//!
//! This adapter is for **testing only**. It uses `.expect()` on lock
//! operations which will panic if locks are poisoned; production code
//! uses the STOMP transport adapter.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::domain::{ChannelError, Topic};
use crate::ports::{BrokerTransport, SubscriptionHandle, TransportEvent};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// In-memory broker for tests.
///
/// A frame published on a topic is delivered only while connected and
/// only if a transport-level subscription for that topic is active,
/// mirroring a real broker: handles do not survive a disconnect.
pub struct MemoryTransport {
    events: broadcast::Sender<TransportEvent>,
    connected: AtomicBool,
    refuse: AtomicBool,
    active: RwLock<HashMap<SubscriptionHandle, Topic>>,
    subscribe_calls: AtomicUsize,
    unsubscribe_calls: AtomicUsize,
    connect_calls: AtomicUsize,
}

impl MemoryTransport {
    /// Creates a disconnected broker that accepts connections.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            events,
            connected: AtomicBool::new(false),
            refuse: AtomicBool::new(false),
            active: RwLock::new(HashMap::new()),
            subscribe_calls: AtomicUsize::new(0),
            unsubscribe_calls: AtomicUsize::new(0),
            connect_calls: AtomicUsize::new(0),
        }
    }

    /// Script whether future connect attempts are refused.
    pub fn refuse_connections(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    /// Simulate a broker-side drop: the connection and every active
    /// subscription are gone, and a disconnect event is emitted.
    pub fn drop_connection(&self, reason: &str) {
        self.connected.store(false, Ordering::SeqCst);
        self.active
            .write()
            .expect("MemoryTransport: active lock poisoned")
            .clear();
        let _ = self.events.send(TransportEvent::Disconnected {
            reason: reason.to_string(),
        });
    }

    /// Publish a frame on a topic. Returns true if it was delivered
    /// (connected and at least one active subscription for the topic).
    pub fn publish(&self, topic: &Topic, body: impl Into<String>) -> bool {
        if !self.is_connected() {
            return false;
        }
        let subscribed = self
            .active
            .read()
            .expect("MemoryTransport: active lock poisoned")
            .values()
            .any(|active| active == topic);
        if !subscribed {
            return false;
        }
        let _ = self.events.send(TransportEvent::Frame {
            topic: topic.clone(),
            body: body.into(),
        });
        true
    }

    // === Test Helpers ===

    /// Active transport subscriptions for one topic.
    pub fn subscription_count(&self, topic: &Topic) -> usize {
        self.active
            .read()
            .expect("MemoryTransport: active lock poisoned")
            .values()
            .filter(|active| *active == topic)
            .count()
    }

    /// Total `subscribe` calls ever made.
    pub fn subscribe_calls(&self) -> usize {
        self.subscribe_calls.load(Ordering::SeqCst)
    }

    /// Total `unsubscribe` calls ever made.
    pub fn unsubscribe_calls(&self) -> usize {
        self.unsubscribe_calls.load(Ordering::SeqCst)
    }

    /// Total `connect` calls ever made.
    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrokerTransport for MemoryTransport {
    async fn connect(&self, _endpoint: &str) -> Result<(), ChannelError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        if self.connected.load(Ordering::SeqCst) {
            return Ok(());
        }
        if self.refuse.load(Ordering::SeqCst) {
            let reason = "connection refused".to_string();
            let _ = self.events.send(TransportEvent::ProtocolError {
                message: reason.clone(),
            });
            let _ = self.events.send(TransportEvent::Disconnected {
                reason: reason.clone(),
            });
            return Err(ChannelError::Transport(reason));
        }
        self.connected.store(true, Ordering::SeqCst);
        let _ = self.events.send(TransportEvent::Connected);
        Ok(())
    }

    async fn disconnect(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            self.active
                .write()
                .expect("MemoryTransport: active lock poisoned")
                .clear();
            let _ = self.events.send(TransportEvent::Disconnected {
                reason: "deactivated".to_string(),
            });
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn subscribe(&self, topic: &Topic) -> Result<SubscriptionHandle, ChannelError> {
        if !self.is_connected() {
            return Err(ChannelError::NotConnected);
        }
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        let handle = SubscriptionHandle::new();
        self.active
            .write()
            .expect("MemoryTransport: active lock poisoned")
            .insert(handle, topic.clone());
        Ok(handle)
    }

    async fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<(), ChannelError> {
        self.unsubscribe_calls.fetch_add(1, Ordering::SeqCst);
        self.active
            .write()
            .expect("MemoryTransport: active lock poisoned")
            .remove(&handle);
        Ok(())
    }

    fn events(&self) -> broadcast::Receiver<TransportEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_requires_connection_and_subscription() {
        let broker = MemoryTransport::new();
        let topic = Topic::merchant_orders(7);

        assert!(!broker.publish(&topic, "{}"));

        broker.connect("memory://").await.unwrap();
        assert!(!broker.publish(&topic, "{}"));

        broker.subscribe(&topic).await.unwrap();
        assert!(broker.publish(&topic, "{}"));
    }

    #[tokio::test]
    async fn refused_connect_emits_disconnect_event() {
        let broker = MemoryTransport::new();
        let mut events = broker.events();
        broker.refuse_connections(true);

        assert!(broker.connect("memory://").await.is_err());
        assert!(!broker.is_connected());

        assert!(matches!(
            events.recv().await.unwrap(),
            TransportEvent::ProtocolError { .. }
        ));
        assert!(matches!(
            events.recv().await.unwrap(),
            TransportEvent::Disconnected { .. }
        ));
    }

    #[tokio::test]
    async fn drop_connection_invalidates_subscriptions() {
        let broker = MemoryTransport::new();
        let topic = Topic::merchant_orders(7);
        broker.connect("memory://").await.unwrap();
        broker.subscribe(&topic).await.unwrap();
        assert_eq!(broker.subscription_count(&topic), 1);

        broker.drop_connection("network flaked");

        assert!(!broker.is_connected());
        assert_eq!(broker.subscription_count(&topic), 0);
    }

    #[tokio::test]
    async fn unsubscribe_removes_active_entry() {
        let broker = MemoryTransport::new();
        let topic = Topic::merchant_orders(7);
        broker.connect("memory://").await.unwrap();
        let handle = broker.subscribe(&topic).await.unwrap();

        broker.unsubscribe(handle).await.unwrap();

        assert_eq!(broker.subscription_count(&topic), 0);
        assert_eq!(broker.unsubscribe_calls(), 1);
    }
}

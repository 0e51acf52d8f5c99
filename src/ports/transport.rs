//! BrokerTransport port - Interface for the physical broker connection.
//!
//! The transport owns at most one live connection to the message broker
//! and surfaces everything that happens on it (connects, disconnects,
//! incoming frames, protocol errors) through a broadcast event channel.
//! The channel layer never talks to the wire directly; it consumes events
//! and issues subscribe/unsubscribe calls through this port, which keeps
//! the whole pipeline testable against an in-memory broker.

use async_trait::async_trait;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::domain::{ChannelError, Topic};

/// Opaque handle for one transport-level topic subscription.
///
/// Handles are only valid for the connection they were created on; a
/// disconnect invalidates every outstanding handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(Uuid);

impl SubscriptionHandle {
    /// Create a fresh handle.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The handle's unique id.
    pub fn id(&self) -> Uuid {
        self.0
    }
}

impl Default for SubscriptionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything a transport can report.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// The connection is established and frames may flow.
    Connected,

    /// The connection is gone. Heartbeat loss, a server close, and a
    /// failed connect attempt all land here; the reason is informational.
    Disconnected { reason: String },

    /// A broker frame arrived for a topic. Body is the raw frame payload.
    Frame { topic: Topic, body: String },

    /// The broker reported a protocol-level error. A `Disconnected`
    /// event follows separately if the connection was lost.
    ProtocolError { message: String },
}

/// Port for the physical broker connection.
///
/// Implementations must be safe to share behind an `Arc` and must never
/// panic on wire failures; everything is reported through `events()`.
#[async_trait]
pub trait BrokerTransport: Send + Sync {
    /// Begin a connection attempt against the given endpoint.
    ///
    /// Idempotent while connecting or connected. A failure both emits
    /// `ProtocolError`/`Disconnected` events and returns `Err`, so callers
    /// may either await the result or watch the event channel.
    async fn connect(&self, endpoint: &str) -> Result<(), ChannelError>;

    /// Tear the connection down immediately.
    async fn disconnect(&self);

    /// Point-in-time connection flag.
    fn is_connected(&self) -> bool;

    /// Register a topic with the broker on the current connection.
    ///
    /// Fails with `NotConnected` while disconnected; the caller defers and
    /// retries after the next `Connected` event.
    async fn subscribe(&self, topic: &Topic) -> Result<SubscriptionHandle, ChannelError>;

    /// Deregister a previously-created subscription.
    async fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<(), ChannelError>;

    /// A fresh receiver for transport events. Each receiver sees every
    /// event from the moment it is created.
    fn events(&self) -> broadcast::Receiver<TransportEvent>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time check that the trait is object-safe
    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn BrokerTransport) {}

    #[test]
    fn subscription_handles_are_unique() {
        let a = SubscriptionHandle::new();
        let b = SubscriptionHandle::new();
        assert_ne!(a, b);
    }

    #[test]
    fn subscription_handle_display_is_uuid() {
        let handle = SubscriptionHandle::new();
        assert_eq!(format!("{}", handle).len(), 36);
    }
}

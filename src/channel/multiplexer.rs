//! Topic subscription multiplexer.
//!
//! Many listeners can register for one topic while the transport holds
//! at most one broker subscription per topic. Listener registrations
//! outlive the connection: when the link drops, broker handles are
//! invalidated but the listener table is kept, and `rearm` re-issues
//! one broker subscription per populated topic after a reconnect.
//!
//! Reserved topics (`connection`, `error`) are local-only and are
//! never subscribed on the broker.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use crate::domain::Topic;
use crate::ports::{BrokerTransport, SubscriptionHandle};

/// Listener callback. Receives the parsed JSON body of each frame.
pub type Listener = Arc<dyn Fn(Value) + Send + Sync>;

struct TopicEntry {
    /// Broker-side handle, present only while the transport subscription
    /// is believed active. None for reserved topics and while offline.
    handle: Option<SubscriptionHandle>,
    listeners: Vec<(u64, Listener)>,
}

impl TopicEntry {
    fn new() -> Self {
        Self {
            handle: None,
            listeners: Vec::new(),
        }
    }
}

/// Fan-out registry between the transport and application listeners.
pub struct SubscriptionMultiplexer {
    transport: Arc<dyn BrokerTransport>,
    topics: Mutex<HashMap<Topic, TopicEntry>>,
    next_listener: AtomicU64,
}

impl SubscriptionMultiplexer {
    pub fn new(transport: Arc<dyn BrokerTransport>) -> Self {
        Self {
            transport,
            topics: Mutex::new(HashMap::new()),
            next_listener: AtomicU64::new(1),
        }
    }

    /// Register a listener for a topic.
    ///
    /// The first listener on a non-reserved topic triggers a broker
    /// subscription if the transport is currently connected; otherwise
    /// the subscription is deferred until the next `rearm`. Later
    /// listeners on the same topic piggyback on the existing handle.
    pub async fn subscribe(self: &Arc<Self>, topic: Topic, listener: Listener) -> SubscriptionToken {
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        let mut topics = self.topics.lock().await;
        let entry = topics.entry(topic.clone()).or_insert_with(TopicEntry::new);
        entry.listeners.push((id, listener));

        if !topic.is_reserved() && entry.handle.is_none() && self.transport.is_connected() {
            match self.transport.subscribe(&topic).await {
                Ok(handle) => entry.handle = Some(handle),
                Err(err) => {
                    // Keep the listener; rearm picks it up after reconnect.
                    warn!(topic = %topic, %err, "broker subscribe failed, deferring to rearm");
                }
            }
        }

        debug!(topic = %topic, listener = id, listeners = entry.listeners.len(), "listener registered");
        SubscriptionToken::active(Arc::clone(self), topic, id)
    }

    /// Deliver a raw frame body to every listener of its topic.
    ///
    /// A listener that panics is isolated: the panic is caught and the
    /// remaining listeners still run.
    pub async fn dispatch(&self, topic: &Topic, body: &str) {
        let payload: Value = match serde_json::from_str(body) {
            Ok(value) => value,
            Err(err) => {
                warn!(topic = %topic, %err, "discarding frame with unparseable body");
                return;
            }
        };
        self.fan_out(topic, payload).await;
    }

    /// Deliver a locally produced payload, used for the reserved
    /// `connection` and `error` topics.
    pub async fn publish_local(&self, topic: &Topic, payload: Value) {
        self.fan_out(topic, payload).await;
    }

    async fn fan_out(&self, topic: &Topic, payload: Value) {
        let listeners: Vec<Listener> = {
            let topics = self.topics.lock().await;
            match topics.get(topic) {
                Some(entry) => entry.listeners.iter().map(|(_, l)| Arc::clone(l)).collect(),
                None => return,
            }
        };
        for listener in listeners {
            let payload = payload.clone();
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| listener(payload))) {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_string());
                error!(topic = %topic, panic = %message, "listener panicked during dispatch");
            }
        }
    }

    /// Forget every broker handle. Called when the link drops; listener
    /// registrations are untouched.
    pub async fn invalidate_handles(&self) {
        let mut topics = self.topics.lock().await;
        for entry in topics.values_mut() {
            entry.handle = None;
        }
    }

    /// Re-issue one broker subscription per non-reserved topic that has
    /// listeners. Called after a (re)connect.
    pub async fn rearm(&self) {
        let mut topics = self.topics.lock().await;
        for (topic, entry) in topics.iter_mut() {
            if topic.is_reserved() || entry.listeners.is_empty() || entry.handle.is_some() {
                continue;
            }
            match self.transport.subscribe(topic).await {
                Ok(handle) => {
                    entry.handle = Some(handle);
                    debug!(topic = %topic, "broker subscription rearmed");
                }
                Err(err) => {
                    warn!(topic = %topic, %err, "rearm failed, retrying on next reconnect");
                }
            }
        }
    }

    /// Topics that currently hold a broker handle. Test observability.
    pub async fn armed_topics(&self) -> Vec<Topic> {
        let topics = self.topics.lock().await;
        topics
            .iter()
            .filter(|(_, entry)| entry.handle.is_some())
            .map(|(topic, _)| topic.clone())
            .collect()
    }

    async fn remove_listener(&self, topic: &Topic, id: u64) {
        let mut topics = self.topics.lock().await;
        let Some(entry) = topics.get_mut(topic) else {
            return;
        };
        entry.listeners.retain(|(lid, _)| *lid != id);
        if entry.listeners.is_empty() {
            let handle = entry.handle.take();
            topics.remove(topic);
            drop(topics);
            if let Some(handle) = handle {
                if let Err(err) = self.transport.unsubscribe(handle).await {
                    warn!(topic = %topic, %err, "broker unsubscribe failed");
                }
            }
        }
    }
}

struct TokenInner {
    mux: Arc<SubscriptionMultiplexer>,
    topic: Topic,
    id: u64,
}

/// Owned handle to one listener registration.
///
/// Dropping the token does NOT unsubscribe; call [`unsubscribe`]
/// explicitly. The call is idempotent.
///
/// [`unsubscribe`]: SubscriptionToken::unsubscribe
pub struct SubscriptionToken {
    inner: Option<TokenInner>,
}

impl SubscriptionToken {
    fn active(mux: Arc<SubscriptionMultiplexer>, topic: Topic, id: u64) -> Self {
        Self {
            inner: Some(TokenInner { mux, topic, id }),
        }
    }

    /// A token bound to nothing. Unsubscribing it is a no-op.
    pub fn noop() -> Self {
        Self { inner: None }
    }

    /// Remove this listener. The last listener on a non-reserved topic
    /// also releases the broker subscription.
    pub async fn unsubscribe(&mut self) {
        if let Some(inner) = self.inner.take() {
            inner.mux.remove_listener(&inner.topic, inner.id).await;
        }
    }
}

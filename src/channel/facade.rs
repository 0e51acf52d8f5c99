//! Notification channel facade.
//!
//! Single entry point the application talks to: activate the channel,
//! register listeners, probe the link, and shut down. Behind it sit
//! the multiplexer and the reconnection supervisor; callers never see
//! the transport directly.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::timeout;
use tracing::{error, warn};

use crate::adapters::stomp::StompTransport;
use crate::config::BrokerConfig;
use crate::domain::{OrderNotification, Topic};
use crate::ports::{BrokerTransport, TransportEvent};

use super::multiplexer::{Listener, SubscriptionMultiplexer, SubscriptionToken};
use super::supervisor::ReconnectionSupervisor;

pub struct NotificationChannel {
    transport: Arc<dyn BrokerTransport>,
    mux: Arc<SubscriptionMultiplexer>,
    supervisor: Arc<ReconnectionSupervisor>,
    probe_timeout: Duration,
}

impl NotificationChannel {
    /// Build a channel over any transport. Tests inject the in-memory
    /// broker here; production uses [`NotificationChannel::stomp`].
    pub fn new(transport: Arc<dyn BrokerTransport>, config: &BrokerConfig) -> Self {
        let mux = Arc::new(SubscriptionMultiplexer::new(Arc::clone(&transport)));
        let supervisor = Arc::new(ReconnectionSupervisor::new(
            Arc::clone(&transport),
            Arc::clone(&mux),
            config.clone(),
        ));
        Self {
            transport,
            mux,
            supervisor,
            probe_timeout: config.connect_timeout(),
        }
    }

    /// Channel over the STOMP-over-WebSocket transport.
    pub fn stomp(config: &BrokerConfig) -> Self {
        let transport: Arc<dyn BrokerTransport> = Arc::new(StompTransport::new(config.clone()));
        Self::new(transport, config)
    }

    /// Activate the channel: connect and begin supervising the link.
    pub async fn init(&self) {
        self.supervisor.start().await;
    }

    /// Deactivate the channel. Listener registrations stay in place, so
    /// a later `init` resumes delivery without re-registering.
    pub async fn shutdown(&self) {
        self.supervisor.shutdown().await;
    }

    /// Reconnect against a different broker endpoint.
    pub async fn restart(&self, endpoint: &str) {
        self.supervisor.restart(endpoint).await;
    }

    /// Forward a host network-reachability hint to the supervisor.
    pub async fn network_hint(&self, online: bool) {
        self.supervisor.network_hint(online).await;
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Register a raw JSON listener on any topic, including the
    /// reserved `connection` and `error` topics.
    pub async fn subscribe(&self, topic: Topic, listener: Listener) -> SubscriptionToken {
        self.mux.subscribe(topic, listener).await
    }

    /// Register a typed listener for a merchant's order notifications.
    ///
    /// Without a merchant id there is no topic to build; an error is
    /// logged and the returned token is inert, so callers can always
    /// unsubscribe unconditionally.
    pub async fn subscribe_to_order_notifications(
        &self,
        merchant_id: Option<u64>,
        on_notification: impl Fn(OrderNotification) + Send + Sync + 'static,
    ) -> SubscriptionToken {
        let Some(merchant_id) = merchant_id else {
            error!("cannot subscribe to order notifications without a merchant id");
            return SubscriptionToken::noop();
        };
        let topic = Topic::merchant_orders(merchant_id);
        let listener: Listener = Arc::new(move |payload: Value| {
            match serde_json::from_value::<OrderNotification>(payload) {
                Ok(notification) => on_notification(notification),
                Err(err) => {
                    warn!(%err, "discarding malformed order notification");
                }
            }
        });
        self.mux.subscribe(topic, listener).await
    }

    /// Probe the link. Forces a connect attempt if the link is down,
    /// then resolves `true` as soon as the link is (or becomes)
    /// established, `false` when the probe window elapses. Always
    /// settles within the configured connect timeout.
    pub async fn test_connection(&self) -> bool {
        if self.transport.is_connected() {
            return true;
        }
        // Receiver first, so a fast connect cannot slip past the wait.
        let mut events = self.transport.events();
        self.supervisor.connect_once().await;
        if self.transport.is_connected() {
            return true;
        }
        let wait = async {
            loop {
                match events.recv().await {
                    Ok(TransportEvent::Connected) => return true,
                    Ok(_) => continue,
                    Err(RecvError::Lagged(_)) => {
                        // The Connected event may be among the dropped ones.
                        if self.transport.is_connected() {
                            return true;
                        }
                    }
                    Err(RecvError::Closed) => return self.transport.is_connected(),
                }
            }
        };
        timeout(self.probe_timeout, wait).await.unwrap_or(false)
    }
}

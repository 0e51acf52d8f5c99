//! Connection lifecycle supervision.
//!
//! Owns the event pump between the transport and the multiplexer and
//! drives reconnection: a dropped link schedules a single retry task
//! with a fixed delay, a network-online hint short-circuits the wait,
//! and a liveness poll keeps `connection`-topic listeners converged on
//! the real link state even if a transition event was missed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::BrokerConfig;
use crate::domain::{ConnectionStatus, Topic};
use crate::ports::{BrokerTransport, TransportEvent};

use super::multiplexer::SubscriptionMultiplexer;

pub struct ReconnectionSupervisor {
    transport: Arc<dyn BrokerTransport>,
    mux: Arc<SubscriptionMultiplexer>,
    config: BrokerConfig,
    endpoint: RwLock<String>,
    enabled: AtomicBool,
    pump: Mutex<Option<JoinHandle<()>>>,
    retry: Mutex<Option<JoinHandle<()>>>,
    liveness: Mutex<Option<JoinHandle<()>>>,
}

impl ReconnectionSupervisor {
    pub fn new(
        transport: Arc<dyn BrokerTransport>,
        mux: Arc<SubscriptionMultiplexer>,
        config: BrokerConfig,
    ) -> Self {
        let endpoint = config.endpoint_url.clone();
        Self {
            transport,
            mux,
            config,
            endpoint: RwLock::new(endpoint),
            enabled: AtomicBool::new(false),
            pump: Mutex::new(None),
            retry: Mutex::new(None),
            liveness: Mutex::new(None),
        }
    }

    /// Activate supervision and make the first connect attempt.
    ///
    /// The event pump is started before the connect so the Connected
    /// event of a fast handshake cannot be missed. Idempotent: calling
    /// start on an active supervisor only retriggers a connect attempt
    /// if the link is down.
    pub async fn start(self: &Arc<Self>) {
        self.enabled.store(true, Ordering::SeqCst);
        self.spawn_pump().await;
        self.spawn_liveness().await;
        if !self.transport.is_connected() {
            self.attempt_connect().await;
        }
    }

    /// Deactivate supervision and tear the link down.
    ///
    /// No retry fires afterwards; listeners observe a final
    /// disconnected status on the `connection` topic.
    pub async fn shutdown(&self) {
        self.enabled.store(false, Ordering::SeqCst);
        if let Some(handle) = self.retry.lock().await.take() {
            handle.abort();
        }
        if let Some(handle) = self.liveness.lock().await.take() {
            handle.abort();
        }
        self.transport.disconnect().await;
        self.mux.invalidate_handles().await;
        self.publish_status(ConnectionStatus::Disconnected).await;
        if let Some(handle) = self.pump.lock().await.take() {
            handle.abort();
        }
        info!("supervisor shut down");
    }

    /// Tear down the current link and reconnect against a new endpoint.
    pub async fn restart(self: &Arc<Self>, endpoint: &str) {
        info!(%endpoint, "restarting against new endpoint");
        *self.endpoint.write().await = endpoint.to_string();
        if let Some(handle) = self.retry.lock().await.take() {
            handle.abort();
        }
        self.transport.disconnect().await;
        self.mux.invalidate_handles().await;
        if self.enabled.load(Ordering::SeqCst) {
            self.attempt_connect().await;
        }
    }

    /// Hint from the host that network reachability changed.
    ///
    /// Coming back online collapses any pending retry delay into an
    /// immediate attempt. Going offline is informational only; the
    /// transport notices the dead link through its own heartbeats.
    pub async fn network_hint(self: &Arc<Self>, online: bool) {
        if !online {
            debug!("network offline hint");
            return;
        }
        if self.enabled.load(Ordering::SeqCst) && !self.transport.is_connected() {
            info!("network online hint, attempting reconnect now");
            if let Some(handle) = self.retry.lock().await.take() {
                handle.abort();
            }
            self.attempt_connect().await;
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// One immediate connect attempt, used by the connection probe.
    /// Does not schedule a retry and works even before `start`.
    pub async fn connect_once(&self) {
        if self.transport.is_connected() {
            return;
        }
        let endpoint = self.endpoint.read().await.clone();
        if let Err(err) = self.transport.connect(&endpoint).await {
            debug!(%endpoint, %err, "probe connect attempt failed");
        }
    }

    async fn attempt_connect(self: &Arc<Self>) {
        let endpoint = self.endpoint.read().await.clone();
        if let Err(err) = self.transport.connect(&endpoint).await {
            warn!(%endpoint, %err, "connect attempt failed");
            self.schedule_retry().await;
        }
    }

    /// At most one retry task exists at a time. A live task is left
    /// alone so overlapping disconnect events do not reset the delay.
    async fn schedule_retry(self: &Arc<Self>) {
        let mut retry = self.retry.lock().await;
        if let Some(handle) = retry.as_ref() {
            if !handle.is_finished() {
                return;
            }
        }
        let this = Arc::clone(self);
        let delay = self.config.retry_delay();
        *retry = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(delay).await;
                if !this.enabled.load(Ordering::SeqCst) || this.transport.is_connected() {
                    break;
                }
                let endpoint = this.endpoint.read().await.clone();
                match this.transport.connect(&endpoint).await {
                    Ok(()) => break,
                    Err(err) => {
                        warn!(%endpoint, %err, "retry attempt failed, waiting another interval");
                    }
                }
            }
        }));
    }

    async fn spawn_pump(self: &Arc<Self>) {
        let mut pump = self.pump.lock().await;
        if let Some(handle) = pump.as_ref() {
            if !handle.is_finished() {
                return;
            }
        }
        let this = Arc::clone(self);
        let mut events = self.transport.events();
        *pump = Some(tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => this.handle_event(event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "event pump lagged, events dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }));
    }

    async fn handle_event(self: &Arc<Self>, event: TransportEvent) {
        match event {
            TransportEvent::Connected => {
                info!("link established");
                if let Some(handle) = self.retry.lock().await.take() {
                    handle.abort();
                }
                self.mux.rearm().await;
                self.publish_status(ConnectionStatus::Connected).await;
            }
            TransportEvent::Disconnected { reason } => {
                info!(%reason, "link lost");
                self.mux.invalidate_handles().await;
                self.publish_status(ConnectionStatus::Disconnected).await;
                if self.enabled.load(Ordering::SeqCst) {
                    self.schedule_retry().await;
                }
            }
            TransportEvent::Frame { topic, body } => {
                self.mux.dispatch(&topic, &body).await;
            }
            TransportEvent::ProtocolError { message } => {
                warn!(%message, "broker protocol error");
                self.mux
                    .publish_local(&Topic::error(), json!({ "message": message }))
                    .await;
            }
        }
    }

    async fn publish_status(&self, status: ConnectionStatus) {
        self.mux
            .publish_local(&Topic::connection(), json!({ "status": status }))
            .await;
    }

    /// Periodically republish the live link state so `connection`
    /// listeners converge even if a transition event was missed.
    async fn spawn_liveness(self: &Arc<Self>) {
        let mut liveness = self.liveness.lock().await;
        if let Some(handle) = liveness.as_ref() {
            if !handle.is_finished() {
                return;
            }
        }
        let this = Arc::clone(self);
        let period = self.config.liveness_poll();
        *liveness = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            ticker.tick().await; // immediate first tick carries no new information
            loop {
                ticker.tick().await;
                let status = if this.transport.is_connected() {
                    ConnectionStatus::Connected
                } else {
                    ConnectionStatus::Disconnected
                };
                this.publish_status(status).await;
            }
        }));
    }
}

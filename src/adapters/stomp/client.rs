//! STOMP-over-WebSocket broker transport.
//!
//! Owns at most one live websocket to the broker. The connect path runs
//! the STOMP handshake inline; after that a reader task routes incoming
//! frames onto the event channel and a heartbeat task keeps the
//! connection verifiably alive. Absence of inbound traffic for two
//! heartbeat intervals is surfaced as a plain disconnect, not as a
//! distinguishable error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::config::BrokerConfig;
use crate::domain::{ChannelError, Topic};
use crate::ports::{BrokerTransport, SubscriptionHandle, TransportEvent};

use super::frame::{Command, Frame};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Normalize a configured endpoint into a websocket URL.
///
/// The backend configures SockJS-style `http(s)` endpoints; this client
/// speaks plain websocket, so the scheme maps to `ws(s)`. When the
/// hosting origin is secure an insecure scheme is silently upgraded to
/// avoid mixed-content failures.
pub fn websocket_url(endpoint: &str, secure_origin: bool) -> String {
    let mut url = if let Some(rest) = endpoint.strip_prefix("http://") {
        format!("ws://{rest}")
    } else if let Some(rest) = endpoint.strip_prefix("https://") {
        format!("wss://{rest}")
    } else {
        endpoint.to_string()
    };
    if secure_origin {
        if let Some(rest) = url.strip_prefix("ws://") {
            url = format!("wss://{rest}");
        }
    }
    url
}

/// Host portion of an endpoint, for the CONNECT frame's `host` header.
fn endpoint_host(endpoint: &str) -> &str {
    let without_scheme = endpoint
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(endpoint);
    without_scheme
        .split_once('/')
        .map(|(host, _)| host)
        .unwrap_or(without_scheme)
}

/// Translate one incoming websocket text payload into transport events.
///
/// Heartbeats and frames we do not consume produce nothing; malformed
/// frames are logged and dropped without touching the connection.
fn route_incoming(text: &str) -> Vec<TransportEvent> {
    match Frame::decode(text) {
        Ok(None) => Vec::new(),
        Ok(Some(frame)) => match frame.command {
            Command::Message => match frame.header("destination") {
                Some(destination) => vec![TransportEvent::Frame {
                    topic: Topic::new(destination),
                    body: frame.body,
                }],
                None => {
                    tracing::warn!("MESSAGE frame without destination header, dropping");
                    Vec::new()
                }
            },
            Command::Error => {
                let message = frame
                    .header("message")
                    .map(str::to_string)
                    .unwrap_or_else(|| frame.body.clone());
                vec![TransportEvent::ProtocolError { message }]
            }
            other => {
                tracing::debug!(command = other.as_str(), "ignoring broker frame");
                Vec::new()
            }
        },
        Err(e) => {
            tracing::warn!(error = %e, "undecodable broker frame, dropping");
            Vec::new()
        }
    }
}

struct Session {
    sink: Arc<Mutex<WsSink>>,
    reader: JoinHandle<()>,
    heartbeat: JoinHandle<()>,
}

/// Transport Connector over STOMP/WebSocket.
pub struct StompTransport {
    config: BrokerConfig,
    events: broadcast::Sender<TransportEvent>,
    connected: Arc<AtomicBool>,
    session: Mutex<Option<Session>>,
}

impl StompTransport {
    /// Create a disconnected transport.
    pub fn new(config: BrokerConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            config,
            events,
            connected: Arc::new(AtomicBool::new(false)),
            session: Mutex::new(None),
        }
    }

    /// Emit the error/disconnect pair for a failed connect attempt and
    /// hand back the matching `ChannelError`.
    fn connect_failed(&self, reason: String) -> ChannelError {
        tracing::warn!(reason = %reason, "broker connect attempt failed");
        let _ = self.events.send(TransportEvent::ProtocolError {
            message: reason.clone(),
        });
        let _ = self.events.send(TransportEvent::Disconnected {
            reason: reason.clone(),
        });
        ChannelError::Transport(reason)
    }

    /// Run the STOMP handshake on a freshly-opened websocket.
    async fn handshake(
        &self,
        ws: &mut WebSocketStream<MaybeTlsStream<TcpStream>>,
        endpoint: &str,
    ) -> Result<(), String> {
        let connect_frame = Frame::connect(endpoint_host(endpoint), self.config.heartbeat_ms);
        ws.send(Message::Text(connect_frame.encode()))
            .await
            .map_err(|e| format!("failed to send CONNECT: {e}"))?;

        loop {
            let message = tokio::time::timeout(self.config.connect_timeout(), ws.next())
                .await
                .map_err(|_| "broker handshake timed out".to_string())?
                .ok_or_else(|| "connection closed during handshake".to_string())?
                .map_err(|e| format!("websocket error during handshake: {e}"))?;

            let text = match message {
                Message::Text(text) => text,
                Message::Close(_) => return Err("broker closed during handshake".to_string()),
                _ => continue,
            };
            match Frame::decode(&text) {
                Ok(Some(frame)) if frame.command == Command::Connected => return Ok(()),
                Ok(Some(frame)) if frame.command == Command::Error => {
                    let message = frame
                        .header("message")
                        .map(str::to_string)
                        .unwrap_or_else(|| frame.body.clone());
                    return Err(format!("broker rejected connection: {message}"));
                }
                Ok(_) => continue,
                Err(e) => return Err(format!("undecodable handshake frame: {e}")),
            }
        }
    }

    fn spawn_reader(&self, source: WsSource) -> JoinHandle<()> {
        let events = self.events.clone();
        let connected = Arc::clone(&self.connected);
        // Two missed heartbeats count as a dead connection.
        let watchdog = self.config.heartbeat() * 2 + std::time::Duration::from_millis(500);
        tokio::spawn(async move {
            let mut source = source;
            let reason = loop {
                match tokio::time::timeout(watchdog, source.next()).await {
                    Err(_) => break "heartbeat timeout".to_string(),
                    Ok(None) => break "connection closed".to_string(),
                    Ok(Some(Err(e))) => break format!("websocket error: {e}"),
                    Ok(Some(Ok(Message::Text(text)))) => {
                        for event in route_incoming(&text) {
                            let _ = events.send(event);
                        }
                    }
                    Ok(Some(Ok(Message::Close(_)))) => break "server closed".to_string(),
                    Ok(Some(Ok(_))) => {}
                }
            };
            connected.store(false, Ordering::SeqCst);
            tracing::info!(reason = %reason, "broker connection lost");
            let _ = events.send(TransportEvent::Disconnected { reason });
        })
    }

    fn spawn_heartbeat(&self, sink: Arc<Mutex<WsSink>>) -> JoinHandle<()> {
        let every = self.config.heartbeat();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(every);
            // The first tick fires immediately; skip it so the first
            // heartbeat goes out one interval after connect.
            tick.tick().await;
            loop {
                tick.tick().await;
                if sink
                    .lock()
                    .await
                    .send(Message::Text("\n".to_string()))
                    .await
                    .is_err()
                {
                    break;
                }
            }
        })
    }

    async fn send_frame(&self, frame: Frame) -> Result<(), ChannelError> {
        let sink = {
            let session = self.session.lock().await;
            match session.as_ref() {
                Some(session) => Arc::clone(&session.sink),
                None => return Err(ChannelError::NotConnected),
            }
        };
        let mut guard = sink.lock().await;
        guard
            .send(Message::Text(frame.encode()))
            .await
            .map_err(|e| ChannelError::Transport(format!("send failed: {e}")))
    }
}

#[async_trait::async_trait]
impl BrokerTransport for StompTransport {
    async fn connect(&self, endpoint: &str) -> Result<(), ChannelError> {
        // The session lock also serializes concurrent connect attempts,
        // which is what makes `connect` idempotent while connecting.
        let mut session = self.session.lock().await;
        if self.connected.load(Ordering::SeqCst) {
            return Ok(());
        }

        let url = websocket_url(endpoint, self.config.secure_origin);
        let (mut ws, _response) = connect_async(&url)
            .await
            .map_err(|e| self.connect_failed(format!("websocket connect failed: {e}")))?;

        if let Err(reason) = self.handshake(&mut ws, endpoint).await {
            let _ = ws.close(None).await;
            return Err(self.connect_failed(reason));
        }

        let (sink, source) = ws.split();
        let sink = Arc::new(Mutex::new(sink));
        let reader = self.spawn_reader(source);
        let heartbeat = self.spawn_heartbeat(Arc::clone(&sink));
        *session = Some(Session {
            sink,
            reader,
            heartbeat,
        });
        drop(session);

        self.connected.store(true, Ordering::SeqCst);
        tracing::info!(url = %url, "broker connection established");
        let _ = self.events.send(TransportEvent::Connected);
        Ok(())
    }

    async fn disconnect(&self) {
        let taken = self.session.lock().await.take();
        let was_connected = self.connected.swap(false, Ordering::SeqCst);
        if let Some(session) = taken {
            session.reader.abort();
            session.heartbeat.abort();
            let mut sink = session.sink.lock().await;
            let _ = sink
                .send(Message::Text(Frame::new(Command::Disconnect).encode()))
                .await;
            let _ = sink.close().await;
        }
        if was_connected {
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
        let handle = SubscriptionHandle::new();
        self.send_frame(Frame::subscribe(&handle.to_string(), topic.as_str()))
            .await?;
        tracing::debug!(topic = %topic, handle = %handle, "broker subscription created");
        Ok(handle)
    }

    async fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<(), ChannelError> {
        if !self.is_connected() {
            return Err(ChannelError::NotConnected);
        }
        self.send_frame(Frame::unsubscribe(&handle.to_string()))
            .await
    }

    fn events(&self) -> broadcast::Receiver<TransportEvent> {
        self.events.subscribe()
    }
}

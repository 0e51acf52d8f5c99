//! Broker connection configuration.

use std::time::Duration;

use serde::Deserialize;

use super::error::ValidationError;

/// Configuration for the broker transport and the reconnection supervisor.
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    /// Broker endpoint. `http(s)` schemes are normalized to `ws(s)`.
    #[serde(default = "default_endpoint_url")]
    pub endpoint_url: String,

    /// Whether the hosting origin is secure. When true, an insecure
    /// endpoint scheme is silently upgraded before connecting.
    #[serde(default)]
    pub secure_origin: bool,

    /// Fixed delay before a reconnect attempt after a disconnect.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Heartbeat interval, both incoming and outgoing.
    #[serde(default = "default_heartbeat_ms")]
    pub heartbeat_ms: u64,

    /// Interval of the liveness poll that republishes the connection flag.
    #[serde(default = "default_liveness_poll_ms")]
    pub liveness_poll_ms: u64,

    /// Bound on the broker handshake and on `test_connection`.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl BrokerConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn heartbeat(&self) -> Duration {
        Duration::from_millis(self.heartbeat_ms)
    }

    pub fn liveness_poll(&self) -> Duration {
        Duration::from_millis(self.liveness_poll_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Validate broker configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.endpoint_url.is_empty() {
            return Err(ValidationError::EmptyEndpoint);
        }
        let valid_scheme = ["ws://", "wss://", "http://", "https://"]
            .iter()
            .any(|scheme| self.endpoint_url.starts_with(scheme));
        if !valid_scheme {
            return Err(ValidationError::InvalidEndpointScheme(
                self.endpoint_url.clone(),
            ));
        }
        for (field, value) in [
            ("retry_delay_ms", self.retry_delay_ms),
            ("heartbeat_ms", self.heartbeat_ms),
            ("liveness_poll_ms", self.liveness_poll_ms),
            ("connect_timeout_ms", self.connect_timeout_ms),
        ] {
            if value == 0 {
                return Err(ValidationError::ZeroInterval { field });
            }
        }
        Ok(())
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            endpoint_url: default_endpoint_url(),
            secure_origin: false,
            retry_delay_ms: default_retry_delay_ms(),
            heartbeat_ms: default_heartbeat_ms(),
            liveness_poll_ms: default_liveness_poll_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

fn default_endpoint_url() -> String {
    "http://localhost:8080/ws".to_string()
}

fn default_retry_delay_ms() -> u64 {
    5000
}

fn default_heartbeat_ms() -> u64 {
    4000
}

fn default_liveness_poll_ms() -> u64 {
    5000
}

fn default_connect_timeout_ms() -> u64 {
    5000
}

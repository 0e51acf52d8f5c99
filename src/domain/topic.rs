//! Broker topic names.
//!
//! Topics are opaque strings to the multiplexer; the only structure the
//! pipeline knows about is the merchant order topic convention and the two
//! reserved local topics used for connection status and transport errors.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A named channel on the message broker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Topic(String);

impl Topic {
    /// Reserved local topic carrying `{"status": "connected"|"disconnected"}`.
    pub const CONNECTION: &'static str = "connection";

    /// Reserved local topic carrying `{"message": string}`.
    pub const ERROR: &'static str = "error";

    /// Create a topic from an arbitrary destination string.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The canonical order-notification topic for a merchant.
    pub fn merchant_orders(merchant_id: u64) -> Self {
        Self(format!("/topic/merchant/{}/orders", merchant_id))
    }

    /// The reserved connection-status topic.
    pub fn connection() -> Self {
        Self(Self::CONNECTION.to_string())
    }

    /// The reserved error topic.
    pub fn error() -> Self {
        Self(Self::ERROR.to_string())
    }

    /// Reserved topics are fanned out locally and never registered with
    /// the broker.
    pub fn is_reserved(&self) -> bool {
        self.0 == Self::CONNECTION || self.0 == Self::ERROR
    }

    /// The topic name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Topic {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Topic {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merchant_orders_follows_convention() {
        let topic = Topic::merchant_orders(7);
        assert_eq!(topic.as_str(), "/topic/merchant/7/orders");
    }

    #[test]
    fn reserved_topics_are_flagged() {
        assert!(Topic::connection().is_reserved());
        assert!(Topic::error().is_reserved());
        assert!(!Topic::merchant_orders(1).is_reserved());
    }

    #[test]
    fn topic_display_matches_name() {
        let topic = Topic::new("/topic/merchant/42/orders");
        assert_eq!(format!("{}", topic), "/topic/merchant/42/orders");
    }
}

//! Pushed order events and connection-status payloads.
//!
//! Wire format is camelCase JSON. Notifications are immutable once
//! received; consumers may de-duplicate by `order_code`.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Order lifecycle status as pushed by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Ordered,
    Paid,
    Canceled,
    Refunded,
}

/// Payment status as pushed by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Canceled,
    Failed,
}

/// A single pushed order event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderNotification {
    /// Unique per order.
    pub order_code: String,
    pub merchant_id: u64,
    pub table_number: u32,
    /// Currency minor units.
    pub total_amount: i64,
    pub order_status: OrderStatus,
    pub payment_status: PaymentStatus,
    /// Invalid timestamps fall back to the time of receipt.
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    /// Display string, already localized by the backend.
    pub message: String,
}

/// Connection status published on the reserved `connection` topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
}

/// Payload shape of the reserved `connection` topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionEvent {
    pub status: ConnectionStatus,
}

/// Parse a broker timestamp defensively.
///
/// Accepts RFC 3339 and the backend's naive `YYYY-MM-DDTHH:MM:SS[.fff]`
/// form (interpreted as UTC). Anything else yields "now" rather than a
/// rejected notification.
pub fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.with_timezone(&Utc);
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Utc.from_utc_datetime(&naive);
        }
    }
    tracing::debug!(raw, "unparseable notification timestamp, using now");
    Utc::now()
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(parse_timestamp(&raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_camel_case_payload() {
        let payload = json!({
            "orderCode": "A1",
            "merchantId": 7,
            "tableNumber": 3,
            "totalAmount": 12000,
            "orderStatus": "ORDERED",
            "paymentStatus": "PENDING",
            "timestamp": "2024-01-01T10:00:00",
            "message": "신규 주문"
        });

        let notification: OrderNotification = serde_json::from_value(payload).unwrap();

        assert_eq!(notification.order_code, "A1");
        assert_eq!(notification.merchant_id, 7);
        assert_eq!(notification.table_number, 3);
        assert_eq!(notification.total_amount, 12000);
        assert_eq!(notification.order_status, OrderStatus::Ordered);
        assert_eq!(notification.payment_status, PaymentStatus::Pending);
        assert_eq!(
            notification.timestamp,
            Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()
        );
        assert_eq!(notification.message, "신규 주문");
    }

    #[test]
    fn parses_rfc3339_timestamps() {
        let parsed = parse_timestamp("2024-01-01T10:00:00+09:00");
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap());
    }

    #[test]
    fn parses_fractional_seconds() {
        let parsed = parse_timestamp("2024-01-01T10:00:00.250");
        assert_eq!(
            parsed.timestamp_millis(),
            Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0)
                .unwrap()
                .timestamp_millis()
                + 250
        );
    }

    #[test]
    fn invalid_timestamp_falls_back_to_now() {
        let before = Utc::now();
        let parsed = parse_timestamp("definitely not a timestamp");
        let after = Utc::now();
        assert!(parsed >= before && parsed <= after);
    }

    #[test]
    fn connection_event_serializes_lowercase_status() {
        let event = ConnectionEvent {
            status: ConnectionStatus::Disconnected,
        };
        let value = serde_json::to_value(event).unwrap();
        assert_eq!(value, json!({"status": "disconnected"}));
    }
}

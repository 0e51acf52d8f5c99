//! Error types for the notification pipeline.

use thiserror::Error;

/// Errors raised by the broker transport and the channel layer.
///
/// None of these are fatal to the host application: connection failures
/// feed the reconnect path, and subscription failures are retried on the
/// next successful connect.
#[derive(Debug, Clone, Error)]
pub enum ChannelError {
    /// The underlying connection failed or the broker refused us.
    #[error("transport error: {0}")]
    Transport(String),

    /// An operation that requires a live connection was attempted while
    /// disconnected.
    #[error("not connected to broker")]
    NotConnected,
}

/// Errors from the REST orders collaborator.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response (network, timeout, DNS).
    #[error("request failed: {0}")]
    Request(String),

    /// The server answered with a non-2xx status.
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be decoded.
    #[error("response decode failed: {0}")]
    Decode(String),
}

/// Errors surfaced by the kitchen board to its caller.
///
/// Every variant also leaves a user-visible notice on the board; the
/// projection is never left in a partially-mutated state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    /// Dropping into the pending lane is rejected before any network call.
    #[error("orders cannot be moved back to the pending lane")]
    PendingLaneRejected,

    /// The dragged order is not in the current projection.
    #[error("unknown order '{0}'")]
    UnknownOrder(String),

    /// The dragged item is not part of the named order.
    #[error("unknown item {order_menu_id} in order '{order_code}'")]
    UnknownItem {
        order_code: String,
        order_menu_id: i64,
    },

    /// One or more status-update calls failed; the projection was rolled
    /// back to its pre-drag state.
    #[error("status update failed, changes were reverted: {0}")]
    UpdateFailed(String),
}

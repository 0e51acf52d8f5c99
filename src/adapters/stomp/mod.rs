//! STOMP-over-WebSocket broker adapter.

mod client;
mod frame;

pub use client::{websocket_url, StompTransport};
pub use frame::{Command, Frame, FrameError};

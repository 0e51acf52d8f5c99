//! Adapters - Infrastructure implementations of ports.
//!
//! Wire protocols, HTTP clients, and in-memory test doubles live here;
//! everything implements a trait from `crate::ports` so the channel and
//! kitchen layers never see a concrete transport or REST client.

pub mod http;
pub mod memory;
pub mod stomp;

//! OrderDeck Live - Real-time order notifications for merchant kitchens
//!
//! This crate implements the push pipeline between a STOMP message broker
//! and the kitchen display: a supervised broker connection, topic fan-out
//! to application listeners, and a kitchen board that reconciles against
//! the REST orders service on every push.

pub mod adapters;
pub mod channel;
pub mod config;
pub mod domain;
pub mod kitchen;
pub mod ports;

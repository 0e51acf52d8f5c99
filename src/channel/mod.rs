//! Real-time notification channel.
//!
//! Layered as facade over multiplexer over supervisor: the facade is
//! the application-facing surface, the multiplexer fans frames out to
//! listeners, and the supervisor keeps the underlying link alive.

pub mod facade;
pub mod multiplexer;
pub mod supervisor;

pub use facade::NotificationChannel;
pub use multiplexer::{Listener, SubscriptionMultiplexer, SubscriptionToken};
pub use supervisor::ReconnectionSupervisor;

//! Ports - trait interfaces between the pipeline and the outside world.

mod orders_api;
mod transport;

pub use orders_api::OrdersApi;
pub use transport::{BrokerTransport, SubscriptionHandle, TransportEvent};

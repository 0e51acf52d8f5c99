//! In-memory adapters for testing.

pub mod orders;
pub mod transport;

pub use orders::MemoryOrdersApi;
pub use transport::MemoryTransport;

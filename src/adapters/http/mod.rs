//! HTTP adapter for the orders REST collaborator.

mod dto;
mod orders_client;

pub use dto::{DailyOrdersResponse, OrderDto, OrderMenuDto, StatusUpdateRequest};
pub use orders_client::HttpOrdersApi;

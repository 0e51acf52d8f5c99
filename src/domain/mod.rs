//! Domain types shared across the pipeline.

mod errors;
mod kitchen;
mod notification;
mod topic;

pub use errors::{ApiError, BoardError, ChannelError};
pub use kitchen::{
    DailyPage, KitchenItem, KitchenLane, KitchenOrder, MenuStatus, OrderDetail, OrderItemDetail,
};
pub use notification::{
    parse_timestamp, ConnectionEvent, ConnectionStatus, OrderNotification, OrderStatus,
    PaymentStatus,
};
pub use topic::Topic;

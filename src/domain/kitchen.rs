//! Kitchen-side order types.
//!
//! `OrderDetail` is the authoritative snapshot shape returned by the REST
//! collaborator. `KitchenOrder` is the board's derived projection of it:
//! rebuilt wholesale on every refetch, optimistically mutated on drag
//! actions, never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::notification::OrderStatus;

/// Per-item preparation status. The only statuses the status-update
/// endpoint accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MenuStatus {
    Ordered,
    Served,
}

/// Board lanes. Derived from item statuses, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KitchenLane {
    Pending,
    Cooking,
    Completed,
}

impl KitchenLane {
    /// The item status implied by dropping into this lane.
    ///
    /// `Pending` is not a valid drop target and yields `None`; callers
    /// reject the drop before any network call.
    pub fn target_status(self) -> Option<MenuStatus> {
        match self {
            KitchenLane::Pending => None,
            KitchenLane::Cooking => Some(MenuStatus::Ordered),
            KitchenLane::Completed => Some(MenuStatus::Served),
        }
    }
}

/// One menu line of an order as returned by the REST collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderItemDetail {
    pub order_menu_id: i64,
    pub menu_name: String,
    pub quantity: u32,
    pub options: Vec<String>,
    pub status: MenuStatus,
}

/// One order as returned by the REST collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDetail {
    pub order_code: String,
    pub table_number: u32,
    pub order_time: DateTime<Utc>,
    pub order_status: OrderStatus,
    pub items: Vec<OrderItemDetail>,
}

/// One page of the daily order listing.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyPage {
    pub orders: Vec<OrderDetail>,
    /// True when no further pages exist.
    pub last: bool,
}

/// A menu line in the board projection.
#[derive(Debug, Clone, PartialEq)]
pub struct KitchenItem {
    pub order_menu_id: i64,
    pub menu_name: String,
    pub quantity: u32,
    pub options: Vec<String>,
    pub status: MenuStatus,
}

/// The board projection of one order.
#[derive(Debug, Clone, PartialEq)]
pub struct KitchenOrder {
    pub order_code: String,
    pub table_number: u32,
    pub items: Vec<KitchenItem>,
    pub order_time: DateTime<Utc>,
}

impl KitchenOrder {
    /// Derive the lane this order belongs to.
    ///
    /// Completed iff every item is served, Cooking iff some but not all
    /// are, Pending otherwise. An order with no items derives Pending.
    pub fn lane(&self) -> KitchenLane {
        let served = self
            .items
            .iter()
            .filter(|item| item.status == MenuStatus::Served)
            .count();
        if served == 0 || self.items.is_empty() {
            KitchenLane::Pending
        } else if served == self.items.len() {
            KitchenLane::Completed
        } else {
            KitchenLane::Cooking
        }
    }
}

impl From<OrderDetail> for KitchenOrder {
    fn from(detail: OrderDetail) -> Self {
        Self {
            order_code: detail.order_code,
            table_number: detail.table_number,
            order_time: detail.order_time,
            items: detail
                .items
                .into_iter()
                .map(|item| KitchenItem {
                    order_menu_id: item.order_menu_id,
                    menu_name: item.menu_name,
                    quantity: item.quantity,
                    options: item.options,
                    status: item.status,
                })
                .collect(),
        }
    }
}

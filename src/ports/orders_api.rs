//! OrdersApi port - Interface to the REST orders collaborator.
//!
//! The kitchen board uses this port two ways: pulling the authoritative
//! daily snapshot (reconciliation), and pushing per-item status updates
//! (confirming optimistic drag actions). The backend itself is outside
//! this crate; tests substitute an in-memory implementation.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::{ApiError, DailyPage, MenuStatus};

/// Port for the order CRUD endpoints the pipeline consumes.
#[async_trait]
pub trait OrdersApi: Send + Sync {
    /// Fetch one page of the merchant's orders for the given day.
    ///
    /// Callers page forward until `DailyPage::last` is true.
    async fn daily_orders(
        &self,
        date: NaiveDate,
        page: u32,
        size: u32,
    ) -> Result<DailyPage, ApiError>;

    /// Update a single menu item's status on an order.
    ///
    /// Maps to `PUT /orders/{orderCode}/status` with
    /// `{orderMenuId, status}`.
    async fn update_item_status(
        &self,
        order_code: &str,
        order_menu_id: i64,
        status: MenuStatus,
    ) -> Result<(), ApiError>;
}

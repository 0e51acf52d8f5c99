//! In-memory orders API for testing.
//!
//! # Security Note
//!
//! This adapter is for **testing only**. It uses `.expect()` on lock
//! operations which will panic if locks are poisoned; production code
//! uses the HTTP orders adapter.

use std::collections::HashSet;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::{ApiError, DailyPage, MenuStatus, OrderDetail};
use crate::ports::OrdersApi;

/// In-memory orders backend seeded by tests.
///
/// Status updates mutate the seeded orders so a subsequent
/// `daily_orders` read reflects them, and every update call is
/// recorded so tests can assert exactly which REST calls were made.
pub struct MemoryOrdersApi {
    orders: RwLock<Vec<OrderDetail>>,
    fail_updates_for: RwLock<HashSet<i64>>,
    recorded_updates: RwLock<Vec<(String, i64, MenuStatus)>>,
}

impl MemoryOrdersApi {
    pub fn new() -> Self {
        Self {
            orders: RwLock::new(Vec::new()),
            fail_updates_for: RwLock::new(HashSet::new()),
            recorded_updates: RwLock::new(Vec::new()),
        }
    }

    /// Replace the seeded orders.
    pub fn seed(&self, orders: Vec<OrderDetail>) {
        *self
            .orders
            .write()
            .expect("MemoryOrdersApi: orders lock poisoned") = orders;
    }

    /// Script `update_item_status` to fail for one order menu id.
    pub fn fail_update_for(&self, order_menu_id: i64) {
        self.fail_updates_for
            .write()
            .expect("MemoryOrdersApi: fail lock poisoned")
            .insert(order_menu_id);
    }

    /// Every `update_item_status` call made so far, in order.
    pub fn recorded_updates(&self) -> Vec<(String, i64, MenuStatus)> {
        self.recorded_updates
            .read()
            .expect("MemoryOrdersApi: recorded lock poisoned")
            .clone()
    }

    /// Number of `update_item_status` calls made so far.
    pub fn update_count(&self) -> usize {
        self.recorded_updates
            .read()
            .expect("MemoryOrdersApi: recorded lock poisoned")
            .len()
    }
}

impl Default for MemoryOrdersApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrdersApi for MemoryOrdersApi {
    async fn daily_orders(
        &self,
        _date: NaiveDate,
        page: u32,
        size: u32,
    ) -> Result<DailyPage, ApiError> {
        let orders = self
            .orders
            .read()
            .expect("MemoryOrdersApi: orders lock poisoned");
        let start = (page as usize) * (size as usize);
        let end = (start + size as usize).min(orders.len());
        let slice = if start < orders.len() {
            orders[start..end].to_vec()
        } else {
            Vec::new()
        };
        Ok(DailyPage {
            last: end >= orders.len(),
            orders: slice,
        })
    }

    async fn update_item_status(
        &self,
        order_code: &str,
        order_menu_id: i64,
        status: MenuStatus,
    ) -> Result<(), ApiError> {
        self.recorded_updates
            .write()
            .expect("MemoryOrdersApi: recorded lock poisoned")
            .push((order_code.to_string(), order_menu_id, status));

        let scripted_failure = self
            .fail_updates_for
            .read()
            .expect("MemoryOrdersApi: fail lock poisoned")
            .contains(&order_menu_id);
        if scripted_failure {
            return Err(ApiError::Status {
                status: 500,
                body: format!("update rejected for menu {order_menu_id}"),
            });
        }

        let mut orders = self
            .orders
            .write()
            .expect("MemoryOrdersApi: orders lock poisoned");
        for order in orders.iter_mut() {
            if order.order_code == order_code {
                for item in order.items.iter_mut() {
                    if item.order_menu_id == order_menu_id {
                        item.status = status;
                        return Ok(());
                    }
                }
            }
        }
        Err(ApiError::Status {
            status: 404,
            body: format!("no menu {order_menu_id} on order {order_code}"),
        })
    }
}

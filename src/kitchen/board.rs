//! Kitchen board state.
//!
//! Holds the projection the kitchen display renders: today's orders in
//! three derived lanes, plus short-lived highlights for orders that just
//! arrived over the notification channel. The board is a pure consumer
//! of the REST collaborator; every push notification triggers a full
//! refetch rather than a local merge, so the projection can only drift
//! from the server between a push and the refetch completing.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::channel::{NotificationChannel, SubscriptionToken};
use crate::domain::{
    ApiError, BoardError, KitchenLane, KitchenOrder, MenuStatus, OrderNotification,
};
use crate::ports::OrdersApi;

/// How long a freshly arrived order stays highlighted.
pub const HIGHLIGHT_TTL: Duration = Duration::from_millis(5_000);

struct BoardState {
    orders: Vec<KitchenOrder>,
    highlighted: HashSet<String>,
    /// Every order code ever shown or notified; only codes absent from
    /// this set get the new-order highlight.
    seen: HashSet<String>,
    notice: Option<String>,
}

pub struct KitchenBoard {
    api: Arc<dyn OrdersApi>,
    page_size: u32,
    state: RwLock<BoardState>,
}

impl KitchenBoard {
    pub fn new(api: Arc<dyn OrdersApi>, page_size: u32) -> Self {
        Self {
            api,
            page_size,
            state: RwLock::new(BoardState {
                orders: Vec::new(),
                highlighted: HashSet::new(),
                seen: HashSet::new(),
                notice: None,
            }),
        }
    }

    /// Rebuild the projection from the server's daily listing, paging
    /// until the final page.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        let today = Utc::now().date_naive();
        let mut orders = Vec::new();
        let mut page = 0;
        loop {
            let batch = self.api.daily_orders(today, page, self.page_size).await?;
            orders.extend(batch.orders.into_iter().map(KitchenOrder::from));
            if batch.last {
                break;
            }
            page += 1;
        }
        debug!(orders = orders.len(), "board refreshed");
        let mut state = self.state.write().await;
        for order in &orders {
            state.seen.insert(order.order_code.clone());
        }
        state.orders = orders;
        Ok(())
    }

    /// React to a pushed order notification: highlight the order for
    /// [`HIGHLIGHT_TTL`] if its code was never seen before, and refetch
    /// the whole listing either way.
    ///
    /// Gating on the seen set keeps status-change pushes about orders
    /// already on the board from re-highlighting them, and guarantees at
    /// most one expiry task per code.
    pub async fn on_notification(self: &Arc<Self>, notification: OrderNotification) {
        info!(order = %notification.order_code, "order notification received");
        let first_sighting = {
            let mut state = self.state.write().await;
            let first_sighting = state.seen.insert(notification.order_code.clone());
            if first_sighting {
                state.highlighted.insert(notification.order_code.clone());
            }
            first_sighting
        };
        if first_sighting {
            let this = Arc::clone(self);
            let code = notification.order_code.clone();
            tokio::spawn(async move {
                tokio::time::sleep(HIGHLIGHT_TTL).await;
                this.state.write().await.highlighted.remove(&code);
            });
        }
        if let Err(err) = self.refresh().await {
            warn!(%err, "refetch after notification failed");
            self.state.write().await.notice = Some(format!("failed to refresh orders: {err}"));
        }
    }

    /// Move every item of an order to the status implied by the target
    /// lane.
    ///
    /// The projection is mutated before any network call so the display
    /// reacts instantly; if any of the per-item updates fails, the whole
    /// order is restored to its pre-drag state and a notice is left.
    pub async fn move_order(&self, order_code: &str, lane: KitchenLane) -> Result<(), BoardError> {
        let Some(target) = lane.target_status() else {
            self.state.write().await.notice =
                Some(BoardError::PendingLaneRejected.to_string());
            return Err(BoardError::PendingLaneRejected);
        };

        // Optimistic apply under the lock; snapshot for rollback.
        let snapshot: Vec<(i64, MenuStatus)> = {
            let mut state = self.state.write().await;
            let order = state
                .orders
                .iter_mut()
                .find(|order| order.order_code == order_code)
                .ok_or_else(|| BoardError::UnknownOrder(order_code.to_string()))?;
            let snapshot = order
                .items
                .iter()
                .map(|item| (item.order_menu_id, item.status))
                .collect();
            for item in order.items.iter_mut() {
                item.status = target;
            }
            snapshot
        };

        // One confirming call per item, including items already at the
        // target status.
        for (order_menu_id, _) in &snapshot {
            if let Err(err) = self
                .api
                .update_item_status(order_code, *order_menu_id, target)
                .await
            {
                warn!(order = order_code, menu = order_menu_id, %err, "order move failed, rolling back");
                self.rollback(order_code, &snapshot).await;
                let board_err = BoardError::UpdateFailed(err.to_string());
                self.state.write().await.notice = Some(board_err.to_string());
                return Err(board_err);
            }
        }
        Ok(())
    }

    /// Move a single item to the status implied by the target lane.
    ///
    /// Same optimistic-then-confirm shape as [`move_order`], scoped to
    /// one item. Dropping into the lane the item already maps to is a
    /// no-op with no network call.
    ///
    /// [`move_order`]: KitchenBoard::move_order
    pub async fn move_item(
        &self,
        order_code: &str,
        order_menu_id: i64,
        lane: KitchenLane,
    ) -> Result<(), BoardError> {
        let Some(target) = lane.target_status() else {
            self.state.write().await.notice =
                Some(BoardError::PendingLaneRejected.to_string());
            return Err(BoardError::PendingLaneRejected);
        };

        let previous = {
            let mut state = self.state.write().await;
            let order = state
                .orders
                .iter_mut()
                .find(|order| order.order_code == order_code)
                .ok_or_else(|| BoardError::UnknownOrder(order_code.to_string()))?;
            let item = order
                .items
                .iter_mut()
                .find(|item| item.order_menu_id == order_menu_id)
                .ok_or_else(|| BoardError::UnknownItem {
                    order_code: order_code.to_string(),
                    order_menu_id,
                })?;
            let previous = item.status;
            item.status = target;
            previous
        };
        if previous == target {
            return Ok(());
        }

        if let Err(err) = self
            .api
            .update_item_status(order_code, order_menu_id, target)
            .await
        {
            warn!(order = order_code, menu = order_menu_id, %err, "item move failed, rolling back");
            self.rollback(order_code, &[(order_menu_id, previous)]).await;
            let board_err = BoardError::UpdateFailed(err.to_string());
            self.state.write().await.notice = Some(board_err.to_string());
            return Err(board_err);
        }
        Ok(())
    }

    async fn rollback(&self, order_code: &str, snapshot: &[(i64, MenuStatus)]) {
        let mut state = self.state.write().await;
        let Some(order) = state
            .orders
            .iter_mut()
            .find(|order| order.order_code == order_code)
        else {
            return;
        };
        for (order_menu_id, status) in snapshot {
            if let Some(item) = order
                .items
                .iter_mut()
                .find(|item| item.order_menu_id == *order_menu_id)
            {
                item.status = *status;
            }
        }
    }

    /// Wire the board to a channel: every pushed notification for the
    /// merchant runs [`on_notification`].
    ///
    /// [`on_notification`]: KitchenBoard::on_notification
    pub async fn attach(
        self: &Arc<Self>,
        channel: &NotificationChannel,
        merchant_id: Option<u64>,
    ) -> SubscriptionToken {
        let this = Arc::clone(self);
        channel
            .subscribe_to_order_notifications(merchant_id, move |notification| {
                let board = Arc::clone(&this);
                tokio::spawn(async move {
                    board.on_notification(notification).await;
                });
            })
            .await
    }

    // === Read Accessors ===

    pub async fn orders(&self) -> Vec<KitchenOrder> {
        self.state.read().await.orders.clone()
    }

    /// Orders currently in one lane, in listing order.
    pub async fn lane(&self, lane: KitchenLane) -> Vec<KitchenOrder> {
        self.state
            .read()
            .await
            .orders
            .iter()
            .filter(|order| order.lane() == lane)
            .cloned()
            .collect()
    }

    pub async fn is_highlighted(&self, order_code: &str) -> bool {
        self.state.read().await.highlighted.contains(order_code)
    }

    /// Consume the pending user-visible notice, if any.
    pub async fn take_notice(&self) -> Option<String> {
        self.state.write().await.notice.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryOrdersApi;
    use crate::domain::{OrderDetail, OrderItemDetail, OrderStatus};

    fn seeded_board(orders: Vec<OrderDetail>) -> (Arc<KitchenBoard>, Arc<MemoryOrdersApi>) {
        let api = Arc::new(MemoryOrdersApi::new());
        api.seed(orders);
        let board = Arc::new(KitchenBoard::new(
            Arc::clone(&api) as Arc<dyn OrdersApi>,
            50,
        ));
        (board, api)
    }

    fn order(code: &str, statuses: &[MenuStatus]) -> OrderDetail {
        OrderDetail {
            order_code: code.to_string(),
            table_number: 7,
            order_time: Utc::now(),
            order_status: OrderStatus::Paid,
            items: statuses
                .iter()
                .enumerate()
                .map(|(i, status)| OrderItemDetail {
                    order_menu_id: (i + 1) as i64,
                    menu_name: format!("menu-{}", i + 1),
                    quantity: 1,
                    options: Vec::new(),
                    status: *status,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn refresh_rebuilds_lanes() {
        let (board, _api) = seeded_board(vec![
            order("A", &[MenuStatus::Ordered, MenuStatus::Ordered]),
            order("B", &[MenuStatus::Served, MenuStatus::Ordered]),
            order("C", &[MenuStatus::Served]),
        ]);
        board.refresh().await.unwrap();

        assert_eq!(board.lane(KitchenLane::Pending).await.len(), 1);
        assert_eq!(board.lane(KitchenLane::Cooking).await.len(), 1);
        assert_eq!(board.lane(KitchenLane::Completed).await.len(), 1);
    }

    #[tokio::test]
    async fn pending_lane_drop_is_rejected_with_no_rest_call() {
        let (board, api) = seeded_board(vec![order("A", &[MenuStatus::Served])]);
        board.refresh().await.unwrap();

        let err = board.move_order("A", KitchenLane::Pending).await.unwrap_err();
        assert_eq!(err, BoardError::PendingLaneRejected);
        assert_eq!(api.update_count(), 0);
        assert!(board.take_notice().await.is_some());

        let err = board
            .move_item("A", 1, KitchenLane::Pending)
            .await
            .unwrap_err();
        assert_eq!(err, BoardError::PendingLaneRejected);
        assert_eq!(api.update_count(), 0);
    }

    #[tokio::test]
    async fn successful_item_move_sticks() {
        let (board, api) = seeded_board(vec![order("A", &[MenuStatus::Ordered])]);
        board.refresh().await.unwrap();

        board.move_item("A", 1, KitchenLane::Completed).await.unwrap();

        assert_eq!(board.lane(KitchenLane::Completed).await.len(), 1);
        assert_eq!(
            api.recorded_updates(),
            vec![("A".to_string(), 1, MenuStatus::Served)]
        );
        assert!(board.take_notice().await.is_none());
    }

    #[tokio::test]
    async fn failed_item_move_rolls_back_and_leaves_notice() {
        let (board, api) = seeded_board(vec![order("A", &[MenuStatus::Ordered])]);
        api.fail_update_for(1);
        board.refresh().await.unwrap();

        let err = board
            .move_item("A", 1, KitchenLane::Completed)
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::UpdateFailed(_)));

        let orders = board.orders().await;
        assert_eq!(orders[0].items[0].status, MenuStatus::Ordered);
        assert!(board.take_notice().await.is_some());
    }

    #[tokio::test]
    async fn partial_order_move_failure_rolls_back_every_item() {
        let (board, api) = seeded_board(vec![order(
            "A",
            &[MenuStatus::Ordered, MenuStatus::Ordered, MenuStatus::Ordered],
        )]);
        api.fail_update_for(2);
        board.refresh().await.unwrap();

        let err = board
            .move_order("A", KitchenLane::Completed)
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::UpdateFailed(_)));

        // Item 1 succeeded remotely, item 2 failed; locally every item
        // is back at its pre-drag status.
        let orders = board.orders().await;
        assert!(orders[0]
            .items
            .iter()
            .all(|item| item.status == MenuStatus::Ordered));
        assert_eq!(orders[0].lane(), KitchenLane::Pending);
    }

    #[tokio::test]
    async fn order_move_issues_one_call_per_item() {
        // Cooking order: one item already served, one still ordered.
        let (board, api) = seeded_board(vec![order(
            "A",
            &[MenuStatus::Served, MenuStatus::Ordered],
        )]);
        board.refresh().await.unwrap();

        board.move_order("A", KitchenLane::Completed).await.unwrap();

        assert_eq!(
            api.recorded_updates(),
            vec![
                ("A".to_string(), 1, MenuStatus::Served),
                ("A".to_string(), 2, MenuStatus::Served),
            ]
        );
    }

    #[tokio::test]
    async fn unknown_targets_are_rejected() {
        let (board, _api) = seeded_board(vec![order("A", &[MenuStatus::Ordered])]);
        board.refresh().await.unwrap();

        assert_eq!(
            board.move_order("Z", KitchenLane::Completed).await.unwrap_err(),
            BoardError::UnknownOrder("Z".to_string())
        );
        assert_eq!(
            board.move_item("A", 99, KitchenLane::Completed).await.unwrap_err(),
            BoardError::UnknownItem {
                order_code: "A".to_string(),
                order_menu_id: 99,
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn notification_highlights_order_until_ttl_expires() {
        let (board, api) = seeded_board(Vec::new());
        let notification: OrderNotification = serde_json::from_str(
            r#"{"orderCode":"NEW-1","merchantId":1,"tableNumber":2,"totalAmount":9000,
                "orderStatus":"PAID","paymentStatus":"COMPLETED",
                "timestamp":"2026-08-30T09:30:00","message":"new order"}"#,
        )
        .unwrap();
        api.seed(vec![order("NEW-1", &[MenuStatus::Ordered])]);

        board.on_notification(notification).await;
        assert!(board.is_highlighted("NEW-1").await);
        assert_eq!(board.orders().await.len(), 1);

        tokio::time::sleep(HIGHLIGHT_TTL + Duration::from_millis(100)).await;
        assert!(!board.is_highlighted("NEW-1").await);
    }

    #[tokio::test(start_paused = true)]
    async fn known_orders_are_not_rehighlighted() {
        let (board, api) = seeded_board(vec![order("A", &[MenuStatus::Ordered])]);
        board.refresh().await.unwrap();

        // Status-change push about an order already on the board.
        let about_known: OrderNotification = serde_json::from_str(
            r#"{"orderCode":"A","merchantId":1,"tableNumber":2,"totalAmount":9000,
                "orderStatus":"PAID","paymentStatus":"COMPLETED",
                "timestamp":"2026-08-30T09:45:00","message":"payment completed"}"#,
        )
        .unwrap();
        board.on_notification(about_known).await;
        assert!(!board.is_highlighted("A").await);

        // A duplicate push about a genuinely new order must not spawn a
        // second expiry task that could unflag the highlight early.
        api.seed(vec![
            order("A", &[MenuStatus::Ordered]),
            order("B", &[MenuStatus::Ordered]),
        ]);
        let about_new: OrderNotification = serde_json::from_str(
            r#"{"orderCode":"B","merchantId":1,"tableNumber":3,"totalAmount":4000,
                "orderStatus":"PAID","paymentStatus":"COMPLETED",
                "timestamp":"2026-08-30T09:46:00","message":"new order"}"#,
        )
        .unwrap();
        board.on_notification(about_new.clone()).await;
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        board.on_notification(about_new).await;

        tokio::time::sleep(Duration::from_millis(2_400)).await;
        assert!(board.is_highlighted("B").await);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!board.is_highlighted("B").await);
    }

    #[tokio::test]
    async fn refresh_pages_until_last() {
        let api = Arc::new(MemoryOrdersApi::new());
        api.seed((0..5).map(|i| order(&format!("O{i}"), &[MenuStatus::Ordered])).collect());
        let board = KitchenBoard::new(Arc::clone(&api) as Arc<dyn OrdersApi>, 2);

        board.refresh().await.unwrap();
        assert_eq!(board.orders().await.len(), 5);
    }
}

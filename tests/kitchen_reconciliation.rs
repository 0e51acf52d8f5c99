//! Kitchen board wired to the channel: push-driven reconciliation.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use orderdeck_live::adapters::memory::{MemoryOrdersApi, MemoryTransport};
use orderdeck_live::channel::NotificationChannel;
use orderdeck_live::config::BrokerConfig;
use orderdeck_live::domain::{
    KitchenLane, MenuStatus, OrderDetail, OrderItemDetail, OrderStatus, Topic,
};
use orderdeck_live::kitchen::{KitchenBoard, HIGHLIGHT_TTL};
use orderdeck_live::ports::{BrokerTransport, OrdersApi};

const MERCHANT_ID: u64 = 42;

fn notification_for(order_code: &str) -> String {
    format!(
        r#"{{"orderCode":"{order_code}","merchantId":{MERCHANT_ID},"tableNumber":4,
            "totalAmount":15000,"orderStatus":"PAID","paymentStatus":"COMPLETED",
            "timestamp":"2026-08-30T12:15:00","message":"신규 주문"}}"#
    )
}

fn order(code: &str, statuses: &[MenuStatus]) -> OrderDetail {
    OrderDetail {
        order_code: code.to_string(),
        table_number: 4,
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

struct Fixture {
    broker: Arc<MemoryTransport>,
    channel: NotificationChannel,
    api: Arc<MemoryOrdersApi>,
    board: Arc<KitchenBoard>,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn wired_fixture() -> Fixture {
    init_tracing();
    let broker = Arc::new(MemoryTransport::new());
    let config = BrokerConfig::default();
    let channel =
        NotificationChannel::new(Arc::clone(&broker) as Arc<dyn BrokerTransport>, &config);
    let api = Arc::new(MemoryOrdersApi::new());
    let board = Arc::new(KitchenBoard::new(
        Arc::clone(&api) as Arc<dyn OrdersApi>,
        50,
    ));
    channel.init().await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    board.attach(&channel, Some(MERCHANT_ID)).await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    Fixture {
        broker,
        channel,
        api,
        board,
    }
}

#[tokio::test(start_paused = true)]
async fn push_triggers_a_full_refetch() {
    let fx = wired_fixture().await;
    fx.api.seed(vec![order("OLD-1", &[MenuStatus::Ordered])]);
    fx.board.refresh().await.unwrap();
    assert_eq!(fx.board.orders().await.len(), 1);

    // New order lands server-side, then the push arrives.
    fx.api.seed(vec![
        order("OLD-1", &[MenuStatus::Ordered]),
        order("NEW-1", &[MenuStatus::Ordered, MenuStatus::Ordered]),
    ]);
    assert!(fx.broker.publish(
        &Topic::merchant_orders(MERCHANT_ID),
        notification_for("NEW-1"),
    ));
    tokio::time::sleep(Duration::from_millis(50)).await;

    let orders = fx.board.orders().await;
    assert_eq!(orders.len(), 2);
    assert!(orders.iter().any(|o| o.order_code == "NEW-1"));

    fx.channel.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn pushed_order_is_highlighted_until_ttl_expires() {
    let fx = wired_fixture().await;
    fx.api.seed(vec![order("NEW-1", &[MenuStatus::Ordered])]);

    assert!(fx.broker.publish(
        &Topic::merchant_orders(MERCHANT_ID),
        notification_for("NEW-1"),
    ));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(fx.board.is_highlighted("NEW-1").await);

    tokio::time::sleep(HIGHLIGHT_TTL + Duration::from_millis(100)).await;
    assert!(!fx.board.is_highlighted("NEW-1").await);

    fx.channel.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn push_reflects_remote_status_changes_even_for_known_orders() {
    let fx = wired_fixture().await;
    fx.api.seed(vec![order("A", &[MenuStatus::Ordered])]);
    fx.board.refresh().await.unwrap();
    assert_eq!(fx.board.lane(KitchenLane::Pending).await.len(), 1);

    // Another terminal served the item; a push about anything triggers
    // the refetch that picks it up.
    fx.api.seed(vec![order("A", &[MenuStatus::Served])]);
    assert!(fx.broker.publish(
        &Topic::merchant_orders(MERCHANT_ID),
        notification_for("A"),
    ));
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(fx.board.lane(KitchenLane::Completed).await.len(), 1);
    // A push about an order the board already shows carries no
    // new-order highlight.
    assert!(!fx.board.is_highlighted("A").await);

    fx.channel.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn drag_failure_rolls_back_through_the_wired_stack() {
    let fx = wired_fixture().await;
    fx.api.seed(vec![order("A", &[MenuStatus::Ordered, MenuStatus::Ordered])]);
    fx.board.refresh().await.unwrap();
    fx.api.fail_update_for(2);

    let result = fx.board.move_order("A", KitchenLane::Completed).await;
    assert!(result.is_err());

    let orders = fx.board.orders().await;
    assert!(orders[0]
        .items
        .iter()
        .all(|item| item.status == MenuStatus::Ordered));
    assert!(fx.board.take_notice().await.is_some());

    fx.channel.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn pending_lane_drop_makes_no_rest_calls() {
    let fx = wired_fixture().await;
    fx.api.seed(vec![order("A", &[MenuStatus::Served])]);
    fx.board.refresh().await.unwrap();

    let result = fx.board.move_order("A", KitchenLane::Pending).await;
    assert!(result.is_err());
    assert_eq!(fx.api.update_count(), 0);

    fx.channel.shutdown().await;
}

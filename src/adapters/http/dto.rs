//! Wire shapes of the orders REST API.
//!
//! camelCase JSON, mapped into domain types at the adapter boundary so
//! the rest of the crate never sees serde artifacts.

use serde::{Deserialize, Serialize};

use crate::domain::{
    parse_timestamp, DailyPage, MenuStatus, OrderDetail, OrderItemDetail, OrderStatus,
};

/// `GET /orders/daily` response page.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyOrdersResponse {
    pub content: Vec<OrderDto>,
    /// True on the final page.
    #[serde(default)]
    pub last: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDto {
    pub order_code: String,
    pub table_number: u32,
    /// Parsed defensively; an unparseable value becomes "now".
    pub order_time: String,
    pub order_status: OrderStatus,
    #[serde(default)]
    pub menus: Vec<OrderMenuDto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderMenuDto {
    pub order_menu_id: i64,
    pub menu_name: String,
    pub quantity: u32,
    #[serde(default)]
    pub options: Vec<String>,
    pub menu_status: MenuStatus,
}

/// `PUT /orders/{orderCode}/status` request body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
    pub order_menu_id: i64,
    pub status: MenuStatus,
}

impl From<DailyOrdersResponse> for DailyPage {
    fn from(response: DailyOrdersResponse) -> Self {
        DailyPage {
            last: response.last,
            orders: response.content.into_iter().map(OrderDetail::from).collect(),
        }
    }
}

impl From<OrderDto> for OrderDetail {
    fn from(dto: OrderDto) -> Self {
        OrderDetail {
            order_code: dto.order_code,
            table_number: dto.table_number,
            order_time: parse_timestamp(&dto.order_time),
            order_status: dto.order_status,
            items: dto.menus.into_iter().map(OrderItemDetail::from).collect(),
        }
    }
}

impl From<OrderMenuDto> for OrderItemDetail {
    fn from(dto: OrderMenuDto) -> Self {
        OrderItemDetail {
            order_menu_id: dto.order_menu_id,
            menu_name: dto.menu_name,
            quantity: dto.quantity,
            options: dto.options,
            status: dto.menu_status,
        }
    }
}

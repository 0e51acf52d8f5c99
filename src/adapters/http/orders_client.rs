//! HTTP implementation of the OrdersApi port.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;

use crate::config::ApiConfig;
use crate::domain::{ApiError, DailyPage, MenuStatus};
use crate::ports::OrdersApi;

use super::dto::{DailyOrdersResponse, StatusUpdateRequest};

/// reqwest-backed client for the orders REST collaborator.
pub struct HttpOrdersApi {
    client: Client,
    config: ApiConfig,
}

impl HttpOrdersApi {
    /// Create a client with the configured request timeout.
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ApiError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn daily_url(&self) -> String {
        format!("{}/orders/daily", self.config.base_url)
    }

    fn status_url(&self, order_code: &str) -> String {
        format!("{}/orders/{}/status", self.config.base_url, order_code)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl OrdersApi for HttpOrdersApi {
    async fn daily_orders(
        &self,
        date: NaiveDate,
        page: u32,
        size: u32,
    ) -> Result<DailyPage, ApiError> {
        let response = self
            .client
            .get(self.daily_url())
            .query(&[
                ("date", date.format("%Y-%m-%d").to_string()),
                ("page", page.to_string()),
                ("size", size.to_string()),
                ("sort", "orderTime,desc".to_string()),
            ])
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        let response = check_status(response).await?;
        let parsed: DailyOrdersResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(DailyPage::from(parsed))
    }

    async fn update_item_status(
        &self,
        order_code: &str,
        order_menu_id: i64,
        status: MenuStatus,
    ) -> Result<(), ApiError> {
        let response = self
            .client
            .put(self.status_url(order_code))
            .json(&StatusUpdateRequest {
                order_menu_id,
                status,
            })
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        check_status(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_built_from_base() {
        let api = HttpOrdersApi::new(ApiConfig {
            base_url: "https://api.orderdeck.example/api".to_string(),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(
            api.daily_url(),
            "https://api.orderdeck.example/api/orders/daily"
        );
        assert_eq!(
            api.status_url("A1"),
            "https://api.orderdeck.example/api/orders/A1/status"
        );
    }
}

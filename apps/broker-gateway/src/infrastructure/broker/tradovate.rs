//! Tradovate adapter (futures).
//!
//! Auth: every call first exchanges the stored credentials for a short-lived
//! access token (`accesstokenrequest`), then sends it as a bearer header.
//! Credential fields: `api_key` (username), `api_secret` (password).

use async_trait::async_trait;
use serde_json::Value;

use crate::application::ports::{BrokerAdapter, BrokerApiError, OrderTicket, OrderTicketRequest};
use crate::domain::broker::Credentials;
use crate::domain::order::{OrderSide, OrderStatus, OrderStatusUpdate, OrderType};

use super::http::{VendorHttpClient, decimal_field, string_field};

/// Tradovate broker adapter.
#[derive(Debug, Clone)]
pub struct TradovateAdapter {
    base_url: String,
    credentials: Credentials,
    http: VendorHttpClient,
}

impl TradovateAdapter {
    /// Create an adapter bound to one credential set.
    #[must_use]
    pub const fn new(base_url: String, credentials: Credentials, http: VendorHttpClient) -> Self {
        Self {
            base_url,
            credentials,
            http,
        }
    }

    /// Exchange the stored credentials for an access token.
    async fn access_token(&self) -> Result<String, BrokerApiError> {
        let name = self.credentials.require("api_key")?;
        let password = self.credentials.require("api_secret")?;

        let body = serde_json::json!({ "name": name, "password": password });
        let response = self
            .http
            .execute(
                self.http
                    .inner()
                    .post(format!("{}/auth/accesstokenrequest", self.base_url))
                    .json(&body),
            )
            .await?;

        string_field(&response, "accessToken").ok_or(BrokerApiError::AuthRejected)
    }

    async fn authed(
        &self,
        method: reqwest::Method,
        path: &str,
    ) -> Result<reqwest::RequestBuilder, BrokerApiError> {
        let token = self.access_token().await?;
        Ok(self
            .http
            .inner()
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(token))
    }

    const fn map_side(side: OrderSide) -> &'static str {
        match side {
            OrderSide::Buy => "Buy",
            OrderSide::Sell => "Sell",
        }
    }

    const fn map_order_type(order_type: OrderType) -> &'static str {
        match order_type {
            OrderType::Market => "Market",
            OrderType::Limit => "Limit",
            OrderType::Stop => "Stop",
            OrderType::StopLimit => "StopLimit",
        }
    }

    fn map_status(raw: &str) -> OrderStatus {
        match raw.to_lowercase().as_str() {
            "pendingnew" => OrderStatus::Submitted,
            "working" | "suspended" => OrderStatus::Accepted,
            "completed" | "filled" => OrderStatus::Filled,
            "canceled" => OrderStatus::Canceled,
            "rejected" => OrderStatus::Rejected,
            "expired" => OrderStatus::Expired,
            other => {
                tracing::warn!(vendor = "tradovate", status = other, "unrecognized vendor status");
                OrderStatus::Pending
            }
        }
    }

    fn update_from(payload: Value) -> OrderStatusUpdate {
        let status = string_field(&payload, "ordStatus")
            .map_or(OrderStatus::Pending, |s| Self::map_status(&s));
        let filled = decimal_field(&payload, "filledQty").filter(|q| !q.is_zero());
        OrderStatusUpdate {
            status: if status == OrderStatus::Accepted && filled.is_some() {
                OrderStatus::PartiallyFilled
            } else {
                status
            },
            filled_quantity: filled,
            filled_price: decimal_field(&payload, "avgPx").filter(|p| !p.is_zero()),
            commission: None,
            raw: payload,
        }
    }
}

#[async_trait]
impl BrokerAdapter for TradovateAdapter {
    async fn validate_credentials(&self) -> Result<bool, BrokerApiError> {
        match self.access_token().await {
            Ok(_) => Ok(true),
            Err(BrokerApiError::AuthRejected) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn submit_order(
        &self,
        request: &OrderTicketRequest,
    ) -> Result<OrderTicket, BrokerApiError> {
        let mut body = serde_json::json!({
            "action": Self::map_side(request.side),
            "symbol": request.symbol,
            "orderQty": request.quantity.to_string(),
            "orderType": Self::map_order_type(request.order_type),
            "isAutomated": true,
        });
        if let Some(price) = request.limit_price {
            body["price"] = Value::String(price.to_string());
        }
        if let Some(stop) = request.stop_price {
            body["stopPrice"] = Value::String(stop.to_string());
        }

        let response = self
            .http
            .execute(
                self.authed(reqwest::Method::POST, "/order/placeorder")
                    .await?
                    .json(&body),
            )
            .await?;

        let vendor_order_id = response
            .get("orderId")
            .map(|id| match id {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .ok_or_else(|| BrokerApiError::Decode("order response missing orderId".to_string()))?;

        tracing::info!(
            vendor = "tradovate",
            vendor_order_id,
            symbol = %request.symbol,
            "order submitted"
        );

        Ok(OrderTicket {
            vendor_order_id,
            raw: response,
        })
    }

    async fn get_order_status(
        &self,
        vendor_order_id: &str,
    ) -> Result<OrderStatusUpdate, BrokerApiError> {
        let request = self
            .authed(
                reqwest::Method::GET,
                &format!("/order/item?id={vendor_order_id}"),
            )
            .await?;
        let payload = self.http.execute(request).await?;
        Ok(Self::update_from(payload))
    }

    async fn cancel_order(&self, vendor_order_id: &str) -> Result<bool, BrokerApiError> {
        let body = serde_json::json!({ "orderId": vendor_order_id });
        match self
            .http
            .execute(
                self.authed(reqwest::Method::POST, "/order/cancelorder")
                    .await?
                    .json(&body),
            )
            .await
        {
            Ok(_) => Ok(true),
            Err(BrokerApiError::Rejected(_) | BrokerApiError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn get_account_info(&self) -> Result<Value, BrokerApiError> {
        let request = self.authed(reqwest::Method::GET, "/account/list").await?;
        self.http.execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_table_covers_tradovate_vocabulary() {
        assert_eq!(
            TradovateAdapter::map_status("PendingNew"),
            OrderStatus::Submitted
        );
        assert_eq!(TradovateAdapter::map_status("Working"), OrderStatus::Accepted);
        assert_eq!(TradovateAdapter::map_status("Filled"), OrderStatus::Filled);
        assert_eq!(
            TradovateAdapter::map_status("Completed"),
            OrderStatus::Filled
        );
        assert_eq!(
            TradovateAdapter::map_status("Canceled"),
            OrderStatus::Canceled
        );
        assert_eq!(
            TradovateAdapter::map_status("Rejected"),
            OrderStatus::Rejected
        );
        assert_eq!(TradovateAdapter::map_status("Expired"), OrderStatus::Expired);
        assert_eq!(TradovateAdapter::map_status("Parked"), OrderStatus::Pending);
    }

    #[test]
    fn working_order_with_fills_is_partial() {
        let payload = serde_json::json!({
            "ordStatus": "Working",
            "filledQty": "2",
            "avgPx": "4512.25"
        });
        let update = TradovateAdapter::update_from(payload);
        assert_eq!(update.status, OrderStatus::PartiallyFilled);
        assert_eq!(update.filled_price.unwrap().to_string(), "4512.25");
    }
}

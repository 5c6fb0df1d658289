//! Alpaca Markets adapter (stocks).
//!
//! Auth: `APCA-API-KEY-ID` / `APCA-API-SECRET-KEY` headers on every request,
//! or a bearer token for OAuth-linked accounts.
//! Credential fields: `api_key` + `api_secret`, or `access_token`.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::application::ports::{BrokerAdapter, BrokerApiError, OrderTicket, OrderTicketRequest};
use crate::domain::broker::Credentials;
use crate::domain::order::{OrderSide, OrderStatus, OrderStatusUpdate, OrderType};

use super::http::{VendorHttpClient, decimal_field, string_field};

/// Alpaca broker adapter.
#[derive(Debug, Clone)]
pub struct AlpacaAdapter {
    base_url: String,
    credentials: Credentials,
    http: VendorHttpClient,
}

/// Alpaca order request body.
#[derive(Debug, Serialize)]
struct AlpacaOrderRequest {
    symbol: String,
    qty: String,
    side: &'static str,
    #[serde(rename = "type")]
    order_type: &'static str,
    time_in_force: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_price: Option<String>,
}

impl AlpacaAdapter {
    /// Create an adapter bound to one credential set.
    #[must_use]
    pub const fn new(base_url: String, credentials: Credentials, http: VendorHttpClient) -> Self {
        Self {
            base_url,
            credentials,
            http,
        }
    }

    fn request(
        &self,
        method: reqwest::Method,
        path: &str,
    ) -> Result<reqwest::RequestBuilder, BrokerApiError> {
        let builder = self
            .http
            .inner()
            .request(method, format!("{}{}", self.base_url, path));

        // OAuth-derived connections carry a bearer token instead of the
        // key/secret header pair.
        if let Some(token) = self.credentials.get("access_token") {
            return Ok(builder.bearer_auth(token));
        }
        let key = self.credentials.require("api_key")?;
        let secret = self.credentials.require("api_secret")?;
        Ok(builder
            .header("APCA-API-KEY-ID", key)
            .header("APCA-API-SECRET-KEY", secret))
    }

    const fn map_side(side: OrderSide) -> &'static str {
        match side {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        }
    }

    /// Alpaca supports every internal order type one-to-one.
    const fn map_order_type(order_type: OrderType) -> &'static str {
        match order_type {
            OrderType::Market => "market",
            OrderType::Limit => "limit",
            OrderType::Stop => "stop",
            OrderType::StopLimit => "stop_limit",
        }
    }

    fn map_status(raw: &str) -> OrderStatus {
        match raw.to_lowercase().as_str() {
            "new" => OrderStatus::Submitted,
            "accepted" | "pending_new" => OrderStatus::Accepted,
            "partially_filled" => OrderStatus::PartiallyFilled,
            "filled" => OrderStatus::Filled,
            "canceled" | "pending_cancel" => OrderStatus::Canceled,
            "rejected" => OrderStatus::Rejected,
            "expired" | "done_for_day" => OrderStatus::Expired,
            other => {
                tracing::warn!(vendor = "alpaca", status = other, "unrecognized vendor status");
                OrderStatus::Pending
            }
        }
    }

    fn update_from(payload: Value) -> OrderStatusUpdate {
        let status = string_field(&payload, "status")
            .map_or(OrderStatus::Pending, |s| Self::map_status(&s));
        OrderStatusUpdate {
            status,
            filled_quantity: decimal_field(&payload, "filled_qty"),
            filled_price: decimal_field(&payload, "filled_avg_price"),
            commission: None,
            raw: payload,
        }
    }
}

#[async_trait]
impl BrokerAdapter for AlpacaAdapter {
    async fn validate_credentials(&self) -> Result<bool, BrokerApiError> {
        let request = self.request(reqwest::Method::GET, "/v2/account")?;
        match self.http.execute(request).await {
            Ok(account) => Ok(account
                .get("account_number")
                .is_some_and(|v| !v.is_null())),
            Err(BrokerApiError::AuthRejected) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn submit_order(
        &self,
        request: &OrderTicketRequest,
    ) -> Result<OrderTicket, BrokerApiError> {
        let body = AlpacaOrderRequest {
            symbol: request.symbol.clone(),
            qty: request.quantity.to_string(),
            side: Self::map_side(request.side),
            order_type: Self::map_order_type(request.order_type),
            time_in_force: "day",
            limit_price: request.limit_price.map(|p| p.to_string()),
            stop_price: request.stop_price.map(|p| p.to_string()),
        };

        let response = self
            .http
            .execute(self.request(reqwest::Method::POST, "/v2/orders")?.json(&body))
            .await?;

        let vendor_order_id = string_field(&response, "id")
            .ok_or_else(|| BrokerApiError::Decode("order response missing id".to_string()))?;

        tracing::info!(
            vendor = "alpaca",
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
        let request = self.request(reqwest::Method::GET, &format!("/v2/orders/{vendor_order_id}"))?;
        let payload = self.http.execute(request).await?;
        Ok(Self::update_from(payload))
    }

    async fn cancel_order(&self, vendor_order_id: &str) -> Result<bool, BrokerApiError> {
        let request =
            self.request(reqwest::Method::DELETE, &format!("/v2/orders/{vendor_order_id}"))?;
        match self.http.execute(request).await {
            Ok(_) => Ok(true),
            // Alpaca answers 422 for an order past cancelation and 404 for an
            // unknown handle; both mean there is nothing left to cancel.
            Err(BrokerApiError::Rejected(_) | BrokerApiError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn get_account_info(&self) -> Result<Value, BrokerApiError> {
        let request = self.request(reqwest::Method::GET, "/v2/account")?;
        self.http.execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_table_covers_alpaca_vocabulary() {
        assert_eq!(AlpacaAdapter::map_status("new"), OrderStatus::Submitted);
        assert_eq!(AlpacaAdapter::map_status("accepted"), OrderStatus::Accepted);
        assert_eq!(
            AlpacaAdapter::map_status("partially_filled"),
            OrderStatus::PartiallyFilled
        );
        assert_eq!(AlpacaAdapter::map_status("FILLED"), OrderStatus::Filled);
        assert_eq!(AlpacaAdapter::map_status("canceled"), OrderStatus::Canceled);
        assert_eq!(AlpacaAdapter::map_status("rejected"), OrderStatus::Rejected);
        assert_eq!(AlpacaAdapter::map_status("expired"), OrderStatus::Expired);
    }

    #[test]
    fn unknown_status_falls_back_to_pending() {
        assert_eq!(
            AlpacaAdapter::map_status("calculating"),
            OrderStatus::Pending
        );
    }

    #[test]
    fn update_parses_fill_details() {
        let payload = serde_json::json!({
            "status": "filled",
            "filled_qty": "10",
            "filled_avg_price": "101.5"
        });
        let update = AlpacaAdapter::update_from(payload);
        assert_eq!(update.status, OrderStatus::Filled);
        assert_eq!(update.filled_quantity.unwrap().to_string(), "10");
        assert_eq!(update.filled_price.unwrap().to_string(), "101.5");
    }

    #[test]
    fn order_type_mapping_is_exhaustive() {
        assert_eq!(AlpacaAdapter::map_order_type(OrderType::Market), "market");
        assert_eq!(AlpacaAdapter::map_order_type(OrderType::Limit), "limit");
        assert_eq!(AlpacaAdapter::map_order_type(OrderType::Stop), "stop");
        assert_eq!(
            AlpacaAdapter::map_order_type(OrderType::StopLimit),
            "stop_limit"
        );
    }
}

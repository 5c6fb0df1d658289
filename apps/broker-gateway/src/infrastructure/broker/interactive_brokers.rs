//! Interactive Brokers client-portal adapter (stocks).
//!
//! Talks to a client-portal gateway, which holds the brokerage session; the
//! gateway URL is deployment configuration and an optional session token is
//! passed through as a bearer header.
//! Credential fields: `account_id`, optional `session_token`.

use async_trait::async_trait;
use serde_json::Value;

use crate::application::ports::{BrokerAdapter, BrokerApiError, OrderTicket, OrderTicketRequest};
use crate::domain::broker::Credentials;
use crate::domain::order::{OrderSide, OrderStatus, OrderStatusUpdate, OrderType};

use super::http::{VendorHttpClient, decimal_field, string_field};

/// Interactive Brokers adapter.
#[derive(Debug, Clone)]
pub struct InteractiveBrokersAdapter {
    base_url: String,
    credentials: Credentials,
    http: VendorHttpClient,
}

impl InteractiveBrokersAdapter {
    /// Create an adapter bound to one credential set.
    #[must_use]
    pub const fn new(base_url: String, credentials: Credentials, http: VendorHttpClient) -> Self {
        Self {
            base_url,
            credentials,
            http,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut request = self
            .http
            .inner()
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = self.credentials.get("session_token") {
            request = request.bearer_auth(token);
        }
        request
    }

    fn account_id(&self) -> Result<&str, BrokerApiError> {
        Ok(self.credentials.require("account_id")?)
    }

    const fn map_side(side: OrderSide) -> &'static str {
        match side {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }

    const fn map_order_type(order_type: OrderType) -> &'static str {
        match order_type {
            OrderType::Market => "MKT",
            OrderType::Limit => "LMT",
            OrderType::Stop => "STP",
            OrderType::StopLimit => "STOP_LIMIT",
        }
    }

    fn map_status(raw: &str) -> OrderStatus {
        match raw.to_lowercase().as_str() {
            "pendingsubmit" => OrderStatus::Submitted,
            "presubmitted" | "submitted" => OrderStatus::Accepted,
            "filled" => OrderStatus::Filled,
            "cancelled" | "pendingcancel" => OrderStatus::Canceled,
            "inactive" => OrderStatus::Rejected,
            other => {
                tracing::warn!(
                    vendor = "interactive_brokers",
                    status = other,
                    "unrecognized vendor status"
                );
                OrderStatus::Pending
            }
        }
    }

    fn update_from(payload: Value) -> OrderStatusUpdate {
        let status = string_field(&payload, "order_status")
            .or_else(|| string_field(&payload, "status"))
            .map_or(OrderStatus::Pending, |s| Self::map_status(&s));

        let filled = decimal_field(&payload, "cum_fill")
            .or_else(|| decimal_field(&payload, "filled_quantity"))
            .filter(|q| !q.is_zero());
        // A filled report without an explicit partial marker still counts as
        // partial until the status itself says filled.
        OrderStatusUpdate {
            status: if status == OrderStatus::Accepted && filled.is_some() {
                OrderStatus::PartiallyFilled
            } else {
                status
            },
            filled_quantity: filled,
            filled_price: decimal_field(&payload, "avg_price")
                .or_else(|| decimal_field(&payload, "average_price")),
            commission: decimal_field(&payload, "commission"),
            raw: payload,
        }
    }

    fn order_body(&self, account_id: &str, request: &OrderTicketRequest) -> Value {
        let mut order = serde_json::json!({
            "acctId": account_id,
            "ticker": request.symbol,
            "secType": "STK",
            "orderType": Self::map_order_type(request.order_type),
            "side": Self::map_side(request.side),
            "quantity": request.quantity.to_string(),
            "tif": "DAY",
        });
        if let Some(price) = request.limit_price {
            order["price"] = Value::String(price.to_string());
        }
        if let Some(stop) = request.stop_price {
            order["auxPrice"] = Value::String(stop.to_string());
        }
        serde_json::json!({ "orders": [order] })
    }
}

#[async_trait]
impl BrokerAdapter for InteractiveBrokersAdapter {
    async fn validate_credentials(&self) -> Result<bool, BrokerApiError> {
        let request = self.request(reqwest::Method::GET, "/iserver/accounts");
        match self.http.execute(request).await {
            Ok(response) => Ok(response.get("accounts").is_some()),
            Err(BrokerApiError::AuthRejected) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn submit_order(
        &self,
        request: &OrderTicketRequest,
    ) -> Result<OrderTicket, BrokerApiError> {
        let account_id = self.account_id()?.to_string();
        let body = self.order_body(&account_id, request);
        let response = self
            .http
            .execute(
                self.request(
                    reqwest::Method::POST,
                    &format!("/iserver/account/{account_id}/orders"),
                )
                .json(&body),
            )
            .await?;

        // The gateway replies with an array; the first element carries the
        // order id (or a confirmation prompt, which we treat as a rejection).
        let first = response
            .as_array()
            .and_then(|arr| arr.first())
            .cloned()
            .ok_or_else(|| BrokerApiError::Decode("empty order response".to_string()))?;

        let vendor_order_id = string_field(&first, "order_id")
            .or_else(|| first.get("order_id").map(|id| id.to_string()))
            .ok_or_else(|| {
                BrokerApiError::Rejected(
                    string_field(&first, "message")
                        .unwrap_or_else(|| "order requires confirmation".to_string()),
                )
            })?;

        tracing::info!(
            vendor = "interactive_brokers",
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
        let request = self.request(
            reqwest::Method::GET,
            &format!("/iserver/account/order/status/{vendor_order_id}"),
        );
        let payload = self.http.execute(request).await?;
        Ok(Self::update_from(payload))
    }

    async fn cancel_order(&self, vendor_order_id: &str) -> Result<bool, BrokerApiError> {
        let account_id = self.account_id()?.to_string();
        let request = self.request(
            reqwest::Method::DELETE,
            &format!("/iserver/account/{account_id}/order/{vendor_order_id}"),
        );
        match self.http.execute(request).await {
            Ok(_) => Ok(true),
            Err(BrokerApiError::Rejected(_) | BrokerApiError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn get_account_info(&self) -> Result<Value, BrokerApiError> {
        let request = self.request(reqwest::Method::GET, "/iserver/accounts");
        self.http.execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn status_table_covers_gateway_vocabulary() {
        assert_eq!(
            InteractiveBrokersAdapter::map_status("PendingSubmit"),
            OrderStatus::Submitted
        );
        assert_eq!(
            InteractiveBrokersAdapter::map_status("Submitted"),
            OrderStatus::Accepted
        );
        assert_eq!(
            InteractiveBrokersAdapter::map_status("Filled"),
            OrderStatus::Filled
        );
        assert_eq!(
            InteractiveBrokersAdapter::map_status("Cancelled"),
            OrderStatus::Canceled
        );
        assert_eq!(
            InteractiveBrokersAdapter::map_status("Inactive"),
            OrderStatus::Rejected
        );
        assert_eq!(
            InteractiveBrokersAdapter::map_status("???"),
            OrderStatus::Pending
        );
    }

    #[test]
    fn working_order_with_fills_reports_partial() {
        let payload = serde_json::json!({
            "order_status": "Submitted",
            "cum_fill": "30",
            "avg_price": "187.2"
        });
        let update = InteractiveBrokersAdapter::update_from(payload);
        assert_eq!(update.status, OrderStatus::PartiallyFilled);
        assert_eq!(update.filled_quantity.unwrap().to_string(), "30");
    }

    #[test]
    fn order_body_places_prices_in_gateway_fields() {
        let adapter = InteractiveBrokersAdapter::new(
            "https://localhost:5000/v1/api".into(),
            Credentials::new().with("account_id", "U123"),
            VendorHttpClient::new(std::time::Duration::from_secs(5)).unwrap(),
        );
        let request = OrderTicketRequest {
            symbol: "AAPL".into(),
            side: OrderSide::Buy,
            order_type: OrderType::StopLimit,
            quantity: Decimal::new(10, 0),
            limit_price: Some(Decimal::new(150, 0)),
            stop_price: Some(Decimal::new(148, 0)),
        };
        let body = adapter.order_body("U123", &request);
        let order = &body["orders"][0];
        assert_eq!(order["orderType"], "STOP_LIMIT");
        assert_eq!(order["price"], "150");
        assert_eq!(order["auxPrice"], "148");
    }
}

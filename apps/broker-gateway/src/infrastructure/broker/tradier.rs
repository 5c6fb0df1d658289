//! Tradier adapter (stocks).
//!
//! Auth: access token as a bearer header, JSON negotiated via `Accept`.
//! Order entry is form-encoded against the account's orders collection.
//! Credential fields: `api_key`, `account_id`.

use async_trait::async_trait;
use serde_json::Value;

use crate::application::ports::{BrokerAdapter, BrokerApiError, OrderTicket, OrderTicketRequest};
use crate::domain::broker::Credentials;
use crate::domain::order::{OrderSide, OrderStatus, OrderStatusUpdate, OrderType};

use super::http::{VendorHttpClient, decimal_field, string_field};

/// Tradier broker adapter.
#[derive(Debug, Clone)]
pub struct TradierAdapter {
    base_url: String,
    credentials: Credentials,
    http: VendorHttpClient,
}

impl TradierAdapter {
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
        let token = self.credentials.require("api_key")?;
        Ok(self
            .http
            .inner()
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .header("Accept", "application/json"))
    }

    fn account_id(&self) -> Result<&str, BrokerApiError> {
        Ok(self.credentials.require("account_id")?)
    }

    const fn map_side(side: OrderSide) -> &'static str {
        match side {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        }
    }

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
            "pending" | "submitted" => OrderStatus::Submitted,
            "open" => OrderStatus::Accepted,
            "partially_filled" => OrderStatus::PartiallyFilled,
            "filled" => OrderStatus::Filled,
            "canceled" => OrderStatus::Canceled,
            "rejected" | "error" => OrderStatus::Rejected,
            "expired" => OrderStatus::Expired,
            other => {
                tracing::warn!(vendor = "tradier", status = other, "unrecognized vendor status");
                OrderStatus::Pending
            }
        }
    }

    fn update_from(payload: Value) -> OrderStatusUpdate {
        let order = payload.get("order").cloned().unwrap_or_else(|| payload.clone());
        let status = string_field(&order, "status")
            .map_or(OrderStatus::Pending, |s| Self::map_status(&s));

        OrderStatusUpdate {
            status,
            filled_quantity: decimal_field(&order, "exec_quantity").filter(|q| !q.is_zero()),
            filled_price: decimal_field(&order, "avg_fill_price").filter(|p| !p.is_zero()),
            commission: None,
            raw: payload,
        }
    }

    fn order_form(request: &OrderTicketRequest) -> Vec<(&'static str, String)> {
        let mut form = vec![
            ("class", "equity".to_string()),
            ("symbol", request.symbol.clone()),
            ("side", Self::map_side(request.side).to_string()),
            ("quantity", request.quantity.to_string()),
            ("type", Self::map_order_type(request.order_type).to_string()),
            ("duration", "day".to_string()),
        ];
        if matches!(request.order_type, OrderType::Limit | OrderType::StopLimit) {
            if let Some(price) = request.limit_price {
                form.push(("price", price.to_string()));
            }
        }
        if matches!(request.order_type, OrderType::Stop | OrderType::StopLimit) {
            if let Some(stop) = request.stop_price {
                form.push(("stop", stop.to_string()));
            }
        }
        form
    }
}

#[async_trait]
impl BrokerAdapter for TradierAdapter {
    async fn validate_credentials(&self) -> Result<bool, BrokerApiError> {
        let request = self.request(reqwest::Method::GET, "/user/profile")?;
        match self.http.execute(request).await {
            Ok(response) => Ok(response.get("profile").is_some()),
            Err(BrokerApiError::AuthRejected) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn submit_order(
        &self,
        request: &OrderTicketRequest,
    ) -> Result<OrderTicket, BrokerApiError> {
        let account_id = self.account_id()?.to_string();
        let form = Self::order_form(request);
        let response = self
            .http
            .execute(
                self.request(
                    reqwest::Method::POST,
                    &format!("/accounts/{account_id}/orders"),
                )?
                .form(&form),
            )
            .await?;

        let vendor_order_id = response
            .get("order")
            .and_then(|o| o.get("id"))
            .map(|id| match id {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .ok_or_else(|| BrokerApiError::Decode("order response missing order.id".to_string()))?;

        tracing::info!(
            vendor = "tradier",
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
        let account_id = self.account_id()?.to_string();
        let request = self.request(
            reqwest::Method::GET,
            &format!("/accounts/{account_id}/orders/{vendor_order_id}"),
        )?;
        let payload = self.http.execute(request).await?;
        Ok(Self::update_from(payload))
    }

    async fn cancel_order(&self, vendor_order_id: &str) -> Result<bool, BrokerApiError> {
        let account_id = self.account_id()?.to_string();
        let request = self.request(
            reqwest::Method::DELETE,
            &format!("/accounts/{account_id}/orders/{vendor_order_id}"),
        )?;
        match self.http.execute(request).await {
            Ok(_) => Ok(true),
            Err(BrokerApiError::Rejected(_) | BrokerApiError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn get_account_info(&self) -> Result<Value, BrokerApiError> {
        let request = self.request(reqwest::Method::GET, "/user/profile")?;
        self.http.execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn status_table_covers_tradier_vocabulary() {
        assert_eq!(TradierAdapter::map_status("pending"), OrderStatus::Submitted);
        assert_eq!(TradierAdapter::map_status("open"), OrderStatus::Accepted);
        assert_eq!(
            TradierAdapter::map_status("partially_filled"),
            OrderStatus::PartiallyFilled
        );
        assert_eq!(TradierAdapter::map_status("filled"), OrderStatus::Filled);
        assert_eq!(TradierAdapter::map_status("canceled"), OrderStatus::Canceled);
        assert_eq!(TradierAdapter::map_status("rejected"), OrderStatus::Rejected);
        assert_eq!(TradierAdapter::map_status("expired"), OrderStatus::Expired);
        assert_eq!(TradierAdapter::map_status("nonsense"), OrderStatus::Pending);
    }

    #[test]
    fn stop_limit_form_carries_both_prices() {
        let request = OrderTicketRequest {
            symbol: "AAPL".into(),
            side: OrderSide::Buy,
            order_type: OrderType::StopLimit,
            quantity: Decimal::new(5, 0),
            limit_price: Some(Decimal::new(150, 0)),
            stop_price: Some(Decimal::new(148, 0)),
        };
        let form = TradierAdapter::order_form(&request);
        assert!(form.contains(&("price", "150".to_string())));
        assert!(form.contains(&("stop", "148".to_string())));
        assert!(form.contains(&("type", "stop_limit".to_string())));
    }

    #[test]
    fn update_unwraps_order_envelope() {
        let payload = serde_json::json!({
            "order": {"status": "filled", "exec_quantity": "5", "avg_fill_price": "149.5"}
        });
        let update = TradierAdapter::update_from(payload);
        assert_eq!(update.status, OrderStatus::Filled);
        assert_eq!(update.filled_quantity.unwrap().to_string(), "5");
    }
}

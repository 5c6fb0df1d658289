//! CME Direct adapter (futures).
//!
//! Auth: static API key header on every request.
//! Credential fields: `api_key`.

use async_trait::async_trait;
use serde_json::Value;

use crate::application::ports::{BrokerAdapter, BrokerApiError, OrderTicket, OrderTicketRequest};
use crate::domain::broker::Credentials;
use crate::domain::order::{OrderSide, OrderStatus, OrderStatusUpdate, OrderType};

use super::http::{VendorHttpClient, decimal_field, string_field};

/// CME Direct broker adapter.
#[derive(Debug, Clone)]
pub struct CmeAdapter {
    base_url: String,
    credentials: Credentials,
    http: VendorHttpClient,
}

impl CmeAdapter {
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
        let key = self.credentials.require("api_key")?;
        Ok(self
            .http
            .inner()
            .request(method, format!("{}{}", self.base_url, path))
            .header("X-CME-API-KEY", key))
    }

    const fn map_side(side: OrderSide) -> &'static str {
        match side {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }

    const fn map_order_type(order_type: OrderType) -> &'static str {
        match order_type {
            OrderType::Market => "MARKET",
            OrderType::Limit => "LIMIT",
            OrderType::Stop => "STOP",
            OrderType::StopLimit => "STOP_LIMIT",
        }
    }

    fn map_status(raw: &str) -> OrderStatus {
        match raw.to_uppercase().as_str() {
            "NEW" | "WORKING" => OrderStatus::Accepted,
            "PARTIALLY_FILLED" => OrderStatus::PartiallyFilled,
            "FILLED" => OrderStatus::Filled,
            "CANCELED" => OrderStatus::Canceled,
            "REJECTED" => OrderStatus::Rejected,
            "EXPIRED" => OrderStatus::Expired,
            other => {
                tracing::warn!(vendor = "cme", status = other, "unrecognized vendor status");
                OrderStatus::Pending
            }
        }
    }

    fn update_from(payload: Value) -> OrderStatusUpdate {
        let status = string_field(&payload, "status")
            .map_or(OrderStatus::Pending, |s| Self::map_status(&s));
        OrderStatusUpdate {
            status,
            filled_quantity: decimal_field(&payload, "filledQuantity").filter(|q| !q.is_zero()),
            filled_price: decimal_field(&payload, "avgFillPrice").filter(|p| !p.is_zero()),
            commission: decimal_field(&payload, "commission"),
            raw: payload,
        }
    }
}

#[async_trait]
impl BrokerAdapter for CmeAdapter {
    async fn validate_credentials(&self) -> Result<bool, BrokerApiError> {
        let request = self.request(reqwest::Method::GET, "/account")?;
        match self.http.execute(request).await {
            Ok(account) => Ok(!account.is_null()),
            Err(BrokerApiError::AuthRejected) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn submit_order(
        &self,
        request: &OrderTicketRequest,
    ) -> Result<OrderTicket, BrokerApiError> {
        let mut body = serde_json::json!({
            "symbol": request.symbol,
            "side": Self::map_side(request.side),
            "type": Self::map_order_type(request.order_type),
            "quantity": request.quantity.to_string(),
        });
        if let Some(price) = request.limit_price {
            body["price"] = Value::String(price.to_string());
        }
        if let Some(stop) = request.stop_price {
            body["stopPrice"] = Value::String(stop.to_string());
        }

        let response = self
            .http
            .execute(self.request(reqwest::Method::POST, "/orders")?.json(&body))
            .await?;

        let vendor_order_id = response
            .get("orderId")
            .map(|id| match id {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .ok_or_else(|| BrokerApiError::Decode("order response missing orderId".to_string()))?;

        tracing::info!(
            vendor = "cme",
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
        let request = self.request(reqwest::Method::GET, &format!("/orders/{vendor_order_id}"))?;
        let payload = self.http.execute(request).await?;
        Ok(Self::update_from(payload))
    }

    async fn cancel_order(&self, vendor_order_id: &str) -> Result<bool, BrokerApiError> {
        let request =
            self.request(reqwest::Method::DELETE, &format!("/orders/{vendor_order_id}"))?;
        match self.http.execute(request).await {
            Ok(_) => Ok(true),
            Err(BrokerApiError::Rejected(_) | BrokerApiError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn get_account_info(&self) -> Result<Value, BrokerApiError> {
        let request = self.request(reqwest::Method::GET, "/account")?;
        self.http.execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_table_covers_cme_vocabulary() {
        assert_eq!(CmeAdapter::map_status("NEW"), OrderStatus::Accepted);
        assert_eq!(
            CmeAdapter::map_status("PARTIALLY_FILLED"),
            OrderStatus::PartiallyFilled
        );
        assert_eq!(CmeAdapter::map_status("FILLED"), OrderStatus::Filled);
        assert_eq!(CmeAdapter::map_status("CANCELED"), OrderStatus::Canceled);
        assert_eq!(CmeAdapter::map_status("REJECTED"), OrderStatus::Rejected);
        assert_eq!(CmeAdapter::map_status("EXPIRED"), OrderStatus::Expired);
        assert_eq!(CmeAdapter::map_status("HALTED"), OrderStatus::Pending);
    }

    #[test]
    fn update_reads_fill_fields() {
        let payload = serde_json::json!({
            "status": "FILLED",
            "filledQuantity": 3,
            "avgFillPrice": 4510.5,
            "commission": 2.5
        });
        let update = CmeAdapter::update_from(payload);
        assert_eq!(update.status, OrderStatus::Filled);
        assert_eq!(update.filled_quantity.unwrap().to_string(), "3");
        assert_eq!(update.commission.unwrap().to_string(), "2.5");
    }
}

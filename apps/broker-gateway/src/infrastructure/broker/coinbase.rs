//! Coinbase Exchange adapter (crypto).
//!
//! Auth: HMAC-SHA256 over `timestamp + method + path + body` keyed with the
//! base64-decoded secret, sent base64-encoded alongside the key, timestamp
//! and passphrase in the `CB-ACCESS-*` headers.
//! Credential fields: `api_key`, `api_secret` (base64), `passphrase`.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;

use crate::application::ports::{BrokerAdapter, BrokerApiError, OrderTicket, OrderTicketRequest};
use crate::domain::broker::Credentials;
use crate::domain::order::{OrderSide, OrderStatus, OrderStatusUpdate, OrderType};

use super::http::{VendorHttpClient, decimal_field, string_field};

type HmacSha256 = Hmac<Sha256>;

/// Coinbase Exchange broker adapter.
#[derive(Debug, Clone)]
pub struct CoinbaseAdapter {
    base_url: String,
    credentials: Credentials,
    http: VendorHttpClient,
}

impl CoinbaseAdapter {
    /// Create an adapter bound to one credential set.
    #[must_use]
    pub const fn new(base_url: String, credentials: Credentials, http: VendorHttpClient) -> Self {
        Self {
            base_url,
            credentials,
            http,
        }
    }

    fn sign(
        timestamp: &str,
        method: &str,
        path: &str,
        body: &str,
        secret_b64: &str,
    ) -> Result<String, BrokerApiError> {
        // A secret that is not valid base64 can never authenticate.
        let secret = BASE64
            .decode(secret_b64)
            .map_err(|_| BrokerApiError::AuthRejected)?;

        #[allow(clippy::expect_used)]
        let mut mac = HmacSha256::new_from_slice(&secret).expect("HMAC accepts any key length");
        mac.update(timestamp.as_bytes());
        mac.update(method.as_bytes());
        mac.update(path.as_bytes());
        mac.update(body.as_bytes());
        Ok(BASE64.encode(mac.finalize().into_bytes()))
    }

    fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<reqwest::RequestBuilder, BrokerApiError> {
        let key = self.credentials.require("api_key")?;
        let secret = self.credentials.require("api_secret")?;
        let passphrase = self.credentials.require("passphrase")?;

        let timestamp = Utc::now().timestamp().to_string();
        let body_string = body.map(Value::to_string).unwrap_or_default();
        let signature = Self::sign(&timestamp, method.as_str(), path, &body_string, secret)?;

        let mut request = self
            .http
            .inner()
            .request(method, format!("{}{}", self.base_url, path))
            .header("CB-ACCESS-KEY", key)
            .header("CB-ACCESS-SIGN", signature)
            .header("CB-ACCESS-TIMESTAMP", timestamp)
            .header("CB-ACCESS-PASSPHRASE", passphrase)
            .header("Content-Type", "application/json");

        if !body_string.is_empty() {
            request = request.body(body_string);
        }
        Ok(request)
    }

    const fn map_side(side: OrderSide) -> &'static str {
        match side {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        }
    }

    /// Coinbase has no native stop-limit; those fall back to market, the
    /// documented default for unsupported types on this vendor.
    const fn map_order_type(order_type: OrderType) -> &'static str {
        match order_type {
            OrderType::Market | OrderType::StopLimit => "market",
            OrderType::Limit => "limit",
            OrderType::Stop => "stop",
        }
    }

    fn map_status(raw: &str, done_reason: Option<&str>) -> OrderStatus {
        match raw.to_lowercase().as_str() {
            "pending" => OrderStatus::Submitted,
            "open" | "active" | "received" => OrderStatus::Accepted,
            "done" => match done_reason.unwrap_or("filled") {
                "canceled" => OrderStatus::Canceled,
                _ => OrderStatus::Filled,
            },
            "rejected" => OrderStatus::Rejected,
            other => {
                tracing::warn!(vendor = "coinbase", status = other, "unrecognized vendor status");
                OrderStatus::Pending
            }
        }
    }

    fn update_from(payload: Value) -> OrderStatusUpdate {
        let done_reason = string_field(&payload, "done_reason");
        let status = string_field(&payload, "status").map_or(OrderStatus::Pending, |s| {
            Self::map_status(&s, done_reason.as_deref())
        });

        let filled = decimal_field(&payload, "filled_size").filter(|q| !q.is_zero());
        let avg_price = match (filled, decimal_field(&payload, "executed_value")) {
            (Some(qty), Some(value)) if !qty.is_zero() => Some(value / qty),
            _ => None,
        };

        OrderStatusUpdate {
            status,
            filled_quantity: filled,
            filled_price: avg_price,
            commission: decimal_field(&payload, "fill_fees"),
            raw: payload,
        }
    }

    fn order_body(request: &OrderTicketRequest) -> Value {
        let mut body = serde_json::json!({
            "product_id": request.symbol,
            "side": Self::map_side(request.side),
            "type": Self::map_order_type(request.order_type),
            "size": request.quantity.to_string(),
        });

        if request.order_type == OrderType::Limit {
            if let Some(price) = request.limit_price {
                body["price"] = Value::String(price.to_string());
            }
        }
        if request.order_type == OrderType::Stop {
            // Buy stops trigger on the way up (entry), sell stops protect on
            // the way down (loss).
            body["stop"] = Value::String(
                match request.side {
                    OrderSide::Buy => "entry",
                    OrderSide::Sell => "loss",
                }
                .to_string(),
            );
            if let Some(stop) = request.stop_price {
                body["stop_price"] = Value::String(stop.to_string());
            }
        }
        body
    }
}

#[async_trait]
impl BrokerAdapter for CoinbaseAdapter {
    async fn validate_credentials(&self) -> Result<bool, BrokerApiError> {
        let request = self.request(reqwest::Method::GET, "/accounts", None)?;
        match self.http.execute(request).await {
            Ok(accounts) => Ok(accounts.is_array()),
            Err(BrokerApiError::AuthRejected) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn submit_order(
        &self,
        request: &OrderTicketRequest,
    ) -> Result<OrderTicket, BrokerApiError> {
        let body = Self::order_body(request);
        let response = self
            .http
            .execute(self.request(reqwest::Method::POST, "/orders", Some(&body))?)
            .await?;

        let vendor_order_id = string_field(&response, "id")
            .ok_or_else(|| BrokerApiError::Decode("order response missing id".to_string()))?;

        tracing::info!(
            vendor = "coinbase",
            vendor_order_id,
            product = %request.symbol,
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
        let request =
            self.request(reqwest::Method::GET, &format!("/orders/{vendor_order_id}"), None)?;
        let payload = self.http.execute(request).await?;
        Ok(Self::update_from(payload))
    }

    async fn cancel_order(&self, vendor_order_id: &str) -> Result<bool, BrokerApiError> {
        let request =
            self.request(reqwest::Method::DELETE, &format!("/orders/{vendor_order_id}"), None)?;
        match self.http.execute(request).await {
            Ok(_) => Ok(true),
            Err(BrokerApiError::Rejected(_) | BrokerApiError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn get_account_info(&self) -> Result<Value, BrokerApiError> {
        let request = self.request(reqwest::Method::GET, "/accounts", None)?;
        let accounts = self.http.execute(request).await?;
        Ok(serde_json::json!({ "accounts": accounts }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_deterministic() {
        let secret = BASE64.encode(b"super secret key material here!!");
        let first = CoinbaseAdapter::sign("1700000000", "GET", "/accounts", "", &secret).unwrap();
        let second = CoinbaseAdapter::sign("1700000000", "GET", "/accounts", "", &secret).unwrap();
        assert_eq!(first, second);
        assert!(BASE64.decode(&first).is_ok());
    }

    #[test]
    fn malformed_secret_rejects_as_auth_failure() {
        let err =
            CoinbaseAdapter::sign("1700000000", "GET", "/accounts", "", "not base64 !!").unwrap_err();
        assert!(matches!(err, BrokerApiError::AuthRejected));
    }

    #[test]
    fn stop_limit_falls_back_to_market() {
        assert_eq!(CoinbaseAdapter::map_order_type(OrderType::StopLimit), "market");
        assert_eq!(CoinbaseAdapter::map_order_type(OrderType::Limit), "limit");
        assert_eq!(CoinbaseAdapter::map_order_type(OrderType::Stop), "stop");
        assert_eq!(CoinbaseAdapter::map_order_type(OrderType::Market), "market");
    }

    #[test]
    fn done_order_uses_done_reason() {
        assert_eq!(
            CoinbaseAdapter::map_status("done", Some("filled")),
            OrderStatus::Filled
        );
        assert_eq!(
            CoinbaseAdapter::map_status("done", Some("canceled")),
            OrderStatus::Canceled
        );
    }

    #[test]
    fn update_derives_average_price() {
        let payload = serde_json::json!({
            "status": "done",
            "done_reason": "filled",
            "filled_size": "2",
            "executed_value": "84000",
            "fill_fees": "42.0"
        });
        let update = CoinbaseAdapter::update_from(payload);
        assert_eq!(update.status, OrderStatus::Filled);
        assert_eq!(update.filled_price.unwrap().to_string(), "42000");
        assert_eq!(update.commission.unwrap().to_string(), "42.0");
    }

    #[test]
    fn buy_stop_is_entry_sell_stop_is_loss() {
        let mut request = OrderTicketRequest {
            symbol: "BTC-USD".into(),
            side: OrderSide::Buy,
            order_type: OrderType::Stop,
            quantity: rust_decimal::Decimal::ONE,
            limit_price: None,
            stop_price: Some(rust_decimal::Decimal::new(40_000, 0)),
        };
        assert_eq!(CoinbaseAdapter::order_body(&request)["stop"], "entry");
        request.side = OrderSide::Sell;
        assert_eq!(CoinbaseAdapter::order_body(&request)["stop"], "loss");
    }
}

//! Binance adapter (crypto).
//!
//! Auth: HMAC-SHA256 over the query string, hex-encoded, appended as
//! `signature`; API key in the `X-MBX-APIKEY` header. Every authenticated
//! call carries a millisecond `timestamp` parameter.
//! Credential fields: `api_key`, `api_secret`.

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use serde_json::Value;
use sha2::Sha256;

use crate::application::ports::{BrokerAdapter, BrokerApiError, OrderTicket, OrderTicketRequest};
use crate::domain::broker::Credentials;
use crate::domain::order::{OrderSide, OrderStatus, OrderStatusUpdate, OrderType};

use super::http::{VendorHttpClient, decimal_field, string_field};

type HmacSha256 = Hmac<Sha256>;

/// Binance broker adapter.
#[derive(Debug, Clone)]
pub struct BinanceAdapter {
    base_url: String,
    credentials: Credentials,
    http: VendorHttpClient,
}

impl BinanceAdapter {
    /// Create an adapter bound to one credential set.
    #[must_use]
    pub const fn new(base_url: String, credentials: Credentials, http: VendorHttpClient) -> Self {
        Self {
            base_url,
            credentials,
            http,
        }
    }

    /// Sign a query string with the account secret.
    fn sign(query: &str, secret: &str) -> String {
        #[allow(clippy::expect_used)]
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(query.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Build a signed request for `path` with the given parameters.
    fn signed_request(
        &self,
        method: reqwest::Method,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<reqwest::RequestBuilder, BrokerApiError> {
        let key = self.credentials.require("api_key")?;
        let secret = self.credentials.require("api_secret")?;

        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (name, value) in params {
            serializer.append_pair(name, value);
        }
        serializer.append_pair("timestamp", &Utc::now().timestamp_millis().to_string());
        let query = serializer.finish();

        let signature = Self::sign(&query, secret);
        let url = format!("{}{}?{}&signature={}", self.base_url, path, query, signature);

        Ok(self
            .http
            .inner()
            .request(method, url)
            .header("X-MBX-APIKEY", key))
    }

    const fn map_side(side: OrderSide) -> &'static str {
        match side {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }

    /// Binance's stop orders are `STOP_LOSS` variants of the same shapes.
    const fn map_order_type(order_type: OrderType) -> &'static str {
        match order_type {
            OrderType::Market => "MARKET",
            OrderType::Limit => "LIMIT",
            OrderType::Stop => "STOP_LOSS",
            OrderType::StopLimit => "STOP_LOSS_LIMIT",
        }
    }

    fn map_status(raw: &str) -> OrderStatus {
        match raw.to_uppercase().as_str() {
            "NEW" => OrderStatus::Accepted,
            "PARTIALLY_FILLED" => OrderStatus::PartiallyFilled,
            "FILLED" => OrderStatus::Filled,
            "CANCELED" | "PENDING_CANCEL" => OrderStatus::Canceled,
            "REJECTED" => OrderStatus::Rejected,
            "EXPIRED" | "EXPIRED_IN_MATCH" => OrderStatus::Expired,
            other => {
                tracing::warn!(vendor = "binance", status = other, "unrecognized vendor status");
                OrderStatus::Pending
            }
        }
    }

    fn update_from(payload: Value) -> OrderStatusUpdate {
        let status = string_field(&payload, "status")
            .map_or(OrderStatus::Pending, |s| Self::map_status(&s));

        let executed = decimal_field(&payload, "executedQty");
        // Average price is not reported directly; derive it from the quote
        // volume when anything executed.
        let avg_price = match (executed, decimal_field(&payload, "cummulativeQuoteQty")) {
            (Some(qty), Some(quote)) if !qty.is_zero() => Some(quote / qty),
            _ => decimal_field(&payload, "price").filter(|p| !p.is_zero()),
        };

        OrderStatusUpdate {
            status,
            filled_quantity: executed.filter(|q| !q.is_zero()),
            filled_price: avg_price,
            commission: None,
            raw: payload,
        }
    }

    fn order_params(request: &OrderTicketRequest) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("symbol", request.symbol.clone()),
            ("side", Self::map_side(request.side).to_string()),
            ("type", Self::map_order_type(request.order_type).to_string()),
            ("quantity", request.quantity.to_string()),
        ];

        let price = request.limit_price.map(|p: Decimal| p.to_string());
        let stop = request.stop_price.map(|p: Decimal| p.to_string());
        match request.order_type {
            OrderType::Market => {}
            OrderType::Limit => {
                params.push(("timeInForce", "GTC".to_string()));
                if let Some(price) = price {
                    params.push(("price", price));
                }
            }
            OrderType::Stop => {
                if let Some(stop) = stop {
                    params.push(("stopPrice", stop));
                }
            }
            OrderType::StopLimit => {
                params.push(("timeInForce", "GTC".to_string()));
                if let Some(price) = price {
                    params.push(("price", price));
                }
                if let Some(stop) = stop {
                    params.push(("stopPrice", stop));
                }
            }
        }
        params
    }
}

#[async_trait]
impl BrokerAdapter for BinanceAdapter {
    async fn validate_credentials(&self) -> Result<bool, BrokerApiError> {
        let request = self.signed_request(reqwest::Method::GET, "/api/v3/account", &[])?;
        match self.http.execute(request).await {
            Ok(account) => Ok(account.get("balances").is_some()),
            Err(BrokerApiError::AuthRejected) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn submit_order(
        &self,
        request: &OrderTicketRequest,
    ) -> Result<OrderTicket, BrokerApiError> {
        let params = Self::order_params(request);
        let response = self
            .http
            .execute(self.signed_request(reqwest::Method::POST, "/api/v3/order", &params)?)
            .await?;

        let vendor_order_id = response
            .get("orderId")
            .map(|id| match id {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .ok_or_else(|| BrokerApiError::Decode("order response missing orderId".to_string()))?;

        tracing::info!(
            vendor = "binance",
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
        let params = [("orderId", vendor_order_id.to_string())];
        let payload = self
            .http
            .execute(self.signed_request(reqwest::Method::GET, "/api/v3/order", &params)?)
            .await?;
        Ok(Self::update_from(payload))
    }

    async fn cancel_order(&self, vendor_order_id: &str) -> Result<bool, BrokerApiError> {
        let params = [("orderId", vendor_order_id.to_string())];
        match self
            .http
            .execute(self.signed_request(reqwest::Method::DELETE, "/api/v3/order", &params)?)
            .await
        {
            Ok(_) => Ok(true),
            Err(BrokerApiError::Rejected(_) | BrokerApiError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn get_account_info(&self) -> Result<Value, BrokerApiError> {
        let request = self.signed_request(reqwest::Method::GET, "/api/v3/account", &[])?;
        self.http.execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_signature() {
        // From the Binance API docs example.
        let query = "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1&recvWindow=5000&timestamp=1499827319559";
        let secret = "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j";
        assert_eq!(
            BinanceAdapter::sign(query, secret),
            "c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
    }

    #[test]
    fn status_table_covers_binance_vocabulary() {
        assert_eq!(BinanceAdapter::map_status("NEW"), OrderStatus::Accepted);
        assert_eq!(
            BinanceAdapter::map_status("PARTIALLY_FILLED"),
            OrderStatus::PartiallyFilled
        );
        assert_eq!(BinanceAdapter::map_status("FILLED"), OrderStatus::Filled);
        assert_eq!(
            BinanceAdapter::map_status("PENDING_CANCEL"),
            OrderStatus::Canceled
        );
        assert_eq!(BinanceAdapter::map_status("REJECTED"), OrderStatus::Rejected);
        assert_eq!(BinanceAdapter::map_status("EXPIRED"), OrderStatus::Expired);
        assert_eq!(BinanceAdapter::map_status("SOMETHING"), OrderStatus::Pending);
    }

    #[test]
    fn average_price_derived_from_quote_volume() {
        let payload = serde_json::json!({
            "status": "PARTIALLY_FILLED",
            "executedQty": "2",
            "cummulativeQuoteQty": "205.0"
        });
        let update = BinanceAdapter::update_from(payload);
        assert_eq!(update.status, OrderStatus::PartiallyFilled);
        assert_eq!(update.filled_quantity.unwrap().to_string(), "2");
        assert_eq!(update.filled_price.unwrap().to_string(), "102.5");
    }

    #[test]
    fn limit_order_params_carry_price_and_tif() {
        let request = OrderTicketRequest {
            symbol: "BTCUSDT".into(),
            side: OrderSide::Buy,
            order_type: OrderType::Limit,
            quantity: Decimal::ONE,
            limit_price: Some(Decimal::new(42_000, 0)),
            stop_price: None,
        };
        let params = BinanceAdapter::order_params(&request);
        assert!(params.contains(&("timeInForce", "GTC".to_string())));
        assert!(params.contains(&("price", "42000".to_string())));
    }

    #[test]
    fn market_order_params_have_no_price() {
        let request = OrderTicketRequest {
            symbol: "BTCUSDT".into(),
            side: OrderSide::Sell,
            order_type: OrderType::Market,
            quantity: Decimal::ONE,
            limit_price: None,
            stop_price: None,
        };
        let params = BinanceAdapter::order_params(&request);
        assert!(params.iter().all(|(name, _)| *name != "price"));
    }
}

//! Kraken adapter (crypto).
//!
//! Auth: every private call POSTs a form body containing a fresh `nonce`;
//! the `API-Sign` header is HMAC-SHA512 over `path || SHA256(nonce || body)`
//! keyed with the base64-decoded secret, base64-encoded.
//! Credential fields: `api_key`, `api_secret` (base64).
//!
//! Kraken wraps every response in `{"error": [...], "result": ...}` and
//! reports failures inside the `error` array even on HTTP 200.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::{Digest, Sha256, Sha512};

use crate::application::ports::{BrokerAdapter, BrokerApiError, OrderTicket, OrderTicketRequest};
use crate::domain::broker::Credentials;
use crate::domain::order::{OrderSide, OrderStatus, OrderStatusUpdate, OrderType};

use super::http::{VendorHttpClient, decimal_field};

type HmacSha512 = Hmac<Sha512>;

/// Kraken broker adapter.
#[derive(Debug, Clone)]
pub struct KrakenAdapter {
    base_url: String,
    credentials: Credentials,
    http: VendorHttpClient,
}

impl KrakenAdapter {
    /// Create an adapter bound to one credential set.
    #[must_use]
    pub const fn new(base_url: String, credentials: Credentials, http: VendorHttpClient) -> Self {
        Self {
            base_url,
            credentials,
            http,
        }
    }

    /// Compute the `API-Sign` header value.
    fn sign(path: &str, nonce: &str, body: &str, secret_b64: &str) -> Result<String, BrokerApiError> {
        // A secret that is not valid base64 can never authenticate.
        let secret = BASE64
            .decode(secret_b64)
            .map_err(|_| BrokerApiError::AuthRejected)?;

        let mut digest = Sha256::new();
        digest.update(nonce.as_bytes());
        digest.update(body.as_bytes());
        let inner = digest.finalize();

        #[allow(clippy::expect_used)]
        let mut mac =
            HmacSha512::new_from_slice(&secret).expect("HMAC accepts any key length");
        mac.update(path.as_bytes());
        mac.update(&inner);
        Ok(BASE64.encode(mac.finalize().into_bytes()))
    }

    /// POST a signed private-API call.
    async fn private_call(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Value, BrokerApiError> {
        let key = self.credentials.require("api_key")?;
        let secret = self.credentials.require("api_secret")?;

        let nonce = Utc::now().timestamp_millis().to_string();
        let body = {
            let mut serializer = url::form_urlencoded::Serializer::new(String::new());
            serializer.append_pair("nonce", &nonce);
            for (name, value) in params {
                serializer.append_pair(name, value);
            }
            serializer.finish()
        };

        let signature = Self::sign(path, &nonce, &body, secret)?;

        let request = self
            .http
            .inner()
            .post(format!("{}{}", self.base_url, path))
            .header("API-Key", key)
            .header("API-Sign", signature)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body);

        let response = self.http.execute(request).await?;
        Self::unwrap_result(response)
    }

    /// Split Kraken's `{error, result}` envelope.
    fn unwrap_result(response: Value) -> Result<Value, BrokerApiError> {
        let errors: Vec<String> = response
            .get("error")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        if !errors.is_empty() {
            let message = errors.join(", ");
            return Err(if message.contains("EAPI:Invalid key")
                || message.contains("EGeneral:Permission denied")
            {
                BrokerApiError::AuthRejected
            } else if message.starts_with("EOrder:") {
                BrokerApiError::Rejected(message)
            } else {
                BrokerApiError::Api(message)
            });
        }

        Ok(response.get("result").cloned().unwrap_or(Value::Null))
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
            OrderType::Stop => "stop-loss",
            OrderType::StopLimit => "stop-loss-limit",
        }
    }

    fn map_status(raw: &str, executed: bool) -> OrderStatus {
        match raw.to_lowercase().as_str() {
            "pending" => OrderStatus::Submitted,
            "open" if executed => OrderStatus::PartiallyFilled,
            "open" => OrderStatus::Accepted,
            "closed" => OrderStatus::Filled,
            "canceled" => OrderStatus::Canceled,
            "expired" => OrderStatus::Expired,
            other => {
                tracing::warn!(vendor = "kraken", status = other, "unrecognized vendor status");
                OrderStatus::Pending
            }
        }
    }

    fn update_from(order: Value) -> OrderStatusUpdate {
        let executed = decimal_field(&order, "vol_exec").filter(|v| !v.is_zero());
        let status = order
            .get("status")
            .and_then(Value::as_str)
            .map_or(OrderStatus::Pending, |s| {
                Self::map_status(s, executed.is_some())
            });

        OrderStatusUpdate {
            status,
            filled_quantity: executed,
            filled_price: decimal_field(&order, "price").filter(|p| !p.is_zero()),
            commission: decimal_field(&order, "fee"),
            raw: order,
        }
    }
}

#[async_trait]
impl BrokerAdapter for KrakenAdapter {
    async fn validate_credentials(&self) -> Result<bool, BrokerApiError> {
        match self.private_call("/0/private/Balance", &[]).await {
            Ok(result) => Ok(!result.is_null()),
            Err(BrokerApiError::AuthRejected) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn submit_order(
        &self,
        request: &OrderTicketRequest,
    ) -> Result<OrderTicket, BrokerApiError> {
        let mut params = vec![
            ("pair", request.symbol.clone()),
            ("type", Self::map_side(request.side).to_string()),
            ("ordertype", Self::map_order_type(request.order_type).to_string()),
            ("volume", request.quantity.to_string()),
        ];

        // Kraken's `price`/`price2` meaning depends on the order type: the
        // trigger rides in `price` for plain stops, and the limit leg moves
        // to `price2` for stop-limits.
        match request.order_type {
            OrderType::Market => {}
            OrderType::Limit => {
                if let Some(price) = request.limit_price {
                    params.push(("price", price.to_string()));
                }
            }
            OrderType::Stop => {
                if let Some(stop) = request.stop_price {
                    params.push(("price", stop.to_string()));
                }
            }
            OrderType::StopLimit => {
                if let Some(stop) = request.stop_price {
                    params.push(("price", stop.to_string()));
                }
                if let Some(price) = request.limit_price {
                    params.push(("price2", price.to_string()));
                }
            }
        }

        let result = self.private_call("/0/private/AddOrder", &params).await?;

        let vendor_order_id = result
            .get("txid")
            .and_then(Value::as_array)
            .and_then(|ids| ids.first())
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| BrokerApiError::Decode("AddOrder result missing txid".to_string()))?;

        tracing::info!(
            vendor = "kraken",
            vendor_order_id,
            pair = %request.symbol,
            "order submitted"
        );

        Ok(OrderTicket {
            vendor_order_id,
            raw: result,
        })
    }

    async fn get_order_status(
        &self,
        vendor_order_id: &str,
    ) -> Result<OrderStatusUpdate, BrokerApiError> {
        let params = [("txid", vendor_order_id.to_string())];
        let result = self.private_call("/0/private/QueryOrders", &params).await?;

        let order = result
            .get(vendor_order_id)
            .cloned()
            .ok_or_else(|| BrokerApiError::NotFound(format!("order {vendor_order_id}")))?;

        Ok(Self::update_from(order))
    }

    async fn cancel_order(&self, vendor_order_id: &str) -> Result<bool, BrokerApiError> {
        let params = [("txid", vendor_order_id.to_string())];
        match self.private_call("/0/private/CancelOrder", &params).await {
            Ok(result) => Ok(result
                .get("count")
                .and_then(Value::as_u64)
                .is_some_and(|count| count > 0)),
            Err(BrokerApiError::Rejected(_) | BrokerApiError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn get_account_info(&self) -> Result<Value, BrokerApiError> {
        let balances = self.private_call("/0/private/Balance", &[]).await?;
        Ok(serde_json::json!({ "balances": balances }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_matches_known_vector() {
        // From the Kraken API docs signature example.
        let secret = "kQH5HW/8p1uGOVjbgWA7FunAmGO8lsSUXNsu3eow76sz84Q18fWxnyRzBHCd3pd5nE9qa99HAZtuZuj6F1huXg==";
        let path = "/0/private/AddOrder";
        let nonce = "1616492376594";
        let body = "nonce=1616492376594&ordertype=limit&pair=XBTUSD&price=37500&type=buy&volume=1.25";
        let signature = KrakenAdapter::sign(path, nonce, body, secret).unwrap();
        assert_eq!(
            signature,
            "4/dpxb3iT4tp/ZCVEwSnEsLxx0bqyhLpdfOpc6fn7OR8+UClSV5n9E6aSS8MPtnRfp32bAb0nmbRn6H8ndwLUQ=="
        );
    }

    #[test]
    fn error_array_maps_to_rejection() {
        let response = serde_json::json!({"error": ["EOrder:Insufficient funds"]});
        let err = KrakenAdapter::unwrap_result(response).unwrap_err();
        assert!(matches!(err, BrokerApiError::Rejected(_)));
    }

    #[test]
    fn invalid_key_maps_to_auth_rejection() {
        let response = serde_json::json!({"error": ["EAPI:Invalid key"]});
        let err = KrakenAdapter::unwrap_result(response).unwrap_err();
        assert!(matches!(err, BrokerApiError::AuthRejected));
    }

    #[test]
    fn open_order_with_executed_volume_is_partial() {
        let order = serde_json::json!({
            "status": "open",
            "vol": "1.5",
            "vol_exec": "0.5",
            "price": "37450.0",
            "fee": "1.2"
        });
        let update = KrakenAdapter::update_from(order);
        assert_eq!(update.status, OrderStatus::PartiallyFilled);
        assert_eq!(update.filled_quantity.unwrap().to_string(), "0.5");
        assert_eq!(update.commission.unwrap().to_string(), "1.2");
    }

    #[test]
    fn closed_order_is_filled() {
        let order = serde_json::json!({"status": "closed", "vol_exec": "1.5", "price": "37450.0"});
        assert_eq!(KrakenAdapter::update_from(order).status, OrderStatus::Filled);
    }

    #[test]
    fn unknown_status_falls_back_to_pending() {
        assert_eq!(
            KrakenAdapter::map_status("unwinding", false),
            OrderStatus::Pending
        );
    }
}

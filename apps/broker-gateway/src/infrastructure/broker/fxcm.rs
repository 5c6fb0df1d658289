//! FXCM adapter (forex).
//!
//! Auth: access token as a bearer header. Market orders open immediately via
//! `open_trade`; resting orders go through `create_entry_order`. Order state
//! is read from the account model snapshot.
//! Credential fields: `access_token`, `account_id`.

use async_trait::async_trait;
use serde_json::Value;

use crate::application::ports::{BrokerAdapter, BrokerApiError, OrderTicket, OrderTicketRequest};
use crate::domain::broker::Credentials;
use crate::domain::order::{OrderSide, OrderStatus, OrderStatusUpdate, OrderType};

use super::http::{VendorHttpClient, decimal_field, string_field};

/// FXCM broker adapter.
#[derive(Debug, Clone)]
pub struct FxcmAdapter {
    base_url: String,
    credentials: Credentials,
    http: VendorHttpClient,
}

impl FxcmAdapter {
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
        let token = self.credentials.require("access_token")?;
        Ok(self
            .http
            .inner()
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .header("Accept", "application/json"))
    }

    fn map_status(raw: &str) -> OrderStatus {
        match raw.to_lowercase().as_str() {
            "waiting" => OrderStatus::Submitted,
            "in_process" | "executing" => OrderStatus::Accepted,
            "executed" => OrderStatus::Filled,
            "canceled" => OrderStatus::Canceled,
            "rejected" => OrderStatus::Rejected,
            "expired" => OrderStatus::Expired,
            other => {
                tracing::warn!(vendor = "fxcm", status = other, "unrecognized vendor status");
                OrderStatus::Pending
            }
        }
    }

    fn update_from_order(order: Value) -> OrderStatusUpdate {
        let status = string_field(&order, "status")
            .map_or(OrderStatus::Pending, |s| Self::map_status(&s));
        OrderStatusUpdate {
            status,
            filled_quantity: decimal_field(&order, "filledAmount").filter(|q| !q.is_zero()),
            filled_price: decimal_field(&order, "buy")
                .or_else(|| decimal_field(&order, "sell"))
                .filter(|p| !p.is_zero()),
            commission: decimal_field(&order, "com"),
            raw: order,
        }
    }

    /// Check FXCM's `response.executed` envelope flag.
    fn ensure_executed(response: &Value) -> Result<(), BrokerApiError> {
        let executed = response
            .get("response")
            .and_then(|r| r.get("executed"))
            .and_then(Value::as_bool)
            .unwrap_or(true);
        if executed {
            Ok(())
        } else {
            let message = response
                .get("response")
                .and_then(|r| r.get("error"))
                .and_then(Value::as_str)
                .unwrap_or("request not executed")
                .to_string();
            Err(BrokerApiError::Rejected(message))
        }
    }
}

#[async_trait]
impl BrokerAdapter for FxcmAdapter {
    async fn validate_credentials(&self) -> Result<bool, BrokerApiError> {
        let request = self.request(reqwest::Method::GET, "/trading/get_model?models=Account")?;
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
        let account_id = self.credentials.require("account_id")?.to_string();
        let is_buy = matches!(request.side, OrderSide::Buy);

        let (path, mut form): (&str, Vec<(&str, String)>) = match request.order_type {
            OrderType::Market => (
                "/trading/open_trade",
                vec![("order_type", "AtMarket".to_string())],
            ),
            // Resting orders carry their trigger in `rate`; a stop-limit adds
            // the protective limit leg.
            OrderType::Limit => (
                "/trading/create_entry_order",
                vec![(
                    "rate",
                    request
                        .limit_price
                        .map(|p| p.to_string())
                        .unwrap_or_default(),
                )],
            ),
            OrderType::Stop | OrderType::StopLimit => {
                let mut form = vec![(
                    "rate",
                    request
                        .stop_price
                        .map(|p| p.to_string())
                        .unwrap_or_default(),
                )];
                if request.order_type == OrderType::StopLimit {
                    if let Some(limit) = request.limit_price {
                        form.push(("limit", limit.to_string()));
                    }
                }
                ("/trading/create_entry_order", form)
            }
        };

        form.extend([
            ("account_id", account_id),
            ("symbol", request.symbol.clone()),
            ("is_buy", is_buy.to_string()),
            ("amount", request.quantity.to_string()),
            ("time_in_force", "GTC".to_string()),
        ]);

        let response = self
            .http
            .execute(self.request(reqwest::Method::POST, path)?.form(&form))
            .await?;
        Self::ensure_executed(&response)?;

        let vendor_order_id = response
            .get("data")
            .and_then(|d| d.get("orderId"))
            .map(|id| match id {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .ok_or_else(|| BrokerApiError::Decode("order response missing data.orderId".into()))?;

        tracing::info!(
            vendor = "fxcm",
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
        let request = self.request(reqwest::Method::GET, "/trading/get_model?models=Order")?;
        let response = self.http.execute(request).await?;
        Self::ensure_executed(&response)?;

        let order = response
            .get("orders")
            .and_then(Value::as_array)
            .and_then(|orders| {
                orders
                    .iter()
                    .find(|o| {
                        o.get("orderId")
                            .map(|id| match id {
                                Value::String(s) => s == vendor_order_id,
                                other => other.to_string() == vendor_order_id,
                            })
                            .unwrap_or(false)
                    })
                    .cloned()
            })
            .ok_or_else(|| BrokerApiError::NotFound(format!("order {vendor_order_id}")))?;

        Ok(Self::update_from_order(order))
    }

    async fn cancel_order(&self, vendor_order_id: &str) -> Result<bool, BrokerApiError> {
        let form = [("order_id", vendor_order_id.to_string())];
        match self
            .http
            .execute(
                self.request(reqwest::Method::POST, "/trading/delete_order")?
                    .form(&form),
            )
            .await
        {
            Ok(response) => match Self::ensure_executed(&response) {
                Ok(()) => Ok(true),
                Err(_) => Ok(false),
            },
            Err(BrokerApiError::Rejected(_) | BrokerApiError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn get_account_info(&self) -> Result<Value, BrokerApiError> {
        let request = self.request(reqwest::Method::GET, "/trading/get_model?models=Account")?;
        self.http.execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_table_covers_model_vocabulary() {
        assert_eq!(FxcmAdapter::map_status("waiting"), OrderStatus::Submitted);
        assert_eq!(FxcmAdapter::map_status("executing"), OrderStatus::Accepted);
        assert_eq!(FxcmAdapter::map_status("executed"), OrderStatus::Filled);
        assert_eq!(FxcmAdapter::map_status("canceled"), OrderStatus::Canceled);
        assert_eq!(FxcmAdapter::map_status("rejected"), OrderStatus::Rejected);
        assert_eq!(FxcmAdapter::map_status("expired"), OrderStatus::Expired);
        assert_eq!(FxcmAdapter::map_status("w"), OrderStatus::Pending);
    }

    #[test]
    fn unexecuted_envelope_is_a_rejection() {
        let response = serde_json::json!({
            "response": {"executed": false, "error": "market closed"}
        });
        let err = FxcmAdapter::ensure_executed(&response).unwrap_err();
        match err {
            BrokerApiError::Rejected(msg) => assert_eq!(msg, "market closed"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn executed_envelope_passes() {
        let response = serde_json::json!({"response": {"executed": true}});
        assert!(FxcmAdapter::ensure_executed(&response).is_ok());
    }
}

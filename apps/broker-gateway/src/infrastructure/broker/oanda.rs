//! OANDA adapter (forex).
//!
//! Auth: personal access token as a bearer header; the account id rides in
//! every path. Order direction is encoded in the sign of `units`.
//! Credential fields: `api_key`, `account_id`.

use async_trait::async_trait;
use serde_json::Value;

use crate::application::ports::{BrokerAdapter, BrokerApiError, OrderTicket, OrderTicketRequest};
use crate::domain::broker::Credentials;
use crate::domain::order::{OrderSide, OrderStatus, OrderStatusUpdate, OrderType};

use super::http::{VendorHttpClient, decimal_field, string_field};

/// OANDA broker adapter.
#[derive(Debug, Clone)]
pub struct OandaAdapter {
    base_url: String,
    credentials: Credentials,
    http: VendorHttpClient,
}

impl OandaAdapter {
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
            .bearer_auth(token))
    }

    fn account_id(&self) -> Result<&str, BrokerApiError> {
        Ok(self.credentials.require("account_id")?)
    }

    /// OANDA has no stop-limit order; those fall back to a plain stop, the
    /// documented default for this vendor.
    const fn map_order_type(order_type: OrderType) -> &'static str {
        match order_type {
            OrderType::Market => "MARKET",
            OrderType::Limit => "LIMIT",
            OrderType::Stop | OrderType::StopLimit => "STOP",
        }
    }

    fn map_status(raw: &str) -> OrderStatus {
        match raw.to_uppercase().as_str() {
            "PENDING" | "TRIGGERED" => OrderStatus::Accepted,
            "FILLED" => OrderStatus::Filled,
            "CANCELLED" => OrderStatus::Canceled,
            other => {
                tracing::warn!(vendor = "oanda", status = other, "unrecognized vendor status");
                OrderStatus::Pending
            }
        }
    }

    fn update_from(payload: Value) -> OrderStatusUpdate {
        let order = payload.get("order").cloned().unwrap_or_else(|| payload.clone());
        let status = string_field(&order, "state")
            .map_or(OrderStatus::Pending, |s| Self::map_status(&s));

        let filled = (status == OrderStatus::Filled)
            .then(|| decimal_field(&order, "units").map(|units| units.abs()))
            .flatten();

        OrderStatusUpdate {
            status,
            filled_quantity: filled,
            filled_price: decimal_field(&order, "averageFillPrice")
                .or_else(|| decimal_field(&order, "price")),
            commission: None,
            raw: payload,
        }
    }

    fn order_body(request: &OrderTicketRequest) -> Value {
        // Negative units sell, positive units buy.
        let units = match request.side {
            OrderSide::Buy => request.quantity.to_string(),
            OrderSide::Sell => format!("-{}", request.quantity),
        };

        let mut order = serde_json::json!({
            "type": Self::map_order_type(request.order_type),
            "instrument": request.symbol,
            "units": units,
            "timeInForce": if request.order_type == OrderType::Market { "FOK" } else { "GTC" },
        });

        match request.order_type {
            OrderType::Market => {}
            OrderType::Limit => {
                if let Some(price) = request.limit_price {
                    order["price"] = Value::String(price.to_string());
                }
            }
            OrderType::Stop | OrderType::StopLimit => {
                if let Some(stop) = request.stop_price {
                    order["price"] = Value::String(stop.to_string());
                }
            }
        }

        serde_json::json!({ "order": order })
    }
}

#[async_trait]
impl BrokerAdapter for OandaAdapter {
    async fn validate_credentials(&self) -> Result<bool, BrokerApiError> {
        let account_id = self.account_id()?.to_string();
        let request = self.request(reqwest::Method::GET, &format!("/v3/accounts/{account_id}"))?;
        match self.http.execute(request).await {
            Ok(response) => Ok(response.get("account").is_some()),
            Err(BrokerApiError::AuthRejected) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn submit_order(
        &self,
        request: &OrderTicketRequest,
    ) -> Result<OrderTicket, BrokerApiError> {
        let account_id = self.account_id()?.to_string();
        let body = Self::order_body(request);
        let response = self
            .http
            .execute(
                self.request(
                    reqwest::Method::POST,
                    &format!("/v3/accounts/{account_id}/orders"),
                )?
                .json(&body),
            )
            .await?;

        let vendor_order_id = response
            .get("orderCreateTransaction")
            .and_then(|tx| tx.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                BrokerApiError::Decode("order response missing orderCreateTransaction.id".into())
            })?;

        tracing::info!(
            vendor = "oanda",
            vendor_order_id,
            instrument = %request.symbol,
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
            &format!("/v3/accounts/{account_id}/orders/{vendor_order_id}"),
        )?;
        let payload = self.http.execute(request).await?;
        Ok(Self::update_from(payload))
    }

    async fn cancel_order(&self, vendor_order_id: &str) -> Result<bool, BrokerApiError> {
        let account_id = self.account_id()?.to_string();
        let request = self.request(
            reqwest::Method::PUT,
            &format!("/v3/accounts/{account_id}/orders/{vendor_order_id}/cancel"),
        )?;
        match self.http.execute(request).await {
            Ok(_) => Ok(true),
            Err(BrokerApiError::Rejected(_) | BrokerApiError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn get_account_info(&self) -> Result<Value, BrokerApiError> {
        let account_id = self.account_id()?.to_string();
        let request = self.request(reqwest::Method::GET, &format!("/v3/accounts/{account_id}"))?;
        self.http.execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn request(side: OrderSide, order_type: OrderType) -> OrderTicketRequest {
        OrderTicketRequest {
            symbol: "EUR_USD".into(),
            side,
            order_type,
            quantity: Decimal::new(1000, 0),
            limit_price: Some(Decimal::new(108, 2)),
            stop_price: Some(Decimal::new(105, 2)),
        }
    }

    #[test]
    fn sell_orders_negate_units() {
        let body = OandaAdapter::order_body(&request(OrderSide::Sell, OrderType::Market));
        assert_eq!(body["order"]["units"], "-1000");
        let body = OandaAdapter::order_body(&request(OrderSide::Buy, OrderType::Market));
        assert_eq!(body["order"]["units"], "1000");
    }

    #[test]
    fn stop_limit_falls_back_to_stop() {
        assert_eq!(OandaAdapter::map_order_type(OrderType::StopLimit), "STOP");
    }

    #[test]
    fn market_orders_use_fok() {
        let body = OandaAdapter::order_body(&request(OrderSide::Buy, OrderType::Market));
        assert_eq!(body["order"]["timeInForce"], "FOK");
        let body = OandaAdapter::order_body(&request(OrderSide::Buy, OrderType::Limit));
        assert_eq!(body["order"]["timeInForce"], "GTC");
    }

    #[test]
    fn filled_state_reports_absolute_units() {
        let payload = serde_json::json!({
            "order": {"state": "FILLED", "units": "-1000", "averageFillPrice": "1.0850"}
        });
        let update = OandaAdapter::update_from(payload);
        assert_eq!(update.status, OrderStatus::Filled);
        assert_eq!(update.filled_quantity.unwrap().to_string(), "1000");
        assert_eq!(update.filled_price.unwrap().to_string(), "1.0850");
    }

    #[test]
    fn unknown_state_falls_back_to_pending() {
        assert_eq!(OandaAdapter::map_status("MELTED"), OrderStatus::Pending);
    }
}

//! HTTP request DTOs.

use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;

use crate::domain::order::{OrderSide, OrderType};

/// Body of `POST /brokers/connect`.
///
/// `vendor` and `asset_class` stay strings here so unknown identifiers map to
/// the gateway's own error kinds instead of a generic decode failure.
#[derive(Debug, Deserialize)]
pub struct ConnectBrokerRequest {
    /// Vendor identifier.
    pub vendor: String,
    /// Opaque credential fields, forwarded to the vendor adapter unread.
    pub credentials: HashMap<String, String>,
    /// Optional asset class to pin the connection to.
    #[serde(default, alias = "assetClass")]
    pub asset_class: Option<String>,
    /// Whether this is a demo/paper account.
    #[serde(default, alias = "isDemo")]
    pub is_demo: bool,
}

/// Body of `POST /brokers/orders`.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    /// Instrument symbol in the vendor's notation.
    pub symbol: String,
    /// Buy or sell.
    pub side: OrderSide,
    /// Execution type.
    #[serde(rename = "type")]
    pub order_type: OrderType,
    /// Requested quantity.
    pub quantity: Decimal,
    /// Limit price for limit and stop-limit orders.
    #[serde(default)]
    pub price: Option<Decimal>,
    /// Stop price for stop and stop-limit orders.
    #[serde(default, alias = "stopPrice")]
    pub stop_price: Option<Decimal>,
}

/// Query string of `GET /brokers/connections`.
#[derive(Debug, Deserialize)]
pub struct ConnectionsQuery {
    /// Restrict the listing to one asset class.
    #[serde(default, alias = "assetClass")]
    pub asset_class: Option<String>,
}

/// Query string of `GET /brokers/oauth/callback`.
#[derive(Debug, Deserialize)]
pub struct OAuthCallbackQuery {
    /// Authorization code returned by the vendor.
    pub code: String,
    /// Vendor identifier.
    pub vendor: String,
    /// Opaque owner reference round-tripped through the vendor.
    #[serde(default)]
    pub state: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_request_accepts_camel_case_aliases() {
        let body = r#"{
            "vendor": "alpaca",
            "credentials": {"api_key": "k", "api_secret": "s"},
            "assetClass": "stocks",
            "isDemo": true
        }"#;
        let request: ConnectBrokerRequest = serde_json::from_str(body).unwrap();
        assert_eq!(request.asset_class.as_deref(), Some("stocks"));
        assert!(request.is_demo);
    }

    #[test]
    fn order_request_parses_type_field() {
        let body = r#"{
            "symbol": "XYZ",
            "side": "buy",
            "type": "stop_limit",
            "quantity": "10",
            "price": "101.5",
            "stopPrice": "100.0"
        }"#;
        let request: CreateOrderRequest = serde_json::from_str(body).unwrap();
        assert_eq!(request.order_type, OrderType::StopLimit);
        assert_eq!(request.stop_price.unwrap().to_string(), "100.0");
    }
}

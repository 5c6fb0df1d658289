//! HTTP response DTOs and error mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::broker::{AssetClass, BrokerConnection, Vendor};
use crate::domain::order::{Order, OrderSide, OrderStatus, OrderType};
use crate::error::GatewayError;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: &'static str,
    /// Crate version.
    pub version: &'static str,
}

/// OAuth authorize URL response.
#[derive(Debug, Serialize)]
pub struct AuthUrlResponse {
    /// URL to redirect the caller to.
    pub auth_url: String,
}

/// A broker connection as exposed to callers. Credentials never leave the
/// store boundary.
#[derive(Debug, Serialize)]
pub struct ConnectionResponse {
    /// Connection ID.
    pub id: String,
    /// Vendor.
    pub vendor: Vendor,
    /// Asset class.
    pub asset_class: AssetClass,
    /// Whether the connection is usable for trading.
    pub is_active: bool,
    /// Whether this is a demo/paper account.
    pub is_demo: bool,
    /// When the vendor last accepted the credentials.
    pub last_connected_at: DateTime<Utc>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<BrokerConnection> for ConnectionResponse {
    fn from(connection: BrokerConnection) -> Self {
        Self {
            id: connection.id,
            vendor: connection.vendor,
            asset_class: connection.asset_class,
            is_active: connection.is_active,
            is_demo: connection.is_demo,
            last_connected_at: connection.last_connected_at,
            created_at: connection.created_at,
        }
    }
}

/// An order as exposed to callers.
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    /// Order ID.
    pub id: String,
    /// Owning connection.
    pub connection_id: String,
    /// Vendor order handle.
    pub vendor_order_id: String,
    /// Instrument symbol.
    pub symbol: String,
    /// Buy or sell.
    pub side: OrderSide,
    /// Execution type.
    #[serde(rename = "type")]
    pub order_type: OrderType,
    /// Asset class.
    pub asset_class: AssetClass,
    /// Requested quantity.
    pub quantity: Decimal,
    /// Limit price.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<Decimal>,
    /// Stop price.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_price: Option<Decimal>,
    /// Normalized status.
    pub status: OrderStatus,
    /// Average fill price.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filled_price: Option<Decimal>,
    /// Quantity filled so far.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filled_quantity: Option<Decimal>,
    /// Commission charged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission: Option<Decimal>,
    /// When the order filled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filled_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            connection_id: order.connection_id,
            vendor_order_id: order.vendor_order_id,
            symbol: order.symbol,
            side: order.side,
            order_type: order.order_type,
            asset_class: order.asset_class,
            quantity: order.quantity,
            limit_price: order.limit_price,
            stop_price: order.stop_price,
            status: order.status,
            filled_price: order.filled_price,
            filled_quantity: order.filled_quantity,
            commission: order.commission,
            filled_at: order.filled_at,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

/// Result of `DELETE /brokers/orders/{id}`.
#[derive(Debug, Serialize)]
pub struct CancelOrderResponse {
    /// Whether the vendor acknowledged the cancel.
    pub canceled: bool,
    /// The order after the attempt.
    pub order: OrderResponse,
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Stable machine-readable code.
    pub code: &'static str,
    /// Human-readable message.
    pub message: String,
    /// Whether retrying the same request may succeed.
    pub retryable: bool,
}

/// Wrapper turning [`GatewayError`] into an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub GatewayError);

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        Self(err)
    }
}

impl ApiError {
    /// HTTP status for each error kind.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match &self.0 {
            GatewayError::UnsupportedVendor(_)
            | GatewayError::AssetClassNotSupported { .. }
            | GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            GatewayError::Forbidden => StatusCode::FORBIDDEN,
            GatewayError::NotFound(_) | GatewayError::NoActiveConnection => StatusCode::NOT_FOUND,
            GatewayError::InvalidState(_) => StatusCode::CONFLICT,
            GatewayError::SubmissionRejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            GatewayError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            GatewayError::Transport(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        let body = ErrorBody {
            code: self.0.code(),
            message: self.0.to_string(),
            retryable: self.0.is_retryable(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_map_to_expected_statuses() {
        let cases = [
            (
                GatewayError::UnsupportedVendor("etrade".into()),
                StatusCode::BAD_REQUEST,
            ),
            (GatewayError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (GatewayError::Forbidden, StatusCode::FORBIDDEN),
            (GatewayError::NoActiveConnection, StatusCode::NOT_FOUND),
            (
                GatewayError::InvalidState("already FILLED".into()),
                StatusCode::CONFLICT,
            ),
            (
                GatewayError::SubmissionRejected("nope".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                GatewayError::Transport("timeout".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                GatewayError::NotImplemented(Vendor::Cme),
                StatusCode::NOT_IMPLEMENTED,
            ),
        ];
        for (error, expected) in cases {
            assert_eq!(ApiError(error).status_code(), expected);
        }
    }

    #[test]
    fn connection_response_omits_credentials() {
        let connection = BrokerConnection::new(
            "u1",
            Vendor::Alpaca,
            AssetClass::Stocks,
            crate::domain::broker::Credentials::new().with("api_key", "secret-key"),
            false,
            None,
        );
        let response = ConnectionResponse::from(connection);
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("secret-key"));
        assert!(!json.contains("credentials"));
    }
}

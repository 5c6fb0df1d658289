//! Broker adapter contract (driven port).
//!
//! Every vendor integration implements this trait. Adapters own their
//! authentication scheme end to end: the gateway hands them the opaque
//! credential blob and never inspects its shape.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::broker::MissingCredential;
use crate::domain::order::{OrderSide, OrderStatusUpdate, OrderType};
use crate::error::GatewayError;

/// The order fields an adapter translates into its vendor's request shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderTicketRequest {
    /// Instrument symbol in the vendor's notation.
    pub symbol: String,
    /// Buy or sell.
    pub side: OrderSide,
    /// Execution type.
    pub order_type: OrderType,
    /// Requested quantity.
    pub quantity: Decimal,
    /// Limit price for limit and stop-limit orders.
    pub limit_price: Option<Decimal>,
    /// Stop price for stop and stop-limit orders.
    pub stop_price: Option<Decimal>,
}

/// Acknowledgment of a submitted order.
#[derive(Debug, Clone)]
pub struct OrderTicket {
    /// The vendor's order handle, used for all later status/cancel calls.
    pub vendor_order_id: String,
    /// The raw vendor response, uninterpreted.
    pub raw: serde_json::Value,
}

/// Errors from vendor API calls.
///
/// Authentication-class rejections are distinct from transport failures so
/// callers can tell "wrong credentials" from "vendor unreachable".
#[derive(Debug, Clone, Error)]
pub enum BrokerApiError {
    /// Network-level failure reaching the vendor. Retryable.
    #[error("transport error: {0}")]
    Transport(String),

    /// The request timed out.
    #[error("request timed out")]
    Timeout,

    /// The vendor rejected the credentials (401/403-class).
    #[error("authentication rejected")]
    AuthRejected,

    /// The vendor accepted the call but refused the order; message verbatim.
    #[error("rejected: {0}")]
    Rejected(String),

    /// The referenced vendor resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The vendor returned an error payload outside the above classes.
    #[error("vendor error: {0}")]
    Api(String),

    /// The vendor response could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// The credential blob lacks a field this vendor requires.
    #[error(transparent)]
    Credential(#[from] MissingCredential),

    /// The vendor integration does not implement this operation.
    #[error("operation not implemented")]
    NotImplemented,
}

impl BrokerApiError {
    /// Whether the failure is transport-class (retryable without change).
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout)
    }
}

/// Builds the adapter for a vendor/credential pair.
///
/// Pure construction with no I/O; implemented by the vendor registry.
pub trait AdapterFactory: Send + Sync {
    /// Build an adapter bound to one credential blob.
    fn create_adapter(
        &self,
        vendor: crate::domain::broker::Vendor,
        credentials: &crate::domain::broker::Credentials,
    ) -> std::sync::Arc<dyn BrokerAdapter>;
}

/// Capability contract every vendor adapter satisfies.
#[async_trait]
pub trait BrokerAdapter: Send + Sync {
    /// Perform a cheap authenticated read to check the credentials.
    ///
    /// Returns `Ok(false)` on an authentication-class rejection; transport
    /// failures propagate as errors so callers can distinguish the two.
    async fn validate_credentials(&self) -> Result<bool, BrokerApiError>;

    /// Translate and submit an order, returning the vendor's order handle.
    async fn submit_order(&self, request: &OrderTicketRequest)
    -> Result<OrderTicket, BrokerApiError>;

    /// Fetch and normalize the current status of a vendor order.
    async fn get_order_status(
        &self,
        vendor_order_id: &str,
    ) -> Result<OrderStatusUpdate, BrokerApiError>;

    /// Cancel a vendor order.
    ///
    /// Idempotent: canceling an order that is already terminal at the vendor
    /// returns `Ok(false)` rather than an error.
    async fn cancel_order(&self, vendor_order_id: &str) -> Result<bool, BrokerApiError>;

    /// Fetch an opaque account summary.
    async fn get_account_info(&self) -> Result<serde_json::Value, BrokerApiError>;
}

impl From<BrokerApiError> for GatewayError {
    fn from(err: BrokerApiError) -> Self {
        match err {
            BrokerApiError::Transport(msg) => Self::Transport(msg),
            BrokerApiError::Timeout => Self::Transport("request timed out".to_string()),
            BrokerApiError::AuthRejected => Self::InvalidCredentials,
            BrokerApiError::Rejected(msg) => Self::SubmissionRejected(msg),
            BrokerApiError::NotFound(what) => Self::NotFound(what),
            BrokerApiError::Credential(e) => Self::InvalidRequest(e.to_string()),
            BrokerApiError::NotImplemented => Self::Internal("operation not implemented".into()),
            BrokerApiError::Api(msg) | BrokerApiError::Decode(msg) => Self::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_class_detection() {
        assert!(BrokerApiError::Timeout.is_transport());
        assert!(BrokerApiError::Transport("refused".into()).is_transport());
        assert!(!BrokerApiError::AuthRejected.is_transport());
    }

    #[test]
    fn auth_rejection_maps_to_invalid_credentials() {
        let err: GatewayError = BrokerApiError::AuthRejected.into();
        assert!(matches!(err, GatewayError::InvalidCredentials));
    }

    #[test]
    fn vendor_rejection_message_survives_mapping() {
        let err: GatewayError = BrokerApiError::Rejected("min notional not met".into()).into();
        match err {
            GatewayError::SubmissionRejected(msg) => assert_eq!(msg, "min notional not met"),
            other => panic!("unexpected mapping: {other:?}"),
        }
    }
}

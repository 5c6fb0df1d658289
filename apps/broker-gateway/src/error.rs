//! Gateway error taxonomy.
//!
//! One error kind per failure class a caller can observe. The HTTP layer maps
//! each kind to a status code; transport failures inside the reconciliation
//! loop never reach this type (they are logged and retried on the next tick).

use thiserror::Error;

use crate::domain::broker::{AssetClass, Vendor};

/// Errors surfaced by caller-facing gateway operations.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The vendor identifier does not name a known vendor.
    #[error("unsupported vendor: {0}")]
    UnsupportedVendor(String),

    /// The vendor does not trade the requested asset class.
    #[error("{vendor} does not support asset class {asset_class}")]
    AssetClassNotSupported {
        /// The vendor that was asked.
        vendor: Vendor,
        /// The unsupported asset class.
        asset_class: AssetClass,
    },

    /// The vendor rejected the supplied credentials.
    #[error("vendor rejected the supplied credentials")]
    InvalidCredentials,

    /// Malformed or incomplete request from the caller.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Network failure or timeout talking to the vendor. Retryable.
    #[error("vendor unreachable: {0}")]
    Transport(String),

    /// The caller has no active broker connection.
    #[error("no active broker connection")]
    NoActiveConnection,

    /// The referenced record does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// The record exists but belongs to a different owner.
    #[error("not permitted for this owner")]
    Forbidden,

    /// The operation is invalid in the record's current state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The vendor accepted the call but refused the order. The vendor's
    /// message is preserved verbatim for display.
    #[error("order rejected by vendor: {0}")]
    SubmissionRejected(String),

    /// The vendor integration does not implement this operation.
    #[error("not implemented for vendor: {0}")]
    NotImplemented(Vendor),

    /// Unexpected internal failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Stable machine-readable code for API responses.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedVendor(_) => "UNSUPPORTED_VENDOR",
            Self::AssetClassNotSupported { .. } => "ASSET_CLASS_NOT_SUPPORTED",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::Transport(_) => "TRANSPORT_ERROR",
            Self::NoActiveConnection => "NO_ACTIVE_CONNECTION",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Forbidden => "FORBIDDEN",
            Self::InvalidState(_) => "INVALID_STATE",
            Self::SubmissionRejected(_) => "SUBMISSION_REJECTED",
            Self::NotImplemented(_) => "NOT_IMPLEMENTED",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether a caller may retry the same request unchanged.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

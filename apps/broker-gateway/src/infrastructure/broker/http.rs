//! Shared HTTP plumbing for vendor adapters.
//!
//! Adapters build their own requests (each owns its signing scheme); this
//! wrapper executes them under a bounded timeout and folds HTTP failures into
//! the common error classes. Vendor error messages are preserved verbatim so
//! they can be shown to the user.

use std::time::Duration;

use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

use crate::application::ports::BrokerApiError;

/// HTTP client shared across adapters.
#[derive(Debug, Clone)]
pub struct VendorHttpClient {
    client: reqwest::Client,
}

impl VendorHttpClient {
    /// Build a client with the given per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self, BrokerApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BrokerApiError::Transport(e.to_string()))?;
        Ok(Self { client })
    }

    /// The underlying reqwest client, for adapters to build requests on.
    #[must_use]
    pub const fn inner(&self) -> &reqwest::Client {
        &self.client
    }

    /// Execute a request and decode the JSON body.
    ///
    /// Empty success bodies decode to `Value::Null`.
    pub async fn execute(&self, request: reqwest::RequestBuilder) -> Result<Value, BrokerApiError> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                BrokerApiError::Timeout
            } else {
                BrokerApiError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BrokerApiError::Transport(e.to_string()))?;

        if status.is_success() {
            if body.trim().is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_str(&body).map_err(|e| BrokerApiError::Decode(e.to_string()));
        }

        Err(classify_failure(status, &body))
    }
}

/// Fold a non-success HTTP response into an error class.
fn classify_failure(status: StatusCode, body: &str) -> BrokerApiError {
    let message = vendor_message(body).unwrap_or_else(|| {
        if body.trim().is_empty() {
            status.to_string()
        } else {
            body.trim().to_string()
        }
    });

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BrokerApiError::AuthRejected,
        StatusCode::NOT_FOUND => BrokerApiError::NotFound(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            BrokerApiError::Rejected(message)
        }
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            BrokerApiError::Transport(message)
        }
        s if s.is_server_error() => BrokerApiError::Transport(message),
        _ => BrokerApiError::Api(message),
    }
}

/// Pull a human-readable message out of a vendor error body.
fn vendor_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    for key in ["message", "error", "msg", "errorMessage", "reason"] {
        if let Some(msg) = value.get(key).and_then(Value::as_str) {
            return Some(msg.to_string());
        }
    }
    // Kraken-style: {"error": ["EOrder:Insufficient funds"]}
    if let Some(errors) = value.get("error").and_then(Value::as_array) {
        let joined: Vec<&str> = errors.iter().filter_map(Value::as_str).collect();
        if !joined.is_empty() {
            return Some(joined.join(", "));
        }
    }
    None
}

/// Read a decimal out of a JSON value that may be a string or a number.
pub(crate) fn decimal_from(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => Decimal::from_str(s).ok(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        _ => None,
    }
}

/// Read a decimal field from a JSON object.
pub(crate) fn decimal_field(object: &Value, key: &str) -> Option<Decimal> {
    object.get(key).and_then(decimal_from)
}

/// Read a string field from a JSON object.
pub(crate) fn string_field(object: &Value, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).map(str::to_string)
}

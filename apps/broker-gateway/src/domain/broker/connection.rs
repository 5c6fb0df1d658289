//! Broker connection records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::asset_class::AssetClass;
use super::credentials::Credentials;
use super::vendor::Vendor;

/// A persisted, credentialed link between a user and a vendor for one asset
/// class.
///
/// Connections are deactivated on disconnect or credential rejection, never
/// deleted, and are not mutated by the reconciliation loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConnection {
    /// Connection ID.
    pub id: String,
    /// Opaque reference to the owning user.
    pub owner_id: String,
    /// The vendor this connection targets.
    pub vendor: Vendor,
    /// The single asset class this connection is scoped to.
    pub asset_class: AssetClass,
    /// Opaque credential blob, interpreted only by the matching adapter.
    pub credentials: Credentials,
    /// Whether the connection is currently usable for trading.
    pub is_active: bool,
    /// Whether this is a demo/paper account.
    pub is_demo: bool,
    /// When the vendor last accepted these credentials.
    pub last_connected_at: DateTime<Utc>,
    /// Vendor account summary captured at connection time, uninterpreted.
    pub account_snapshot: Option<serde_json::Value>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl BrokerConnection {
    /// Create an active connection after a successful credential validation.
    #[must_use]
    pub fn new(
        owner_id: impl Into<String>,
        vendor: Vendor,
        asset_class: AssetClass,
        credentials: Credentials,
        is_demo: bool,
        account_snapshot: Option<serde_json::Value>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.into(),
            vendor,
            asset_class,
            credentials,
            is_active: true,
            is_demo,
            last_connected_at: now,
            account_snapshot,
            created_at: now,
            updated_at: now,
        }
    }

    /// Deactivate the connection. Idempotent.
    pub fn deactivate(&mut self) {
        if self.is_active {
            self.is_active = false;
            self.updated_at = Utc::now();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection() -> BrokerConnection {
        BrokerConnection::new(
            "user-1",
            Vendor::Alpaca,
            AssetClass::Stocks,
            Credentials::new().with("api_key", "k").with("api_secret", "s"),
            false,
            None,
        )
    }

    #[test]
    fn new_connection_is_active() {
        let conn = connection();
        assert!(conn.is_active);
        assert!(!conn.is_demo);
        assert_eq!(conn.vendor, Vendor::Alpaca);
    }

    #[test]
    fn deactivate_is_idempotent() {
        let mut conn = connection();
        conn.deactivate();
        let first_update = conn.updated_at;
        conn.deactivate();
        assert!(!conn.is_active);
        assert_eq!(conn.updated_at, first_update);
    }
}

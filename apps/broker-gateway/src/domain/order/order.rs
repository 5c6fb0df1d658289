//! Order records and their mutation rules.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::broker::AssetClass;

use super::state_machine;
use super::status::OrderStatus;
use super::types::{OrderSide, OrderType};

/// A normalized view of one vendor status poll.
///
/// Produced by the owning adapter: `status` has already been mapped through
/// the vendor's status table, fill fields are present when the vendor reports
/// them, and `raw` preserves the vendor payload verbatim for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusUpdate {
    /// Normalized status.
    pub status: OrderStatus,
    /// Quantity filled so far.
    pub filled_quantity: Option<Decimal>,
    /// Average fill price.
    pub filled_price: Option<Decimal>,
    /// Commission charged, when the vendor reports it.
    pub commission: Option<Decimal>,
    /// The raw vendor payload, uninterpreted.
    pub raw: serde_json::Value,
}

impl OrderStatusUpdate {
    /// An update carrying only a status, no fill details.
    #[must_use]
    pub fn status_only(status: OrderStatus, raw: serde_json::Value) -> Self {
        Self {
            status,
            filled_quantity: None,
            filled_price: None,
            commission: None,
            raw,
        }
    }
}

/// Fields required to create an order at submission time.
#[derive(Debug, Clone)]
pub struct NewOrder {
    /// Owning user.
    pub owner_id: String,
    /// The connection the order was routed through.
    pub connection_id: String,
    /// Vendor-assigned order handle.
    pub vendor_order_id: String,
    /// Instrument symbol in the vendor's notation.
    pub symbol: String,
    /// Buy or sell.
    pub side: OrderSide,
    /// Execution type.
    pub order_type: OrderType,
    /// Asset class, inherited from the connection.
    pub asset_class: AssetClass,
    /// Requested quantity.
    pub quantity: Decimal,
    /// Limit price for limit and stop-limit orders.
    pub limit_price: Option<Decimal>,
    /// Stop price for stop and stop-limit orders.
    pub stop_price: Option<Decimal>,
}

/// A persisted order record.
///
/// Mutated only by the reconciliation loop (via [`Order::record_update`]) and
/// by explicit cancel; never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Order ID.
    pub id: String,
    /// Owning user.
    pub owner_id: String,
    /// Owning connection; immutable after creation.
    pub connection_id: String,
    /// Vendor order handle; immutable once set.
    pub vendor_order_id: String,
    /// Instrument symbol.
    pub symbol: String,
    /// Buy or sell.
    pub side: OrderSide,
    /// Execution type.
    pub order_type: OrderType,
    /// Asset class.
    pub asset_class: AssetClass,
    /// Requested quantity.
    pub quantity: Decimal,
    /// Limit price, if any.
    pub limit_price: Option<Decimal>,
    /// Stop price, if any.
    pub stop_price: Option<Decimal>,
    /// Normalized status.
    pub status: OrderStatus,
    /// Average fill price.
    pub filled_price: Option<Decimal>,
    /// Quantity filled so far. Never exceeds `quantity`.
    pub filled_quantity: Option<Decimal>,
    /// Commission charged.
    pub commission: Option<Decimal>,
    /// When the order (fully) filled.
    pub filled_at: Option<DateTime<Utc>>,
    /// Last raw vendor status payload, diagnostic only.
    pub vendor_status_detail: Option<serde_json::Value>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Create an order in `Submitted` state after a successful vendor submit.
    #[must_use]
    pub fn new(new: NewOrder) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id: new.owner_id,
            connection_id: new.connection_id,
            vendor_order_id: new.vendor_order_id,
            symbol: new.symbol,
            side: new.side,
            order_type: new.order_type,
            asset_class: new.asset_class,
            quantity: new.quantity,
            limit_price: new.limit_price,
            stop_price: new.stop_price,
            status: OrderStatus::Submitted,
            filled_price: None,
            filled_quantity: None,
            commission: None,
            filled_at: None,
            vendor_status_detail: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply one reconciliation poll.
    ///
    /// Idempotent: terminal orders are left untouched, stale (backward)
    /// statuses keep the stored state, and reported fill quantities are
    /// clamped to the order quantity. Returns whether anything changed.
    pub fn record_update(&mut self, update: &OrderStatusUpdate) -> bool {
        let transition = state_machine::advance(self.status, update.status);
        if !transition.applied() {
            return false;
        }

        self.status = transition.resolved();
        self.vendor_status_detail = Some(update.raw.clone());

        if matches!(
            self.status,
            OrderStatus::PartiallyFilled | OrderStatus::Filled
        ) {
            if let Some(qty) = update.filled_quantity {
                self.filled_quantity = Some(qty.min(self.quantity));
            }
            if update.filled_price.is_some() {
                self.filled_price = update.filled_price;
            }
            if update.commission.is_some() {
                self.commission = update.commission;
            }
            if self.status == OrderStatus::Filled && self.filled_at.is_none() {
                self.filled_at = Some(Utc::now());
            }
        }

        self.updated_at = Utc::now();
        true
    }

    /// Mark the order canceled after a successful vendor cancel.
    ///
    /// Returns false when the order is already terminal.
    pub fn mark_canceled(&mut self) -> bool {
        match state_machine::cancel(self.status) {
            Some(status) => {
                self.status = status;
                self.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }
}

//! Order status transition rules.

use super::status::OrderStatus;

/// Decide what a polled status does to the stored status.
///
/// Polling writes are idempotent and may arrive out of order, so this is a
/// lattice rather than a strict transition table: forward moves and repeats
/// are applied, backward moves are kept at the stored state, and terminal
/// states never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The observed status advances (or re-confirms) the stored one.
    Apply(OrderStatus),
    /// The observed status is stale relative to the stored one; keep stored.
    Keep(OrderStatus),
}

impl Transition {
    /// The status the order should hold after this transition.
    #[must_use]
    pub const fn resolved(&self) -> OrderStatus {
        match self {
            Self::Apply(s) | Self::Keep(s) => *s,
        }
    }

    /// Whether the observed status was actually applied.
    #[must_use]
    pub const fn applied(&self) -> bool {
        matches!(self, Self::Apply(_))
    }
}

/// Reconcile an observed status against the stored one.
#[must_use]
pub fn advance(stored: OrderStatus, observed: OrderStatus) -> Transition {
    if stored.is_terminal() {
        return Transition::Keep(stored);
    }
    // Repeats of PartiallyFilled carry updated fill quantities, so equal rank
    // still applies.
    if observed.rank() >= stored.rank() {
        Transition::Apply(observed)
    } else {
        Transition::Keep(stored)
    }
}

/// An explicit cancel from a non-terminal state.
///
/// Returns `None` when the order is already terminal.
#[must_use]
pub fn cancel(stored: OrderStatus) -> Option<OrderStatus> {
    if stored.is_terminal() {
        None
    } else {
        Some(OrderStatus::Canceled)
    }
}

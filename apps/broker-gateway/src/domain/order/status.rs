//! Normalized order status.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Vendor-agnostic order status.
///
/// Every vendor's raw status vocabulary is mapped into this fixed enum by the
/// owning adapter. Progression is monotonic; the cancel/reject/expire states
/// are reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Not yet confirmed by the vendor (also the fallback for unrecognized
    /// vendor status strings).
    Pending,
    /// Submitted, awaiting vendor acknowledgment.
    Submitted,
    /// Accepted by the vendor and working.
    Accepted,
    /// Partially filled.
    PartiallyFilled,
    /// Completely filled.
    Filled,
    /// Canceled before completion.
    Canceled,
    /// Rejected by the vendor.
    Rejected,
    /// Expired without filling.
    Expired,
}

impl OrderStatus {
    /// Returns true if the order can no longer change state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Filled | Self::Canceled | Self::Rejected | Self::Expired
        )
    }

    /// Returns true if a cancel request is meaningful in this state.
    #[must_use]
    pub const fn is_cancelable(&self) -> bool {
        !self.is_terminal()
    }

    /// Position along the normal fill progression.
    ///
    /// Terminal side-states share the highest rank so a canceled or rejected
    /// order never moves again.
    #[must_use]
    pub(crate) const fn rank(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Submitted => 1,
            Self::Accepted => 2,
            Self::PartiallyFilled => 3,
            Self::Filled | Self::Canceled | Self::Rejected | Self::Expired => 4,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Submitted => "SUBMITTED",
            Self::Accepted => "ACCEPTED",
            Self::PartiallyFilled => "PARTIALLY_FILLED",
            Self::Filled => "FILLED",
            Self::Canceled => "CANCELED",
            Self::Rejected => "REJECTED",
            Self::Expired => "EXPIRED",
        };
        f.write_str(s)
    }
}

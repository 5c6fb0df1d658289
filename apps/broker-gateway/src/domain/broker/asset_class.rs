//! Market asset classes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A market category a vendor may support.
///
/// A connection is scoped to exactly one asset class; a vendor may cover
/// several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    /// Equities.
    Stocks,
    /// Cryptocurrencies.
    Crypto,
    /// Foreign exchange.
    Forex,
    /// Futures contracts.
    Futures,
}

impl AssetClass {
    /// Every known asset class.
    pub const ALL: [Self; 4] = [Self::Stocks, Self::Crypto, Self::Forex, Self::Futures];

    /// Stable identifier used in API paths and persisted records.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Stocks => "stocks",
            Self::Crypto => "crypto",
            Self::Forex => "forex",
            Self::Futures => "futures",
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for strings that do not name a known asset class.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown asset class: {0}")]
pub struct UnknownAssetClass(pub String);

impl FromStr for AssetClass {
    type Err = UnknownAssetClass;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|c| c.as_str() == s)
            .copied()
            .ok_or_else(|| UnknownAssetClass(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_str() {
        for class in AssetClass::ALL {
            assert_eq!(class.as_str().parse::<AssetClass>().unwrap(), class);
        }
    }

    #[test]
    fn unknown_class_is_rejected() {
        assert!("bonds".parse::<AssetClass>().is_err());
    }
}

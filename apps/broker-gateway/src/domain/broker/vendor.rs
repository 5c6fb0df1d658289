//! Supported brokerage vendors.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::asset_class::AssetClass;

/// A third-party brokerage or exchange with an order-entry API.
///
/// Adding a variant here forces the registry's adapter constructor and
/// asset-class table to handle it (both are exhaustive matches).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vendor {
    /// Alpaca Markets (stocks).
    Alpaca,
    /// Interactive Brokers client-portal gateway (stocks).
    InteractiveBrokers,
    /// Tradier (stocks).
    Tradier,
    /// Binance (crypto).
    Binance,
    /// Kraken (crypto).
    Kraken,
    /// Coinbase Exchange (crypto).
    Coinbase,
    /// OANDA (forex).
    Oanda,
    /// FXCM (forex).
    Fxcm,
    /// Tradovate (futures).
    Tradovate,
    /// CME Direct (futures).
    Cme,
}

impl Vendor {
    /// Every known vendor, in display order.
    pub const ALL: [Self; 10] = [
        Self::Alpaca,
        Self::InteractiveBrokers,
        Self::Tradier,
        Self::Binance,
        Self::Kraken,
        Self::Coinbase,
        Self::Oanda,
        Self::Fxcm,
        Self::Tradovate,
        Self::Cme,
    ];

    /// Stable identifier used in API paths and persisted records.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Alpaca => "alpaca",
            Self::InteractiveBrokers => "interactive_brokers",
            Self::Tradier => "tradier",
            Self::Binance => "binance",
            Self::Kraken => "kraken",
            Self::Coinbase => "coinbase",
            Self::Oanda => "oanda",
            Self::Fxcm => "fxcm",
            Self::Tradovate => "tradovate",
            Self::Cme => "cme",
        }
    }

    /// Asset classes this vendor can trade.
    ///
    /// The single forward capability table; the reverse lookup
    /// ([`Vendor::for_asset_class`]) is derived from it and cannot drift.
    #[must_use]
    pub const fn supported_asset_classes(&self) -> &'static [AssetClass] {
        match self {
            Self::Alpaca | Self::InteractiveBrokers | Self::Tradier => &[AssetClass::Stocks],
            Self::Binance | Self::Kraken | Self::Coinbase => &[AssetClass::Crypto],
            Self::Oanda | Self::Fxcm => &[AssetClass::Forex],
            Self::Tradovate | Self::Cme => &[AssetClass::Futures],
        }
    }

    /// Whether this vendor trades the given asset class.
    #[must_use]
    pub fn supports(&self, asset_class: AssetClass) -> bool {
        self.supported_asset_classes().contains(&asset_class)
    }

    /// Vendors trading the given asset class.
    #[must_use]
    pub fn for_asset_class(asset_class: AssetClass) -> Vec<Self> {
        Self::ALL
            .into_iter()
            .filter(|v| v.supports(asset_class))
            .collect()
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for vendor identifiers that do not match any known vendor.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unsupported vendor: {0}")]
pub struct UnknownVendor(pub String);

impl FromStr for Vendor {
    type Err = UnknownVendor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|v| v.as_str() == s)
            .copied()
            .ok_or_else(|| UnknownVendor(s.to_string()))
    }
}

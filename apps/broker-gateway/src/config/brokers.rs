//! Per-vendor endpoint and OAuth configuration.

use serde::{Deserialize, Serialize};

use crate::domain::broker::Vendor;

/// OAuth client settings for vendors that support the authorization-code
/// flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthSettings {
    /// Vendor authorization page.
    pub auth_url: String,
    /// Token exchange endpoint.
    pub token_url: String,
    /// Registered client id.
    pub client_id: String,
    /// Registered client secret.
    #[serde(default)]
    pub client_secret: String,
    /// Redirect URI registered with the vendor.
    pub redirect_uri: String,
    /// Scope string requested at authorization.
    #[serde(default)]
    pub scope: String,
}

/// Endpoints for one vendor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorEndpoints {
    /// REST API base URL.
    pub base_url: String,
    /// OAuth client settings, absent for API-key-only vendors.
    #[serde(default)]
    pub oauth: Option<OAuthSettings>,
}

impl VendorEndpoints {
    fn with_base(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            oauth: None,
        }
    }
}

/// Endpoint configuration for every vendor.
///
/// Defaults point at each vendor's sandbox/demo environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokersConfig {
    /// Alpaca Markets.
    #[serde(default = "default_alpaca")]
    pub alpaca: VendorEndpoints,
    /// Interactive Brokers client-portal gateway.
    #[serde(default = "default_interactive_brokers")]
    pub interactive_brokers: VendorEndpoints,
    /// Tradier.
    #[serde(default = "default_tradier")]
    pub tradier: VendorEndpoints,
    /// Binance.
    #[serde(default = "default_binance")]
    pub binance: VendorEndpoints,
    /// Kraken.
    #[serde(default = "default_kraken")]
    pub kraken: VendorEndpoints,
    /// Coinbase Exchange.
    #[serde(default = "default_coinbase")]
    pub coinbase: VendorEndpoints,
    /// OANDA.
    #[serde(default = "default_oanda")]
    pub oanda: VendorEndpoints,
    /// FXCM.
    #[serde(default = "default_fxcm")]
    pub fxcm: VendorEndpoints,
    /// Tradovate.
    #[serde(default = "default_tradovate")]
    pub tradovate: VendorEndpoints,
    /// CME Direct.
    #[serde(default = "default_cme")]
    pub cme: VendorEndpoints,
}

impl Default for BrokersConfig {
    fn default() -> Self {
        Self {
            alpaca: default_alpaca(),
            interactive_brokers: default_interactive_brokers(),
            tradier: default_tradier(),
            binance: default_binance(),
            kraken: default_kraken(),
            coinbase: default_coinbase(),
            oanda: default_oanda(),
            fxcm: default_fxcm(),
            tradovate: default_tradovate(),
            cme: default_cme(),
        }
    }
}

impl BrokersConfig {
    /// Endpoints for a vendor.
    #[must_use]
    pub const fn endpoints(&self, vendor: Vendor) -> &VendorEndpoints {
        match vendor {
            Vendor::Alpaca => &self.alpaca,
            Vendor::InteractiveBrokers => &self.interactive_brokers,
            Vendor::Tradier => &self.tradier,
            Vendor::Binance => &self.binance,
            Vendor::Kraken => &self.kraken,
            Vendor::Coinbase => &self.coinbase,
            Vendor::Oanda => &self.oanda,
            Vendor::Fxcm => &self.fxcm,
            Vendor::Tradovate => &self.tradovate,
            Vendor::Cme => &self.cme,
        }
    }
}

fn default_alpaca() -> VendorEndpoints {
    VendorEndpoints::with_base("https://paper-api.alpaca.markets")
}

fn default_interactive_brokers() -> VendorEndpoints {
    VendorEndpoints::with_base("https://localhost:5000/v1/api")
}

fn default_tradier() -> VendorEndpoints {
    VendorEndpoints::with_base("https://sandbox.tradier.com/v1")
}

fn default_binance() -> VendorEndpoints {
    VendorEndpoints::with_base("https://api.binance.com")
}

fn default_kraken() -> VendorEndpoints {
    VendorEndpoints::with_base("https://api.kraken.com")
}

fn default_coinbase() -> VendorEndpoints {
    VendorEndpoints::with_base("https://api-public.sandbox.exchange.coinbase.com")
}

fn default_oanda() -> VendorEndpoints {
    VendorEndpoints::with_base("https://api-fxpractice.oanda.com")
}

fn default_fxcm() -> VendorEndpoints {
    VendorEndpoints::with_base("https://api-demo.fxcm.com")
}

fn default_tradovate() -> VendorEndpoints {
    VendorEndpoints::with_base("https://demo.tradovateapi.com/v1")
}

fn default_cme() -> VendorEndpoints {
    VendorEndpoints::with_base("https://api.cmegroup.com/v1")
}

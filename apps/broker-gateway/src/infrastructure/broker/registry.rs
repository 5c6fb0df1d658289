//! Vendor registry: adapter construction.
//!
//! The vendor→constructor map lives here and nowhere else, as an exhaustive
//! match over [`Vendor`], so adding a vendor without wiring an adapter fails
//! to compile. Capability metadata (which asset classes a vendor trades)
//! lives on [`Vendor`] itself.

use std::sync::Arc;

use crate::application::ports::{AdapterFactory, BrokerAdapter};
use crate::config::BrokersConfig;
use crate::domain::broker::{Credentials, Vendor};

use super::alpaca::AlpacaAdapter;
use super::binance::BinanceAdapter;
use super::cme::CmeAdapter;
use super::coinbase::CoinbaseAdapter;
use super::fxcm::FxcmAdapter;
use super::http::VendorHttpClient;
use super::interactive_brokers::InteractiveBrokersAdapter;
use super::kraken::KrakenAdapter;
use super::oanda::OandaAdapter;
use super::tradier::TradierAdapter;
use super::tradovate::TradovateAdapter;

/// Builds adapters for vendor/credential pairs.
///
/// Pure construction, no network I/O; the adapter performs all vendor calls.
pub struct BrokerRegistry {
    config: BrokersConfig,
    http: VendorHttpClient,
}

impl BrokerRegistry {
    /// Create a registry over the configured vendor endpoints.
    #[must_use]
    pub const fn new(config: BrokersConfig, http: VendorHttpClient) -> Self {
        Self { config, http }
    }
}

impl AdapterFactory for BrokerRegistry {
    fn create_adapter(&self, vendor: Vendor, credentials: &Credentials) -> Arc<dyn BrokerAdapter> {
        let base_url = self.config.endpoints(vendor).base_url.clone();
        let credentials = credentials.clone();
        let http = self.http.clone();

        match vendor {
            Vendor::Alpaca => Arc::new(AlpacaAdapter::new(base_url, credentials, http)),
            Vendor::InteractiveBrokers => {
                Arc::new(InteractiveBrokersAdapter::new(base_url, credentials, http))
            }
            Vendor::Tradier => Arc::new(TradierAdapter::new(base_url, credentials, http)),
            Vendor::Binance => Arc::new(BinanceAdapter::new(base_url, credentials, http)),
            Vendor::Kraken => Arc::new(KrakenAdapter::new(base_url, credentials, http)),
            Vendor::Coinbase => Arc::new(CoinbaseAdapter::new(base_url, credentials, http)),
            Vendor::Oanda => Arc::new(OandaAdapter::new(base_url, credentials, http)),
            Vendor::Fxcm => Arc::new(FxcmAdapter::new(base_url, credentials, http)),
            Vendor::Tradovate => Arc::new(TradovateAdapter::new(base_url, credentials, http)),
            Vendor::Cme => Arc::new(CmeAdapter::new(base_url, credentials, http)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn adapter_construction_is_total() {
        let registry = BrokerRegistry::new(
            BrokersConfig::default(),
            VendorHttpClient::new(Duration::from_secs(5)).unwrap(),
        );
        let credentials = Credentials::new().with("api_key", "k").with("api_secret", "s");
        for vendor in Vendor::ALL {
            // Construction must never panic or touch the network.
            let _adapter = registry.create_adapter(vendor, &credentials);
        }
    }
}

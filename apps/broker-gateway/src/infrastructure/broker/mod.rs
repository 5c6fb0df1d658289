//! Vendor adapters and the registry that builds them.
//!
//! One module per vendor; each owns its signing scheme, request shapes, and
//! status vocabulary mapping.

mod alpaca;
mod binance;
mod cme;
mod coinbase;
mod fxcm;
mod http;
mod interactive_brokers;
mod kraken;
mod oanda;
mod registry;
mod tradier;
mod tradovate;

pub use alpaca::AlpacaAdapter;
pub use binance::BinanceAdapter;
pub use cme::CmeAdapter;
pub use coinbase::CoinbaseAdapter;
pub use fxcm::FxcmAdapter;
pub use http::VendorHttpClient;
pub use interactive_brokers::InteractiveBrokersAdapter;
pub use kraken::KrakenAdapter;
pub use oanda::OandaAdapter;
pub use registry::BrokerRegistry;
pub use tradier::TradierAdapter;
pub use tradovate::TradovateAdapter;

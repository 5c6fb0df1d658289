// Allow unwrap/expect and test-only patterns in tests - tests should panic
// on unexpected errors
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Broker Gateway - Rust Core Library
//!
//! Connects user trading accounts to third-party brokerage APIs and keeps
//! local order records synchronized with vendor order state.
//!
//! # Architecture
//!
//! - **Domain**: vendors, asset classes, connections, orders and the order
//!   status state machine. No I/O.
//! - **Application**: ports (`BrokerAdapter`, stores), caller-facing services
//!   (connect, submit, cancel) and the reconciliation scheduler.
//! - **Infrastructure**: one adapter per vendor (each owning its signing
//!   scheme and status vocabulary), the vendor registry, in-memory stores,
//!   OAuth flows, and the Axum HTTP surface.
//!
//! Control flow: a caller submits an order → the registry resolves the
//! owner's active connection to an adapter → the adapter submits to the
//! vendor → the order is persisted as `SUBMITTED` → the reconciliation
//! scheduler polls vendor status until the order reaches a terminal state.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Domain layer.
pub mod domain;

/// Application layer.
pub mod application;

/// Infrastructure layer.
pub mod infrastructure;

/// Configuration loading.
pub mod config;

/// Error taxonomy.
pub mod error;

/// Tracing setup.
pub mod telemetry;

// Domain re-exports
pub use domain::broker::{AssetClass, BrokerConnection, Credentials, Vendor};
pub use domain::order::{Order, OrderSide, OrderStatus, OrderStatusUpdate, OrderType};

// Application re-exports
pub use application::ports::{
    AdapterFactory, BrokerAdapter, BrokerApiError, ConnectionStore, OrderStore, OrderTicket,
    OrderTicketRequest, StoreError,
};
pub use application::services::{
    CancelOutcome, ConnectRequest, ConnectionService, OrderRequest, OrderService,
    ReconciliationScheduler,
};

// Infrastructure re-exports
pub use error::GatewayError;
pub use infrastructure::broker::{BrokerRegistry, VendorHttpClient};
pub use infrastructure::http::{AppState, create_router};
pub use infrastructure::oauth::OAuthFlow;
pub use infrastructure::persistence::{InMemoryConnectionStore, InMemoryOrderStore};

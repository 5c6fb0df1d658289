//! Ports - interfaces to external systems.

mod broker_port;
mod stores;

pub use broker_port::{
    AdapterFactory, BrokerAdapter, BrokerApiError, OrderTicket, OrderTicketRequest,
};
pub use stores::{ConnectionStore, OrderStore, StoreError};

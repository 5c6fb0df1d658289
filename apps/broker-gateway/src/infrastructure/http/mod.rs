//! HTTP surface.

mod controller;
mod request;
mod response;

pub use controller::{AppState, create_router};
pub use request::{ConnectBrokerRequest, ConnectionsQuery, CreateOrderRequest, OAuthCallbackQuery};
pub use response::{
    ApiError, AuthUrlResponse, CancelOrderResponse, ConnectionResponse, ErrorBody, HealthResponse,
    OrderResponse,
};

//! HTTP controller (driver adapter).
//!
//! Axum REST surface delegating to the application services. Every
//! caller-facing route takes the already-authenticated owner id from the
//! `X-User-Id` header the upstream gateway injects; the core never
//! authenticates callers itself.

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Redirect;
use axum::routing::{delete, get, post};
use axum::{Json, Router};

use crate::application::services::{
    ConnectRequest, ConnectionService, OrderRequest, OrderService,
};
use crate::domain::broker::{AssetClass, Credentials, Vendor};
use crate::error::GatewayError;
use crate::infrastructure::oauth::OAuthFlow;

use super::request::{
    ConnectBrokerRequest, ConnectionsQuery, CreateOrderRequest, OAuthCallbackQuery,
};
use super::response::{
    ApiError, AuthUrlResponse, CancelOrderResponse, ConnectionResponse, HealthResponse,
    OrderResponse,
};

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Connection service.
    pub connections: Arc<ConnectionService>,
    /// Order service.
    pub orders: Arc<OrderService>,
    /// OAuth flows.
    pub oauth: Arc<OAuthFlow>,
    /// Front-end URL OAuth callbacks redirect to.
    pub frontend_url: String,
}

/// Create the router with all gateway endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/brokers/asset-classes", get(asset_classes))
        .route("/brokers/types/{asset_class}", get(vendors_for_class))
        .route("/brokers/auth/{vendor}", get(auth_url))
        .route("/brokers/oauth/callback", get(oauth_callback))
        .route("/brokers/connect", post(connect))
        .route("/brokers/connections", get(list_connections))
        .route("/brokers/connections/{id}", delete(disconnect))
        .route("/brokers/orders", post(create_order).get(list_orders))
        .route(
            "/brokers/orders/{id}",
            get(get_order).delete(cancel_order),
        )
        .with_state(state)
}

/// Owner identity injected by the upstream authentication layer.
fn owner_id(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            ApiError(GatewayError::InvalidRequest(
                "missing X-User-Id header".into(),
            ))
        })
}

fn parse_vendor(raw: &str) -> Result<Vendor, ApiError> {
    Vendor::from_str(raw)
        .map_err(|_| ApiError(GatewayError::UnsupportedVendor(raw.to_string())))
}

fn parse_asset_class(raw: &str) -> Result<AssetClass, ApiError> {
    AssetClass::from_str(raw)
        .map_err(|_| ApiError(GatewayError::InvalidRequest(format!("unknown asset class: {raw}"))))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn asset_classes() -> Json<Vec<AssetClass>> {
    Json(AssetClass::ALL.to_vec())
}

async fn vendors_for_class(
    Path(asset_class): Path<String>,
) -> Result<Json<Vec<Vendor>>, ApiError> {
    let asset_class = parse_asset_class(&asset_class)?;
    Ok(Json(Vendor::for_asset_class(asset_class)))
}

async fn auth_url(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(vendor): Path<String>,
) -> Result<Json<AuthUrlResponse>, ApiError> {
    let owner = owner_id(&headers)?;
    let vendor = parse_vendor(&vendor)?;
    let auth_url = state.oauth.authorize_url(vendor, &owner)?;
    Ok(Json(AuthUrlResponse { auth_url }))
}

/// Completes the OAuth flow and redirects back to the front-end. Errors ride
/// in the redirect query string so the browser always lands somewhere sane.
async fn oauth_callback(
    State(state): State<AppState>,
    Query(query): Query<OAuthCallbackQuery>,
) -> Redirect {
    let target = match complete_oauth(&state, &query).await {
        Ok(()) => format!("{}/broker-connected?success=true", state.frontend_url),
        Err(err) => {
            tracing::warn!(error = %err, vendor = %query.vendor, "oauth callback failed");
            let mut encoded = url::form_urlencoded::Serializer::new(String::new());
            encoded.append_pair("success", "false");
            encoded.append_pair("error", &err.to_string());
            format!("{}/broker-connected?{}", state.frontend_url, encoded.finish())
        }
    };
    Redirect::to(&target)
}

async fn complete_oauth(state: &AppState, query: &OAuthCallbackQuery) -> Result<(), GatewayError> {
    let vendor = Vendor::from_str(&query.vendor)
        .map_err(|_| GatewayError::UnsupportedVendor(query.vendor.clone()))?;
    let owner = query
        .state
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| GatewayError::InvalidRequest("missing state parameter".into()))?;

    let credentials = state.oauth.exchange_code(vendor, &query.code).await?;
    state
        .connections
        .connect(
            owner,
            ConnectRequest {
                vendor,
                credentials,
                asset_class: None,
                is_demo: false,
            },
        )
        .await?;
    Ok(())
}

async fn connect(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ConnectBrokerRequest>,
) -> Result<Json<Vec<ConnectionResponse>>, ApiError> {
    let owner = owner_id(&headers)?;
    let vendor = parse_vendor(&body.vendor)?;
    let asset_class = body
        .asset_class
        .as_deref()
        .map(parse_asset_class)
        .transpose()?;

    let created = state
        .connections
        .connect(
            &owner,
            ConnectRequest {
                vendor,
                credentials: Credentials::from(body.credentials),
                asset_class,
                is_demo: body.is_demo,
            },
        )
        .await?;

    Ok(Json(created.into_iter().map(ConnectionResponse::from).collect()))
}

async fn list_connections(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ConnectionsQuery>,
) -> Result<Json<Vec<ConnectionResponse>>, ApiError> {
    let owner = owner_id(&headers)?;
    let connections = match query.asset_class.as_deref() {
        Some(raw) => {
            let asset_class = parse_asset_class(raw)?;
            state
                .connections
                .list_by_asset_class(&owner, asset_class)
                .await?
        }
        None => state.connections.list(&owner).await?,
    };
    Ok(Json(
        connections.into_iter().map(ConnectionResponse::from).collect(),
    ))
}

async fn disconnect(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ConnectionResponse>, ApiError> {
    let owner = owner_id(&headers)?;
    let connection = state.connections.disconnect(&owner, &id).await?;
    Ok(Json(ConnectionResponse::from(connection)))
}

async fn create_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateOrderRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let owner = owner_id(&headers)?;
    let order = state
        .orders
        .submit(
            &owner,
            OrderRequest {
                symbol: body.symbol,
                side: body.side,
                order_type: body.order_type,
                quantity: body.quantity,
                limit_price: body.price,
                stop_price: body.stop_price,
            },
        )
        .await?;
    Ok(Json(OrderResponse::from(order)))
}

async fn list_orders(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let owner = owner_id(&headers)?;
    let orders = state.orders.list(&owner).await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

async fn get_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let owner = owner_id(&headers)?;
    let order = state.orders.get(&owner, &id).await?;
    Ok(Json(OrderResponse::from(order)))
}

async fn cancel_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<CancelOrderResponse>, ApiError> {
    let owner = owner_id(&headers)?;
    let outcome = state.orders.cancel(&owner, &id).await?;
    Ok(Json(CancelOrderResponse {
        canceled: outcome.canceled,
        order: OrderResponse::from(outcome.order),
    }))
}

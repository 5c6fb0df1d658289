//! End-to-end tests driving the HTTP surface against a stubbed vendor.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use broker_gateway::application::services::{
    ConnectionService, OrderService, ReconciliationScheduler,
};
use broker_gateway::config::{BrokersConfig, ReconciliationConfig};
use broker_gateway::infrastructure::broker::{BrokerRegistry, VendorHttpClient};
use broker_gateway::infrastructure::http::{AppState, create_router};
use broker_gateway::infrastructure::oauth::OAuthFlow;
use broker_gateway::infrastructure::persistence::{InMemoryConnectionStore, InMemoryOrderStore};

struct TestApp {
    router: Router,
    scheduler: ReconciliationScheduler,
}

/// Wire the full service stack against a vendor stub standing in for Alpaca.
fn test_app(vendor_url: &str) -> TestApp {
    let mut brokers = BrokersConfig::default();
    brokers.alpaca.base_url = vendor_url.to_string();

    let http = VendorHttpClient::new(Duration::from_secs(2)).unwrap();
    let registry = Arc::new(BrokerRegistry::new(brokers.clone(), http.clone()));
    let connections = Arc::new(InMemoryConnectionStore::new());
    let orders = Arc::new(InMemoryOrderStore::new());

    let scheduler = ReconciliationScheduler::new(
        ReconciliationConfig {
            interval_secs: 1,
            request_timeout_secs: 2,
        },
        orders.clone(),
        connections.clone(),
        registry.clone(),
    );

    let state = AppState {
        connections: Arc::new(ConnectionService::new(registry.clone(), connections.clone())),
        orders: Arc::new(OrderService::new(
            registry,
            connections,
            orders,
            scheduler.clone(),
        )),
        oauth: Arc::new(OAuthFlow::new(brokers, http)),
        frontend_url: "http://localhost:3000".to_string(),
    };

    TestApp {
        router: create_router(state),
        scheduler,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(path: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .header("x-user-id", "user-1")
        .body(Body::empty())
        .unwrap()
}

fn post_json(path: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header("x-user-id", "user-1")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn delete(path: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(path)
        .header("x-user-id", "user-1")
        .body(Body::empty())
        .unwrap()
}

fn connect_body() -> Value {
    json!({
        "vendor": "alpaca",
        "credentials": {"api_key": "k", "api_secret": "s"},
        "asset_class": "stocks"
    })
}

async fn mock_valid_account(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v2/account"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "account_number": "PA3ABC",
            "buying_power": "10000"
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn asset_classes_and_vendor_listings() {
    let app = test_app("http://unused.invalid");

    let (status, body) = send(&app.router, get("/brokers/asset-classes")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!(["stocks", "crypto", "forex", "futures"])
    );

    let (status, body) = send(&app.router, get("/brokers/types/crypto")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(["binance", "kraken", "coinbase"]));

    let (status, _) = send(&app.router, get("/brokers/types/bonds")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_vendor_is_rejected_with_specific_code() {
    let app = test_app("http://unused.invalid");
    let (status, body) = send(
        &app.router,
        post_json(
            "/brokers/connect",
            json!({"vendor": "etrade", "credentials": {}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "UNSUPPORTED_VENDOR");
}

#[tokio::test]
async fn missing_owner_header_is_rejected() {
    let app = test_app("http://unused.invalid");
    let request = Request::builder()
        .uri("/brokers/connections")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn connect_validates_and_persists() {
    let server = MockServer::start().await;
    mock_valid_account(&server).await;
    let app = test_app(&server.uri());

    let (status, body) = send(&app.router, post_json("/brokers/connect", connect_body())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["vendor"], "alpaca");
    assert_eq!(body[0]["asset_class"], "stocks");
    assert_eq!(body[0]["is_active"], true);
    assert!(body[0].get("credentials").is_none());

    let (status, body) = send(&app.router, get("/brokers/connections")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn disconnect_deactivates_but_keeps_the_record() {
    let server = MockServer::start().await;
    mock_valid_account(&server).await;
    let app = test_app(&server.uri());

    let (_, body) = send(&app.router, post_json("/brokers/connect", connect_body())).await;
    let connection_id = body[0]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app.router,
        delete(&format!("/brokers/connections/{connection_id}")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_active"], false);

    // Deactivated, never deleted: the record still lists.
    let (_, body) = send(&app.router, get("/brokers/connections")).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["is_active"], false);

    // Filtered listing by asset class sees it too; other classes are empty.
    let (_, body) = send(&app.router, get("/brokers/connections?asset_class=stocks")).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    let (_, body) = send(&app.router, get("/brokers/connections?asset_class=crypto")).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn null_account_number_surfaces_invalid_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/account"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"account_number": null})),
        )
        .mount(&server)
        .await;
    let app = test_app(&server.uri());

    let (status, body) = send(&app.router, post_json("/brokers/connect", connect_body())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "INVALID_CREDENTIALS");

    // Nothing persisted.
    let (_, body) = send(&app.router, get("/brokers/connections")).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn vendor_rejecting_asset_class_is_refused() {
    let server = MockServer::start().await;
    mock_valid_account(&server).await;
    let app = test_app(&server.uri());

    let (status, body) = send(
        &app.router,
        post_json(
            "/brokers/connect",
            json!({
                "vendor": "alpaca",
                "credentials": {"api_key": "k", "api_secret": "s"},
                "asset_class": "forex"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "ASSET_CLASS_NOT_SUPPORTED");
}

#[tokio::test]
async fn market_buy_reconciles_to_filled_on_first_poll() {
    let server = MockServer::start().await;
    mock_valid_account(&server).await;
    Mock::given(method("POST"))
        .and(path("/v2/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "alp-123",
            "status": "new"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/orders/alp-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "filled",
            "filled_qty": "10",
            "filled_avg_price": "101.5"
        })))
        .mount(&server)
        .await;

    let app = test_app(&server.uri());
    send(&app.router, post_json("/brokers/connect", connect_body())).await;

    let (status, order) = send(
        &app.router,
        post_json(
            "/brokers/orders",
            json!({"symbol": "XYZ", "side": "buy", "type": "market", "quantity": 10}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "SUBMITTED");
    assert_eq!(order["vendor_order_id"], "alp-123");
    let order_id = order["id"].as_str().unwrap().to_string();

    // First reconciliation tick fires immediately after submit.
    tokio::time::sleep(Duration::from_millis(500)).await;

    let (status, order) = send(&app.router, get(&format!("/brokers/orders/{order_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "FILLED");
    assert_eq!(order["filled_quantity"], "10");
    assert_eq!(order["filled_price"], "101.5");
    assert!(!app.scheduler.is_watched(&order_id));

    // Canceling a filled order is refused before any vendor call.
    let (status, body) = send(&app.router, delete(&format!("/brokers/orders/{order_id}"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_STATE");
}

#[tokio::test]
async fn vendor_rejection_message_reaches_the_caller() {
    let server = MockServer::start().await;
    mock_valid_account(&server).await;
    Mock::given(method("POST"))
        .and(path("/v2/orders"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "message": "insufficient buying power"
        })))
        .mount(&server)
        .await;

    let app = test_app(&server.uri());
    send(&app.router, post_json("/brokers/connect", connect_body())).await;

    let (status, body) = send(
        &app.router,
        post_json(
            "/brokers/orders",
            json!({"symbol": "XYZ", "side": "buy", "type": "market", "quantity": 10}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "SUBMISSION_REJECTED");
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .contains("insufficient buying power")
    );
}

#[tokio::test]
async fn submit_without_connection_is_not_found() {
    let app = test_app("http://unused.invalid");
    let (status, body) = send(
        &app.router,
        post_json(
            "/brokers/orders",
            json!({"symbol": "XYZ", "side": "buy", "type": "market", "quantity": 1}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NO_ACTIVE_CONNECTION");
}

#[tokio::test]
async fn cancel_flow_marks_canceled_and_stops_polling() {
    let server = MockServer::start().await;
    mock_valid_account(&server).await;
    Mock::given(method("POST"))
        .and(path("/v2/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "alp-9",
            "status": "new"
        })))
        .mount(&server)
        .await;
    // Order stays working so the cancel races nothing.
    Mock::given(method("GET"))
        .and(path("/v2/orders/alp-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "accepted"
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v2/orders/alp-9"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let app = test_app(&server.uri());
    send(&app.router, post_json("/brokers/connect", connect_body())).await;
    let (_, order) = send(
        &app.router,
        post_json(
            "/brokers/orders",
            json!({"symbol": "XYZ", "side": "sell", "type": "limit", "quantity": 5, "price": "99.5"}),
        ),
    )
    .await;
    let order_id = order["id"].as_str().unwrap().to_string();

    let (status, body) = send(&app.router, delete(&format!("/brokers/orders/{order_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["canceled"], true);
    assert_eq!(body["order"]["status"], "CANCELED");
    assert!(!app.scheduler.is_watched(&order_id));
}

#[tokio::test]
async fn foreign_owner_cannot_touch_an_order() {
    let server = MockServer::start().await;
    mock_valid_account(&server).await;
    Mock::given(method("POST"))
        .and(path("/v2/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "alp-7",
            "status": "new"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/orders/alp-7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "accepted"})))
        .mount(&server)
        .await;

    let app = test_app(&server.uri());
    send(&app.router, post_json("/brokers/connect", connect_body())).await;
    let (_, order) = send(
        &app.router,
        post_json(
            "/brokers/orders",
            json!({"symbol": "XYZ", "side": "buy", "type": "market", "quantity": 1}),
        ),
    )
    .await;
    let order_id = order["id"].as_str().unwrap().to_string();

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/brokers/orders/{order_id}"))
        .header("x-user-id", "someone-else")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
    app.scheduler.shutdown();
}

#[tokio::test]
async fn oauth_auth_url_for_unconfigured_vendor_is_not_implemented() {
    let app = test_app("http://unused.invalid");
    let (status, body) = send(&app.router, get("/brokers/auth/tradovate")).await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(body["code"], "NOT_IMPLEMENTED");
}

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use ewallet::{
    bin_utils::{Service, settings::Settings},
    store::in_memory_store::InMemoryWalletStore,
};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

fn app() -> Router {
    Service {
        settings: Settings::default(),
        store: Arc::new(InMemoryWalletStore::new()),
    }
    .router()
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn create_wallet(app: &Router) -> String {
    let (status, body) = call(app, "POST", "/api/v1/wallet", None).await;
    assert_eq!(status, StatusCode::OK);
    body["id"].as_str().unwrap().to_owned()
}

async fn balance(app: &Router, id: &str) -> f64 {
    let (status, body) = call(app, "GET", &format!("/api/v1/wallet/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    body["balance"].as_f64().unwrap()
}

async fn send(app: &Router, from: &str, body: Value) -> (StatusCode, Value) {
    call(app, "POST", &format!("/api/v1/wallet/{from}/send"), Some(body)).await
}

#[tokio::test]
async fn health() {
    let (status, body) = call(&app(), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn create_wallet_grants_initial_balance() {
    let app = app();
    let (status, body) = call(&app, "POST", "/api/v1/wallet", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["balance"].as_f64(), Some(100.0));
    let first = Uuid::parse_str(body["id"].as_str().unwrap()).unwrap();

    let second = create_wallet(&app).await;
    assert_ne!(first.to_string(), second);
}

#[tokio::test]
async fn transfer_and_history() {
    let app = app();
    let a = create_wallet(&app).await;
    let b = create_wallet(&app).await;

    let (status, _) = send(&app, &a, json!({ "to": b, "amount": 25.5 })).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(balance(&app, &a).await, 74.5);
    assert_eq!(balance(&app, &b).await, 125.5);

    let (status, history) = call(&app, "GET", &format!("/api/v1/wallet/{a}/history"), None).await;
    assert_eq!(status, StatusCode::OK);
    let entries = history.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["from"], a.as_str());
    assert_eq!(entries[0]["to"], b.as_str());
    assert_eq!(entries[0]["amount"].as_f64(), Some(25.5));
    assert!(
        chrono::DateTime::parse_from_rfc3339(entries[0]["time"].as_str().unwrap()).is_ok()
    );

    let (_, history_b) = call(&app, "GET", &format!("/api/v1/wallet/{b}/history"), None).await;
    assert_eq!(history_b, history);
}

#[tokio::test]
async fn transfer_errors() {
    let app = app();
    let a = create_wallet(&app).await;
    let b = create_wallet(&app).await;
    let missing = Uuid::new_v4().to_string();

    // unknown source
    let (status, _) = send(&app, &missing, json!({ "to": b, "amount": 1 })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // unknown target
    let (status, _) = send(&app, &a, json!({ "to": missing, "amount": 1 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // insufficient balance wins over unknown target
    let (status, body) = send(&app, &a, json!({ "to": missing, "amount": 1000 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Insufficient balance");

    // invalid amounts
    for amount in [json!(0), json!(-5), Value::Null] {
        let (status, _) = send(&app, &a, json!({ "to": b, "amount": amount })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    // malformed path and body
    let (status, _) = send(&app, "not-a-uuid", json!({ "to": b, "amount": 1 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, &a, json!({ "amount": 1 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, &a, json!({ "to": "nope", "amount": 1 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, &a, json!({ "to": b, "amount": "10" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // nothing moved
    assert_eq!(balance(&app, &a).await, 100.0);
    assert_eq!(balance(&app, &b).await, 100.0);
    let (_, history) = call(&app, "GET", &format!("/api/v1/wallet/{a}/history"), None).await;
    assert_eq!(history, json!([]));
}

#[tokio::test]
async fn queries_for_unknown_wallets() {
    let app = app();
    let missing = Uuid::new_v4();

    let (status, _) = call(&app, "GET", &format!("/api/v1/wallet/{missing}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&app, "GET", &format!("/api/v1/wallet/{missing}/history"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&app, "GET", "/api/v1/wallet/42", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn fresh_wallet_has_empty_history() {
    let app = app();
    let a = create_wallet(&app).await;
    let (status, body) = call(&app, "GET", &format!("/api/v1/wallet/{a}/history"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sends_never_overdraw() {
    let app = app();
    let a = create_wallet(&app).await;
    let b = create_wallet(&app).await;

    let mut tasks = Vec::new();
    for _ in 0..20 {
        let app = app.clone();
        let (a, b) = (a.clone(), b.clone());
        tasks.push(tokio::spawn(async move {
            send(&app, &a, json!({ "to": b, "amount": 10 })).await.0
        }));
    }

    let mut ok = 0;
    for task in tasks {
        match task.await.unwrap() {
            StatusCode::OK => ok += 1,
            StatusCode::BAD_REQUEST => {}
            other => panic!("unexpected status {other}"),
        }
    }

    assert_eq!(ok, 10);
    assert_eq!(balance(&app, &a).await, 0.0);
    assert_eq!(balance(&app, &b).await, 200.0);
}

#[tokio::test]
async fn server_stops_on_shutdown_signal() {
    let service = Service {
        settings: Settings::default(),
        store: Arc::new(InMemoryWalletStore::new()),
    };
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(service.run(listener, async move {
        let _ = stop_rx.await;
    }));
    stop_tx.send(()).unwrap();

    server.await.unwrap().unwrap();
}

//! HTTP boundary: routing, extraction and status-code mapping.

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    http::StatusCode,
    routing::{get, post},
};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::{engine::TransferEngine, query::QueryService, store::WalletStore};

pub mod error;
pub mod handlers;

#[derive(Clone)]
pub struct AppState {
    pub engine: TransferEngine,
    pub query: QueryService,
}

impl AppState {
    pub fn new(store: Arc<dyn WalletStore>) -> Self {
        Self {
            engine: TransferEngine::new(store.clone()),
            query: QueryService::new(store),
        }
    }
}

/// Requests running past `request_timeout` are answered with 408 and their
/// handler future is dropped, which rolls back any open storage transaction.
pub fn router(state: AppState, request_timeout: Duration) -> Router {
    let wallets = Router::new()
        .route("/wallet", post(handlers::create_wallet))
        .route("/wallet/{wallet_id}/send", post(handlers::send))
        .route("/wallet/{wallet_id}/history", get(handlers::history))
        .route("/wallet/{wallet_id}", get(handlers::wallet_status));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api/v1", wallets)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .with_state(state)
}

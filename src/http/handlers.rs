use std::str::FromStr;

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, de::Error as _};

use crate::{
    command::TransferCommand,
    engine::TransferError,
    wallet::{Transaction, Wallet, WalletId},
};

use super::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub to: WalletId,
    #[serde(default, deserialize_with = "json_number")]
    pub amount: Option<Decimal>,
}

/// Accepts a JSON number or `null`; strings are a malformed body.
fn json_number<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<f64>::deserialize(deserializer)?
        .map(|value| Decimal::from_str(&value.to_string()).map_err(D::Error::custom))
        .transpose()
}

fn failed<E: Into<ApiError>>(handler: &'static str) -> impl FnOnce(E) -> ApiError {
    move |err| {
        let err: ApiError = err.into();
        err.logged(handler)
    }
}

fn wallet_id(path: Result<Path<WalletId>, PathRejection>) -> Result<WalletId, ApiError> {
    path.map(|Path(id)| id).map_err(ApiError::InvalidPath)
}

pub async fn health() -> StatusCode {
    StatusCode::OK
}

// POST /api/v1/wallet
pub async fn create_wallet(State(state): State<AppState>) -> Result<Json<Wallet>, ApiError> {
    Ok(Json(
        state
            .engine
            .create_wallet()
            .await
            .map_err(failed("create_wallet"))?,
    ))
}

// POST /api/v1/wallet/{wallet_id}/send
pub async fn send(
    State(state): State<AppState>,
    path: Result<Path<WalletId>, PathRejection>,
    body: Result<Json<SendRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let from = wallet_id(path)?;
    let Json(request) = body.map_err(ApiError::InvalidBody)?;

    let command =
        TransferCommand::new(from, request.to, request.amount).map_err(TransferError::from)?;
    state
        .engine
        .transfer(command)
        .await
        .map_err(failed("send"))?;
    Ok(StatusCode::OK)
}

// GET /api/v1/wallet/{wallet_id}/history
pub async fn history(
    State(state): State<AppState>,
    path: Result<Path<WalletId>, PathRejection>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    let id = wallet_id(path)?;
    Ok(Json(
        state
            .query
            .transaction_history(id)
            .await
            .map_err(failed("history"))?,
    ))
}

// GET /api/v1/wallet/{wallet_id}
pub async fn wallet_status(
    State(state): State<AppState>,
    path: Result<Path<WalletId>, PathRejection>,
) -> Result<Json<Wallet>, ApiError> {
    let id = wallet_id(path)?;
    Ok(Json(
        state
            .query
            .wallet_status(id)
            .await
            .map_err(failed("wallet_status"))?,
    ))
}

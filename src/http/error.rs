use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::{engine::TransferError, query::QueryError, store::StoreError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid path parameter: {0}")]
    InvalidPath(PathRejection),
    #[error("invalid request body: {0}")]
    InvalidBody(JsonRejection),
    #[error(transparent)]
    Transfer(#[from] TransferError),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Serialize)]
struct ErrorMessage {
    message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidPath(_) | ApiError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            ApiError::Transfer(err) => match err {
                TransferError::WalletNotFound(_) => StatusCode::NOT_FOUND,
                TransferError::TargetWalletNotFound(_)
                | TransferError::Wallet(_)
                | TransferError::Command(_) => StatusCode::BAD_REQUEST,
                TransferError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Query(err) => match err {
                QueryError::WalletNotFound(_) => StatusCode::NOT_FOUND,
                QueryError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Logs a server-side failure under the handler that hit it. Details
    /// stay in the log, the response only carries a generic message.
    pub fn logged(self, handler: &'static str) -> Self {
        if self.status().is_server_error() {
            error!(handler, error = %self, "Request failed");
        }
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(ErrorMessage { message })).into_response()
    }
}

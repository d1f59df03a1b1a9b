use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("invalid request")]
    InvalidRequest,

    #[error("body is required")]
    BodyRequired,

    #[error("invalid id")]
    InvalidId,

    #[error("todo not found")]
    NotFound,

    #[error("store unavailable")]
    Unavailable(#[source] StoreError),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => AppError::NotFound,
            err => AppError::Store(err),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest | AppError::BodyRequired | AppError::InvalidId => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let msg = match &self {
            AppError::Store(err) => {
                // The cause stays in the log, the client gets a generic message
                tracing::error!(error = %err, "store call failed");
                "internal server error".to_string()
            }
            AppError::Unavailable(err) => {
                tracing::warn!(error = %err, "store liveness check failed");
                self.to_string()
            }
            _ => self.to_string(),
        };

        let error_response = json!({
            "success": false,
            "msg": msg,
        });
        (self.status(), Json(error_response)).into_response()
    }
}

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::services::payments::GatewayError;

/// Application-level error type. All handlers return `Result<T, ApiError>`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request rejected before any side effect.
    #[error("{0}")]
    Validation(String),

    /// The ledger could not reserve the requested units.
    #[error("Not enough bags available")]
    OutOfStock,

    /// Payment intent exists but its status is not "succeeded".
    #[error("Payment not completed")]
    PaymentNotCompleted,

    #[error("{0} not found")]
    NotFound(&'static str),

    /// Missing/invalid bearer token, or requester does not own the resource.
    #[error("Not authorized")]
    Unauthorized,

    /// Status update that violates the reservation state machine.
    #[error("Cannot change reservation status from '{from}' to '{to}'")]
    InvalidTransition { from: String, to: String },

    /// Storage or an external collaborator failed; retryable.
    #[error("{0}")]
    Dependency(String),
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        log::error!("Database error: {}", err);
        ApiError::Dependency("Database error".to_string())
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        log::error!("Payment gateway error: {}", err);
        ApiError::Dependency("Payment gateway error".to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::OutOfStock => StatusCode::CONFLICT,
            ApiError::PaymentNotCompleted => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::InvalidTransition { .. } => StatusCode::BAD_REQUEST,
            ApiError::Dependency(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

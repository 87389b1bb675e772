use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    /// The caller lacks the subscription/plan the feature requires.
    #[error("Payment required: {message}")]
    PaymentRequired { message: String, details: String },

    /// The orchestrator failed. Carries the upstream's message when it sent one.
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    /// The backend API could not be reached at all.
    #[error("Bad gateway: {0}")]
    BadGateway(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg, None),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Authentication required".to_string(),
                None,
            ),
            AppError::PaymentRequired { message, details } => {
                tracing::warn!("Entitlement failure: {message}");
                (
                    StatusCode::PAYMENT_REQUIRED,
                    "PAYMENT_REQUIRED",
                    message,
                    Some(details),
                )
            }
            AppError::Upstream(msg) => {
                tracing::error!("Upstream error: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, "UPSTREAM_ERROR", msg, None)
            }
            AppError::Timeout(msg) => {
                tracing::error!("Timeout: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, "TIMEOUT", msg, None)
            }
            AppError::BadGateway(msg) => {
                tracing::error!("Backend unreachable: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "BAD_GATEWAY",
                    "The backend service could not be reached".to_string(),
                    None,
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                    None,
                )
            }
        };

        let mut body = json!({
            "success": false,
            "error": message,
            "code": code,
        });
        if let Some(details) = details {
            body["details"] = json!(details);
        }

        (status, Json(body)).into_response()
    }
}

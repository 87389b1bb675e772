//! Axum route handlers that pass authenticated calls through to the backend API.

use axum::{extract::State, Json};
use reqwest::Method;
use serde_json::Value;

use crate::auth::BearerToken;
use crate::backend::{
    PassThrough, CHECKOUT_SESSION_PATH, COVER_LETTER_GENERATE_PATH, EXTENSION_VERIFY_PATH,
    ONBOARDING_STATUS_PATH, RESUMES_PATH,
};
use crate::errors::AppError;
use crate::state::AppState;

/// GET /api/resumes
pub async fn handle_list_resumes(
    State(state): State<AppState>,
    token: BearerToken,
) -> Result<PassThrough, AppError> {
    Ok(state
        .backend
        .forward(Method::GET, RESUMES_PATH, &token, None)
        .await?)
}

/// POST /api/cover-letters/generate
pub async fn handle_generate_cover_letter(
    State(state): State<AppState>,
    token: BearerToken,
    body: Option<Json<Value>>,
) -> Result<PassThrough, AppError> {
    let body = body.map(|Json(v)| v);
    Ok(state
        .backend
        .forward(Method::POST, COVER_LETTER_GENERATE_PATH, &token, body.as_ref())
        .await?)
}

/// POST /api/extension/verify-token
///
/// Lets the browser extension check that its stored token is still valid.
pub async fn handle_verify_extension_token(
    State(state): State<AppState>,
    token: BearerToken,
) -> Result<PassThrough, AppError> {
    Ok(state
        .backend
        .forward(Method::POST, EXTENSION_VERIFY_PATH, &token, None)
        .await?)
}

/// GET /api/onboarding/status
pub async fn handle_onboarding_status(
    State(state): State<AppState>,
    token: BearerToken,
) -> Result<PassThrough, AppError> {
    Ok(state
        .backend
        .forward(Method::GET, ONBOARDING_STATUS_PATH, &token, None)
        .await?)
}

/// POST /api/billing/checkout
///
/// Creates a checkout session upstream; the body (plan, return URLs) is forwarded as-is.
pub async fn handle_create_checkout(
    State(state): State<AppState>,
    token: BearerToken,
    body: Option<Json<Value>>,
) -> Result<PassThrough, AppError> {
    let body = body.map(|Json(v)| v);
    Ok(state
        .backend
        .forward(Method::POST, CHECKOUT_SESSION_PATH, &token, body.as_ref())
        .await?)
}

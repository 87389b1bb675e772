pub mod health;

use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::backend::handlers as backend;
use crate::relay::handlers as relay;
use crate::state::AppState;

/// Cross-origin callers (web app, browser extension) get wildcard-origin CORS.
/// Every OPTIONS request is answered here, before method routing.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Generation relay
        .route("/api/extension/generate", post(relay::handle_generate))
        // Backend pass-through
        .route("/api/resumes", get(backend::handle_list_resumes))
        .route(
            "/api/cover-letters/generate",
            post(backend::handle_generate_cover_letter),
        )
        .route(
            "/api/extension/verify-token",
            post(backend::handle_verify_extension_token),
        )
        .route(
            "/api/onboarding/status",
            get(backend::handle_onboarding_status),
        )
        .route("/api/billing/checkout", post(backend::handle_create_checkout))
        .layer(cors_layer())
        .with_state(state)
}

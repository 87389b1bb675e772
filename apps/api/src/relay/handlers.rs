//! Axum route handler for the Generation Relay.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use tracing::info;

use crate::auth::BearerToken;
use crate::errors::AppError;
use crate::relay::models::{GenerateRequestBody, GenerationRequest, GenerationResponse};
use crate::state::AppState;

/// POST /api/extension/generate
///
/// Relays one resume or cover letter generation to the orchestrator.
/// The credential is checked first, then the body; neither failure opens a connection.
pub async fn handle_generate(
    State(state): State<AppState>,
    token: BearerToken,
    body: Result<Json<GenerateRequestBody>, JsonRejection>,
) -> Result<Json<GenerationResponse>, AppError> {
    let Json(body) = body.map_err(|e| AppError::Validation(e.body_text()))?;
    let request = validate(body)?;

    info!(
        "Generation requested: {} for {}",
        request.document_type.as_str(),
        request.job_data.company.as_deref().unwrap_or("unknown company")
    );

    let response = state.relay.generate(&token, request).await?;
    Ok(Json(response))
}

fn validate(body: GenerateRequestBody) -> Result<GenerationRequest, AppError> {
    match (body.job_data, body.document_type) {
        (Some(job_data), Some(document_type)) => Ok(GenerationRequest {
            job_data,
            document_type,
        }),
        _ => Err(AppError::Validation(
            "jobData and documentType are required".to_string(),
        )),
    }
}

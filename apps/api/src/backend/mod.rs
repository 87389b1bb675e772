//! Backend API client — the single point of entry for calls to the backend service
//! that owns resumes, cover letters, extension tokens, onboarding and billing.
//!
//! Every call forwards the caller's bearer token. Upstream status and body are
//! passed back to the client unchanged; only transport failures become errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use reqwest::{Client, Method};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::auth::BearerToken;
use crate::errors::AppError;

pub mod handlers;

const REQUEST_TIMEOUT_SECS: u64 = 30;

pub const RESUMES_PATH: &str = "/api/resumes";
pub const COVER_LETTER_GENERATE_PATH: &str = "/api/cover-letters/generate";
pub const EXTENSION_VERIFY_PATH: &str = "/api/extension/verify-token";
pub const ONBOARDING_STATUS_PATH: &str = "/api/onboarding/status";
pub const CHECKOUT_SESSION_PATH: &str = "/api/billing/checkout-session";

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        AppError::BadGateway(err.to_string())
    }
}

/// An upstream response relayed as-is.
#[derive(Debug)]
pub struct PassThrough {
    pub status: StatusCode,
    pub body: Value,
}

impl IntoResponse for PassThrough {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Forwards one authenticated call and returns the upstream status and body.
    pub async fn forward(
        &self,
        method: Method,
        path: &str,
        token: &BearerToken,
        body: Option<&Value>,
    ) -> Result<PassThrough, BackendError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Forwarding {method} {path}");

        let mut request = self
            .client
            .request(method.clone(), &url)
            .bearer_auth(token.as_str());
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = StatusCode::from_u16(response.status().as_u16())
            .unwrap_or(StatusCode::BAD_GATEWAY);
        let text = response.text().await?;

        if !status.is_success() {
            warn!("Backend returned {} for {method} {path}", status.as_u16());
        }

        Ok(PassThrough {
            status,
            body: wrap_body(status, &text),
        })
    }
}

/// JSON bodies pass through untouched; anything else is wrapped so the
/// client always receives JSON.
fn wrap_body(status: StatusCode, text: &str) -> Value {
    if text.trim().is_empty() {
        return json!({});
    }
    match serde_json::from_str::<Value>(text) {
        Ok(value) => value,
        Err(_) if status.is_success() => json!({ "data": text }),
        Err(_) => json!({ "error": text }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn token() -> BearerToken {
        BearerToken("tok_123".to_string())
    }

    #[test]
    fn test_wrap_body_variants() {
        assert_eq!(wrap_body(StatusCode::OK, ""), json!({}));
        assert_eq!(wrap_body(StatusCode::OK, r#"{"a":1}"#), json!({"a": 1}));
        assert_eq!(wrap_body(StatusCode::OK, "plain"), json!({"data": "plain"}));
        assert_eq!(
            wrap_body(StatusCode::BAD_GATEWAY, "<html>oops</html>"),
            json!({"error": "<html>oops</html>"})
        );
    }

    #[tokio::test]
    async fn test_forward_sends_bearer_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(COVER_LETTER_GENERATE_PATH))
            .and(header("authorization", "Bearer tok_123"))
            .and(body_json(json!({"resumeId": "r1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "cl_1"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = BackendClient::new(&format!("{}/", server.uri()));
        let result = client
            .forward(
                Method::POST,
                COVER_LETTER_GENERATE_PATH,
                &token(),
                Some(&json!({"resumeId": "r1"})),
            )
            .await
            .unwrap();

        assert_eq!(result.status, StatusCode::OK);
        assert_eq!(result.body, json!({"id": "cl_1"}));
    }

    #[tokio::test]
    async fn test_forward_passes_error_status_through() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ONBOARDING_STATUS_PATH))
            .respond_with(
                ResponseTemplate::new(403).set_body_json(json!({"error": "Onboarding incomplete"})),
            )
            .mount(&server)
            .await;

        let client = BackendClient::new(&server.uri());
        let result = client
            .forward(Method::GET, ONBOARDING_STATUS_PATH, &token(), None)
            .await
            .unwrap();

        assert_eq!(result.status, StatusCode::FORBIDDEN);
        assert_eq!(result.body["error"], "Onboarding incomplete");
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        // Bind then release a port so nothing is listening on it.
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let client = BackendClient::new(&format!("http://{addr}"));
        let err = client
            .forward(Method::GET, RESUMES_PATH, &token(), None)
            .await
            .unwrap_err();
        assert!(matches!(AppError::from(err), AppError::BadGateway(_)));
    }
}

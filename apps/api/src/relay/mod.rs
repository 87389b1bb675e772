//! Generation Relay — bridges one authenticated client request to the streaming
//! orchestrator and returns a single consolidated result.
//!
//! Flow: compose instruction → derive URL → connect → send one message →
//!       accumulate until a terminal event → extract cover letter payload → respond.
//!
//! One call = one connection, one accumulator, one deadline. No retries; the
//! client reissues the whole request to try again.

pub mod connector;
pub mod events;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod prompts;
pub mod session;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use thiserror::Error;
use tokio::time::{timeout, timeout_at, Instant};
use tokio_tungstenite::tungstenite::{error::ProtocolError, Error as WsError, Message};
use tracing::{info, info_span, warn, Instrument};
use url::Url;

use crate::auth::BearerToken;
use crate::config::Config;
use crate::errors::AppError;
use crate::relay::connector::{build_upstream_url, UpstreamConnector, UpstreamSocket};
use crate::relay::events::{OutboundMessage, UpstreamEvent};
use crate::relay::extract::extract_payload;
use crate::relay::models::{DocumentType, GenerationRequest, GenerationResponse};
use crate::relay::prompts::compose_instruction;
use crate::relay::session::{Inbound, RelaySession, CLOSE_CODE_ABNORMAL, CLOSE_CODE_NO_STATUS};

/// Upper bound on the close handshake once the exchange is over.
const CLOSE_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    #[error("Invalid orchestrator URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to connect to orchestrator: {0}")]
    Connect(String),

    #[error("Connection error: {0}")]
    Transport(String),

    #[error("Malformed event from orchestrator: {0}")]
    MalformedEvent(String),

    /// An `error` event; carries the upstream's message.
    #[error("{0}")]
    Upstream(String),

    /// Explicit `subscription_required` event, or an error matching the entitlement keywords.
    #[error("Subscription required: {0}")]
    SubscriptionRequired(String),

    #[error("Connection closed with code {code} before any content was received (reason: {reason:?})")]
    ClosedEmpty { code: u16, reason: String },

    #[error("Generation timed out after {0} seconds")]
    Timeout(u64),
}

impl From<RelayError> for AppError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::SubscriptionRequired(details) => AppError::PaymentRequired {
                message: "Subscription required".to_string(),
                details,
            },
            RelayError::Timeout(_) => AppError::Timeout(err.to_string()),
            RelayError::InvalidUrl(_) => AppError::Internal(anyhow::anyhow!(err)),
            other => AppError::Upstream(other.to_string()),
        }
    }
}

/// Relay settings taken from `Config` at construction time.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub orchestrator_url: String,
    pub ws_path: String,
    pub timeout: Duration,
    pub page_id_prefix: String,
}

impl From<&Config> for RelaySettings {
    fn from(config: &Config) -> Self {
        Self {
            orchestrator_url: config.orchestrator_url.clone(),
            ws_path: config.orchestrator_ws_path.clone(),
            timeout: config.relay_timeout,
            page_id_prefix: config.page_id_prefix.clone(),
        }
    }
}

#[derive(Clone)]
pub struct Relay {
    settings: RelaySettings,
    connector: Arc<dyn UpstreamConnector>,
}

impl Relay {
    pub fn new(settings: RelaySettings, connector: Arc<dyn UpstreamConnector>) -> Self {
        Self {
            settings,
            connector,
        }
    }

    /// Runs one relay call end to end.
    pub async fn generate(
        &self,
        token: &BearerToken,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, RelayError> {
        let page_id = format!(
            "{}{}",
            self.settings.page_id_prefix,
            Utc::now().timestamp_millis()
        );
        let session = RelaySession::new(page_id);
        let span = info_span!(
            "relay",
            session_id = %session.session_id,
            page_id = %session.page_id,
            document_type = request.document_type.as_str()
        );

        async move {
            let instruction = compose_instruction(&request.job_data, request.document_type);
            let url = build_upstream_url(
                &self.settings.orchestrator_url,
                &self.settings.ws_path,
                token.as_str(),
                &session.page_id,
            )?;

            let content = self.exchange(session, &url, &instruction).await?;
            info!(bytes = content.len(), "Relay complete");
            Ok::<_, RelayError>(finalize(&request, content))
        }
        .instrument(span)
        .await
    }

    /// Drives the session state machine over one connection until a terminal state.
    async fn exchange(
        &self,
        mut session: RelaySession,
        url: &Url,
        instruction: &str,
    ) -> Result<String, RelayError> {
        let deadline = Instant::now() + self.settings.timeout;
        let timeout_secs = self.settings.timeout.as_secs();

        session.begin_connect();
        info!("Connecting to orchestrator");
        let mut socket = match timeout_at(deadline, self.connector.connect(url)).await {
            Ok(Ok(socket)) => socket,
            Ok(Err(e)) => {
                session.fail(e);
                return session.finish();
            }
            Err(_) => {
                session.time_out(timeout_secs);
                return session.finish();
            }
        };

        let page_id = session.page_id.clone();
        let outbound = OutboundMessage::new(instruction, &page_id, Utc::now());
        send_instruction(&mut socket, &mut session, &outbound, deadline, timeout_secs).await;
        if session.state().is_terminal() {
            close_quietly(&mut socket).await;
            return session.finish();
        }
        info!("Instruction sent; awaiting stream");

        loop {
            let inbound = match timeout_at(deadline, socket.next()).await {
                Err(_) => {
                    warn!(
                        fragments = session.fragments(),
                        bytes = session.content().len(),
                        "Deadline elapsed; aborting upstream connection"
                    );
                    session.time_out(timeout_secs);
                    break;
                }
                Ok(None) => Inbound::Closed {
                    code: CLOSE_CODE_ABNORMAL,
                    reason: String::new(),
                },
                Ok(Some(Ok(Message::Text(text)))) => match UpstreamEvent::parse(&text) {
                    Ok(event) => Inbound::Event(event),
                    Err(e) => Inbound::Malformed(e.to_string()),
                },
                Ok(Some(Ok(Message::Close(frame)))) => match frame {
                    Some(frame) => Inbound::Closed {
                        code: u16::from(frame.code),
                        reason: frame.reason.into_owned(),
                    },
                    None => Inbound::Closed {
                        code: CLOSE_CODE_NO_STATUS,
                        reason: String::new(),
                    },
                },
                // Ping/pong are answered by tungstenite; binary frames carry nothing for us.
                Ok(Some(Ok(_))) => continue,
                Ok(Some(Err(
                    WsError::ConnectionClosed
                    | WsError::AlreadyClosed
                    | WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake),
                ))) => Inbound::Closed {
                    code: CLOSE_CODE_ABNORMAL,
                    reason: String::new(),
                },
                Ok(Some(Err(e))) => Inbound::TransportError(e.to_string()),
            };

            if session.apply(inbound).is_terminal() {
                break;
            }
        }

        info!(state = ?session.state(), "Closing upstream connection");
        close_quietly(&mut socket).await;
        session.finish()
    }
}

/// Sends the single outbound frame. Encode and send failures fail the session
/// so the caller still closes the socket.
async fn send_instruction<T: Serialize>(
    socket: &mut UpstreamSocket,
    session: &mut RelaySession,
    outbound: &T,
    deadline: Instant,
    timeout_secs: u64,
) {
    let payload = match serde_json::to_string(outbound) {
        Ok(payload) => payload,
        Err(e) => {
            session.fail(RelayError::Transport(format!("failed to encode message: {e}")));
            return;
        }
    };
    match timeout_at(deadline, socket.send(Message::Text(payload))).await {
        Ok(Ok(())) => session.mark_sent(),
        Ok(Err(e)) => session.fail(RelayError::Transport(e.to_string())),
        Err(_) => session.time_out(timeout_secs),
    }
}

async fn close_quietly(socket: &mut UpstreamSocket) {
    // Already-closed sockets error here; nothing left to do either way.
    let _ = timeout(CLOSE_GRACE, socket.close()).await;
}

/// Shapes the accumulated content into the client response.
pub fn finalize(request: &GenerationRequest, content: String) -> GenerationResponse {
    let job = &request.job_data;

    match request.document_type {
        DocumentType::CoverLetter => {
            let (content, cover_letter_id, company, job_title) = match extract_payload(&content) {
                Some(payload) => (
                    payload.render(),
                    payload.id,
                    payload.company.or_else(|| job.company.clone()),
                    payload.title.or_else(|| job.title.clone()),
                ),
                None => (content, None, job.company.clone(), job.title.clone()),
            };
            GenerationResponse {
                success: true,
                document_type: DocumentType::CoverLetter,
                content,
                company,
                job_title,
                source_url: job.url.clone(),
                cover_letter_id,
                tailoring_prompt: None,
            }
        }
        DocumentType::Resume => GenerationResponse {
            success: true,
            document_type: DocumentType::Resume,
            tailoring_prompt: Some(content.clone()),
            content,
            company: job.company.clone(),
            job_title: job.title.clone(),
            source_url: job.url.clone(),
            cover_letter_id: None,
        },
    }
}

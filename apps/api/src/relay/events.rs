//! Wire shapes exchanged with the orchestrator over the streaming connection.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// An event received from the orchestrator.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UpstreamEvent {
    /// A content fragment. `isUser` marks an echo of our own instruction.
    Message {
        message: Option<String>,
        #[serde(rename = "isUser")]
        is_user: Option<bool>,
    },
    Complete,
    Error {
        message: Option<String>,
    },
    SubscriptionRequired {
        message: Option<String>,
    },
    /// Progress/status events the relay has no use for.
    #[serde(other)]
    Unknown,
}

impl UpstreamEvent {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// The single message the relay sends upstream.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundMessage<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub content: &'a str,
    pub page_id: &'a str,
    pub timestamp: String,
}

impl<'a> OutboundMessage<'a> {
    pub fn new(content: &'a str, page_id: &'a str, now: DateTime<Utc>) -> Self {
        Self {
            kind: "message",
            content,
            page_id,
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

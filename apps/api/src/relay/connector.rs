//! Outbound streaming connection to the orchestrator.
//!
//! `AppState` carries an `Arc<dyn UpstreamConnector>`: production uses
//! `WebSocketConnector`, tests substitute an in-memory socket pair.

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Sink, Stream};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message},
};
use tracing::debug;
use url::Url;

use crate::relay::RelayError;

/// Any duplex WebSocket message channel.
pub trait UpstreamIo:
    Stream<Item = Result<Message, WsError>> + Sink<Message, Error = WsError> + Send
{
}

impl<T> UpstreamIo for T where
    T: Stream<Item = Result<Message, WsError>> + Sink<Message, Error = WsError> + Send
{
}

pub type UpstreamSocket = Pin<Box<dyn UpstreamIo>>;

#[async_trait]
pub trait UpstreamConnector: Send + Sync {
    async fn connect(&self, url: &Url) -> Result<UpstreamSocket, RelayError>;
}

/// Opens real WebSocket connections (ws:// or wss://).
pub struct WebSocketConnector;

#[async_trait]
impl UpstreamConnector for WebSocketConnector {
    async fn connect(&self, url: &Url) -> Result<UpstreamSocket, RelayError> {
        let (stream, response) = connect_async(url.as_str())
            .await
            .map_err(|e| RelayError::Connect(e.to_string()))?;
        debug!(status = %response.status(), "Upstream handshake complete");
        Ok(Box::pin(stream))
    }
}

/// Derives the streaming URL from the orchestrator base address.
///
/// The scheme is swapped to its streaming variant (`http→ws`, `https→wss`),
/// `path` is appended to any base path, and `token` / `page_id` become the
/// only query parameters.
pub fn build_upstream_url(
    base: &str,
    path: &str,
    token: &str,
    page_id: &str,
) -> Result<Url, RelayError> {
    let mut url =
        Url::parse(base).map_err(|e| RelayError::InvalidUrl(format!("{base}: {e}")))?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(RelayError::InvalidUrl(format!(
                "unsupported scheme '{other}'"
            )))
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| RelayError::InvalidUrl(format!("cannot use scheme '{scheme}'")))?;

    let joined = format!(
        "{}/{}",
        url.path().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    url.set_path(&joined);
    url.set_fragment(None);
    url.query_pairs_mut()
        .clear()
        .append_pair("token", token)
        .append_pair("page_id", page_id);

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_becomes_ws() {
        let url = build_upstream_url("http://localhost:8000", "/ws/chat", "tok", "p_1").unwrap();
        assert_eq!(url.as_str(), "ws://localhost:8000/ws/chat?token=tok&page_id=p_1");
    }

    #[test]
    fn test_https_becomes_wss_and_keeps_base_path() {
        let url =
            build_upstream_url("https://api.example.com/v2/", "ws/chat", "tok", "p_1").unwrap();
        assert_eq!(url.scheme(), "wss");
        assert_eq!(url.path(), "/v2/ws/chat");
    }

    #[test]
    fn test_existing_query_is_replaced_and_values_encoded() {
        let url =
            build_upstream_url("http://h/?stale=1#frag", "/ws/chat", "a b&c", "p_1").unwrap();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("token".to_string(), "a b&c".to_string()),
                ("page_id".to_string(), "p_1".to_string())
            ]
        );
        assert!(url.fragment().is_none());
    }

    #[test]
    fn test_unsupported_or_invalid_base_is_rejected() {
        assert!(matches!(
            build_upstream_url("ftp://h", "/ws", "t", "p"),
            Err(RelayError::InvalidUrl(_))
        ));
        assert!(matches!(
            build_upstream_url("not a url", "/ws", "t", "p"),
            Err(RelayError::InvalidUrl(_))
        ));
    }
}

use crate::backend::BackendClient;
use crate::relay::Relay;

/// Shared application state injected into all route handlers via Axum extractors.
/// Immutable after startup; every relay call builds its own session.
#[derive(Clone)]
pub struct AppState {
    /// Generation relay. Holds the pluggable `UpstreamConnector`.
    pub relay: Relay,
    pub backend: BackendClient,
}

//! Relay session — the per-call state machine.
//!
//! `Idle → Connecting → Sent → Receiving → {Complete | Failed | TimedOut}`
//!
//! No transition returns to an earlier state. Content fragments append to the
//! accumulator without changing state. The first terminal input wins; every
//! input after that is ignored, so the outcome can never be overwritten.

use tracing::debug;
use uuid::Uuid;

use crate::relay::events::UpstreamEvent;
use crate::relay::RelayError;

/// Keywords that mark a generic upstream error as an entitlement failure.
/// Heuristic only: the orchestrator sends no structured error code.
const ENTITLEMENT_KEYWORDS: &[&str] = &["subscription", "limit", "upgrade", "payment", "quota"];

const SUBSCRIPTION_DETAILS: &str =
    "An active subscription is required to generate documents. Please upgrade your plan.";

/// Close code reported when the stream ends without a close frame (RFC 6455 §7.1.5).
pub const CLOSE_CODE_ABNORMAL: u16 = 1006;
/// Close code reported when a close frame carries no status (RFC 6455 §7.1.5).
pub const CLOSE_CODE_NO_STATUS: u16 = 1005;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Idle,
    Connecting,
    Sent,
    Receiving,
    Complete,
    Failed,
    TimedOut,
}

impl RelayState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RelayState::Complete | RelayState::Failed | RelayState::TimedOut
        )
    }
}

/// Everything the connection can deliver to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Event(UpstreamEvent),
    /// A text frame that is not a recognizable event.
    Malformed(String),
    TransportError(String),
    Closed { code: u16, reason: String },
}

/// One relay call: identifiers, state, accumulator, and the terminal outcome.
#[derive(Debug)]
pub struct RelaySession {
    pub session_id: Uuid,
    pub page_id: String,
    state: RelayState,
    content: String,
    fragments: usize,
    failure: Option<RelayError>,
}

impl RelaySession {
    pub fn new(page_id: String) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            page_id,
            state: RelayState::Idle,
            content: String::new(),
            fragments: 0,
            failure: None,
        }
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn fragments(&self) -> usize {
        self.fragments
    }

    pub fn begin_connect(&mut self) {
        self.advance(RelayState::Idle, RelayState::Connecting);
    }

    pub fn mark_sent(&mut self) {
        self.advance(RelayState::Connecting, RelayState::Sent);
    }

    /// Fails the session from any non-terminal state (connect or send errors).
    pub fn fail(&mut self, error: RelayError) {
        if !self.state.is_terminal() {
            self.state = RelayState::Failed;
            self.failure = Some(error);
        }
    }

    /// The deadline elapsed. No-op once the session is terminal.
    pub fn time_out(&mut self, timeout_secs: u64) {
        if !self.state.is_terminal() {
            self.state = RelayState::TimedOut;
            self.failure = Some(RelayError::Timeout(timeout_secs));
        }
    }

    /// Applies one inbound input and returns the resulting state.
    pub fn apply(&mut self, inbound: Inbound) -> RelayState {
        if self.state.is_terminal() {
            debug!(state = ?self.state, "Ignoring input after terminal state");
            return self.state;
        }

        match inbound {
            Inbound::Event(UpstreamEvent::Message { message, is_user }) => {
                if self.state == RelayState::Sent {
                    self.state = RelayState::Receiving;
                }
                if is_user == Some(true) {
                    debug!("Skipping echoed user message");
                } else if let Some(fragment) = message.filter(|m| !m.is_empty()) {
                    self.fragments += 1;
                    self.content.push_str(&fragment);
                    debug!(
                        fragments = self.fragments,
                        bytes = self.content.len(),
                        "Accumulated fragment"
                    );
                }
            }
            Inbound::Event(UpstreamEvent::Complete) => {
                self.state = RelayState::Complete;
            }
            Inbound::Event(UpstreamEvent::Error { message }) => {
                let message = message.unwrap_or_else(|| "Generation failed".to_string());
                let error = if is_entitlement_message(&message) {
                    RelayError::SubscriptionRequired(message)
                } else {
                    RelayError::Upstream(message)
                };
                self.fail(error);
            }
            Inbound::Event(UpstreamEvent::SubscriptionRequired { message }) => {
                let details = message.unwrap_or_else(|| SUBSCRIPTION_DETAILS.to_string());
                self.fail(RelayError::SubscriptionRequired(details));
            }
            Inbound::Event(UpstreamEvent::Unknown) => {
                debug!("Ignoring unrecognized upstream event");
            }
            Inbound::Malformed(detail) => self.fail(RelayError::MalformedEvent(detail)),
            Inbound::TransportError(detail) => self.fail(RelayError::Transport(detail)),
            Inbound::Closed { code, reason } => {
                if self.fragments == 0 {
                    self.fail(RelayError::ClosedEmpty { code, reason });
                } else {
                    // Content arrived but the terminal event did not; keep what we have.
                    self.state = RelayState::Complete;
                }
            }
        }

        self.state
    }

    /// Consumes the session and yields the accumulated content or the failure.
    pub fn finish(self) -> Result<String, RelayError> {
        match self.state {
            RelayState::Complete => Ok(self.content),
            _ => Err(self
                .failure
                .unwrap_or_else(|| RelayError::Transport("Relay ended before completion".into()))),
        }
    }

    fn advance(&mut self, from: RelayState, to: RelayState) {
        if self.state == from {
            self.state = to;
        }
    }
}

/// Heuristic entitlement check on free-form upstream error text.
pub fn is_entitlement_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    ENTITLEMENT_KEYWORDS.iter().any(|k| lower.contains(k))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receiving() -> RelaySession {
        let mut session = RelaySession::new("page_1".to_string());
        session.begin_connect();
        session.mark_sent();
        session
    }

    fn message(text: &str) -> Inbound {
        Inbound::Event(UpstreamEvent::Message {
            message: Some(text.to_string()),
            is_user: None,
        })
    }

    #[test]
    fn test_lifecycle_states_advance_in_order() {
        let mut session = RelaySession::new("p".to_string());
        assert_eq!(session.state(), RelayState::Idle);
        session.begin_connect();
        assert_eq!(session.state(), RelayState::Connecting);
        session.mark_sent();
        assert_eq!(session.state(), RelayState::Sent);
        assert_eq!(session.apply(message("a")), RelayState::Receiving);
        assert_eq!(
            session.apply(Inbound::Event(UpstreamEvent::Complete)),
            RelayState::Complete
        );
    }

    #[test]
    fn test_fragments_accumulate_in_arrival_order() {
        let mut session = receiving();
        session.apply(message("Hello "));
        session.apply(message("world"));
        session.apply(Inbound::Event(UpstreamEvent::Complete));
        assert_eq!(session.fragments(), 2);
        assert_eq!(session.finish().unwrap(), "Hello world");
    }

    #[test]
    fn test_user_echo_is_not_accumulated() {
        let mut session = receiving();
        session.apply(Inbound::Event(UpstreamEvent::Message {
            message: Some("the instruction".to_string()),
            is_user: Some(true),
        }));
        session.apply(message("reply"));
        session.apply(Inbound::Event(UpstreamEvent::Complete));
        assert_eq!(session.finish().unwrap(), "reply");
    }

    #[test]
    fn test_first_terminal_event_wins() {
        let mut session = receiving();
        session.apply(message("done"));
        session.apply(Inbound::Event(UpstreamEvent::Complete));
        session.apply(Inbound::Event(UpstreamEvent::Error {
            message: Some("late".to_string()),
        }));
        session.apply(message(" more"));
        assert_eq!(session.state(), RelayState::Complete);
        assert_eq!(session.finish().unwrap(), "done");
    }

    #[test]
    fn test_error_with_subscription_text_is_entitlement_failure() {
        let mut session = receiving();
        session.apply(Inbound::Event(UpstreamEvent::Error {
            message: Some("Active subscription required to continue".to_string()),
        }));
        assert!(matches!(
            session.finish(),
            Err(RelayError::SubscriptionRequired(_))
        ));
    }

    #[test]
    fn test_generic_error_keeps_upstream_message() {
        let mut session = receiving();
        session.apply(Inbound::Event(UpstreamEvent::Error {
            message: Some("model overloaded".to_string()),
        }));
        assert_eq!(
            session.finish(),
            Err(RelayError::Upstream("model overloaded".to_string()))
        );
    }

    #[test]
    fn test_subscription_required_event_without_message_gets_default_details() {
        let mut session = receiving();
        session.apply(Inbound::Event(UpstreamEvent::SubscriptionRequired {
            message: None,
        }));
        assert_eq!(
            session.finish(),
            Err(RelayError::SubscriptionRequired(SUBSCRIPTION_DETAILS.to_string()))
        );
    }

    #[test]
    fn test_close_without_content_fails_with_code() {
        let mut session = receiving();
        session.apply(Inbound::Closed {
            code: 1011,
            reason: "internal".to_string(),
        });
        let err = session.finish().unwrap_err();
        assert!(err.to_string().contains("1011"), "got: {err}");
    }

    #[test]
    fn test_close_after_content_completes() {
        let mut session = receiving();
        session.apply(message("partial"));
        session.apply(Inbound::Closed {
            code: CLOSE_CODE_ABNORMAL,
            reason: String::new(),
        });
        assert_eq!(session.finish().unwrap(), "partial");
    }

    #[test]
    fn test_unknown_events_do_not_change_state() {
        let mut session = receiving();
        assert_eq!(
            session.apply(Inbound::Event(UpstreamEvent::Unknown)),
            RelayState::Sent
        );
    }

    #[test]
    fn test_malformed_and_transport_inputs_fail() {
        let mut session = receiving();
        session.apply(Inbound::Malformed("expected value".to_string()));
        assert!(matches!(session.finish(), Err(RelayError::MalformedEvent(_))));

        let mut session = receiving();
        session.apply(message("x"));
        session.apply(Inbound::TransportError("reset".to_string()));
        assert!(matches!(session.finish(), Err(RelayError::Transport(_))));
    }

    #[test]
    fn test_timeout_is_idempotent_terminal_state() {
        let mut session = receiving();
        session.apply(message("a"));
        session.time_out(180);
        session.apply(message("b"));
        session.apply(Inbound::Event(UpstreamEvent::Complete));
        session.time_out(999);
        assert_eq!(session.state(), RelayState::TimedOut);
        assert_eq!(session.content(), "a");
        assert_eq!(session.finish(), Err(RelayError::Timeout(180)));
    }

    #[test]
    fn test_entitlement_keywords_are_case_insensitive() {
        assert!(is_entitlement_message("Subscription Required"));
        assert!(is_entitlement_message("Monthly generation LIMIT reached"));
        assert!(!is_entitlement_message("Internal server error"));
    }
}

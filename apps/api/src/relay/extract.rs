//! Marker-based payload extraction.
//!
//! Generated cover letters may embed a JSON object after a literal marker token.
//! When present, the object is lifted out and re-rendered as greeting + body.
//! Any malformed payload degrades to the raw text: the call has already produced
//! content, so extraction never fails it.

use serde::Deserialize;
use tracing::warn;

/// Literal token the cover letter instruction asks the model to emit before its JSON.
pub const COVER_LETTER_MARKER: &str = "COVER_LETTER_JSON:";

const DEFAULT_RECIPIENT: &str = "Hiring Manager";

/// Structured cover letter fields embedded in generated text.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CoverLetterPayload {
    pub recipient_name: Option<String>,
    pub body: Option<String>,
    pub id: Option<String>,
    pub company: Option<String>,
    pub title: Option<String>,
}

impl CoverLetterPayload {
    /// `Dear <recipient>,` followed by a blank line and the body.
    pub fn render(&self) -> String {
        let recipient = self
            .recipient_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_RECIPIENT);
        let body = self.body.as_deref().unwrap_or_default().trim();
        format!("Dear {recipient},\n\n{body}")
    }
}

/// Returns the embedded payload, or `None` when the marker is absent or the
/// payload is malformed.
pub fn extract_payload(text: &str) -> Option<CoverLetterPayload> {
    if !text.contains(COVER_LETTER_MARKER) {
        return None;
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        warn!("Marker present but braces are out of order; keeping raw text");
        return None;
    }

    match serde_json::from_str::<CoverLetterPayload>(&text[start..=end]) {
        Ok(payload) => Some(payload),
        Err(e) => {
            warn!("Marker present but payload is not valid JSON ({e}); keeping raw text");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_payload_after_marker() {
        let text = format!(
            "Here you go.\n{COVER_LETTER_MARKER} {{\"recipient_name\":\"Jane\",\"body\":\"Thanks.\",\"id\":\"abc123\"}}"
        );
        let payload = extract_payload(&text).unwrap();
        assert_eq!(payload.recipient_name.as_deref(), Some("Jane"));
        assert_eq!(payload.id.as_deref(), Some("abc123"));
        assert!(payload.company.is_none());

        let rendered = payload.render();
        assert!(rendered.starts_with("Dear Jane,"));
        assert!(rendered.ends_with("Thanks."));
    }

    #[test]
    fn test_no_marker_means_no_extraction() {
        assert!(extract_payload(r#"{"recipient_name":"Jane","body":"Thanks."}"#).is_none());
    }

    #[test]
    fn test_malformed_payload_degrades_silently() {
        let text = format!("{COVER_LETTER_MARKER} {{\"recipient_name\": \"Jane\", body}}");
        assert!(extract_payload(&text).is_none());
    }

    #[test]
    fn test_marker_without_braces_degrades_silently() {
        assert!(extract_payload(&format!("{COVER_LETTER_MARKER} nothing here")).is_none());
        assert!(extract_payload(&format!("}} {COVER_LETTER_MARKER} {{")).is_none());
    }

    #[test]
    fn test_span_is_first_open_to_last_close_brace() {
        // Nested objects parse because the span ends at the LAST closing brace.
        let text = format!(
            "{COVER_LETTER_MARKER} {{\"body\":\"Hi\",\"meta\":{{\"k\":1}},\"title\":\"SRE\"}} trailing"
        );
        let payload = extract_payload(&text).unwrap();
        assert_eq!(payload.title.as_deref(), Some("SRE"));
    }

    #[test]
    fn test_render_defaults_recipient() {
        let payload = CoverLetterPayload {
            recipient_name: Some("   ".to_string()),
            body: Some("Body text".to_string()),
            ..Default::default()
        };
        assert_eq!(payload.render(), "Dear Hiring Manager,\n\nBody text");
    }
}

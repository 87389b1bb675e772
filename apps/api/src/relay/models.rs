use serde::{Deserialize, Serialize};

/// Job posting details scraped by the client. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobData {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub job_type: Option<String>,
    pub salary: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Resume,
    CoverLetter,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Resume => "resume",
            DocumentType::CoverLetter => "cover_letter",
        }
    }
}

/// Inbound body for `POST /api/extension/generate`.
///
/// Both fields are optional at the serde level so that a missing field is
/// reported as a validation error rather than a JSON rejection.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequestBody {
    pub job_data: Option<JobData>,
    pub document_type: Option<DocumentType>,
}

/// A validated generation request.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub job_data: JobData,
    pub document_type: DocumentType,
}

/// Consolidated result returned to the client.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResponse {
    pub success: bool,
    pub document_type: DocumentType,
    pub content: String,
    pub company: Option<String>,
    pub job_title: Option<String>,
    pub source_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_letter_id: Option<String>,
    /// Resumes only: the raw generated content, handed back for tailoring.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tailoring_prompt: Option<String>,
}

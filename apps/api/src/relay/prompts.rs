// Instruction templates sent to the orchestrator, one per document type.
// Placeholders are replaced by `compose_instruction`; absent job fields render as NOT_SPECIFIED.

use crate::relay::extract::COVER_LETTER_MARKER;
use crate::relay::models::{DocumentType, JobData};

const NOT_SPECIFIED: &str = "Not specified";

/// Cover letter instruction. Replace: {title}, {company}, {location}, {job_type},
/// {salary}, {url}, {description}, {marker}
pub const COVER_LETTER_TEMPLATE: &str = r#"Write a tailored cover letter for the following job, using my resume and profile as the only source of facts about me.

JOB DETAILS:
- Title: {title}
- Company: {company}
- Location: {location}
- Employment type: {job_type}
- Salary: {salary}
- Posting URL: {url}

JOB DESCRIPTION:
{description}

STRUCTURE:
1. Opening: name the role and give one compelling reason I am a strong fit
2. Body: two short paragraphs connecting my most relevant experience to the role's key requirements
3. Closing: a confident call to action
Keep it persuasive, specific and under 400 words. Do not repeat the job description back.

OUTPUT FORMAT:
After any commentary, write the literal token {marker} followed by a single JSON object:
{"recipient_name": "Hiring Manager or the named contact", "body": "the letter body without greeting or signature", "company": "company name", "title": "job title"}"#;

/// Resume instruction. Replace: {title}, {company}, {location}, {job_type},
/// {salary}, {url}, {description}
pub const RESUME_TEMPLATE: &str = r#"Tailor my resume for the following job so it passes applicant tracking systems and reads well to a hiring manager.

JOB DETAILS:
- Title: {title}
- Company: {company}
- Location: {location}
- Employment type: {job_type}
- Salary: {salary}
- Posting URL: {url}

JOB DESCRIPTION:
{description}

HARD RULES:
1. Use ONLY experience, skills, dates and metrics already present in my resume. Never invent employers, titles, degrees, certifications or numbers
2. Reorder and rephrase existing bullets to foreground what this job asks for
3. Mirror the job description's keywords only where my resume genuinely supports them
4. Use standard section headings (Summary, Experience, Skills, Education) and plain formatting an ATS can parse
5. If a requirement is not covered by my resume, leave it out rather than implying it"#;

/// Builds the single instruction message for one generation request.
pub fn compose_instruction(job: &JobData, document_type: DocumentType) -> String {
    let template = match document_type {
        DocumentType::CoverLetter => COVER_LETTER_TEMPLATE,
        DocumentType::Resume => RESUME_TEMPLATE,
    };

    fill_placeholders(template, |name| match name {
        "marker" => Some(COVER_LETTER_MARKER),
        "title" => Some(field(&job.title)),
        "company" => Some(field(&job.company)),
        "location" => Some(field(&job.location)),
        "job_type" => Some(field(&job.job_type)),
        "salary" => Some(field(&job.salary)),
        "url" => Some(field(&job.url)),
        "description" => Some(field(&job.description)),
        _ => None,
    })
}

/// Replaces known `{name}` tokens in a single pass. Inserted values are copied
/// verbatim and never scanned again; unknown braces are kept as written.
fn fill_placeholders<'a>(template: &str, lookup: impl Fn(&str) -> Option<&'a str>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let known = after
            .find('}')
            .and_then(|close| lookup(&after[..close]).map(|value| (close, value)));
        match known {
            Some((close, value)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn field(value: &Option<String>) -> &str {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(NOT_SPECIFIED)
}

//! Document Builder — renders the resume and cover letter for one request.
//!
//! Output layout: `<output_dir>/<user_id>/<request_id>_<kind>.<pdf|html>`. Every request
//! gets its own `request_id`, so concurrent requests never write the same file.
//! When PDF conversion fails for any reason the rendered HTML is written instead and
//! the returned document says `format: html`.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use thiserror::Error;
use tracing::{info, warn};

use crate::documents::pdf::PdfRenderer;
use crate::documents::prompts::{COVER_LETTER_PROMPT_TEMPLATE, COVER_LETTER_SYSTEM};
use crate::documents::templates::{fallback_cover_letter, render_cover_letter, render_resume};
use crate::files::write_atomic;
use crate::llm_client::prompts::PROFILE_ONLY_INSTRUCTION;
use crate::llm_client::{LlmClient, Sampling};
use crate::models::document::{DocumentFormat, DocumentKind, GeneratedDocument};
use crate::models::job::JobRequest;
use crate::models::profile::{CandidateProfile, ProfileEntry};
use crate::profiles::is_valid_id;

pub mod handlers;
pub mod pdf;
pub mod prompts;
pub mod templates;

pub use pdf::{DisabledRenderer, WkhtmltopdfRenderer};

const MAX_REQUEST_ID_LEN: usize = 64;
/// An LLM body shorter than this many paragraphs is replaced by the built-in one.
const MIN_LLM_PARAGRAPHS: usize = 2;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Invalid user id '{0}' for an output path")]
    InvalidUserId(String),

    #[error("Invalid request id '{0}'")]
    InvalidRequestId(String),

    #[error("Cannot write {path}: {message}")]
    Write { path: String, message: String },
}

/// Time-ordered and unique: `20240501T120000_1a2b3c4d`.
pub fn new_request_id() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}_{}",
        Local::now().format("%Y%m%dT%H%M%S"),
        &suffix[..8]
    )
}

pub fn is_valid_request_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_REQUEST_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
}

#[derive(Clone)]
pub struct DocumentBuilder {
    output_dir: PathBuf,
    renderer: Arc<dyn PdfRenderer>,
    llm: Option<LlmClient>,
}

impl DocumentBuilder {
    pub fn new(output_dir: PathBuf, renderer: Arc<dyn PdfRenderer>, llm: Option<LlmClient>) -> Self {
        Self {
            output_dir,
            renderer,
            llm,
        }
    }

    pub fn renderer_name(&self) -> &'static str {
        self.renderer.name()
    }

    pub fn output_path(
        &self,
        user_id: &str,
        request_id: &str,
        kind: DocumentKind,
        format: DocumentFormat,
    ) -> PathBuf {
        self.output_dir.join(user_id).join(format!(
            "{request_id}_{}.{}",
            kind.slug(),
            format.extension()
        ))
    }

    /// Documents the request type asks for: resume and/or cover letter, none for
    /// an `info_request`.
    pub async fn build_for_request(
        &self,
        profile: &CandidateProfile,
        job: &JobRequest,
        request_id: &str,
    ) -> Result<Vec<GeneratedDocument>, DocumentError> {
        let mut documents = Vec::new();
        if job.request_type.wants_resume() {
            documents.push(self.build_resume(profile, job, request_id).await?);
        }
        if job.request_type.wants_cover_letter() {
            documents.push(self.build_cover_letter(profile, job, request_id).await?);
        }
        Ok(documents)
    }

    pub async fn build_resume(
        &self,
        profile: &CandidateProfile,
        job: &JobRequest,
        request_id: &str,
    ) -> Result<GeneratedDocument, DocumentError> {
        let html = render_resume(profile, job);
        self.write_document(DocumentKind::Resume, &html, &profile.user_id, request_id)
            .await
    }

    pub async fn build_cover_letter(
        &self,
        profile: &CandidateProfile,
        job: &JobRequest,
        request_id: &str,
    ) -> Result<GeneratedDocument, DocumentError> {
        let paragraphs = self.cover_letter_paragraphs(profile, job).await;
        let date = Local::now().format("%B %d, %Y").to_string();
        let html = render_cover_letter(profile, job, &paragraphs, &date);
        self.write_document(DocumentKind::CoverLetter, &html, &profile.user_id, request_id)
            .await
    }

    async fn cover_letter_paragraphs(&self, profile: &CandidateProfile, job: &JobRequest) -> Vec<String> {
        let Some(llm) = &self.llm else {
            return fallback_cover_letter(profile, job);
        };

        let prompt = cover_letter_prompt(profile, job);
        match llm
            .complete(&prompt, COVER_LETTER_SYSTEM, Sampling::COVER_LETTER)
            .await
        {
            Ok(text) => {
                let paragraphs = split_paragraphs(&text);
                if paragraphs.len() >= MIN_LLM_PARAGRAPHS {
                    paragraphs
                } else {
                    warn!("LLM cover letter too short, using built-in text");
                    fallback_cover_letter(profile, job)
                }
            }
            Err(e) => {
                warn!("Cover letter generation failed, using built-in text: {e}");
                fallback_cover_letter(profile, job)
            }
        }
    }

    /// Tries PDF first; on any renderer error writes the HTML next to where the PDF
    /// would have gone.
    async fn write_document(
        &self,
        kind: DocumentKind,
        html: &str,
        user_id: &str,
        request_id: &str,
    ) -> Result<GeneratedDocument, DocumentError> {
        if !is_valid_id(user_id) {
            return Err(DocumentError::InvalidUserId(user_id.to_string()));
        }
        if !is_valid_request_id(request_id) {
            return Err(DocumentError::InvalidRequestId(request_id.to_string()));
        }

        let pdf_path = self.output_path(user_id, request_id, kind, DocumentFormat::Pdf);
        match self.renderer.render(html, &pdf_path).await {
            Ok(()) => {
                info!("{} written to {}", kind.label(), pdf_path.display());
                return Ok(GeneratedDocument {
                    kind,
                    format: DocumentFormat::Pdf,
                    path: pdf_path,
                });
            }
            Err(e) => warn!(
                "PDF rendering of {} failed ({}), falling back to HTML: {e}",
                kind.slug(),
                self.renderer.name()
            ),
        }

        let html_path = self.output_path(user_id, request_id, kind, DocumentFormat::Html);
        write_atomic(&html_path, html.as_bytes().to_vec())
            .await
            .map_err(|e| DocumentError::Write {
                path: html_path.display().to_string(),
                message: format!("{e:#}"),
            })?;
        info!("{} written to {}", kind.label(), html_path.display());

        Ok(GeneratedDocument {
            kind,
            format: DocumentFormat::Html,
            path: html_path,
        })
    }
}

fn join_summaries(entries: &[ProfileEntry]) -> String {
    let joined = entries
        .iter()
        .map(ProfileEntry::summary)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("; ");
    if joined.is_empty() {
        "not provided".to_string()
    } else {
        joined
    }
}

fn cover_letter_prompt(profile: &CandidateProfile, job: &JobRequest) -> String {
    let job_skills = job.skills.iter().cloned().collect::<Vec<_>>().join(", ");
    COVER_LETTER_PROMPT_TEMPLATE
        .replace("{profile_only}", PROFILE_ONLY_INSTRUCTION)
        .replace("{name}", &profile.display_name())
        .replace("{education}", &join_summaries(&profile.education))
        .replace("{experience}", &join_summaries(&profile.experience))
        .replace("{skills}", &profile.skills.join(", "))
        .replace("{job_title}", job.title_or("Position"))
        .replace("{company}", job.company.as_deref().unwrap_or("the company"))
        .replace("{job_skills}", &job_skills)
}

fn split_paragraphs(text: &str) -> Vec<String> {
    text.replace("\r\n", "\n")
        .split("\n\n")
        .map(|p| p.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|p| !p.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::RequestType;
    use async_trait::async_trait;
    use std::path::Path;

    use crate::documents::pdf::RenderError;

    /// Writes a fake PDF so the success path can be tested without wkhtmltopdf.
    struct FakePdf;

    #[async_trait]
    impl PdfRenderer for FakePdf {
        async fn render(&self, _html: &str, output: &Path) -> Result<(), RenderError> {
            tokio::fs::create_dir_all(output.parent().unwrap()).await?;
            tokio::fs::write(output, b"%PDF-1.4 fake").await?;
            Ok(())
        }

        fn name(&self) -> &'static str {
            "fake"
        }
    }

    fn profile() -> CandidateProfile {
        CandidateProfile {
            user_id: "jane_doe".to_string(),
            name: Some("Jane Doe".to_string()),
            email: Some("jane@example.com".to_string()),
            skills: vec!["Python".to_string(), "SQL".to_string()],
            ..Default::default()
        }
    }

    fn job(request_type: RequestType) -> JobRequest {
        JobRequest {
            job_title: "Backend Engineer".to_string(),
            request_type,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_disabled_renderer_yields_readable_html_at_expected_path() {
        let dir = tempfile::tempdir().unwrap();
        let builder =
            DocumentBuilder::new(dir.path().to_path_buf(), Arc::new(DisabledRenderer), None);

        let doc = builder
            .build_resume(&profile(), &job(RequestType::ResumeOnly), "req1")
            .await
            .unwrap();

        assert_eq!(doc.format, DocumentFormat::Html);
        assert_eq!(doc.kind, DocumentKind::Resume);
        assert_eq!(doc.path, dir.path().join("jane_doe").join("req1_resume.html"));
        let html = std::fs::read_to_string(&doc.path).unwrap();
        assert!(html.contains("<h1>Jane Doe</h1>"));
        assert!(!dir.path().join("jane_doe").join("req1_resume.pdf").exists());
    }

    #[tokio::test]
    async fn test_working_renderer_yields_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let builder = DocumentBuilder::new(dir.path().to_path_buf(), Arc::new(FakePdf), None);

        let doc = builder
            .build_cover_letter(&profile(), &job(RequestType::ResumeAndCoverLetter), "req2")
            .await
            .unwrap();

        assert_eq!(doc.format, DocumentFormat::Pdf);
        assert_eq!(doc.file_name(), "req2_cover_letter.pdf");
        assert!(doc.path.exists());
    }

    #[tokio::test]
    async fn test_request_type_decides_documents() {
        let dir = tempfile::tempdir().unwrap();
        let builder =
            DocumentBuilder::new(dir.path().to_path_buf(), Arc::new(DisabledRenderer), None);
        let p = profile();

        let both = builder
            .build_for_request(&p, &job(RequestType::ResumeAndCoverLetter), "a")
            .await
            .unwrap();
        let kinds: Vec<DocumentKind> = both.iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![DocumentKind::Resume, DocumentKind::CoverLetter]);

        let resume = builder
            .build_for_request(&p, &job(RequestType::ResumeOnly), "b")
            .await
            .unwrap();
        assert_eq!(resume.len(), 1);

        let none = builder
            .build_for_request(&p, &job(RequestType::InfoRequest), "c")
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_distinct_request_ids_never_share_files() {
        let dir = tempfile::tempdir().unwrap();
        let builder =
            DocumentBuilder::new(dir.path().to_path_buf(), Arc::new(DisabledRenderer), None);
        let p = profile();
        let j = job(RequestType::ResumeOnly);

        let first = builder.build_resume(&p, &j, &new_request_id()).await.unwrap();
        let second = builder.build_resume(&p, &j, &new_request_id()).await.unwrap();
        assert_ne!(first.path, second.path);
        assert!(first.path.exists() && second.path.exists());
    }

    #[tokio::test]
    async fn test_unsafe_ids_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let builder =
            DocumentBuilder::new(dir.path().to_path_buf(), Arc::new(DisabledRenderer), None);
        let mut p = profile();

        let err = builder
            .build_resume(&p, &job(RequestType::ResumeOnly), "../x")
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::InvalidRequestId(_)));

        p.user_id = "../../etc".to_string();
        let err = builder
            .build_resume(&p, &job(RequestType::ResumeOnly), "ok")
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::InvalidUserId(_)));
    }

    #[test]
    fn test_split_paragraphs() {
        let text = "Dear Hiring Manager,\r\n\r\nI am   applying\nfor the role.\n\n\n\nThanks.";
        assert_eq!(
            split_paragraphs(text),
            vec!["Dear Hiring Manager,", "I am applying for the role.", "Thanks."]
        );
    }

    #[test]
    fn test_request_id_shape() {
        let id = new_request_id();
        assert!(is_valid_request_id(&id));
        assert!(!is_valid_request_id("a/b"));
        assert!(!is_valid_request_id(""));
    }
}

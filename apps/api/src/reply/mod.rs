//! Reply Composer — drafts the answer to an HR email and turns a draft into a MIME
//! message with the generated documents attached.
//!
//! Composing never fails: without an LLM, or when it errors, the body comes from a
//! built-in template. Turning a draft into a message can fail, since it reads the
//! attachments back from disk.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::gmail::{Attachment, OutgoingMessage};
use crate::llm_client::prompts::PROFILE_ONLY_INSTRUCTION;
use crate::llm_client::{LlmClient, Sampling};
use crate::models::document::GeneratedDocument;
use crate::models::email::EmailRecord;
use crate::models::job::{JobRequest, RequestType};
use crate::models::profile::{CandidateProfile, ProfileEntry};
use crate::reply::prompts::{REPLY_PROMPT_TEMPLATE, REPLY_SYSTEM};

pub mod handlers;
pub mod prompts;

#[derive(Debug, Error)]
pub enum ReplyError {
    #[error("Reply has no recipient")]
    MissingRecipient,

    #[error("Reply {0} contains a line break")]
    HeaderInjection(&'static str),

    #[error("Attachment {0} is outside the output directory")]
    ForeignAttachment(String),

    #[error("Cannot read attachment {path}: {source}")]
    Attachment {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// A reply ready for review or sending. The dashboard may edit the text fields
/// before posting it back to `/api/v1/reply/send`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyDraft {
    pub to: String,
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub in_reply_to: Option<String>,
    #[serde(default)]
    pub references: Option<String>,
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub attachments: Vec<GeneratedDocument>,
}

/// `Re: <subject>`, leaving an existing `Re:` prefix alone.
pub fn reply_subject(original: &str) -> String {
    let original = original.trim();
    let already_reply = original
        .get(..3)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("re:"));
    if already_reply {
        original.to_string()
    } else {
        format!("Re: {original}")
    }
}

/// Content type from the file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        Some("html" | "htm") => "text/html",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

#[derive(Clone)]
pub struct ReplyComposer {
    llm: Option<LlmClient>,
}

impl ReplyComposer {
    pub fn new(llm: Option<LlmClient>) -> Self {
        Self { llm }
    }

    /// Drafts the reply to `email`. `info_request` replies carry no attachments
    /// and summarise the profile in the body instead.
    pub async fn compose(
        &self,
        email: &EmailRecord,
        profile: &CandidateProfile,
        job: &JobRequest,
        documents: &[GeneratedDocument],
    ) -> ReplyDraft {
        let attachments = if job.request_type == RequestType::InfoRequest {
            Vec::new()
        } else {
            documents.to_vec()
        };

        let greeting = greeting(email);
        let mut body = match self.llm_body(email, profile, job, &attachments).await {
            Some(text) => text,
            None => fallback_body(&greeting, profile, job, !attachments.is_empty()),
        };
        if job.request_type == RequestType::InfoRequest {
            body.push_str("\n\n");
            body.push_str(&profile_summary(profile));
        }
        if !attachments.is_empty() {
            body.push_str("\n\n");
            body.push_str(&attachment_list(&attachments));
        }
        body.push_str("\n\n");
        body.push_str(&signature(profile));

        ReplyDraft {
            to: email.sender.clone(),
            subject: reply_subject(&email.subject),
            body,
            in_reply_to: email.message_id_header.clone(),
            references: email.message_id_header.clone(),
            thread_id: email.thread_id.clone(),
            attachments,
        }
    }

    async fn llm_body(
        &self,
        email: &EmailRecord,
        profile: &CandidateProfile,
        job: &JobRequest,
        attachments: &[GeneratedDocument],
    ) -> Option<String> {
        let llm = self.llm.as_ref()?;
        let attached = if attachments.is_empty() {
            "nothing".to_string()
        } else {
            attachments
                .iter()
                .map(|d| d.kind.label())
                .collect::<Vec<_>>()
                .join(", ")
        };
        let prompt = REPLY_PROMPT_TEMPLATE
            .replace("{profile_only}", PROFILE_ONLY_INSTRUCTION)
            .replace("{name}", &profile.display_name())
            .replace("{job_title}", job.title_or("Position"))
            .replace("{company}", job.company.as_deref().unwrap_or("not stated"))
            .replace(
                "{action_needed}",
                job.action_needed.as_deref().unwrap_or("send resume"),
            )
            .replace("{recipient}", email.sender_name().unwrap_or("Hiring Team"))
            .replace("{attachments}", &attached);

        match llm.complete(&prompt, REPLY_SYSTEM, Sampling::REPLY).await {
            Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Ok(_) => None,
            Err(e) => {
                warn!("Reply drafting failed, using built-in text: {e}");
                None
            }
        }
    }
}

fn greeting(email: &EmailRecord) -> String {
    match email.sender_name() {
        Some(name) => format!("Dear {name},"),
        None => "Dear Hiring Team,".to_string(),
    }
}

fn fallback_body(greeting: &str, profile: &CandidateProfile, job: &JobRequest, attached: bool) -> String {
    let company = job
        .company
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .unwrap_or("your company");
    let middle = if attached {
        "Please find the requested documents attached for your review.".to_string()
    } else {
        format!(
            "Below is a summary of {}'s background as requested.",
            profile.display_name()
        )
    };
    format!(
        "{greeting}\n\nThank you for reaching out about the {} role at {company}.\n\n{middle}\n\nWe look forward to hearing from you.",
        job.title_or("open")
    )
}

fn summary_line(label: &str, entries: &[ProfileEntry]) -> Option<String> {
    let parts: Vec<String> = entries
        .iter()
        .map(ProfileEntry::summary)
        .filter(|s| !s.is_empty())
        .collect();
    (!parts.is_empty()).then(|| format!("{label}: {}", parts.join("; ")))
}

fn profile_summary(profile: &CandidateProfile) -> String {
    let mut lines = vec![format!("Candidate: {}", profile.display_name())];
    lines.extend(summary_line("Education", &profile.education));
    lines.extend(summary_line("Experience", &profile.experience));
    if !profile.skills.is_empty() {
        lines.push(format!("Skills: {}", profile.skills.join(", ")));
    }
    lines.join("\n")
}

fn attachment_list(documents: &[GeneratedDocument]) -> String {
    let mut out = String::from("Attachments:");
    for doc in documents {
        out.push_str(&format!("\n• {}: {}", doc.kind.label(), doc.file_name()));
    }
    out
}

fn signature(profile: &CandidateProfile) -> String {
    let mut out = format!("Best regards,\n{}", profile.display_name());
    if !profile.email_or_empty().is_empty() {
        out.push('\n');
        out.push_str(profile.email_or_empty());
    }
    out
}

/// Builds the outgoing message, reading every attachment from disk. Attachments must
/// live under `output_root`, since drafts come back from the browser.
pub async fn to_outgoing(draft: &ReplyDraft, output_root: &Path) -> Result<OutgoingMessage, ReplyError> {
    if draft.to.trim().is_empty() {
        return Err(ReplyError::MissingRecipient);
    }
    let headers = [
        ("recipient", Some(draft.to.as_str())),
        ("subject", Some(draft.subject.as_str())),
        ("in_reply_to", draft.in_reply_to.as_deref()),
        ("references", draft.references.as_deref()),
        ("thread_id", draft.thread_id.as_deref()),
    ];
    for (field, value) in headers {
        if value.is_some_and(|v| v.contains(['\r', '\n'])) {
            return Err(ReplyError::HeaderInjection(field));
        }
    }

    let mut attachments = Vec::with_capacity(draft.attachments.len());
    if !draft.attachments.is_empty() {
        let root = canonical(output_root).await?;
        for doc in &draft.attachments {
            attachments.push(read_attachment(doc, &root).await?);
        }
    }

    Ok(OutgoingMessage {
        to: draft.to.clone(),
        subject: draft.subject.clone(),
        body: draft.body.clone(),
        in_reply_to: draft.in_reply_to.clone(),
        references: draft.references.clone(),
        thread_id: draft.thread_id.clone(),
        attachments,
    })
}

async fn read_attachment(doc: &GeneratedDocument, root: &Path) -> Result<Attachment, ReplyError> {
    let path = canonical(&doc.path).await?;
    if !path.starts_with(root) {
        return Err(ReplyError::ForeignAttachment(doc.path.display().to_string()));
    }
    let data = tokio::fs::read(&path)
        .await
        .map_err(|source| ReplyError::Attachment {
            path: path.display().to_string(),
            source,
        })?;
    Ok(Attachment {
        file_name: doc.file_name(),
        content_type: content_type_for(&path).to_string(),
        data: Bytes::from(data),
    })
}

async fn canonical(path: &Path) -> Result<PathBuf, ReplyError> {
    tokio::fs::canonicalize(path)
        .await
        .map_err(|source| ReplyError::Attachment {
            path: path.display().to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::document::{DocumentFormat, DocumentKind};

    fn email() -> EmailRecord {
        EmailRecord {
            id: "m1".to_string(),
            thread_id: Some("t1".to_string()),
            sender: "Sarah Johnson <sarah@techcorp.com>".to_string(),
            subject: "Backend Engineer opening".to_string(),
            body: "Please send your resume.".to_string(),
            timestamp: None,
            date: None,
            message_id_header: Some("<abc@mail.techcorp.com>".to_string()),
        }
    }

    fn profile() -> CandidateProfile {
        CandidateProfile {
            user_id: "jane_doe".to_string(),
            name: Some("Jane Doe".to_string()),
            email: Some("jane@example.com".to_string()),
            education: vec![ProfileEntry::Text("BSc Computer Science".to_string())],
            skills: vec!["Python".to_string(), "SQL".to_string()],
            ..Default::default()
        }
    }

    fn job(request_type: RequestType) -> JobRequest {
        JobRequest {
            job_title: "Backend Engineer".to_string(),
            company: Some("TechCorp".to_string()),
            request_type,
            ..Default::default()
        }
    }

    fn document(path: PathBuf) -> GeneratedDocument {
        GeneratedDocument {
            kind: DocumentKind::Resume,
            format: DocumentFormat::Html,
            path,
        }
    }

    #[test]
    fn test_reply_subject_not_doubled() {
        assert_eq!(reply_subject("Interview"), "Re: Interview");
        assert_eq!(reply_subject("RE: Interview"), "RE: Interview");
        assert_eq!(reply_subject("re:Interview"), "re:Interview");
    }

    #[test]
    fn test_content_type_by_extension() {
        assert_eq!(content_type_for(Path::new("a/b.PDF")), "application/pdf");
        assert_eq!(content_type_for(Path::new("b.html")), "text/html");
        assert_eq!(content_type_for(Path::new("b")), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_compose_references_thread_and_lists_attachments() {
        let docs = vec![document(PathBuf::from("/out/jane_doe/r1_resume.html"))];
        let draft = ReplyComposer::new(None)
            .compose(&email(), &profile(), &job(RequestType::ResumeOnly), &docs)
            .await;

        assert_eq!(draft.to, "Sarah Johnson <sarah@techcorp.com>");
        assert_eq!(draft.subject, "Re: Backend Engineer opening");
        assert_eq!(draft.in_reply_to.as_deref(), Some("<abc@mail.techcorp.com>"));
        assert_eq!(draft.thread_id.as_deref(), Some("t1"));
        assert_eq!(draft.attachments, docs);
        assert!(draft.body.starts_with("Dear Sarah Johnson,"));
        assert!(draft.body.contains("• Resume: r1_resume.html"));
        assert!(draft.body.ends_with("Best regards,\nJane Doe\njane@example.com"));
    }

    #[tokio::test]
    async fn test_info_request_summarises_profile_without_attachments() {
        let docs = vec![document(PathBuf::from("/out/jane_doe/r1_resume.html"))];
        let draft = ReplyComposer::new(None)
            .compose(&email(), &profile(), &job(RequestType::InfoRequest), &docs)
            .await;

        assert!(draft.attachments.is_empty());
        assert!(!draft.body.contains("Attachments:"));
        assert!(draft.body.contains("Education: BSc Computer Science"));
        assert!(draft.body.contains("Skills: Python, SQL"));
    }

    #[tokio::test]
    async fn test_to_outgoing_reads_attachments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r1_resume.html");
        std::fs::write(&path, "<html></html>").unwrap();

        let draft = ReplyDraft {
            to: "hr@techcorp.com".to_string(),
            subject: "Re: x".to_string(),
            body: "hi".to_string(),
            in_reply_to: None,
            references: None,
            thread_id: Some("t1".to_string()),
            attachments: vec![document(path)],
        };
        let message = to_outgoing(&draft, dir.path()).await.unwrap();
        assert_eq!(message.attachments.len(), 1);
        assert_eq!(message.attachments[0].file_name, "r1_resume.html");
        assert_eq!(message.attachments[0].content_type, "text/html");
        assert_eq!(&message.attachments[0].data[..], b"<html></html>");
        assert_eq!(message.thread_id.as_deref(), Some("t1"));
    }

    #[tokio::test]
    async fn test_to_outgoing_rejects_files_outside_output_dir() {
        let output = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        let path = elsewhere.path().join("secret.txt");
        std::fs::write(&path, "x").unwrap();

        let draft = ReplyDraft {
            to: "hr@techcorp.com".to_string(),
            subject: "Re: x".to_string(),
            body: "hi".to_string(),
            in_reply_to: None,
            references: None,
            thread_id: None,
            attachments: vec![document(path)],
        };
        let err = to_outgoing(&draft, output.path()).await.unwrap_err();
        assert!(matches!(err, ReplyError::ForeignAttachment(_)));
    }

    #[tokio::test]
    async fn test_to_outgoing_rejects_line_breaks_in_headers() {
        let dir = tempfile::tempdir().unwrap();
        let mut draft = ReplyDraft {
            to: "hr@techcorp.com".to_string(),
            subject: "Re: x\r\nBcc: attacker@evil.test".to_string(),
            body: "line one\r\nline two".to_string(),
            in_reply_to: None,
            references: None,
            thread_id: None,
            attachments: Vec::new(),
        };
        assert!(matches!(
            to_outgoing(&draft, dir.path()).await,
            Err(ReplyError::HeaderInjection("subject"))
        ));

        draft.subject = "Re: x".to_string();
        draft.to = "hr@techcorp.com\nBcc: attacker@evil.test".to_string();
        assert!(matches!(
            to_outgoing(&draft, dir.path()).await,
            Err(ReplyError::HeaderInjection("recipient"))
        ));

        draft.to = "hr@techcorp.com".to_string();
        draft.in_reply_to = Some("<a@b>\r\nX-Injected: 1".to_string());
        assert!(matches!(
            to_outgoing(&draft, dir.path()).await,
            Err(ReplyError::HeaderInjection("in_reply_to"))
        ));

        // Line breaks in the body are fine.
        draft.in_reply_to = Some("<a@b>".to_string());
        assert!(to_outgoing(&draft, dir.path()).await.is_ok());
    }

    #[tokio::test]
    async fn test_to_outgoing_requires_recipient() {
        let dir = tempfile::tempdir().unwrap();
        let draft = ReplyDraft {
            to: " ".to_string(),
            subject: "Re: x".to_string(),
            body: "hi".to_string(),
            in_reply_to: None,
            references: None,
            thread_id: None,
            attachments: Vec::new(),
        };
        assert!(matches!(
            to_outgoing(&draft, dir.path()).await,
            Err(ReplyError::MissingRecipient)
        ));
    }
}

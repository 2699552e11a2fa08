//! Email Interpreter — turns a free-text HR email into a `JobRequest`.
//!
//! Interpretation is best-effort: an interpreter always returns a `JobRequest`,
//! leaving fields empty when it finds nothing, and never fails the request.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::interpreter::keywords::{action_for, interpret_text};
use crate::interpreter::prompts::INTERPRET_PROMPT_TEMPLATE;
use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::{LlmClient, Sampling};
use crate::models::job::{JobRequest, RequestType};
use crate::models::profile::normalize_skills;

pub mod handlers;
pub mod keywords;
pub mod prompts;

pub use keywords::KeywordInterpreter;

/// Pluggable interpretation strategy.
#[async_trait]
pub trait EmailInterpreter: Send + Sync {
    async fn interpret(&self, email_text: &str) -> JobRequest;

    /// Strategy name reported by the API.
    fn name(&self) -> &'static str;
}

/// LLM extraction output. Every field tolerates null or absence.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LlmJobRequest {
    job_title: Option<String>,
    company: Option<String>,
    skills: Option<Vec<String>>,
    deadline: Option<String>,
    action_needed: Option<String>,
    request_type: Option<RequestType>,
    experience_level: Option<String>,
    user_id: Option<String>,
    find_best_candidate: Option<bool>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("null"))
}

impl LlmJobRequest {
    fn into_job_request(self) -> JobRequest {
        let request_type = self.request_type.unwrap_or_default();
        JobRequest {
            job_title: non_empty(self.job_title).unwrap_or_default(),
            skills: normalize_skills(self.skills.unwrap_or_default())
                .into_iter()
                .collect(),
            request_type,
            company: non_empty(self.company),
            deadline: non_empty(self.deadline),
            action_needed: non_empty(self.action_needed)
                .or_else(|| Some(action_for(request_type).to_string())),
            experience_level: non_empty(self.experience_level).map(|l| l.to_lowercase()),
            user_id: non_empty(self.user_id),
            find_best_candidate: self.find_best_candidate.unwrap_or(false),
        }
    }
}

/// Extracts with the LLM and falls back to keyword rules on any LLM failure.
pub struct LlmInterpreter {
    llm: LlmClient,
}

impl LlmInterpreter {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl EmailInterpreter for LlmInterpreter {
    async fn interpret(&self, email_text: &str) -> JobRequest {
        let prompt = INTERPRET_PROMPT_TEMPLATE.replace("{email_text}", email_text);
        match self
            .llm
            .complete_json::<LlmJobRequest>(&prompt, JSON_ONLY_SYSTEM, Sampling::EXTRACTION)
            .await
        {
            Ok(extracted) => {
                let job = extracted.into_job_request();
                debug!(
                    "LLM interpretation: title='{}', {} skills, {:?}",
                    job.job_title,
                    job.skills.len(),
                    job.request_type
                );
                job
            }
            Err(e) => {
                warn!("LLM interpretation failed, using keyword rules: {e}");
                interpret_text(email_text)
            }
        }
    }

    fn name(&self) -> &'static str {
        "llm"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    const HIRING_EMAIL: &str = "Subject: Backend Engineer Position\n\n\
        We are hiring for the Backend Engineer position at TechCorp. \
        We need someone with experience in Python and SQL. \
        Please send your resume by Friday.";

    /// Local stand-in for the Messages API; answers every call with `reply`
    /// and keeps the last request body.
    async fn messages_api(status: StatusCode, reply: Value) -> (String, Arc<Mutex<Option<Value>>>) {
        let seen = Arc::new(Mutex::new(None));
        let captured = seen.clone();
        let app = Router::new().route(
            "/v1/messages",
            post(move |Json(body): Json<Value>| {
                let captured = captured.clone();
                let reply = reply.clone();
                async move {
                    *captured.lock().unwrap() = Some(body);
                    (status, Json(reply))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/v1/messages"), seen)
    }

    fn text_reply(text: &str) -> Value {
        json!({
            "content": [{ "type": "text", "text": text }],
            "usage": { "input_tokens": 12, "output_tokens": 34 }
        })
    }

    fn interpreter(url: String) -> LlmInterpreter {
        LlmInterpreter::new(LlmClient::new("test-key".to_string()).unwrap().with_api_url(url))
    }

    #[tokio::test]
    async fn test_llm_rejection_falls_back_to_keywords() {
        let (url, seen) = messages_api(
            StatusCode::UNAUTHORIZED,
            json!({
                "type": "error",
                "error": { "type": "authentication_error", "message": "invalid x-api-key" }
            }),
        )
        .await;

        let job = interpreter(url).interpret(HIRING_EMAIL).await;

        assert!(seen.lock().unwrap().is_some());
        assert_eq!(job, interpret_text(HIRING_EMAIL));
        assert_eq!(job.job_title, "Backend Engineer");
        assert_eq!(job.company.as_deref(), Some("TechCorp"));
    }

    #[tokio::test]
    async fn test_unparseable_llm_output_falls_back_to_keywords() {
        let (url, _seen) = messages_api(StatusCode::OK, text_reply("Sure! The role is Backend Engineer.")).await;

        let job = interpreter(url).interpret(HIRING_EMAIL).await;

        assert_eq!(job, interpret_text(HIRING_EMAIL));
    }

    #[tokio::test]
    async fn test_llm_extraction_is_used_when_valid() {
        let extracted = json!({
            "job_title": "Platform Engineer",
            "company": "TechCorp",
            "skills": ["Rust", "Kubernetes"],
            "request_type": "resume_only",
            "find_best_candidate": true
        });
        let fenced = format!("```json\n{extracted}\n```");
        let (url, seen) = messages_api(StatusCode::OK, text_reply(&fenced)).await;

        let job = interpreter(url).interpret(HIRING_EMAIL).await;

        assert_eq!(job.job_title, "Platform Engineer");
        assert_eq!(job.request_type, RequestType::ResumeOnly);
        assert!(job.skills.contains("Kubernetes"));
        assert!(job.find_best_candidate);

        let request = seen.lock().unwrap().clone().unwrap();
        assert_eq!(request["system"], JSON_ONLY_SYSTEM);
        let prompt = request["messages"][0]["content"].as_str().unwrap();
        assert!(prompt.contains("We are hiring for the Backend Engineer position"));
        assert!(!prompt.contains("{email_text}"));
    }

    #[test]
    fn test_llm_output_with_nulls_maps_to_empty_fields() {
        let json = r#"{
            "job_title": null,
            "company": "null",
            "skills": ["Python", " python ", "SQL", ""],
            "deadline": null,
            "action_needed": null
        }"#;
        let job = serde_json::from_str::<LlmJobRequest>(json)
            .unwrap()
            .into_job_request();

        assert!(job.job_title.is_empty());
        assert!(job.company.is_none());
        assert_eq!(job.skills.len(), 2);
        assert_eq!(job.request_type, RequestType::ResumeAndCoverLetter);
        assert_eq!(
            job.action_needed.as_deref(),
            Some("send resume and cover letter")
        );
    }

    #[test]
    fn test_llm_output_full() {
        let json = r#"{
            "job_title": " Data Analyst ",
            "skills": ["Tableau"],
            "request_type": "info_request",
            "experience_level": "Senior",
            "find_best_candidate": true
        }"#;
        let job = serde_json::from_str::<LlmJobRequest>(json)
            .unwrap()
            .into_job_request();

        assert_eq!(job.job_title, "Data Analyst");
        assert_eq!(job.request_type, RequestType::InfoRequest);
        assert_eq!(job.experience_level.as_deref(), Some("senior"));
        assert!(job.find_best_candidate);
    }

    #[tokio::test]
    async fn test_keyword_interpreter_never_fails_on_empty_text() {
        let job = KeywordInterpreter.interpret("").await;
        assert!(job.job_title.is_empty());
        assert!(job.skills.is_empty());
    }
}

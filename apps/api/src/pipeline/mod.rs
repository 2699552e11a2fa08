//! End-to-end run for one HR email: fetch → interpret → select profile → documents →
//! compose → send.
//!
//! Stages run in order inside the request task. The report records every stage that
//! ran; the first failing stage ends the run with `status: failed`.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::documents::new_request_id;
use crate::errors::AppError;
use crate::gmail::SentMessage;
use crate::matching::{rank_candidates, MatchResult};
use crate::models::document::GeneratedDocument;
use crate::models::email::EmailRecord;
use crate::models::job::JobRequest;
use crate::models::profile::CandidateProfile;
use crate::reply::{to_outgoing, ReplyDraft};
use crate::state::AppState;

pub mod handlers;

/// Candidates kept in the report when the best match is picked.
const REPORTED_MATCHES: usize = 5;

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineRequest {
    pub message_id: String,
    /// Overrides whatever profile the email names.
    pub user_id: Option<String>,
    #[serde(default = "default_send")]
    pub send: bool,
}

fn default_send() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Sent,
    Drafted,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Ok,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub step: &'static str,
    pub status: StepStatus,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub status: PipelineStatus,
    pub request_id: String,
    pub steps: Vec<StepRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<EmailRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_request: Option<JobRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub matches: Vec<MatchResult>,
    pub documents: Vec<GeneratedDocument>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft: Option<ReplyDraft>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent: Option<SentMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// HTTP status for the response; not part of the body.
    #[serde(skip)]
    pub http_status: StatusCode,
}

impl PipelineReport {
    fn new(request_id: String) -> Self {
        Self {
            status: PipelineStatus::Drafted,
            request_id,
            steps: Vec::new(),
            email: None,
            job_request: None,
            user_id: None,
            matches: Vec::new(),
            documents: Vec::new(),
            draft: None,
            sent: None,
            error: None,
            http_status: StatusCode::OK,
        }
    }

    fn step(&mut self, step: &'static str, status: StepStatus, detail: impl Into<String>) {
        self.steps.push(StepRecord {
            step,
            status,
            detail: detail.into(),
        });
    }

    fn fail(&mut self, failure: StageFailure) {
        let (status, _, message) = failure.error.parts();
        warn!("Pipeline {} failed at {}: {message}", self.request_id, failure.step);
        self.step(failure.step, StepStatus::Failed, message.clone());
        self.status = PipelineStatus::Failed;
        self.error = Some(message);
        self.http_status = status;
    }
}

struct StageFailure {
    step: &'static str,
    error: AppError,
}

fn at<E: Into<AppError>>(step: &'static str) -> impl FnOnce(E) -> StageFailure {
    move |e| StageFailure {
        step,
        error: e.into(),
    }
}

pub async fn run(state: &AppState, request: &PipelineRequest) -> PipelineReport {
    let mut report = PipelineReport::new(new_request_id());
    info!(
        "Pipeline {} started for message {}",
        report.request_id, request.message_id
    );
    if let Err(failure) = run_stages(state, request, &mut report).await {
        report.fail(failure);
    }
    info!("Pipeline {} finished: {:?}", report.request_id, report.status);
    report
}

async fn run_stages(
    state: &AppState,
    request: &PipelineRequest,
    report: &mut PipelineReport,
) -> Result<(), StageFailure> {
    let message_id = request.message_id.trim();
    if message_id.is_empty() {
        return Err(at("fetch")(AppError::Validation(
            "message_id is required".to_string(),
        )));
    }

    let email = state.mail.get_message(message_id).await.map_err(at("fetch"))?;
    report.step("fetch", StepStatus::Ok, format!("{} from {}", email.subject, email.sender_address()));
    report.email = Some(email.clone());

    let job = state.interpreter.interpret(&email.interpretable_text()).await;
    report.step(
        "interpret",
        StepStatus::Ok,
        format!(
            "{} ({:?}) via {}",
            job.title_or("no title"),
            job.request_type,
            state.interpreter.name()
        ),
    );
    report.job_request = Some(job.clone());

    let profile = select_profile(state, request, &job, report).await?;
    report.user_id = Some(profile.user_id.clone());

    let documents = state
        .documents
        .build_for_request(&profile, &job, &report.request_id)
        .await
        .map_err(at("documents"))?;
    if documents.is_empty() {
        report.step("documents", StepStatus::Skipped, "information request, nothing to attach");
    } else {
        let names: Vec<String> = documents.iter().map(GeneratedDocument::file_name).collect();
        report.step("documents", StepStatus::Ok, names.join(", "));
    }

    let draft = state.composer.compose(&email, &profile, &job, &documents).await;
    report.step("compose", StepStatus::Ok, format!("to {}", draft.to));
    report.documents = documents;

    if !request.send {
        report.step("send", StepStatus::Skipped, "send disabled, reply kept as draft");
        report.draft = Some(draft);
        report.status = PipelineStatus::Drafted;
        return Ok(());
    }

    let message = to_outgoing(&draft, &state.config.output_dir)
        .await
        .map_err(at("send"))?;
    report.draft = Some(draft);
    let sent = state.mail.send(&message).await.map_err(at("send"))?;
    report.step("send", StepStatus::Ok, format!("message {}", sent.id));
    report.sent = Some(sent);
    report.status = PipelineStatus::Sent;
    Ok(())
}

/// Explicit user id, then the one the email names, then the best match when the
/// sender asked for one, then the configured default.
async fn select_profile(
    state: &AppState,
    request: &PipelineRequest,
    job: &JobRequest,
    report: &mut PipelineReport,
) -> Result<CandidateProfile, StageFailure> {
    let named = request
        .user_id
        .as_deref()
        .map(|id| (id, "requested"))
        .or_else(|| job.user_id.as_deref().map(|id| (id, "named in email")));

    if let Some((user_id, source)) = named {
        report.step("match", StepStatus::Skipped, format!("profile {source}"));
        let profile = state
            .profiles
            .load(user_id.trim())
            .await
            .map_err(at("select_profile"))?;
        report.step("select_profile", StepStatus::Ok, format!("{} ({source})", profile.user_id));
        return Ok(profile);
    }

    if job.find_best_candidate {
        let profiles = state.profiles.list_all().await.map_err(at("match"))?;
        let mut ranked = rank_candidates(state.scorer.as_ref(), job, &profiles).await;
        let Some(best) = ranked.first().cloned() else {
            return Err(at("match")(AppError::NotFound(
                "No candidate profiles to match against".to_string(),
            )));
        };
        report.step(
            "match",
            StepStatus::Ok,
            format!(
                "{} of {} via {}, score {:.2}",
                best.user_id,
                ranked.len(),
                state.scorer.name(),
                best.score
            ),
        );
        ranked.truncate(REPORTED_MATCHES);
        report.matches = ranked;

        let profile = profiles
            .into_iter()
            .find(|p| p.user_id == best.user_id)
            .ok_or_else(|| at("select_profile")(AppError::NotFound(best.user_id.clone())))?;
        report.step("select_profile", StepStatus::Ok, format!("{} (best match)", profile.user_id));
        return Ok(profile);
    }

    report.step("match", StepStatus::Skipped, "no candidate search requested");
    let default_id = state.config.default_user_id.as_str();
    let profile = state
        .profiles
        .load(default_id)
        .await
        .map_err(at("select_profile"))?;
    report.step("select_profile", StepStatus::Ok, format!("{} (default)", profile.user_id));
    Ok(profile)
}

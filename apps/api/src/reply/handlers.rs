use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::gmail::SentMessage;
use crate::models::document::GeneratedDocument;
use crate::models::email::EmailRecord;
use crate::models::job::JobRequest;
use crate::reply::{to_outgoing, ReplyDraft};
use crate::state::AppState;

/// The email is given inline or fetched by id. Without a `job_request` the email is
/// interpreted first; without a `user_id` the request's own id or the default is used.
#[derive(Deserialize)]
pub struct ComposeRequest {
    pub message_id: Option<String>,
    pub email: Option<EmailRecord>,
    pub user_id: Option<String>,
    pub job_request: Option<JobRequest>,
    #[serde(default)]
    pub documents: Vec<GeneratedDocument>,
}

#[derive(Serialize)]
pub struct ComposeResponse {
    pub status: &'static str,
    pub user_id: String,
    pub draft: ReplyDraft,
}

#[derive(Deserialize)]
pub struct SendRequest {
    pub draft: ReplyDraft,
}

#[derive(Serialize)]
pub struct SendResponse {
    pub status: &'static str,
    pub message_id: String,
    pub thread_id: Option<String>,
}

/// POST /api/v1/reply/compose
pub async fn handle_compose(
    State(state): State<AppState>,
    Json(req): Json<ComposeRequest>,
) -> Result<Json<ComposeResponse>, AppError> {
    let email = match (req.email, req.message_id) {
        (Some(email), _) => email,
        (None, Some(id)) if !id.trim().is_empty() => state.mail.get_message(id.trim()).await?,
        _ => {
            return Err(AppError::Validation(
                "Provide either email or message_id".to_string(),
            ))
        }
    };

    let job = match req.job_request {
        Some(job) => job,
        None => state.interpreter.interpret(&email.interpretable_text()).await,
    };
    let user_id = req
        .user_id
        .or_else(|| job.user_id.clone())
        .unwrap_or_else(|| state.config.default_user_id.clone());
    let profile = state.profiles.load(user_id.trim()).await?;

    let draft = state
        .composer
        .compose(&email, &profile, &job, &req.documents)
        .await;

    Ok(Json(ComposeResponse {
        status: "success",
        user_id: profile.user_id,
        draft,
    }))
}

/// POST /api/v1/reply/send
///
/// A provider failure is reported as `{"status": "failed"}` with 502, not retried.
pub async fn handle_send(
    State(state): State<AppState>,
    Json(req): Json<SendRequest>,
) -> Result<Response, AppError> {
    let message = to_outgoing(&req.draft, &state.config.output_dir).await?;

    match state.mail.send(&message).await {
        Ok(SentMessage { id, thread_id }) => {
            info!("Reply sent to {} as {id}", message.to);
            Ok(Json(SendResponse {
                status: "sent",
                message_id: id,
                thread_id,
            })
            .into_response())
        }
        Err(e) => {
            warn!("Sending reply to {} failed: {e}", message.to);
            Ok((
                StatusCode::BAD_GATEWAY,
                Json(json!({ "status": "failed", "error": e.to_string() })),
            )
                .into_response())
        }
    }
}

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::email::EmailRecord;
use crate::models::job::JobRequest;
use crate::state::AppState;

/// Either raw text, or the id of a Gmail message to fetch and interpret.
#[derive(Deserialize)]
pub struct InterpretRequest {
    pub email_text: Option<String>,
    pub message_id: Option<String>,
}

#[derive(Serialize)]
pub struct InterpretResponse {
    pub status: &'static str,
    pub interpreter: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<EmailRecord>,
    pub job_request: JobRequest,
}

/// POST /api/v1/interpret
pub async fn handle_interpret(
    State(state): State<AppState>,
    Json(req): Json<InterpretRequest>,
) -> Result<Json<InterpretResponse>, AppError> {
    let (text, email) = match (req.email_text, req.message_id) {
        (Some(text), _) if !text.trim().is_empty() => (text, None),
        (_, Some(id)) if !id.trim().is_empty() => {
            let email = state.mail.get_message(id.trim()).await?;
            (email.interpretable_text(), Some(email))
        }
        _ => {
            return Err(AppError::Validation(
                "Provide either email_text or message_id".to_string(),
            ))
        }
    };

    let job_request = state.interpreter.interpret(&text).await;
    Ok(Json(InterpretResponse {
        status: "success",
        interpreter: state.interpreter.name(),
        email,
        job_request,
    }))
}

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::documents::{is_valid_request_id, new_request_id};
use crate::errors::AppError;
use crate::models::document::GeneratedDocument;
use crate::models::job::JobRequest;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct GenerateDocumentsRequest {
    pub user_id: String,
    #[serde(default)]
    pub job_request: JobRequest,
    /// Generated when absent.
    pub request_id: Option<String>,
}

#[derive(Serialize)]
pub struct GenerateDocumentsResponse {
    pub status: &'static str,
    pub request_id: String,
    pub renderer: &'static str,
    pub documents: Vec<GeneratedDocument>,
}

/// POST /api/v1/documents
pub async fn handle_generate_documents(
    State(state): State<AppState>,
    Json(req): Json<GenerateDocumentsRequest>,
) -> Result<Json<GenerateDocumentsResponse>, AppError> {
    let request_id = match req.request_id {
        Some(id) if !is_valid_request_id(&id) => {
            return Err(AppError::Validation(format!(
                "request_id '{id}' may only contain letters, digits, '_' and '-'"
            )))
        }
        Some(id) => id,
        None => new_request_id(),
    };

    let profile = state.profiles.load(req.user_id.trim()).await?;
    let documents = state
        .documents
        .build_for_request(&profile, &req.job_request, &request_id)
        .await?;

    Ok(Json(GenerateDocumentsResponse {
        status: "success",
        request_id,
        renderer: state.documents.renderer_name(),
        documents,
    }))
}

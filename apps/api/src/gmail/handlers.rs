use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::email::EmailRecord;
use crate::state::AppState;

/// Gmail caps `maxResults` at 500.
const MAX_LIST_SIZE: u32 = 500;

#[derive(Deserialize)]
pub struct ListEmailsQuery {
    pub max_results: Option<u32>,
    /// Overrides the configured HR search query.
    pub q: Option<String>,
}

#[derive(Serialize)]
pub struct AccountResponse {
    pub status: &'static str,
    pub email_address: String,
}

#[derive(Serialize)]
pub struct EmailListResponse {
    pub status: &'static str,
    pub query: String,
    pub count: usize,
    pub emails: Vec<EmailRecord>,
}

#[derive(Serialize)]
pub struct EmailResponse {
    pub status: &'static str,
    pub email: EmailRecord,
}

/// GET /api/v1/account
pub async fn handle_account(
    State(state): State<AppState>,
) -> Result<Json<AccountResponse>, AppError> {
    let email_address = state.mail.account_address().await?;
    Ok(Json(AccountResponse {
        status: "success",
        email_address,
    }))
}

/// GET /api/v1/emails
pub async fn handle_list_emails(
    State(state): State<AppState>,
    Query(params): Query<ListEmailsQuery>,
) -> Result<Json<EmailListResponse>, AppError> {
    let max_results = params
        .max_results
        .unwrap_or(state.config.gmail_max_results);
    if max_results == 0 || max_results > MAX_LIST_SIZE {
        return Err(AppError::Validation(format!(
            "max_results must be between 1 and {MAX_LIST_SIZE}"
        )));
    }
    let query = params
        .q
        .filter(|q| !q.trim().is_empty())
        .unwrap_or_else(|| state.config.gmail_query.clone());

    let emails = state.mail.list_recent(&query, max_results).await?;
    Ok(Json(EmailListResponse {
        status: "success",
        query,
        count: emails.len(),
        emails,
    }))
}

/// GET /api/v1/emails/:id
pub async fn handle_get_email(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EmailResponse>, AppError> {
    let email = state.mail.get_message(&id).await?;
    Ok(Json(EmailResponse {
        status: "success",
        email,
    }))
}

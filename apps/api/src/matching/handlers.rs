use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::matching::{rank_candidates, MatchResult};
use crate::models::job::JobRequest;
use crate::state::AppState;

const DEFAULT_LIMIT: usize = 5;

#[derive(Deserialize)]
pub struct MatchRequest {
    pub job_request: JobRequest,
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct MatchResponse {
    pub status: &'static str,
    pub strategy: &'static str,
    pub total_candidates_evaluated: usize,
    pub best_match: Option<MatchResult>,
    pub results: Vec<MatchResult>,
}

/// POST /api/v1/match
pub async fn handle_match(
    State(state): State<AppState>,
    Json(req): Json<MatchRequest>,
) -> Result<Json<MatchResponse>, AppError> {
    let limit = req.limit.unwrap_or(DEFAULT_LIMIT);
    if limit == 0 {
        return Err(AppError::Validation("limit must be at least 1".to_string()));
    }

    let profiles = state.profiles.list_all().await?;
    let mut results = rank_candidates(state.scorer.as_ref(), &req.job_request, &profiles).await;
    let total_candidates_evaluated = results.len();
    results.truncate(limit);

    Ok(Json(MatchResponse {
        status: "success",
        strategy: state.scorer.name(),
        total_candidates_evaluated,
        best_match: results.first().cloned(),
        results,
    }))
}

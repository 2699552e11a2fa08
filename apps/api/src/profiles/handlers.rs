use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::profile::CandidateProfile;
use crate::profiles::ProfileStats;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Serialize)]
pub struct ProfileListResponse {
    pub status: &'static str,
    pub count: usize,
    pub profiles: Vec<CandidateProfile>,
}

#[derive(Serialize)]
pub struct ProfileResponse {
    pub status: &'static str,
    pub profile: CandidateProfile,
    /// Validation problems; empty when the profile is complete.
    pub issues: Vec<String>,
}

#[derive(Serialize)]
pub struct ProfileStatsResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub stats: ProfileStats,
}

fn list_response(profiles: Vec<CandidateProfile>) -> Json<ProfileListResponse> {
    Json(ProfileListResponse {
        status: "success",
        count: profiles.len(),
        profiles,
    })
}

/// GET /api/v1/profiles
pub async fn handle_list_profiles(
    State(state): State<AppState>,
) -> Result<Json<ProfileListResponse>, AppError> {
    Ok(list_response(state.profiles.list_all().await?))
}

/// GET /api/v1/profiles/search?q=
pub async fn handle_search_profiles(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<ProfileListResponse>, AppError> {
    Ok(list_response(state.profiles.search(&params.q).await?))
}

/// GET /api/v1/profiles/stats
pub async fn handle_profile_stats(
    State(state): State<AppState>,
) -> Result<Json<ProfileStatsResponse>, AppError> {
    let stats = state.profiles.stats().await?;
    Ok(Json(ProfileStatsResponse {
        status: "success",
        stats,
    }))
}

/// GET /api/v1/profiles/:user_id
pub async fn handle_get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ProfileResponse>, AppError> {
    let profile = state.profiles.load(&user_id).await?;
    let issues = profile.validate();
    Ok(Json(ProfileResponse {
        status: "success",
        profile,
        issues,
    }))
}

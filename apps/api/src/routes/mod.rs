pub mod health;

use axum::{
    response::Html,
    routing::{get, post},
    Router,
};

use crate::documents::handlers::handle_generate_documents;
use crate::gmail::handlers::{handle_account, handle_get_email, handle_list_emails};
use crate::interpreter::handlers::handle_interpret;
use crate::matching::handlers::handle_match;
use crate::pipeline::handlers::handle_pipeline;
use crate::profiles::handlers::{
    handle_get_profile, handle_list_profiles, handle_profile_stats, handle_search_profiles,
};
use crate::reply::handlers::{handle_compose, handle_send};
use crate::state::AppState;

const DASHBOARD_HTML: &str = include_str!("../../static/dashboard.html");

/// GET /
async fn dashboard() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard))
        .route("/health", get(health::health_handler))
        // Gmail reader
        .route("/api/v1/account", get(handle_account))
        .route("/api/v1/emails", get(handle_list_emails))
        .route("/api/v1/emails/:id", get(handle_get_email))
        // Interpretation and matching
        .route("/api/v1/interpret", post(handle_interpret))
        .route("/api/v1/profiles", get(handle_list_profiles))
        .route("/api/v1/profiles/stats", get(handle_profile_stats))
        .route("/api/v1/profiles/search", get(handle_search_profiles))
        .route("/api/v1/profiles/:user_id", get(handle_get_profile))
        .route("/api/v1/match", post(handle_match))
        // Documents and replies
        .route("/api/v1/documents", post(handle_generate_documents))
        .route("/api/v1/reply/compose", post(handle_compose))
        .route("/api/v1/reply/send", post(handle_send))
        .route("/api/v1/pipeline", post(handle_pipeline))
        .with_state(state)
}

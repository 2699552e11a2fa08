use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};

use crate::pipeline::{run, PipelineRequest};
use crate::state::AppState;

/// POST /api/v1/pipeline
///
/// Always answers with the full report; a failed run carries the failing stage's
/// HTTP status.
pub async fn handle_pipeline(
    State(state): State<AppState>,
    Json(req): Json<PipelineRequest>,
) -> Response {
    let report = run(&state, &req).await;
    (report.http_status, Json(report)).into_response()
}

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service status plus the strategies this instance runs with.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "responder",
        "interpreter": state.interpreter.name(),
        "scorer": state.scorer.name(),
        "pdf_renderer": state.documents.renderer_name(),
    }))
}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::debug;

use crate::models::{ErrorResponse, SessionSummary};
use crate::AppState;

/// Read-only view of a live session
pub async fn session_summary(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<SessionSummary>, (StatusCode, Json<ErrorResponse>)> {
    debug!(session = %session_id, "Session summary requested");
    match state.registry.summary(&session_id).await {
        Some(summary) => Ok(Json(summary)),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                code: StatusCode::NOT_FOUND.as_u16(),
                status: "error".to_string(),
                error: format!("Session {} not found", session_id),
            }),
        )),
    }
}

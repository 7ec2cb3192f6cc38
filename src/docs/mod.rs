use utoipa::OpenApi;
use crate::models::*;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Readiness check endpoint
#[utoipa::path(
    get,
    path = "/api/ready",
    responses(
        (status = 200, description = "Service is ready", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn ready_check_doc() {}

/// Relay diagnostics
#[utoipa::path(
    get,
    path = "/api/v1/diagnostics",
    responses(
        (status = 200, description = "Session, connection and host statistics", body = DiagnosticsResponse)
    )
)]
#[allow(dead_code)]
pub async fn diagnostics_doc() {}

/// Current state of a live session
#[utoipa::path(
    get,
    path = "/api/v1/sessions/{session_id}",
    params(
        ("session_id" = String, Path, description = "Session identifier, as used in the websocket path")
    ),
    responses(
        (status = 200, description = "Session found", body = SessionSummary),
        (status = 404, description = "No connection is attached to this session", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn session_summary_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        ready_check_doc,
        diagnostics_doc,
        session_summary_doc,
    ),
    components(
        schemas(HealthResponse, DiagnosticsResponse, SessionSummary, SessionState, ErrorResponse)
    ),
    tags(
        (name = "api", description = "API endpoints")
    )
)]
pub struct ApiDoc;

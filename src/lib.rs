pub mod config;
pub mod docs;
pub mod handlers;
pub mod models;
pub mod relay;
pub mod routes;
pub mod websocket;

use axum::{routing::get, Router};
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use config::RelayConfig;
use docs::ApiDoc;
use relay::Registry;
use routes::create_api_routes;
use websocket::websocket_handler;

/// State shared by every request and connection.
#[derive(Clone)]
pub struct AppState {
    pub registry: Registry,
    pub relay: RelayConfig,
    /// Parent of every connection's cancellation token.
    pub shutdown: CancellationToken,
    /// Every upgraded connection, so shutdown can wait for their close sequence.
    pub connections: TaskTracker,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(relay: RelayConfig) -> Self {
        Self {
            registry: Registry::new(),
            relay,
            shutdown: CancellationToken::new(),
            connections: TaskTracker::new(),
            started_at: Utc::now(),
        }
    }
}

/// Build the full router: one websocket endpoint per session at `/:session`,
/// everything else (API, OpenAPI document, Swagger UI) under `/api`, so that
/// any single path segment can name a session.
pub fn build_app(state: AppState) -> Router {
    let relay_routes = Router::new()
        .nest("/api", create_api_routes())
        .route("/:session", get(websocket_handler))
        .with_state(state);

    relay_routes
        .merge(SwaggerUi::new("/api/swagger").url("/api/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
}

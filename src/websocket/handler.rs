use axum::{
    extract::{ws::WebSocketUpgrade, Path, State},
    response::Response,
};
use tracing::info;

use crate::AppState;

use super::connection::run_connection;

/// WebSocket handler. The path segment names the session to join.
pub async fn websocket_handler(
    Path(session_id): Path<String>,
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Response {
    info!(session = %session_id, "new websocket connection");
    let connections = state.connections.clone();
    ws.max_message_size(state.relay.max_message_size)
        .on_upgrade(move |socket| connections.track_future(run_connection(socket, session_id, state)))
}

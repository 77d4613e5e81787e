//! HTTP surface: the WebSocket endpoint plus a couple of read-only routes.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::broadcast::render_chats;
use crate::state::AppState;
use crate::ws;

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/api/chats", get(list_chats))
        .route("/healthz", get(healthz))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Current chat snapshot, same shape as the `getChats` payload.
///
/// GET /api/chats
pub async fn list_chats(State(state): State<Arc<AppState>>) -> Response {
    match render_chats(state.store.as_ref()).await {
        Ok(chats) => Json(chats).into_response(),
        Err(e) => {
            tracing::error!("Failed to render chats: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to load chats").into_response()
        }
    }
}

/// GET /healthz
pub async fn healthz() -> &'static str {
    "ok"
}

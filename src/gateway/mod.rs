use axum::{
    response::Redirect,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::shared::AppState;

// Public API - what other modules can use
pub use bot_detection::is_preview_bot;
pub use handlers::{heartbeat, room_gate, AUTH_COOKIE};
pub use types::{AccessStatus, RoomAccessResponse};

// Internal modules
mod bot_detection;
mod handlers;
mod types;

/// Builds the HTTP router guarding room entry
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "OK" }))
        .route("/room/:room_id", get(room_gate))
        .route("/room/:room_id/heartbeat", post(heartbeat))
        .fallback(|| async { Redirect::temporary("/") })
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

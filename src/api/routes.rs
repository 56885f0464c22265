//! API route definitions
//!
//! - GET  /api/gamestate   current snapshot (clears the penalty flash)
//! - POST /api/mode        force GREEN or RED
//! - POST /api/start       begin a round
//! - POST /api/end         force GAME_OVER
//! - POST /api/restart     reset to initial values
//! - POST /api/threshold   change the motion area threshold
//! - GET  /video_feed      multipart frame stream
//! - GET  /health          liveness

use axum::middleware as axum_mw;
use axum::routing::{get, post};
use axum::Router;

use super::handlers::{self, ApiState};
use super::middleware;

/// Game state and command endpoints, nested under `/api`.
pub fn api_routes(state: ApiState) -> Router {
    Router::new()
        .route("/gamestate", get(handlers::get_gamestate))
        .route("/mode", post(handlers::set_mode))
        .route("/start", post(handlers::start))
        .route("/end", post(handlers::end))
        .route("/restart", post(handlers::restart))
        .route("/threshold", post(handlers::set_threshold))
        .layer(axum_mw::from_fn(middleware::no_store))
        .with_state(state)
}

/// Root-level endpoints.
pub fn root_routes(state: ApiState) -> Router {
    Router::new()
        .route("/video_feed", get(handlers::video_feed))
        .route("/health", get(handlers::health))
        .with_state(state)
}

//! API request handlers.
//!
//! JSON handlers are thin wrappers over [`StateGateway`]; they return
//! `Response` via [`ApiResponse::game`] or [`ApiErrorResponse`]. The video feed
//! streams the latest rendered frames as `multipart/x-mixed-replace`.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::envelope::{ApiErrorResponse, ApiResponse};
use crate::config::defaults::FEED_BOUNDARY;
use crate::game::{GameSnapshot, StateGateway};
use crate::pipeline::{FrameFeed, RenderedFrame};
use crate::types::Mode;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct ApiState {
    pub gateway: StateGateway,
    pub frames: FrameFeed,
}

impl ApiState {
    fn game(&self, snapshot: GameSnapshot) -> Response {
        ApiResponse::game(snapshot, &self.gateway.referee().rules().clock)
    }
}

// ============================================================================
// Request / response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SetModeRequest {
    pub mode: String,
}

#[derive(Debug, Deserialize)]
pub struct SetThresholdRequest {
    pub threshold: i64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub mode: Mode,
    pub policy: &'static str,
    pub feed_live: bool,
}

// ============================================================================
// Game state
// ============================================================================

/// GET /api/gamestate. Clears the penalty flash.
pub async fn get_gamestate(State(state): State<ApiState>) -> Response {
    state.game(state.gateway.get_state())
}

/// POST /api/mode
pub async fn set_mode(
    State(state): State<ApiState>,
    Json(request): Json<SetModeRequest>,
) -> Response {
    match state.gateway.set_mode(&request.mode) {
        Ok(snapshot) => state.game(snapshot),
        Err(e) => ApiErrorResponse::from_gateway(&e),
    }
}

/// POST /api/start
pub async fn start(State(state): State<ApiState>) -> Response {
    state.game(state.gateway.start())
}

/// POST /api/end
pub async fn end(State(state): State<ApiState>) -> Response {
    state.game(state.gateway.end())
}

/// POST /api/restart
pub async fn restart(State(state): State<ApiState>) -> Response {
    state.game(state.gateway.restart())
}

/// POST /api/threshold
pub async fn set_threshold(
    State(state): State<ApiState>,
    Json(request): Json<SetThresholdRequest>,
) -> Response {
    match state.gateway.set_threshold(request.threshold) {
        Ok(snapshot) => state.game(snapshot),
        Err(e) => ApiErrorResponse::from_gateway(&e),
    }
}

/// GET /health
pub async fn health(State(state): State<ApiState>) -> Response {
    let referee = state.gateway.referee();
    let (mode, _) = referee.frame_context();
    ApiResponse::ok(HealthResponse {
        status: "ok",
        mode,
        policy: referee.rules().clock.name(),
        feed_live: state.frames.has_changed().is_ok(),
    })
}

pub async fn not_found() -> Response {
    ApiErrorResponse::not_found("No such endpoint")
}

// ============================================================================
// Video feed
// ============================================================================

/// Encode one multipart section for `frame`.
pub fn multipart_part(frame: &RenderedFrame) -> Bytes {
    let head = format!(
        "--{FEED_BOUNDARY}\r\nContent-Type: {}\r\nContent-Length: {}\r\nX-Overlay: {}\r\n\r\n",
        frame.content_type,
        frame.bytes.len(),
        frame.overlay_text
    );
    let mut part = Vec::with_capacity(head.len() + frame.bytes.len() + 2);
    part.extend_from_slice(head.as_bytes());
    part.extend_from_slice(&frame.bytes);
    part.extend_from_slice(b"\r\n");
    Bytes::from(part)
}

/// GET /video_feed
///
/// Emits a part for every newly published frame. The stream ends when the
/// analysis loop stops publishing.
pub async fn video_feed(State(state): State<ApiState>) -> Response {
    let mut frames = state.frames.clone();
    if frames.has_changed().is_err() && frames.borrow().is_none() {
        return ApiErrorResponse::service_unavailable("Frame analysis is not running");
    }
    // Replay the current frame (if any) to the new subscriber straight away.
    frames.mark_changed();

    let stream = futures::stream::unfold(frames, |mut frames| async move {
        loop {
            if frames.changed().await.is_err() {
                debug!("Frame feed closed");
                return None;
            }
            let latest: Option<Arc<RenderedFrame>> = frames.borrow_and_update().clone();
            if let Some(frame) = latest {
                return Some((Ok::<_, Infallible>(multipart_part(&frame)), frames));
            }
        }
    });

    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            format!("multipart/x-mixed-replace; boundary={FEED_BOUNDARY}"),
        )],
        Body::from_stream(stream),
    )
        .into_response()
}

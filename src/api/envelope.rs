//! Response envelope for the referee API.
//!
//! Every JSON response is `{data, meta}` or `{error, meta}`. Responses that
//! carry a game snapshot also describe the clock in `meta`, so a polling
//! client knows which timers move on their own and how often.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::Serialize;

use crate::config::defaults::CLOCK_TICK_SECS;
use crate::game::{ClockPolicy, GameSnapshot, GatewayError};

/// Metadata included in every response.
#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub timestamp: String,
    pub version: &'static str,
    /// Clock policy in force, on game responses only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<&'static str>,
    /// Seconds between clock ticks; absent when nothing ticks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick_secs: Option<u64>,
}

impl Default for ResponseMeta {
    fn default() -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION"),
            policy: None,
            tick_secs: None,
        }
    }
}

impl ResponseMeta {
    pub fn for_policy(policy: &ClockPolicy) -> Self {
        Self {
            policy: Some(policy.name()),
            tick_secs: policy.is_timed().then_some(CLOCK_TICK_SECS),
            ..Self::default()
        }
    }
}

/// Successful response: `{ "data": T, "meta": { ... } }`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Response {
        let body = Self {
            data,
            meta: ResponseMeta::default(),
        };
        (StatusCode::OK, axum::Json(body)).into_response()
    }
}

impl ApiResponse<GameSnapshot> {
    /// A game snapshot with the clock described in `meta`.
    pub fn game(snapshot: GameSnapshot, policy: &ClockPolicy) -> Response {
        let body = Self {
            data: snapshot,
            meta: ResponseMeta::for_policy(policy),
        };
        (StatusCode::OK, axum::Json(body)).into_response()
    }
}

/// Error detail inside [`ApiErrorResponse`].
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// Error response: `{ "error": { "code": "...", "message": "..." }, "meta": { ... } }`
#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub error: ErrorDetail,
    pub meta: ResponseMeta,
}

impl ApiErrorResponse {
    fn build(status: StatusCode, code: &str, msg: impl Into<String>) -> Response {
        let body = Self {
            error: ErrorDetail {
                code: code.to_string(),
                message: msg.into(),
            },
            meta: ResponseMeta::default(),
        };
        (status, axum::Json(body)).into_response()
    }

    pub fn not_found(msg: impl Into<String>) -> Response {
        Self::build(StatusCode::NOT_FOUND, "NOT_FOUND", msg)
    }

    pub fn bad_request(msg: impl Into<String>) -> Response {
        Self::build(StatusCode::BAD_REQUEST, "BAD_REQUEST", msg)
    }

    pub fn service_unavailable(msg: impl Into<String>) -> Response {
        Self::build(StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", msg)
    }

    /// Gateway rejections are always the caller's fault.
    pub fn from_gateway(err: &GatewayError) -> Response {
        let code = match err {
            GatewayError::InvalidMode(_) => "INVALID_MODE",
            GatewayError::InvalidThreshold(_) => "INVALID_THRESHOLD",
        };
        Self::build(StatusCode::BAD_REQUEST, code, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ok_response_shape() {
        let resp = ApiResponse::ok(serde_json::json!({"mode": "GREEN"}));
        assert_eq!(resp.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["data"]["mode"], "GREEN");
        assert_eq!(v["meta"]["version"], env!("CARGO_PKG_VERSION"));
        assert!(v["meta"]["timestamp"].is_string());
        assert!(v["meta"].get("policy").is_none());
    }

    #[test]
    fn test_policy_meta() {
        let timed = ResponseMeta::for_policy(&ClockPolicy::default());
        assert_eq!(timed.policy, Some("budgeted"));
        assert_eq!(timed.tick_secs, Some(CLOCK_TICK_SECS));

        let manual = ResponseMeta::for_policy(&ClockPolicy::ClientDriven);
        assert_eq!(manual.policy, Some("client_driven"));
        assert_eq!(manual.tick_secs, None);
    }

    #[tokio::test]
    async fn test_gateway_error_maps_to_bad_request() {
        let resp = ApiErrorResponse::from_gateway(&GatewayError::InvalidMode("BLUE".into()));
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["error"]["code"], "INVALID_MODE");
        assert!(v["error"]["message"].as_str().unwrap().contains("BLUE"));
    }
}

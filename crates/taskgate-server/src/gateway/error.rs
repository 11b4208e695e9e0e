//! Gateway-specific error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use super::upstream::UpstreamError;

/// Errors that reach the caller of the gateway.
///
/// Cache failures are absent on purpose: a failed store read degrades to
/// the miss path and a failed store write is logged and dropped, so only
/// backend-layer failures surface here.
#[derive(Debug)]
pub enum GatewayError {
    /// The backend produced no response at all (unreachable, timed out).
    Upstream(UpstreamError),

    /// The incoming request could not be read for forwarding.
    BadRequest(String),

    /// Response assembly failed inside the gateway.
    Internal(String),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upstream(e) => write!(f, "Upstream error: {}", e),
            Self::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            Self::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for GatewayError {}

impl From<UpstreamError> for GatewayError {
    fn from(err: UpstreamError) -> Self {
        Self::Upstream(err)
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = json!({ "error": self.to_string() });

        (status, Json(body)).into_response()
    }
}

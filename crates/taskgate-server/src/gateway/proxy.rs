//! Pass-through forwarding for the uncached gateway routes.

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    response::Response,
};

use super::error::GatewayError;
use super::upstream::{Upstream, UpstreamResponse};
use crate::server::AppState;

/// Largest request body the gateway will buffer for forwarding.
const MAX_FORWARD_BODY_BYTES: usize = 10_000_000;

pub async fn forward_to_auth(
    State(state): State<AppState>,
    request: Request<Body>,
) -> Result<Response, GatewayError> {
    pass_through(&state, Upstream::Auth, request).await
}

pub async fn forward_to_todo(
    State(state): State<AppState>,
    request: Request<Body>,
) -> Result<Response, GatewayError> {
    pass_through(&state, Upstream::Todo, request).await
}

/// Forwards a request as-is: method, mapped path, body and bearer
/// credential go to the backend; its status, body and content-type come
/// back verbatim. No retries, no header rewriting beyond the path prefix.
async fn pass_through(
    state: &AppState,
    service: Upstream,
    request: Request<Body>,
) -> Result<Response, GatewayError> {
    let method = request.method().clone();
    let path = backend_path(
        request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/"),
    );
    let bearer = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let body = axum::body::to_bytes(request.into_body(), MAX_FORWARD_BODY_BYTES)
        .await
        .map_err(|e| GatewayError::BadRequest(format!("Failed to read request body: {e}")))?;
    let body = (!body.is_empty()).then_some(body);

    let upstream = state
        .upstream
        .forward(service, method, &path, bearer.as_deref(), body)
        .await?;

    respond(upstream)
}

/// Maps an inbound gateway path onto the backend route namespace.
pub(crate) fn backend_path(path_and_query: &str) -> String {
    format!("/api{path_and_query}")
}

fn respond(upstream: UpstreamResponse) -> Result<Response, GatewayError> {
    let content_type = upstream
        .content_type
        .as_deref()
        .unwrap_or("application/json");
    Response::builder()
        .status(upstream.status)
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(upstream.body))
        .map_err(|e| GatewayError::Internal(format!("Failed to build response: {e}")))
}

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use serde_json::json;

use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse<'a> {
    status: &'a str,
}

pub async fn root() -> impl IntoResponse {
    let body = json!({
        "service": "Taskgate",
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(body))
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    // Cache absence is a supported mode, so readiness only reports it.
    let cache = if state.cache.is_some() {
        "present"
    } else {
        "absent"
    };
    let body = json!({
        "status": "ready",
        "cache": cache,
    });
    (StatusCode::OK, Json(body))
}

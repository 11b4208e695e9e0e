//! Cache-aside read path for the todo listing.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Method, StatusCode, header},
    response::Response,
};
use bytes::Bytes;
use taskgate_core::{principal_key, todos_cache_key};
use tracing::{debug, warn};

use super::error::GatewayError;
use super::upstream::Upstream;
use crate::server::AppState;

/// Backend route that owns the todo listing.
const TODOS_BACKEND_PATH: &str = "/api/todos";

/// Serves `GET /todos` through the cache-aside policy.
///
/// The store is a latency optimization with soft consistency: the request
/// never depends on it being present, reachable or fresh. The principal
/// key is derived from the bearer credential whether or not a store
/// exists, the store-absent mode goes straight to the backend, a failed
/// read is a miss, and only successful backend responses are written back.
/// Responses carry `application/json` in every branch; a cached hit is
/// always served as `200 OK` since only 2xx bodies ever enter the store.
pub async fn list_todos(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, GatewayError> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let key = todos_cache_key(&principal_key(bearer));

    let Some(store) = state.cache.as_deref() else {
        // Store absent for the process lifetime: plain backend fetch.
        let upstream = state
            .upstream
            .forward(Upstream::Todo, Method::GET, TODOS_BACKEND_PATH, bearer, None)
            .await?;
        return json_response(upstream.status, upstream.body);
    };

    match store.get(&key).await {
        Ok(Some(cached)) if !cached.is_empty() => {
            debug!(key = %key, "cache hit");
            return json_response(StatusCode::OK, cached.into());
        }
        Ok(_) => {
            debug!(key = %key, "cache miss");
        }
        Err(e) => {
            warn!(key = %key, error = %e, "cache read failed, treating as miss");
        }
    }

    let upstream = state
        .upstream
        .forward(Upstream::Todo, Method::GET, TODOS_BACKEND_PATH, bearer, None)
        .await?;

    if upstream.is_success() {
        if let Err(e) = store.set(&key, &upstream.body, state.todos_ttl).await {
            warn!(key = %key, error = %e, "cache write failed, serving uncached");
        }
    }

    json_response(upstream.status, upstream.body)
}

fn json_response(status: StatusCode, body: Bytes) -> Result<Response, GatewayError> {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .map_err(|e| GatewayError::Internal(format!("Failed to build response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheError, CacheStore};
    use crate::gateway::upstream::{UpstreamClient, UpstreamError, UpstreamResponse};
    use async_trait::async_trait;
    use axum::http::HeaderValue;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    const TTL: Duration = Duration::from_secs(300);

    #[derive(Default)]
    struct MockStore {
        entries: Mutex<HashMap<String, (Vec<u8>, Duration)>>,
        gets: AtomicUsize,
        sets: AtomicUsize,
        fail_reads: bool,
        fail_writes: bool,
    }

    impl MockStore {
        fn with_entry(key: &str, value: &[u8]) -> Self {
            let store = Self::default();
            store
                .entries
                .lock()
                .unwrap()
                .insert(key.to_string(), (value.to_vec(), TTL));
            store
        }

        fn simulated_error() -> CacheError {
            CacheError::Command(redis::RedisError::from((
                redis::ErrorKind::IoError,
                "simulated failure",
            )))
        }
    }

    #[async_trait]
    impl CacheStore for MockStore {
        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            if self.fail_reads {
                return Err(Self::simulated_error());
            }
            Ok(self
                .entries
                .lock()
                .unwrap()
                .get(key)
                .map(|(value, _)| value.clone()))
        }

        async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
            self.sets.fetch_add(1, Ordering::SeqCst);
            if self.fail_writes {
                return Err(Self::simulated_error());
            }
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), (value.to_vec(), ttl));
            Ok(())
        }
    }

    struct MockUpstream {
        status: StatusCode,
        body: &'static str,
        calls: AtomicUsize,
        seen: Mutex<Vec<(Upstream, Method, String, Option<String>)>>,
        fail: bool,
    }

    impl MockUpstream {
        fn responding(status: StatusCode, body: &'static str) -> Arc<Self> {
            Arc::new(Self {
                status,
                body,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
                fail: false,
            })
        }

        fn unreachable() -> Arc<Self> {
            Arc::new(Self {
                status: StatusCode::OK,
                body: "",
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
                fail: true,
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl UpstreamClient for MockUpstream {
        async fn forward(
            &self,
            service: Upstream,
            method: Method,
            path_and_query: &str,
            bearer: Option<&str>,
            _body: Option<Bytes>,
        ) -> Result<UpstreamResponse, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push((
                service,
                method,
                path_and_query.to_string(),
                bearer.map(str::to_string),
            ));
            if self.fail {
                return Err(UpstreamError::Timeout {
                    service,
                    timeout_secs: 30,
                });
            }
            Ok(UpstreamResponse {
                status: self.status,
                body: Bytes::from_static(self.body.as_bytes()),
                content_type: Some("application/json".to_string()),
            })
        }
    }

    fn state_with(store: Option<Arc<MockStore>>, upstream: Arc<MockUpstream>) -> AppState {
        AppState::new(
            store.map(|s| s as Arc<dyn CacheStore>),
            upstream as Arc<dyn UpstreamClient>,
            TTL,
        )
    }

    fn bearer_headers(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    async fn body_of(response: Response) -> Bytes {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn hit_serves_cached_bytes_without_backend_call() {
        let store = Arc::new(MockStore::with_entry("todos:user:unknown", b"[{\"id\":1}]"));
        let upstream = MockUpstream::responding(StatusCode::OK, "[]");
        let state = state_with(Some(store.clone()), upstream.clone());

        let response = list_todos(State(state), HeaderMap::new()).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        assert_eq!(body_of(response).await.as_ref(), b"[{\"id\":1}]");
        assert_eq!(upstream.call_count(), 0);
        assert_eq!(store.sets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn miss_fetches_once_and_fills_the_store() {
        let store = Arc::new(MockStore::default());
        let upstream = MockUpstream::responding(StatusCode::OK, "[{\"id\":7}]");
        let state = state_with(Some(store.clone()), upstream.clone());

        let response = list_todos(State(state), HeaderMap::new()).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_of(response).await.as_ref(), b"[{\"id\":7}]");
        assert_eq!(upstream.call_count(), 1);
        assert_eq!(store.sets.load(Ordering::SeqCst), 1);

        let entries = store.entries.lock().unwrap();
        let (value, ttl) = entries.get("todos:user:unknown").unwrap();
        assert_eq!(value.as_slice(), b"[{\"id\":7}]");
        assert_eq!(*ttl, Duration::from_secs(300));
    }

    #[tokio::test]
    async fn absent_store_fetches_on_every_read() {
        let upstream = MockUpstream::responding(StatusCode::OK, "[]");
        let state = state_with(None, upstream.clone());

        for _ in 0..2 {
            let response = list_todos(State(state.clone()), HeaderMap::new())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(
                response.headers()[header::CONTENT_TYPE],
                "application/json"
            );
        }

        assert_eq!(upstream.call_count(), 2);
    }

    #[tokio::test]
    async fn read_failure_degrades_to_backend_fetch() {
        let store = Arc::new(MockStore {
            fail_reads: true,
            ..MockStore::default()
        });
        let upstream = MockUpstream::responding(StatusCode::OK, "[{\"id\":3}]");
        let state = state_with(Some(store.clone()), upstream.clone());

        let response = list_todos(State(state), HeaderMap::new()).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_of(response).await.as_ref(), b"[{\"id\":3}]");
        assert_eq!(upstream.call_count(), 1);
        // The miss path still tries to fill the store after the fetch.
        assert_eq!(store.sets.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn write_failure_never_fails_the_request() {
        let store = Arc::new(MockStore {
            fail_writes: true,
            ..MockStore::default()
        });
        let upstream = MockUpstream::responding(StatusCode::OK, "[{\"id\":9}]");
        let state = state_with(Some(store.clone()), upstream.clone());

        let response = list_todos(State(state), HeaderMap::new()).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_of(response).await.as_ref(), b"[{\"id\":9}]");
        assert_eq!(store.sets.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn error_status_passes_through_and_is_not_cached() {
        let store = Arc::new(MockStore::default());
        let upstream =
            MockUpstream::responding(StatusCode::UNAUTHORIZED, "{\"error\":\"no token\"}");
        let state = state_with(Some(store.clone()), upstream.clone());

        let response = list_todos(State(state), HeaderMap::new()).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_of(response).await.as_ref(), b"{\"error\":\"no token\"}");
        assert_eq!(store.sets.load(Ordering::SeqCst), 0);
        assert!(store.entries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_cached_value_is_treated_as_miss() {
        let store = Arc::new(MockStore::with_entry("todos:user:unknown", b""));
        let upstream = MockUpstream::responding(StatusCode::OK, "[{\"id\":4}]");
        let state = state_with(Some(store.clone()), upstream.clone());

        let response = list_todos(State(state), HeaderMap::new()).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_of(response).await.as_ref(), b"[{\"id\":4}]");
        assert_eq!(upstream.call_count(), 1);
    }

    #[tokio::test]
    async fn bearer_credential_partitions_the_cache() {
        let store = Arc::new(MockStore::default());
        let upstream = MockUpstream::responding(StatusCode::OK, "[]");
        let state = state_with(Some(store.clone()), upstream.clone());
        let headers = bearer_headers("Bearer aaa.bbbbbbbbbbbbbbbbbbbb.ccc");

        list_todos(State(state), headers).await.unwrap();

        assert!(
            store
                .entries
                .lock()
                .unwrap()
                .contains_key("todos:user:bbbbbbbbbb")
        );
        let seen = upstream.seen.lock().unwrap();
        let (service, method, path, bearer) = &seen[0];
        assert_eq!(*service, Upstream::Todo);
        assert_eq!(*method, Method::GET);
        assert_eq!(path, "/api/todos");
        assert_eq!(
            bearer.as_deref(),
            Some("Bearer aaa.bbbbbbbbbbbbbbbbbbbb.ccc")
        );
    }

    #[tokio::test]
    async fn missing_credential_uses_the_sentinel_partition() {
        let store = Arc::new(MockStore::default());
        let upstream = MockUpstream::responding(StatusCode::OK, "[]");
        let state = state_with(Some(store.clone()), upstream.clone());

        list_todos(State(state), HeaderMap::new()).await.unwrap();

        assert!(
            store
                .entries
                .lock()
                .unwrap()
                .contains_key("todos:user:unknown")
        );
        let seen = upstream.seen.lock().unwrap();
        assert_eq!(seen[0].3, None);
    }

    #[tokio::test]
    async fn unreachable_backend_surfaces_as_bad_gateway() {
        let store = Arc::new(MockStore::default());
        let upstream = MockUpstream::unreachable();
        let state = state_with(Some(store.clone()), upstream.clone());

        let err = list_todos(State(state), HeaderMap::new())
            .await
            .unwrap_err();

        use axum::response::IntoResponse;
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
        assert_eq!(store.sets.load(Ordering::SeqCst), 0);
    }
}

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::cache::CacheStore;
use crate::config::AppConfig;
use crate::gateway::upstream::{HttpUpstreamClient, UpstreamClient};
use crate::gateway::{proxy, todos};
use crate::{handlers, middleware as app_middleware};

/// Shared per-process state injected into every request handler.
///
/// Both capabilities are constructed once at startup and reused by all
/// in-flight requests. `cache` stays `None` for the whole process lifetime
/// when the store was disabled or unreachable at startup; request handlers
/// must not try to reconnect.
#[derive(Clone)]
pub struct AppState {
    pub cache: Option<Arc<dyn CacheStore>>,
    pub upstream: Arc<dyn UpstreamClient>,
    pub todos_ttl: Duration,
}

impl AppState {
    pub fn new(
        cache: Option<Arc<dyn CacheStore>>,
        upstream: Arc<dyn UpstreamClient>,
        todos_ttl: Duration,
    ) -> Self {
        Self {
            cache,
            upstream,
            todos_ttl,
        }
    }
}

pub struct TaskgateServer {
    addr: SocketAddr,
    app: Router,
}

pub fn build_app(state: AppState, cfg: &AppConfig) -> Router {
    let body_limit = cfg.server.body_limit_bytes;
    Router::new()
        // Health and info endpoints
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        // Todo service routes; only the listing read is cached
        .route(
            "/todos",
            get(todos::list_todos).post(proxy::forward_to_todo),
        )
        .route(
            "/todos/{id}",
            get(proxy::forward_to_todo)
                .put(proxy::forward_to_todo)
                .delete(proxy::forward_to_todo),
        )
        // Auth service routes
        .route("/auth/register", post(proxy::forward_to_auth))
        .route("/auth/login", post(proxy::forward_to_auth))
        // Middleware stack. The request id layer wraps the trace layer so
        // the span can read the id it sets.
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    let req_id = req
                        .extensions()
                        .get::<axum::http::HeaderValue>()
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    tracing::info_span!(
                        "http.request",
                        http.method = %method,
                        http.target = %uri,
                        http.status_code = Empty,
                        request_id = %req_id
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(middleware::from_fn(app_middleware::request_id))
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    pub async fn build(self) -> anyhow::Result<TaskgateServer> {
        let cache = crate::create_cache_store(&self.config.redis).await;
        let upstream: Arc<dyn UpstreamClient> =
            Arc::new(HttpUpstreamClient::new(&self.config.upstream)?);
        let state = AppState::new(cache, upstream, self.config.cache.todos_ttl());
        let app = build_app(state, &self.config);

        Ok(TaskgateServer {
            addr: self.addr,
            app,
        })
    }
}

impl TaskgateServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}

//! Axum app assembly and graceful shutdown.
//!
//! `axum::Router` bound via `tokio::net::TcpListener` and `axum::serve`,
//! with `tokio::signal` handling feeding a `with_graceful_shutdown` future
//! so SIGINT/SIGTERM stop new connections while bounding how long in-flight
//! ones are allowed to finish.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::http::handlers;
use crate::metrics;
use crate::resolver::Resolver;

#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<Resolver>,
    pub path_prefix: String,
    pub max_age_seconds: u32,
    pub root_max_age_seconds: u32,
    /// Fires once the shutdown grace period elapses; in-flight resolves
    /// observe it as their cancellation signal.
    pub shutdown: CancellationToken,
}

fn router(state: AppState) -> Router {
    // Wildcard capture, not `Path` extraction, and no `NormalizePathLayer`:
    // both would collapse or re-encode repeated `/` in a base64-encoded
    // request path, and those are significant bytes, not redundant syntax.
    Router::new()
        .route("/", get(handlers::root).post(handlers::post_request))
        .route("/*rest", get(handlers::get_request).post(handlers::post_request))
        .layer(middleware::from_fn(record_http_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Records `http_requests_total` / `http_request_duration_seconds` for
/// every response this router produces, including root health checks and
/// framing-level rejections that never reach `resolver::resolve`.
async fn record_http_metrics(request: Request, next: Next) -> Response {
    let method = request.method().as_str().to_string();
    let start = Instant::now();
    let response = next.run(request).await;
    metrics::record_http_request(&method, response.status().as_u16(), start.elapsed());
    response
}

/// Bind `listen_addr`, serve until a shutdown signal arrives, then allow
/// in-flight handlers up to `shutdown_stop_timeout` before returning.
pub async fn run(listen_addr: SocketAddr, state: AppState, shutdown_stop_timeout: Duration) -> anyhow::Result<()> {
    let app = router(state.clone());
    let listener = TcpListener::bind(listen_addr).await?;
    info!(%listen_addr, "ocsp responder listening");

    let shutdown = state.shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown_signal(shutdown, shutdown_stop_timeout))
        .await?;

    info!("http server stopped");
    Ok(())
}

async fn wait_for_shutdown_signal(shutdown: CancellationToken, stop_timeout: Duration) {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT"),
        _ = terminate => info!("received SIGTERM"),
    }

    info!(?stop_timeout, "shutting down: no longer accepting new connections");
    tokio::spawn(async move {
        tokio::time::sleep(stop_timeout).await;
        shutdown.cancel();
    });
}

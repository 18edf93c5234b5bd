// Path: crates/telemetry/src/http.rs
//! The seeder's internal metrics listener.
//!
//! Bound only when `telemetry.metrics_address` is configured and meant for
//! scrapers on the operator network; it never shares a socket with the
//! device-facing listeners.

use axum::error_handling::HandleErrorLayer;
use axum::http::{header::CONTENT_TYPE, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use prometheus::{Encoder, TextEncoder};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::watch;
use tower::{BoxError, ServiceBuilder};
use tower_http::trace::TraceLayer;

/// Scrape budget. The registry is a handful of request counters, so
/// anything slower than this is wedged, not busy.
const SCRAPE_TIMEOUT: Duration = Duration::from_secs(2);

async fn metrics() -> Response {
    let families = prometheus::gather();
    let mut body = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&families, &mut body) {
        tracing::error!(target: "telemetry", error = %e, "cannot encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    ([(CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response()
}

async fn scrape_failed(err: BoxError) -> (StatusCode, &'static str) {
    if err.is::<tower::timeout::error::Elapsed>() {
        (StatusCode::SERVICE_UNAVAILABLE, "metrics scrape timed out")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "metrics endpoint overloaded")
    }
}

/// Runs the metrics/healthz listener until the shutdown signal fires.
///
/// Scrapers are the only expected clients, so the service is clamped hard:
/// a few concurrent requests, a short timeout, load shed beyond that. A
/// failed bind is logged and swallowed; losing metrics must not take the
/// provisioning plane down with it.
pub async fn run_server(addr: SocketAddr, mut shutdown: watch::Receiver<bool>) {
    let app = Router::new()
        .route("/metrics", get(metrics))
        .route("/healthz", get(|| async { "OK" }))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(scrape_failed))
                .layer(TraceLayer::new_for_http())
                .load_shed()
                .concurrency_limit(4)
                .timeout(SCRAPE_TIMEOUT),
        );

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(target: "telemetry", addr = %addr, error = %e,
                "cannot bind metrics listener");
            return;
        }
    };
    tracing::info!(target: "telemetry", addr = %addr, "metrics listener up");

    let serve = axum::serve(listener, app.into_make_service()).with_graceful_shutdown(
        async move {
            let _ = shutdown.changed().await;
            tracing::info!(target: "telemetry", "metrics listener shutting down");
        },
    );
    if let Err(e) = serve.await {
        tracing::error!(target: "telemetry", error = %e, "metrics listener failed");
    }
}

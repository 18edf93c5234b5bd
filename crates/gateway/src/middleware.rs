// Path: crates/gateway/src/middleware.rs
//! Access logging, real-IP extraction and panic recovery.

use crate::metrics;
use axum::extract::{ConnectInfo, Request};
use axum::middleware::Next;
use axum::response::Response;
use bytes::Bytes;
use dasboot_api::identity::PeerAddr;
use http::header::CONTENT_TYPE;
use http_body::Body as _;
use http_body_util::Full;
use std::any::Any;
use std::net::{IpAddr, SocketAddr};
use std::time::Instant;
use tower_http::catch_panic::ResponseForPanic;

/// Best-effort client address: the first `X-Forwarded-For` hop when
/// present, otherwise the connection's peer address.
fn real_ip(req: &Request) -> String {
    if let Some(xff) = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
    {
        if let Some(first) = xff.split(',').next() {
            if let Ok(ip) = first.trim().parse::<IpAddr>() {
                return ip.to_string();
            }
        }
    }
    if let Some(PeerAddr(addr)) = req.extensions().get::<PeerAddr>() {
        return addr.to_string();
    }
    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.to_string();
    }
    "-".to_string()
}

/// Structured access log plus request metrics. `/healthz` probes are
/// exempt to keep the log usable.
pub async fn access_log(req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    if path == "/healthz" {
        return next.run(req).await;
    }

    let started = Instant::now();
    let method = req.method().clone();
    let uri = req.uri().clone();
    let proto = format!("{:?}", req.version());
    let remote = real_ip(&req);
    let request_id = req
        .headers()
        .get(crate::REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let response = next.run(req).await;

    let status = response.status();
    let bytes = response.body().size_hint().exact().unwrap_or(0);
    let elapsed = started.elapsed();
    tracing::info!(
        target: "gateway",
        method = %method,
        url = %uri,
        request_id = %request_id,
        proto = %proto,
        remote = %remote,
        status = status.as_u16(),
        bytes,
        elapsed_ms = elapsed.as_millis() as u64,
        "request"
    );
    metrics::observe(
        method.as_str(),
        &path,
        status.as_u16(),
        elapsed.as_secs_f64(),
        bytes,
    );
    response
}

/// Converts handler panics into 500 responses with an error-level log entry.
#[derive(Debug, Clone, Copy)]
pub struct PanicResponder;

impl ResponseForPanic for PanicResponder {
    type ResponseBody = Full<Bytes>;

    fn response_for_panic(
        &mut self,
        err: Box<dyn Any + Send + 'static>,
    ) -> http::Response<Self::ResponseBody> {
        let detail = err
            .downcast_ref::<String>()
            .map(String::as_str)
            .or_else(|| err.downcast_ref::<&str>().copied())
            .unwrap_or("panic payload of unknown type");
        tracing::error!(target: "gateway", panic = %detail, "handler panicked");
        http::Response::builder()
            .status(http::StatusCode::INTERNAL_SERVER_ERROR)
            .header(CONTENT_TYPE, "application/json")
            .body(Full::from(r#"{"error":"internal server error"}"#))
            .expect("static response must build")
    }
}

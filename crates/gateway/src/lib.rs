// Path: crates/gateway/src/lib.rs
#![forbid(unsafe_code)]

//! The seeder's HTTP surface.
//!
//! Two routers share one [`GatewayState`]:
//!
//! - the **insecure router**, typically bound to link-local addresses,
//!   serves stage0 (plus the legacy ONIE fallback paths) and the IPAM
//!   handshake; stage0 runs before the device has any credentials, so no
//!   authorization is required there;
//! - the **secure router** serves everything past stage0 over TLS: stage1,
//!   stage2 and the NOS/agent artifacts, plus the registration endpoints
//!   that mint device client certificates.
//!
//! Artifacts are read from the [`ArtifactProvider`], re-signed with the
//! per-stage embedded configuration and streamed back as octet streams.

pub mod authz;
pub mod embed;
pub mod error;
pub mod insecure;
pub mod metrics;
pub mod middleware;
pub mod respond;
pub mod secure;
pub mod state;

pub use error::AppError;
pub use state::{GatewayState, InstallerBundle};

use axum::middleware as axum_middleware;
use axum::routing::{get, post};
use axum::Router;
use http::HeaderName;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

/// Header carrying the per-request id on requests and responses.
pub const REQUEST_ID_HEADER: &str = "request-id";

/// Builds the unauthenticated router serving stage0 and IPAM.
pub fn insecure_router(state: Arc<GatewayState>) -> Router {
    let router = Router::new()
        .route("/healthz", get(insecure::healthz))
        .route("/stage0/{arch}", get(insecure::stage0))
        .route("/stage0", get(insecure::unsupported_platform))
        .route("/stage0/ipam", post(insecure::ipam))
        // Legacy ONIE fallbacks: ONIE probes these paths on its own.
        .route("/onie-installer-{arch}", get(insecure::stage0))
        .route("/onie-installer", get(insecure::unsupported_platform))
        .route("/onie-updater-{arch}", get(insecure::stage0))
        .route("/onie-updater", get(insecure::unsupported_platform))
        .with_state(state);
    finish_router(router)
}

/// Builds the TLS-only router serving stage1 onward.
pub fn secure_router(state: Arc<GatewayState>) -> Router {
    let router = Router::new()
        .route("/healthz", get(insecure::healthz))
        .route("/stage1/{arch}", get(secure::stage1))
        .route("/stage2/{arch}", get(secure::stage2))
        .route("/register", post(secure::register))
        .route("/register/{devid}", get(secure::register_poll))
        .route("/nos/install/{platform}/{devid}", get(secure::nos_install))
        .route("/onie/update/{platform}", get(secure::onie_update))
        .route(
            "/provisioners/hedgehog-agent/{arch}",
            get(secure::agent_provisioner),
        )
        .route(
            "/provisioners/hedgehog-agent/agent/{devid}",
            get(secure::agent_binary),
        )
        .route(
            "/provisioners/hedgehog-agent/agent/config/{devid}",
            get(secure::agent_config),
        )
        .route(
            "/provisioners/hedgehog-agent/agent/kubeconfig/{devid}",
            get(secure::agent_kubeconfig),
        )
        .with_state(state);
    finish_router(router)
}

/// Applies the shared middleware stack. The order matters: the request id
/// must exist before anything logs it, and panics are converted to 500s
/// inside the access log so a panicking handler still produces a log line.
fn finish_router(router: Router) -> Router {
    metrics::install_metrics();
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    router
        .layer(CatchPanicLayer::custom(middleware::PanicResponder))
        .layer(axum_middleware::from_fn(middleware::access_log))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
}

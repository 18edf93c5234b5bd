// Path: crates/gateway/src/insecure.rs
//! Handlers of the unauthenticated router: stage0 and the IPAM handshake.

use crate::authz;
use crate::embed::{serve_embedded, stage0_record};
use crate::error::{AppError, RequestId};
use crate::state::GatewayState;
use axum::extract::{Path, Request, State};
use axum::response::{IntoResponse, Json, Response};
use dasboot_api::artifact::stage_artifact_name;
use dasboot_api::identity::ConnScheme;
use dasboot_types::ipam::{IpamBinding, IpamRequest};
use dasboot_types::Arch;
use http::header::{CONTENT_TYPE, HOST};
use http::StatusCode;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

/// Liveness probe.
pub async fn healthz() -> &'static str {
    "OK"
}

/// Fallback for download paths without a usable architecture tag: a script
/// that tells the operator what went wrong on the device console.
pub async fn unsupported_platform() -> Response {
    const SCRIPT: &str = "#!/bin/sh\necho \"unsupported platform\" >&2\nexit 1\n";
    (
        StatusCode::OK,
        [(CONTENT_TYPE, "text/x-shellscript")],
        SCRIPT,
    )
        .into_response()
}

/// Serves the stage0 installer with its embedded configuration.
///
/// Also mounted on the legacy `/onie-installer*` and `/onie-updater*`
/// paths that ONIE probes by itself.
pub async fn stage0(
    State(state): State<Arc<GatewayState>>,
    Path(arch): Path<String>,
    rid: RequestId,
    req: Request,
) -> Result<Response, AppError> {
    authz::stage0(&req)?;

    let Ok(arch) = arch.parse::<Arch>() else {
        return Ok(unsupported_platform().await);
    };

    let scheme = req
        .extensions()
        .get::<ConnScheme>()
        .copied()
        .unwrap_or(ConnScheme::Http);
    let host = req
        .headers()
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::bad_request(&rid, "request carries no Host header"))?;
    let ipam_url = format!("{}://{host}/stage0/ipam", scheme.as_str());

    // ONIE describes the device in ONIE-* headers; they ride along verbatim
    // so stage0 can echo them into the IPAM handshake.
    let mut onie_headers: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in req.headers() {
        if name.as_str().starts_with("onie-") {
            if let Ok(value) = value.to_str() {
                onie_headers
                    .entry(name.as_str().to_string())
                    .or_default()
                    .push(value.to_string());
            }
        }
    }
    let onie_headers = (!onie_headers.is_empty()).then_some(onie_headers);

    let record = stage0_record(&state.bundle, ipam_url, onie_headers);
    serve_embedded(&rid, &state, &stage_artifact_name("stage0", arch), &record).await
}

/// The stage0 IPAM handshake: interface names in, address plan out.
pub async fn ipam(
    State(state): State<Arc<GatewayState>>,
    rid: RequestId,
    req: Request,
) -> Result<Response, AppError> {
    let is_json = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim_start().starts_with("application/json"));
    if !is_json {
        return Err(AppError::with_status(
            &rid,
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Content-Type must be application/json",
        ));
    }

    let body = axum::body::to_bytes(req.into_body(), 1 << 20)
        .await
        .map_err(|e| AppError::bad_request(&rid, format!("cannot read request body: {e}")))?;
    let ipam_req: IpamRequest = serde_json::from_slice(&body)
        .map_err(|e| AppError::bad_request(&rid, format!("invalid IPAM request: {e}")))?;

    if let Some(location_uuid) = ipam_req.location_uuid {
        let matches = state
            .topology
            .location_matches(ipam_req.devid, location_uuid)
            .await
            .map_err(|e| AppError::internal(&rid, e))?;
        if !matches {
            warn!(target: "gateway", devid = %ipam_req.devid, location = %location_uuid,
                "device asserted a location that does not match the topology");
            return Err(AppError::forbidden(
                &rid,
                "asserted location does not match the topology",
            ));
        }
    }

    let addresses = state
        .topology
        .interface_plan(ipam_req.devid, &ipam_req.interfaces)
        .await
        .map_err(|e| AppError::internal(&rid, e))?;

    let binding = IpamBinding {
        addresses,
        dns_servers: state.bundle.dns_servers.clone(),
        ntp_servers: state.bundle.ntp_servers.clone(),
        syslog_servers: state.bundle.syslog_servers.clone(),
        stage1_url: format!("{}/stage1/{}", state.bundle.secure_base_url, ipam_req.arch),
    };
    Ok(Json(binding).into_response())
}

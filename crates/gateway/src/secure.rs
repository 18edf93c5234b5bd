// Path: crates/gateway/src/secure.rs
//! Handlers of the TLS-only router: stage1 onward.

use crate::authz::{require_client_cn, require_device};
use crate::embed::{
    agent_record, fetch_artifact, octet_stream, serve_embedded, stage1_record, stage2_record,
    yaml,
};
use crate::error::{AppError, RequestId};
use crate::respond::registration_response;
use crate::state::GatewayState;
use axum::extract::{Path, State};
use axum::response::Response;
use axum::Extension;
use bytes::Bytes;
use dasboot_api::artifact::stage_artifact_name;
use dasboot_api::identity::ClientIdentity;
use dasboot_api::topology::DeviceSoftware;
use dasboot_types::registration::RegistrationRequest;
use dasboot_types::{Arch, RegistrationError};
use std::sync::Arc;
use uuid::Uuid;

fn parse_arch(rid: &RequestId, arch: &str) -> Result<Arch, AppError> {
    arch.parse::<Arch>()
        .map_err(|e| AppError::bad_request(rid, e.to_string()))
}

fn parse_devid(rid: &RequestId, devid: &str) -> Result<Uuid, AppError> {
    devid
        .parse::<Uuid>()
        .map_err(|e| AppError::bad_request(rid, format!("invalid device id '{devid}': {e}")))
}

/// The CN of the verified peer certificate, parsed as a device id.
fn identity_devid(
    rid: &RequestId,
    identity: Option<&ClientIdentity>,
) -> Result<Uuid, AppError> {
    let cn = require_client_cn(rid, identity)?;
    cn.parse::<Uuid>().map_err(|_| {
        AppError::forbidden(rid, format!("client certificate CN '{cn}' is not a device id"))
    })
}

async fn software_for(
    rid: &RequestId,
    state: &GatewayState,
    devid: Uuid,
) -> Result<DeviceSoftware, AppError> {
    state
        .topology
        .software_for(devid)
        .await
        .map_err(|e| AppError::internal(rid, e))?
        .ok_or_else(|| {
            AppError::not_found(rid, format!("no software assigned to device '{devid}'"))
        })
}

/// Serves stage1. TLS is required by the listener; no client certificate yet.
pub async fn stage1(
    State(state): State<Arc<GatewayState>>,
    Path(arch): Path<String>,
    rid: RequestId,
) -> Result<Response, AppError> {
    let arch = parse_arch(&rid, &arch)?;
    let record = stage1_record(&state.bundle, arch);
    serve_embedded(&rid, &state, &stage_artifact_name("stage1", arch), &record).await
}

/// Serves stage2 to a registered device; the verified CN is the device id.
pub async fn stage2(
    State(state): State<Arc<GatewayState>>,
    Path(arch): Path<String>,
    rid: RequestId,
    identity: Option<Extension<ClientIdentity>>,
) -> Result<Response, AppError> {
    let arch = parse_arch(&rid, &arch)?;
    let devid = identity_devid(&rid, identity.as_deref())?;
    let software = software_for(&rid, &state, devid).await?;
    let record = stage2_record(&state.bundle, &software, arch, devid);
    serve_embedded(&rid, &state, &stage_artifact_name("stage2", arch), &record).await
}

/// Accepts a CSR and drives the registration state machine.
pub async fn register(
    State(state): State<Arc<GatewayState>>,
    rid: RequestId,
    body: Bytes,
) -> Result<Response, AppError> {
    let req: RegistrationRequest = serde_json::from_slice(&body)
        .map_err(|e| AppError::bad_request(&rid, format!("invalid registration request: {e}")))?;
    run_registration(&state, &rid, req).await
}

/// Polls the registration status for a device id.
pub async fn register_poll(
    State(state): State<Arc<GatewayState>>,
    Path(devid): Path<String>,
    rid: RequestId,
) -> Result<Response, AppError> {
    let device_id = parse_devid(&rid, &devid)?;
    let req = RegistrationRequest {
        device_id,
        csr_der: None,
        location: None,
    };
    run_registration(&state, &rid, req).await
}

async fn run_registration(
    state: &GatewayState,
    rid: &RequestId,
    req: RegistrationRequest,
) -> Result<Response, AppError> {
    match state.processor.process(&req).await {
        Ok(outcome) => Ok(registration_response(&outcome)),
        Err(e @ (RegistrationError::InvalidCsr(_) | RegistrationError::InvalidUuid(_))) => {
            Err(AppError::bad_request(rid, e.to_string()))
        }
        Err(e) => Err(AppError::internal(rid, e)),
    }
}

/// Streams the NOS installer image assigned to the device.
pub async fn nos_install(
    State(state): State<Arc<GatewayState>>,
    Path((_platform, devid)): Path<(String, String)>,
    rid: RequestId,
    identity: Option<Extension<ClientIdentity>>,
) -> Result<Response, AppError> {
    let devid = parse_devid(&rid, &devid)?;
    require_device(&rid, identity.as_deref(), devid)?;
    let software = software_for(&rid, &state, devid).await?;
    let bytes = fetch_artifact(&rid, &state, &software.nos_installer_artifact).await?;
    Ok(octet_stream(bytes))
}

/// Streams the ONIE updater image assigned to the calling device.
pub async fn onie_update(
    State(state): State<Arc<GatewayState>>,
    Path(_platform): Path<String>,
    rid: RequestId,
    identity: Option<Extension<ClientIdentity>>,
) -> Result<Response, AppError> {
    let devid = identity_devid(&rid, identity.as_deref())?;
    let software = software_for(&rid, &state, devid).await?;
    let bytes = fetch_artifact(&rid, &state, &software.onie_updater_artifact).await?;
    Ok(octet_stream(bytes))
}

/// Serves the hedgehog-agent provisioner with its embedded configuration.
pub async fn agent_provisioner(
    State(state): State<Arc<GatewayState>>,
    Path(arch): Path<String>,
    rid: RequestId,
    identity: Option<Extension<ClientIdentity>>,
) -> Result<Response, AppError> {
    let arch = parse_arch(&rid, &arch)?;
    let devid = identity_devid(&rid, identity.as_deref())?;
    let record = agent_record(&state.bundle, devid);
    serve_embedded(
        &rid,
        &state,
        &stage_artifact_name("hedgehog-agent-provisioner", arch),
        &record,
    )
    .await
}

/// Streams the per-device agent binary.
pub async fn agent_binary(
    State(state): State<Arc<GatewayState>>,
    Path(devid): Path<String>,
    rid: RequestId,
    identity: Option<Extension<ClientIdentity>>,
) -> Result<Response, AppError> {
    let devid = parse_devid(&rid, &devid)?;
    require_device(&rid, identity.as_deref(), devid)?;
    let software = software_for(&rid, &state, devid).await?;
    let bytes = fetch_artifact(&rid, &state, &software.agent_artifact).await?;
    Ok(octet_stream(bytes))
}

/// Serves the per-device agent configuration document.
pub async fn agent_config(
    State(state): State<Arc<GatewayState>>,
    Path(devid): Path<String>,
    rid: RequestId,
    identity: Option<Extension<ClientIdentity>>,
) -> Result<Response, AppError> {
    let devid = parse_devid(&rid, &devid)?;
    require_device(&rid, identity.as_deref(), devid)?;
    let doc = state
        .topology
        .agent_config(devid)
        .await
        .map_err(|e| AppError::internal(&rid, e))?
        .ok_or_else(|| AppError::not_found(&rid, format!("no agent config for '{devid}'")))?;
    Ok(yaml(doc))
}

/// Serves the per-device agent kubeconfig secret.
pub async fn agent_kubeconfig(
    State(state): State<Arc<GatewayState>>,
    Path(devid): Path<String>,
    rid: RequestId,
    identity: Option<Extension<ClientIdentity>>,
) -> Result<Response, AppError> {
    let devid = parse_devid(&rid, &devid)?;
    require_device(&rid, identity.as_deref(), devid)?;
    let doc = state
        .topology
        .agent_kubeconfig(devid)
        .await
        .map_err(|e| AppError::internal(&rid, e))?
        .ok_or_else(|| {
            AppError::not_found(&rid, format!("no agent kubeconfig for '{devid}'"))
        })?;
    Ok(yaml(doc))
}

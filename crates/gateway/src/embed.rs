// Path: crates/gateway/src/embed.rs
//! Per-stage configuration records and artifact embedding.

use crate::error::{AppError, RequestId};
use crate::state::{GatewayState, InstallerBundle};
use axum::response::{IntoResponse, Response};
use dasboot_api::artifact::ArtifactError;
use dasboot_api::topology::DeviceSoftware;
use dasboot_embedded_config::generate;
use dasboot_types::stage::{
    ConfigRecord, HedgehogAgentProvisionerConfig, ProvisionerRef, Stage0Config, Stage1Config,
    Stage2Config,
};
use dasboot_types::Arch;
use http::header::CONTENT_TYPE;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Builds the stage0 record for a download arriving at `ipam_url`'s host.
pub fn stage0_record(
    bundle: &InstallerBundle,
    ipam_url: String,
    onie_headers: Option<BTreeMap<String, Vec<String>>>,
) -> Stage0Config {
    Stage0Config {
        version: 1,
        signature_cert: Vec::new(),
        ca_cert_der: bundle.server_ca_der.clone(),
        signature_ca_cert_der: bundle.config_ca_der.clone(),
        ipam_url,
        onie_headers,
    }
}

/// Builds the stage1 record pointing at registration and stage2.
pub fn stage1_record(bundle: &InstallerBundle, arch: Arch) -> Stage1Config {
    Stage1Config {
        version: 1,
        signature_cert: Vec::new(),
        register_url: format!("{}/register", bundle.secure_base_url),
        stage2_url: format!("{}/stage2/{arch}", bundle.secure_base_url),
        keylime: None,
    }
}

/// Builds the stage2 record for a registered device.
pub fn stage2_record(
    bundle: &InstallerBundle,
    software: &DeviceSoftware,
    arch: Arch,
    devid: Uuid,
) -> Stage2Config {
    let base = &bundle.secure_base_url;
    Stage2Config {
        version: 1,
        signature_cert: Vec::new(),
        nos_installer_url: format!("{base}/nos/install/{arch}/{devid}"),
        onie_updater_url: format!("{base}/onie/update/{arch}"),
        nos_type: software.nos_type.clone(),
        provisioners: vec![ProvisionerRef {
            name: "hedgehog-agent".to_string(),
            url: format!("{base}/provisioners/hedgehog-agent/{arch}"),
        }],
    }
}

/// Builds the hedgehog-agent provisioner record for a device.
pub fn agent_record(bundle: &InstallerBundle, devid: Uuid) -> HedgehogAgentProvisionerConfig {
    let base = &bundle.secure_base_url;
    HedgehogAgentProvisionerConfig {
        version: 1,
        signature_cert: Vec::new(),
        agent_url: format!("{base}/provisioners/hedgehog-agent/agent/{devid}"),
        agent_config_url: format!("{base}/provisioners/hedgehog-agent/agent/config/{devid}"),
        agent_kubeconfig_url: format!(
            "{base}/provisioners/hedgehog-agent/agent/kubeconfig/{devid}"
        ),
    }
}

/// Fetches `artifact`, embeds `record` signed by the gateway's signer and
/// streams the result.
pub async fn serve_embedded<R: ConfigRecord>(
    rid: &RequestId,
    state: &GatewayState,
    artifact: &str,
    record: &R,
) -> Result<Response, AppError> {
    let exe = fetch_artifact(rid, state, artifact).await?;
    let bytes =
        generate(&exe, record, &state.signer).map_err(|e| AppError::internal(rid, e))?;
    Ok(octet_stream(bytes))
}

/// Fetches a raw artifact, mapping provider errors onto HTTP statuses.
pub async fn fetch_artifact(
    rid: &RequestId,
    state: &GatewayState,
    artifact: &str,
) -> Result<bytes::Bytes, AppError> {
    state.artifacts.fetch(artifact).await.map_err(|e| match e {
        ArtifactError::NotFound(name) => {
            AppError::not_found(rid, format!("artifact '{name}' not found"))
        }
        other => AppError::internal(rid, other),
    })
}

/// A binary response body.
pub fn octet_stream(bytes: impl Into<axum::body::Body>) -> Response {
    (
        [(CONTENT_TYPE, "application/octet-stream")],
        bytes.into(),
    )
        .into_response()
}

/// A YAML response body for agent config and kubeconfig documents.
pub fn yaml(bytes: bytes::Bytes) -> Response {
    ([(CONTENT_TYPE, "application/yaml")], bytes).into_response()
}

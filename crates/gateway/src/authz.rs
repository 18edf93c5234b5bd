// Path: crates/gateway/src/authz.rs
//! Route authorization helpers.

use crate::error::{AppError, RequestId};
use axum::extract::Request;
use dasboot_api::identity::ClientIdentity;
use uuid::Uuid;

/// Stage0 authorization hook.
///
/// Stage0 is served before the device has any credentials, so this is
/// deliberately a no-op; a future policy (rack allow-lists, ONIE header
/// checks) has a single place to land.
pub fn stage0(_req: &Request) -> Result<(), AppError> {
    Ok(())
}

/// Requires a verified client certificate with a non-empty CommonName and
/// returns that CN.
pub fn require_client_cn(
    rid: &RequestId,
    identity: Option<&ClientIdentity>,
) -> Result<String, AppError> {
    let identity = identity.ok_or_else(|| {
        AppError::unauthorized(rid, "a verified client certificate is required")
    })?;
    if identity.common_name.is_empty() {
        return Err(AppError::forbidden(
            rid,
            "client certificate carries no CommonName",
        ));
    }
    Ok(identity.common_name.clone())
}

/// Requires the verified client CN to equal the device id named in the URL.
pub fn require_device(
    rid: &RequestId,
    identity: Option<&ClientIdentity>,
    devid: Uuid,
) -> Result<(), AppError> {
    let cn = require_client_cn(rid, identity)?;
    if cn != devid.to_string() {
        return Err(AppError::forbidden(
            rid,
            format!("client certificate CN '{cn}' does not match device '{devid}'"),
        ));
    }
    Ok(())
}

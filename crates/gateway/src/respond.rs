// Path: crates/gateway/src/respond.rs
//! Mapping registration outcomes onto the HTTP wire.

use axum::response::{IntoResponse, Json, Response};
use dasboot_types::registration::{
    RegistrationOutcome, RegistrationResponse, RegistrationStatus,
};
use http::StatusCode;

/// Registration request not found.
pub const STATUS_NOT_FOUND: u16 = 464;
/// Internal processing error.
pub const STATUS_PROCESSING_ERROR: u16 = 566;

/// HTTP status for a registration status value.
pub fn status_code(status: RegistrationStatus) -> StatusCode {
    match status {
        RegistrationStatus::Approved | RegistrationStatus::Rejected => StatusCode::OK,
        RegistrationStatus::Pending => StatusCode::ACCEPTED,
        RegistrationStatus::NotFound => {
            StatusCode::from_u16(STATUS_NOT_FOUND).expect("464 is a valid status code")
        }
        RegistrationStatus::Error => {
            StatusCode::from_u16(STATUS_PROCESSING_ERROR).expect("566 is a valid status code")
        }
        // The status universe can grow ahead of this mapping.
        _ => StatusCode::NOT_IMPLEMENTED,
    }
}

/// Renders a processor outcome as `{status, description, client_certificate?}`.
pub fn registration_response(outcome: &RegistrationOutcome) -> Response {
    let body = RegistrationResponse::from(outcome);
    (status_code(body.status), Json(body)).into_response()
}

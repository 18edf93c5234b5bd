// Path: crates/types/src/registration.rs
//! Wire and store types for device registration.

use crate::b64;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Rack-position assertion a device may attach to its requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationInfo {
    /// Location UUID asserted by the device.
    pub uuid: Uuid,
    /// Optional signature over the location UUID.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "b64::opt")]
    pub signature: Option<Vec<u8>>,
}

/// A device's certificate-signing request as posted to `/register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    /// UUID uniquely identifying the switch.
    pub device_id: Uuid,
    /// PKCS#10 CSR, DER-encoded. Absent on poll requests.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "b64::opt")]
    pub csr_der: Option<Vec<u8>>,
    /// Optional rack-position assertion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<LocationInfo>,
}

/// Registration status as reported to the polling device.
///
/// Non-exhaustive so that consumers mapping statuses to HTTP codes keep an
/// explicit arm for values they do not recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum RegistrationStatus {
    /// The request is known and a certificate is being minted.
    Pending,
    /// A client certificate has been issued.
    Approved,
    /// The request was rejected and will not be retried.
    Rejected,
    /// Processing failed permanently.
    Error,
    /// No registration exists for this device id.
    NotFound,
}

/// The registration processor's verdict for one `process` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// Certificate minted; DER bytes attached.
    Approved {
        /// The issued client certificate, DER-encoded.
        cert_der: Vec<u8>,
        /// Human-readable approval reason.
        reason: String,
    },
    /// Terminally rejected.
    Rejected {
        /// Why the request was rejected.
        reason: String,
    },
    /// Known but not yet terminal.
    Pending,
    /// Unknown device id and no CSR supplied.
    NotFound,
    /// Permanent processing failure.
    Error {
        /// Failure description.
        message: String,
    },
}

impl RegistrationOutcome {
    /// The wire status corresponding to this outcome.
    pub fn status(&self) -> RegistrationStatus {
        match self {
            Self::Approved { .. } => RegistrationStatus::Approved,
            Self::Rejected { .. } => RegistrationStatus::Rejected,
            Self::Pending => RegistrationStatus::Pending,
            Self::NotFound => RegistrationStatus::NotFound,
            Self::Error { .. } => RegistrationStatus::Error,
        }
    }
}

/// JSON body returned for every registration request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationResponse {
    /// Terminal or transient status.
    pub status: RegistrationStatus,
    /// Human-readable description of the status.
    pub description: String,
    /// Issued client certificate, DER-encoded, when approved.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "b64::opt")]
    pub client_certificate: Option<Vec<u8>>,
}

impl From<&RegistrationOutcome> for RegistrationResponse {
    fn from(outcome: &RegistrationOutcome) -> Self {
        match outcome {
            RegistrationOutcome::Approved { cert_der, reason } => RegistrationResponse {
                status: RegistrationStatus::Approved,
                description: reason.clone(),
                client_certificate: Some(cert_der.clone()),
            },
            RegistrationOutcome::Rejected { reason } => RegistrationResponse {
                status: RegistrationStatus::Rejected,
                description: reason.clone(),
                client_certificate: None,
            },
            RegistrationOutcome::Pending => RegistrationResponse {
                status: RegistrationStatus::Pending,
                description: "registration request is being processed".to_string(),
                client_certificate: None,
            },
            RegistrationOutcome::NotFound => RegistrationResponse {
                status: RegistrationStatus::NotFound,
                description: "no registration request found for this device".to_string(),
                client_certificate: None,
            },
            RegistrationOutcome::Error { message } => RegistrationResponse {
                status: RegistrationStatus::Error,
                description: message.clone(),
                client_certificate: None,
            },
        }
    }
}

/// Status fields of a stored registration record.
///
/// An all-empty value means the record is still pending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRecordStatus {
    /// Issued certificate, DER-encoded. Empty until approved.
    #[serde(default, with = "b64")]
    pub certificate_der: Vec<u8>,
    /// Whether the record was terminally rejected.
    #[serde(default)]
    pub rejected: bool,
    /// Human-readable reason accompanying approval or rejection.
    #[serde(default)]
    pub reason: String,
    /// Permanent processing error, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A registration record as held by a `DeviceRegistrationStore`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRegistration {
    /// UUID uniquely identifying the switch.
    pub device_id: Uuid,
    /// The CSR the registration was created with, DER-encoded.
    #[serde(with = "b64")]
    pub csr_der: Vec<u8>,
    /// Rack position asserted at registration time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_uuid: Option<Uuid>,
    /// Current processing status.
    #[serde(default)]
    pub status: RegistrationRecordStatus,
}

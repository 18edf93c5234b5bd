// Path: crates/api/src/registration.rs
//! The registration backend seam.

use async_trait::async_trait;
use dasboot_types::registration::{DeviceRegistration, RegistrationRequest};
use dasboot_types::RegistrationError;
use uuid::Uuid;

/// One device's registration state as seen by the processor.
///
/// The all-default value (empty `der`, not rejected, no error) means the
/// request is still pending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationEntry {
    /// Issued client certificate, DER-encoded. Empty until approved.
    pub der: Vec<u8>,
    /// Whether the request was terminally rejected.
    pub rejected: bool,
    /// Reason accompanying approval or rejection.
    pub reason: String,
    /// Permanent processing error, if any.
    pub err: Option<String>,
}

impl RegistrationEntry {
    /// Whether this entry is still pending.
    pub fn is_pending(&self) -> bool {
        self.der.is_empty() && !self.rejected && self.err.is_none()
    }
}

/// Capability set the registration processor drives.
///
/// Implemented by the in-process CA signer and by the controller-delegated
/// backend. `process_request` may run asynchronously; the processor never
/// waits for it.
#[async_trait]
pub trait RegistrationBackend: Send + Sync {
    /// Looks up the registration state for the request's device id.
    ///
    /// The full request is passed so delegated backends can detect a CSR
    /// that differs from the one the registration was created with.
    async fn get_request(
        &self,
        req: &RegistrationRequest,
    ) -> Result<Option<RegistrationEntry>, RegistrationError>;

    /// Creates a pending entry for a first-seen request.
    async fn add_request(&self, req: &RegistrationRequest) -> Result<(), RegistrationError>;

    /// Drives the request toward a terminal status.
    async fn process_request(&self, req: &RegistrationRequest) -> Result<(), RegistrationError>;

    /// Removes the entry for a device id.
    async fn delete_request(&self, device_id: Uuid) -> Result<(), RegistrationError>;
}

/// Store of `DeviceRegistration` records owned by an external controller.
///
/// The transport to the controller is out of scope; the seeder reads and
/// conditionally creates records through this trait.
#[async_trait]
pub trait DeviceRegistrationStore: Send + Sync {
    /// Reads a registration record.
    async fn get(&self, device_id: Uuid)
        -> Result<Option<DeviceRegistration>, RegistrationError>;

    /// Creates a registration record. Fails if one already exists.
    async fn create(&self, registration: DeviceRegistration) -> Result<(), RegistrationError>;

    /// Deletes a registration record.
    async fn delete(&self, device_id: Uuid) -> Result<(), RegistrationError>;
}

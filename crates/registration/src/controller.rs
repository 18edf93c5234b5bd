// Path: crates/registration/src/controller.rs
//! Registration backend delegating to an external controller.

use crate::ca::{cert_public_key, csr_public_key};
use async_trait::async_trait;
use dasboot_api::registration::{
    DeviceRegistrationStore, RegistrationBackend, RegistrationEntry,
};
use dasboot_types::registration::{DeviceRegistration, RegistrationRequest};
use dasboot_types::RegistrationError;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Backend that reads and conditionally creates `DeviceRegistration`
/// records in a controller-owned store. The controller itself mints the
/// certificates; `process_request` is therefore a no-op here.
pub struct ControllerBackend {
    store: Arc<dyn DeviceRegistrationStore>,
}

impl ControllerBackend {
    /// Builds the backend over a controller store handle.
    pub fn new(store: Arc<dyn DeviceRegistrationStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RegistrationBackend for ControllerBackend {
    async fn get_request(
        &self,
        req: &RegistrationRequest,
    ) -> Result<Option<RegistrationEntry>, RegistrationError> {
        let Some(reg) = self.store.get(req.device_id).await? else {
            return Ok(None);
        };

        // A request CSR that differs from the stored one is a terminal
        // rejection; regeneration requires deleting the prior registration.
        if let Some(csr) = &req.csr_der {
            if *csr != reg.csr_der {
                return Ok(Some(RegistrationEntry {
                    rejected: true,
                    reason: format!(
                        "submitted CSR does not match the existing registration for {}; \
                         delete the previous registration to submit a new CSR",
                        req.device_id
                    ),
                    ..RegistrationEntry::default()
                }));
            }
        }

        if let Some(message) = &reg.status.error {
            return Ok(Some(RegistrationEntry {
                err: Some(message.clone()),
                reason: reg.status.reason.clone(),
                ..RegistrationEntry::default()
            }));
        }
        if reg.status.rejected {
            return Ok(Some(RegistrationEntry {
                rejected: true,
                reason: reg.status.reason.clone(),
                ..RegistrationEntry::default()
            }));
        }
        if reg.status.certificate_der.is_empty() {
            return Ok(Some(RegistrationEntry::default()));
        }

        // A certificate may still belong to an older CSR while a new one is
        // in flight; only report Approved once the keys line up.
        let effective_csr = req.csr_der.as_deref().unwrap_or(&reg.csr_der);
        let csr_key = csr_public_key(effective_csr)?;
        let cert_key = cert_public_key(&reg.status.certificate_der)?;
        if csr_key != cert_key {
            debug!(target: "registration", device_id = %req.device_id,
                "stored certificate does not match the CSR public key; still pending");
            return Ok(Some(RegistrationEntry::default()));
        }

        Ok(Some(RegistrationEntry {
            der: reg.status.certificate_der.clone(),
            rejected: false,
            reason: reg.status.reason.clone(),
            err: None,
        }))
    }

    async fn add_request(&self, req: &RegistrationRequest) -> Result<(), RegistrationError> {
        let csr_der = req
            .csr_der
            .clone()
            .ok_or_else(|| RegistrationError::InvalidCsr("request carries no CSR".to_string()))?;
        self.store
            .create(DeviceRegistration {
                device_id: req.device_id,
                csr_der,
                location_uuid: req.location.as_ref().map(|l| l.uuid),
                status: Default::default(),
            })
            .await
    }

    async fn process_request(&self, _req: &RegistrationRequest) -> Result<(), RegistrationError> {
        // The controller drives the record to a terminal status on its own.
        Ok(())
    }

    async fn delete_request(&self, device_id: Uuid) -> Result<(), RegistrationError> {
        self.store.delete(device_id).await
    }
}

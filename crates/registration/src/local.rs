// Path: crates/registration/src/local.rs
//! In-process registration backend backed by the local CA.

use crate::ca::CaSigner;
use async_trait::async_trait;
use dasboot_api::registration::{RegistrationBackend, RegistrationEntry};
use dasboot_types::registration::RegistrationRequest;
use dasboot_types::RegistrationError;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

const APPROVAL_REASON: &str = "device approved and is allowed onto the network";

struct LocalEntry {
    csr_der: Vec<u8>,
    entry: RegistrationEntry,
}

/// Registration backend that mints client certificates with an in-process
/// CA and keeps its records in memory.
pub struct LocalCaBackend {
    ca: CaSigner,
    entries: RwLock<HashMap<Uuid, LocalEntry>>,
}

impl LocalCaBackend {
    /// Builds the backend around a CA signer.
    pub fn new(ca: CaSigner) -> Self {
        Self {
            ca,
            entries: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl RegistrationBackend for LocalCaBackend {
    async fn get_request(
        &self,
        req: &RegistrationRequest,
    ) -> Result<Option<RegistrationEntry>, RegistrationError> {
        let entries = self.entries.read().await;
        let Some(stored) = entries.get(&req.device_id) else {
            return Ok(None);
        };
        // A later request carrying a different CSR for the same device id is
        // terminally rejected; regeneration requires deleting the prior
        // registration first.
        if let Some(csr) = &req.csr_der {
            if *csr != stored.csr_der {
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
        Ok(Some(stored.entry.clone()))
    }

    async fn add_request(&self, req: &RegistrationRequest) -> Result<(), RegistrationError> {
        let csr_der = req
            .csr_der
            .clone()
            .ok_or_else(|| RegistrationError::InvalidCsr("request carries no CSR".to_string()))?;
        let mut entries = self.entries.write().await;
        entries.entry(req.device_id).or_insert(LocalEntry {
            csr_der,
            entry: RegistrationEntry::default(),
        });
        Ok(())
    }

    async fn process_request(&self, req: &RegistrationRequest) -> Result<(), RegistrationError> {
        let Some(csr_der) = &req.csr_der else {
            return Ok(());
        };
        // Signing failures leave the entry pending so the device can retry
        // with a corrected CSR; they are never terminal.
        match self.ca.issue(csr_der, req.device_id) {
            Ok(der) => {
                let mut entries = self.entries.write().await;
                if let Some(stored) = entries.get_mut(&req.device_id) {
                    if stored.entry.der.is_empty() {
                        stored.entry = RegistrationEntry {
                            der,
                            rejected: false,
                            reason: APPROVAL_REASON.to_string(),
                            err: None,
                        };
                    }
                }
            }
            Err(e) => {
                warn!(target: "registration", device_id = %req.device_id, error = %e,
                    "certificate signing failed; leaving request pending");
            }
        }
        Ok(())
    }

    async fn delete_request(&self, device_id: Uuid) -> Result<(), RegistrationError> {
        self.entries.write().await.remove(&device_id);
        Ok(())
    }
}

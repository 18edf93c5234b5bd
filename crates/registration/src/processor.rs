// Path: crates/registration/src/processor.rs
//! The registration state machine and cache.

use crate::ca::validate_csr;
use dasboot_api::registration::{RegistrationBackend, RegistrationEntry};
use dasboot_types::registration::{RegistrationOutcome, RegistrationRequest};
use dasboot_types::RegistrationError;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

/// Drives device registrations to a terminal status and answers polling
/// clients in bounded time.
///
/// The cache is authoritative only for what a client has been told; the
/// backend is authoritative for the registration itself. Terminal entries
/// are deleted once the polling client has observed them.
pub struct RegistrationProcessor {
    cache: RwLock<HashMap<Uuid, RegistrationEntry>>,
    backend: Arc<dyn RegistrationBackend>,
    refresh_interval: Duration,
}

impl RegistrationProcessor {
    /// Builds a processor over a backend.
    pub fn new(backend: Arc<dyn RegistrationBackend>, refresh_interval: Duration) -> Arc<Self> {
        Arc::new(Self {
            cache: RwLock::new(HashMap::new()),
            backend,
            refresh_interval,
        })
    }

    /// Processes one registration request or poll.
    ///
    /// `Err` is returned only for request validation failures; backend
    /// trouble degrades to `Pending` (transient) or the `Error` outcome
    /// (permanent).
    pub async fn process(
        self: &Arc<Self>,
        req: &RegistrationRequest,
    ) -> Result<RegistrationOutcome, RegistrationError> {
        if let Some(csr) = &req.csr_der {
            validate_csr(csr)?;
        }

        let cached = self.cache.read().await.get(&req.device_id).cloned();
        let entry = match cached {
            Some(entry) if !entry.is_pending() => Some(entry),
            _ => match self.backend.get_request(req).await {
                Ok(Some(entry)) => {
                    self.cache
                        .write()
                        .await
                        .insert(req.device_id, entry.clone());
                    Some(entry)
                }
                Ok(None) => None,
                Err(RegistrationError::BackendPermanent(message)) => {
                    self.forget(req.device_id).await;
                    return Ok(RegistrationOutcome::Error { message });
                }
                Err(e) => {
                    warn!(target: "registration", device_id = %req.device_id, error = %e,
                        "backend lookup failed; reporting pending");
                    return Ok(RegistrationOutcome::Pending);
                }
            },
        };

        let Some(entry) = entry else {
            if req.csr_der.is_some() {
                match self.backend.add_request(req).await {
                    Ok(()) => {}
                    Err(RegistrationError::BackendPermanent(message)) => {
                        return Ok(RegistrationOutcome::Error { message });
                    }
                    Err(e) => {
                        warn!(target: "registration", device_id = %req.device_id, error = %e,
                            "backend add failed; reporting pending");
                        return Ok(RegistrationOutcome::Pending);
                    }
                }
                self.cache
                    .write()
                    .await
                    .insert(req.device_id, RegistrationEntry::default());
                self.spawn_process(req.clone());
                return Ok(RegistrationOutcome::Pending);
            }
            return Ok(RegistrationOutcome::NotFound);
        };

        if let Some(message) = entry.err {
            self.forget(req.device_id).await;
            return Ok(RegistrationOutcome::Error { message });
        }
        if entry.rejected {
            self.forget(req.device_id).await;
            return Ok(RegistrationOutcome::Rejected {
                reason: entry.reason,
            });
        }
        if !entry.der.is_empty() {
            self.forget(req.device_id).await;
            return Ok(RegistrationOutcome::Approved {
                cert_der: entry.der,
                reason: entry.reason,
            });
        }
        Ok(RegistrationOutcome::Pending)
    }

    /// Runs the cache refresh sweep until the shutdown signal fires.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.refresh_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => self.refresh_once().await,
                _ = shutdown.changed() => {
                    debug!(target: "registration", "refresh loop stopping");
                    return;
                }
            }
        }
    }

    /// One refresh sweep: re-reads every cached device from the backend and
    /// drops entries whose backing record has disappeared.
    pub async fn refresh_once(&self) {
        let device_ids: Vec<Uuid> = self.cache.read().await.keys().copied().collect();
        for device_id in device_ids {
            let poll = RegistrationRequest {
                device_id,
                csr_der: None,
                location: None,
            };
            match self.backend.get_request(&poll).await {
                Ok(Some(entry)) => {
                    self.cache.write().await.insert(device_id, entry);
                }
                Ok(None) => {
                    debug!(target: "registration", device_id = %device_id,
                        "backend record gone; expiring cache entry");
                    self.cache.write().await.remove(&device_id);
                }
                Err(e) => {
                    warn!(target: "registration", device_id = %device_id, error = %e,
                        "refresh lookup failed");
                }
            }
        }
    }

    /// Number of cached entries; used by tests and metrics.
    pub async fn cached(&self) -> usize {
        self.cache.read().await.len()
    }

    async fn forget(&self, device_id: Uuid) {
        self.cache.write().await.remove(&device_id);
        if let Err(e) = self.backend.delete_request(device_id).await {
            warn!(target: "registration", device_id = %device_id, error = %e,
                "backend delete failed");
        }
    }

    fn spawn_process(self: &Arc<Self>, req: RegistrationRequest) {
        let backend = Arc::clone(&self.backend);
        tokio::spawn(async move {
            if let Err(e) = backend.process_request(&req).await {
                warn!(target: "registration", device_id = %req.device_id, error = %e,
                    "process_request failed");
            }
        });
    }
}

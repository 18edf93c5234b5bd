// Path: crates/registration/src/tests/mod.rs
use crate::ca::CaSigner;
use crate::controller::ControllerBackend;
use crate::local::LocalCaBackend;
use crate::processor::RegistrationProcessor;
use async_trait::async_trait;
use dasboot_api::registration::{DeviceRegistrationStore, RegistrationBackend};
use dasboot_types::registration::{
    DeviceRegistration, RegistrationOutcome, RegistrationRequest,
};
use dasboot_types::RegistrationError;
use rcgen::{BasicConstraints, CertificateParams, DnType, IsCa, KeyPair};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;
use x509_parser::prelude::{FromDer, X509Certificate};

const REFRESH: Duration = Duration::from_secs(60);

fn make_ca() -> CaSigner {
    let key = KeyPair::generate().unwrap();
    let mut params = CertificateParams::new(Vec::new()).unwrap();
    params
        .distinguished_name
        .push(DnType::CommonName, "device registry CA");
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    let cert = params.self_signed(&key).unwrap();
    CaSigner::new(cert, key)
}

/// A CSR with the given CommonName, plus the key pair that signed it.
fn make_csr(cn: &str) -> (Vec<u8>, KeyPair) {
    let key = KeyPair::generate().unwrap();
    let mut params = CertificateParams::new(Vec::new()).unwrap();
    params.distinguished_name.push(DnType::CommonName, cn);
    let csr = params.serialize_request(&key).unwrap();
    (csr.der().to_vec(), key)
}

fn request(device_id: Uuid, csr_der: Option<Vec<u8>>) -> RegistrationRequest {
    RegistrationRequest {
        device_id,
        csr_der,
        location: None,
    }
}

#[derive(Default)]
struct InMemoryStore {
    records: RwLock<HashMap<Uuid, DeviceRegistration>>,
}

#[async_trait]
impl DeviceRegistrationStore for InMemoryStore {
    async fn get(
        &self,
        device_id: Uuid,
    ) -> Result<Option<DeviceRegistration>, RegistrationError> {
        Ok(self.records.read().await.get(&device_id).cloned())
    }

    async fn create(&self, registration: DeviceRegistration) -> Result<(), RegistrationError> {
        let mut records = self.records.write().await;
        if records.contains_key(&registration.device_id) {
            return Err(RegistrationError::BackendPermanent(
                "registration already exists".to_string(),
            ));
        }
        records.insert(registration.device_id, registration);
        Ok(())
    }

    async fn delete(&self, device_id: Uuid) -> Result<(), RegistrationError> {
        self.records.write().await.remove(&device_id);
        Ok(())
    }
}

#[tokio::test]
async fn local_flow_approves_new_device() {
    let backend = Arc::new(LocalCaBackend::new(make_ca()));
    let processor = RegistrationProcessor::new(backend.clone(), REFRESH);

    let device_id = Uuid::new_v4();
    let (csr_der, _key) = make_csr(&device_id.to_string());
    let req = request(device_id, Some(csr_der));

    let outcome = processor.process(&req).await.unwrap();
    assert_eq!(outcome, RegistrationOutcome::Pending);

    // Drive the signing deterministically instead of racing the spawned task.
    backend.process_request(&req).await.unwrap();

    let outcome = processor.process(&request(device_id, None)).await.unwrap();
    let RegistrationOutcome::Approved { cert_der, reason } = outcome else {
        panic!("expected approval, got {outcome:?}");
    };
    assert_eq!(reason, "device approved and is allowed onto the network");

    let (_, cert) = X509Certificate::from_der(&cert_der).unwrap();
    let cn = cert
        .subject()
        .iter_common_name()
        .next()
        .unwrap()
        .as_str()
        .unwrap();
    assert_eq!(cn, device_id.to_string());
    assert!(cert.validity().is_valid());
    // 63-bit serial: the high bit of the 64-bit value is always clear.
    assert!(cert.serial.bits() <= 63);

    // The terminal status was observed, so the registration is gone.
    let outcome = processor.process(&request(device_id, None)).await.unwrap();
    assert_eq!(outcome, RegistrationOutcome::NotFound);
}

#[tokio::test]
async fn local_wrong_cn_leaves_request_pending() {
    let backend = Arc::new(LocalCaBackend::new(make_ca()));
    let processor = RegistrationProcessor::new(backend.clone(), REFRESH);

    let device_id = Uuid::new_v4();
    let (csr_der, _key) = make_csr("someone-else");
    let req = request(device_id, Some(csr_der));

    assert_eq!(
        processor.process(&req).await.unwrap(),
        RegistrationOutcome::Pending
    );
    backend.process_request(&req).await.unwrap();

    // No certificate was minted and the entry is not terminal.
    assert_eq!(
        processor.process(&request(device_id, None)).await.unwrap(),
        RegistrationOutcome::Pending
    );
}

#[tokio::test]
async fn local_second_csr_is_rejected() {
    let backend = Arc::new(LocalCaBackend::new(make_ca()));
    let processor = RegistrationProcessor::new(backend.clone(), REFRESH);

    let device_id = Uuid::new_v4();
    let (csr_one, _) = make_csr(&device_id.to_string());
    let (csr_two, _) = make_csr(&device_id.to_string());
    assert_ne!(csr_one, csr_two);

    processor
        .process(&request(device_id, Some(csr_one)))
        .await
        .unwrap();

    let outcome = processor
        .process(&request(device_id, Some(csr_two)))
        .await
        .unwrap();
    let RegistrationOutcome::Rejected { reason } = outcome else {
        panic!("expected rejection, got {outcome:?}");
    };
    assert!(reason.contains("does not match"));
}

#[tokio::test]
async fn poll_for_unknown_device_is_not_found() {
    let backend = Arc::new(LocalCaBackend::new(make_ca()));
    let processor = RegistrationProcessor::new(backend, REFRESH);

    let outcome = processor
        .process(&request(Uuid::new_v4(), None))
        .await
        .unwrap();
    assert_eq!(outcome, RegistrationOutcome::NotFound);
}

#[tokio::test]
async fn malformed_csr_is_a_validation_error() {
    let backend = Arc::new(LocalCaBackend::new(make_ca()));
    let processor = RegistrationProcessor::new(backend, REFRESH);

    let res = processor
        .process(&request(Uuid::new_v4(), Some(vec![0xde, 0xad, 0xbe, 0xef])))
        .await;
    assert!(matches!(res, Err(RegistrationError::InvalidCsr(_))));
}

#[tokio::test]
async fn controller_csr_mismatch_is_rejected() {
    let store = Arc::new(InMemoryStore::default());
    let backend = Arc::new(ControllerBackend::new(store.clone()));
    let processor = RegistrationProcessor::new(backend, REFRESH);

    let device_id = Uuid::new_v4();
    let (csr_one, _) = make_csr(&device_id.to_string());
    let (csr_two, _) = make_csr(&device_id.to_string());

    store
        .create(DeviceRegistration {
            device_id,
            csr_der: csr_one,
            location_uuid: None,
            status: Default::default(),
        })
        .await
        .unwrap();

    let outcome = processor
        .process(&request(device_id, Some(csr_two)))
        .await
        .unwrap();
    let RegistrationOutcome::Rejected { reason } = outcome else {
        panic!("expected rejection, got {outcome:?}");
    };
    assert!(reason.contains("does not match"));
}

#[tokio::test]
async fn controller_stale_certificate_stays_pending() {
    let store = Arc::new(InMemoryStore::default());
    let backend = Arc::new(ControllerBackend::new(store.clone()));
    let processor = RegistrationProcessor::new(backend, REFRESH);
    let ca = make_ca();

    let device_id = Uuid::new_v4();
    let (current_csr, _) = make_csr(&device_id.to_string());
    // Certificate minted for a different key than the CSR in the record.
    let (old_csr, _) = make_csr(&device_id.to_string());
    let old_cert = ca.issue(&old_csr, device_id).unwrap();

    let mut registration = DeviceRegistration {
        device_id,
        csr_der: current_csr.clone(),
        location_uuid: None,
        status: Default::default(),
    };
    registration.status.certificate_der = old_cert;
    store.create(registration).await.unwrap();

    let outcome = processor
        .process(&request(device_id, Some(current_csr)))
        .await
        .unwrap();
    assert_eq!(outcome, RegistrationOutcome::Pending);
}

#[tokio::test]
async fn controller_matching_certificate_is_approved() {
    let store = Arc::new(InMemoryStore::default());
    let backend = Arc::new(ControllerBackend::new(store.clone()));
    let processor = RegistrationProcessor::new(backend, REFRESH);
    let ca = make_ca();

    let device_id = Uuid::new_v4();
    let (csr_der, _) = make_csr(&device_id.to_string());
    let cert_der = ca.issue(&csr_der, device_id).unwrap();

    let mut registration = DeviceRegistration {
        device_id,
        csr_der: csr_der.clone(),
        location_uuid: None,
        status: Default::default(),
    };
    registration.status.certificate_der = cert_der.clone();
    registration.status.reason = "approved by controller".to_string();
    store.create(registration).await.unwrap();

    let outcome = processor
        .process(&request(device_id, Some(csr_der)))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        RegistrationOutcome::Approved {
            cert_der,
            reason: "approved by controller".to_string(),
        }
    );
}

#[tokio::test]
async fn controller_error_status_is_terminal() {
    let store = Arc::new(InMemoryStore::default());
    let backend = Arc::new(ControllerBackend::new(store.clone()));
    let processor = RegistrationProcessor::new(backend, REFRESH);

    let device_id = Uuid::new_v4();
    let (csr_der, _) = make_csr(&device_id.to_string());
    let mut registration = DeviceRegistration {
        device_id,
        csr_der: csr_der.clone(),
        location_uuid: None,
        status: Default::default(),
    };
    registration.status.error = Some("controller exploded".to_string());
    store.create(registration).await.unwrap();

    let outcome = processor
        .process(&request(device_id, Some(csr_der)))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        RegistrationOutcome::Error {
            message: "controller exploded".to_string(),
        }
    );
    // Terminal observation deletes the backing record.
    assert!(store.get(device_id).await.unwrap().is_none());
}

#[tokio::test]
async fn refresh_expires_records_gone_from_the_backend() {
    let store = Arc::new(InMemoryStore::default());
    let backend = Arc::new(ControllerBackend::new(store.clone()));
    let processor = RegistrationProcessor::new(backend, REFRESH);

    let device_id = Uuid::new_v4();
    let (csr_der, _) = make_csr(&device_id.to_string());
    processor
        .process(&request(device_id, Some(csr_der)))
        .await
        .unwrap();
    assert_eq!(processor.cached().await, 1);

    // The controller dropped the record out from under us.
    store.delete(device_id).await.unwrap();
    processor.refresh_once().await;
    assert_eq!(processor.cached().await, 0);
}

// Path: crates/embedded-config/src/tests/mod.rs
use super::*;
use crate::header::{HEADER_VERSION, MAGIC, SIGNATURE_LEN, SIZE_LEN};
use crate::signer::ConfigSigner;
use dasboot_types::error::CodecError;
use dasboot_types::stage::ConfigRecord;
use p256::ecdsa::signature::DigestSigner;
use p256::pkcs8::EncodePrivateKey;
use rcgen::{BasicConstraints, CertificateParams, DnType, IsCa, KeyPair};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

fn default_version() -> i64 {
    1
}

/// Minimal record with required content, used for most codec tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct TestRecord {
    #[serde(default = "default_version")]
    version: i64,
    #[serde(default)]
    signature_cert: Vec<u8>,
    field1: String,
    field2: u32,
}

impl ConfigRecord for TestRecord {
    fn version(&self) -> i64 {
        self.version
    }
    fn supported_versions(&self, version: i64) -> bool {
        version == 1
    }
    fn validate(&self) -> Result<(), CodecError> {
        if self.field1.is_empty() {
            return Err(CodecError::ValidationError("field1 must be set".into()));
        }
        Ok(())
    }
    fn signature_cert(&self) -> &[u8] {
        &self.signature_cert
    }
    fn set_signature_cert(&mut self, der: Vec<u8>) {
        self.signature_cert = der;
    }
}

/// Fully-defaulted record: decodes from the empty object, always validates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct PermissiveRecord {
    #[serde(default = "default_version")]
    version: i64,
    #[serde(default)]
    signature_cert: Vec<u8>,
}

impl Default for TestRecord {
    fn default() -> Self {
        Self {
            version: 1,
            signature_cert: Vec::new(),
            field1: "ok".to_string(),
            field2: 8,
        }
    }
}

impl ConfigRecord for PermissiveRecord {
    fn version(&self) -> i64 {
        self.version
    }
    fn supported_versions(&self, version: i64) -> bool {
        version == 1
    }
    fn validate(&self) -> Result<(), CodecError> {
        Ok(())
    }
    fn signature_cert(&self) -> &[u8] {
        &self.signature_cert
    }
    fn set_signature_cert(&mut self, der: Vec<u8>) {
        self.signature_cert = der;
    }
}

fn make_ca(cn: &str) -> (rcgen::Certificate, KeyPair) {
    let key = KeyPair::generate().unwrap();
    let mut params = CertificateParams::new(Vec::new()).unwrap();
    params.distinguished_name.push(DnType::CommonName, cn);
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    let cert = params.self_signed(&key).unwrap();
    (cert, key)
}

struct Fixture {
    signer: ConfigSigner,
    trust: Vec<Vec<u8>>,
}

fn make_signer(expired: bool) -> Fixture {
    let (ca_cert, ca_key) = make_ca("embedded-config test CA");

    let signing_key = p256::ecdsa::SigningKey::random(&mut rand::rngs::OsRng);
    let pkcs8 = signing_key.to_pkcs8_der().unwrap();
    let leaf_key = KeyPair::try_from(pkcs8.as_bytes()).unwrap();

    let mut params = CertificateParams::new(Vec::new()).unwrap();
    params
        .distinguished_name
        .push(DnType::CommonName, "config-signer");
    if expired {
        // 2020-01-01 through 2020-01-02.
        params.not_before = time::OffsetDateTime::from_unix_timestamp(1_577_836_800).unwrap();
        params.not_after = params.not_before + time::Duration::days(1);
    }
    let cert = params.signed_by(&leaf_key, &ca_cert, &ca_key).unwrap();

    Fixture {
        signer: ConfigSigner::new(signing_key, cert.der().to_vec()).unwrap(),
        trust: vec![ca_cert.der().to_vec()],
    }
}

/// Assembles an envelope over raw payload bytes, signed like `generate`.
fn assemble(exe: &[u8], payload: &[u8], signer: &ConfigSigner) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(exe);
    out.extend_from_slice(payload);
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    let digest = Sha256::new_with_prefix(&out);
    let sig: p256::ecdsa::Signature = signer.key().sign_digest(digest);
    let der = sig.to_der();
    let mut slot = [0u8; SIGNATURE_LEN];
    slot[..der.as_bytes().len()].copy_from_slice(der.as_bytes());
    out.extend_from_slice(&slot);
    out.push(HEADER_VERSION);
    out.extend_from_slice(MAGIC);
    out
}

const EXE: &[u8] = b"I'm a binary";

#[test]
fn roundtrip_happy_path() {
    let fx = make_signer(false);
    let record = TestRecord::default();

    let out = generate(EXE, &record, &fx.signer).unwrap();
    assert_eq!(&out[out.len() - 8..], MAGIC);
    assert_eq!(out[out.len() - 9], HEADER_VERSION);
    assert!(out.len() > EXE.len() + HEADER_SIZE);

    let back: TestRecord = read(&out, &fx.trust, ReadOptions::default()).unwrap();
    let mut expected = record;
    expected.set_signature_cert(fx.signer.cert_der().to_vec());
    assert_eq!(back, expected);
}

#[test]
fn approved_record_is_stable_across_reads() {
    let fx = make_signer(false);
    let out = generate(EXE, &TestRecord::default(), &fx.signer).unwrap();
    let a: TestRecord = read(&out, &fx.trust, ReadOptions::default()).unwrap();
    let b: TestRecord = read(&out, &fx.trust, ReadOptions::default()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn every_flip_in_signed_range_fails() {
    let fx = make_signer(false);
    let out = generate(EXE, &TestRecord::default(), &fx.signer).unwrap();
    let header_start = out.len() - HEADER_SIZE;

    for i in 0..header_start + SIZE_LEN {
        let mut tampered = out.clone();
        tampered[i] ^= 0x01;
        let res: Result<TestRecord, _> = read(&tampered, &fx.trust, ReadOptions::default());
        assert!(res.is_err(), "flip at offset {i} must not verify");
    }

    // Flips inside the executable keep the payload intact, so they must fail
    // at signature verification specifically.
    let mut tampered = out.clone();
    tampered[3] ^= 0x01;
    let res: Result<TestRecord, _> = read(&tampered, &fx.trust, ReadOptions::default());
    assert!(matches!(
        res,
        Err(CodecError::SignatureVerificationFailure(_))
    ));
}

#[test]
fn flip_inside_signature_slot_fails_verification() {
    let fx = make_signer(false);
    let out = generate(EXE, &TestRecord::default(), &fx.signer).unwrap();
    let header_start = out.len() - HEADER_SIZE;

    let mut tampered = out;
    tampered[header_start + SIZE_LEN + 10] ^= 0x01;
    let res: Result<TestRecord, _> = read(&tampered, &fx.trust, ReadOptions::default());
    assert!(matches!(
        res,
        Err(CodecError::SignatureVerificationFailure(_))
    ));
}

#[test]
fn missing_magic_means_no_config() {
    let fx = make_signer(false);
    let res: Result<TestRecord, _> = read(b"just a binary", &fx.trust, ReadOptions::default());
    assert!(matches!(res, Err(CodecError::ConfigNotPresent)));
}

#[test]
fn exactly_header_sized_input_is_too_small() {
    let fx = make_signer(false);
    let mut input = vec![0u8; HEADER_SIZE];
    let n = input.len();
    input[n - 9] = HEADER_VERSION;
    input[n - 8..].copy_from_slice(MAGIC);
    let res: Result<TestRecord, _> = read(&input, &fx.trust, ReadOptions::default());
    assert!(matches!(res, Err(CodecError::ExeTooSmall(_))));
}

#[test]
fn unknown_header_version_is_rejected() {
    let fx = make_signer(false);
    let mut out = generate(EXE, &TestRecord::default(), &fx.signer).unwrap();
    let n = out.len();
    out[n - 9] = 2;
    let res: Result<TestRecord, _> = read(&out, &fx.trust, ReadOptions::default());
    assert!(matches!(res, Err(CodecError::UnsupportedHeaderVersion(2))));
}

#[test]
fn oversized_payload_window_is_rejected() {
    let fx = make_signer(false);
    let mut out = generate(EXE, &TestRecord::default(), &fx.signer).unwrap();
    let header_start = out.len() - HEADER_SIZE;
    let bogus = (header_start as u32 + 1).to_be_bytes();
    out[header_start..header_start + SIZE_LEN].copy_from_slice(&bogus);
    let res: Result<TestRecord, _> = read(&out, &fx.trust, ReadOptions::default());
    assert!(matches!(res, Err(CodecError::ExeTooSmall(_))));
}

#[test]
fn zero_length_payload_is_legal() {
    let fx = make_signer(false);
    let input = assemble(b"x", b"", &fx.signer);
    // An empty payload cannot carry a signer certificate, so only the
    // structural checks apply.
    let record: PermissiveRecord = read(
        &input,
        &[],
        ReadOptions {
            ignore_signature: true,
            ..ReadOptions::default()
        },
    )
    .unwrap();
    assert_eq!(record.version, 1);
}

#[test]
fn config_version_gates() {
    let fx = make_signer(false);

    let zero = serde_json::to_vec(&PermissiveRecord {
        version: 0,
        signature_cert: Vec::new(),
    })
    .unwrap();
    let input = assemble(b"x", &zero, &fx.signer);
    let res: Result<PermissiveRecord, _> = read(&input, &fx.trust, ReadOptions::default());
    assert!(matches!(res, Err(CodecError::InvalidConfigVersion(0))));

    let three = serde_json::to_vec(&PermissiveRecord {
        version: 3,
        signature_cert: Vec::new(),
    })
    .unwrap();
    let input = assemble(b"x", &three, &fx.signer);
    let res: Result<PermissiveRecord, _> = read(&input, &fx.trust, ReadOptions::default());
    assert!(matches!(res, Err(CodecError::UnsupportedConfigVersion(3))));
}

#[test]
fn generate_rejects_version_below_one() {
    let fx = make_signer(false);
    let record = TestRecord {
        version: 0,
        ..TestRecord::default()
    };
    let res = generate(EXE, &record, &fx.signer);
    assert!(matches!(res, Err(CodecError::InvalidConfigVersion(0))));
}

#[test]
fn generate_propagates_record_validation() {
    let fx = make_signer(false);
    let record = TestRecord {
        field1: String::new(),
        ..TestRecord::default()
    };
    let res = generate(EXE, &record, &fx.signer);
    assert!(matches!(res, Err(CodecError::ValidationError(_))));
}

#[test]
fn untrusted_pool_fails_verification() {
    let fx = make_signer(false);
    let (other_ca, _) = make_ca("some other CA");
    let out = generate(EXE, &TestRecord::default(), &fx.signer).unwrap();
    let res: Result<TestRecord, _> =
        read(&out, &[other_ca.der().to_vec()], ReadOptions::default());
    assert!(matches!(
        res,
        Err(CodecError::SignatureVerificationFailure(_))
    ));
}

#[test]
fn ignore_signature_skips_trust_entirely() {
    let fx = make_signer(false);
    let out = generate(EXE, &TestRecord::default(), &fx.signer).unwrap();
    let record: TestRecord = read(
        &out,
        &[],
        ReadOptions {
            ignore_signature: true,
            ..ReadOptions::default()
        },
    )
    .unwrap();
    assert_eq!(record.field2, 8);
}

#[test]
fn expired_signer_requires_ignore_expiry() {
    let fx = make_signer(true);
    let out = generate(EXE, &TestRecord::default(), &fx.signer).unwrap();

    let res: Result<TestRecord, _> = read(&out, &fx.trust, ReadOptions::default());
    assert!(matches!(
        res,
        Err(CodecError::SignatureVerificationFailure(_))
    ));

    let record: TestRecord = read(
        &out,
        &fx.trust,
        ReadOptions {
            ignore_expiry: true,
            ..ReadOptions::default()
        },
    )
    .unwrap();
    assert_eq!(record.field1, "ok");
}

#[test]
fn non_p256_key_is_rejected() {
    let p384 = KeyPair::generate_for(&rcgen::PKCS_ECDSA_P384_SHA384).unwrap();
    let (ca_cert, _) = make_ca("unused CA");
    let res = ConfigSigner::from_pem(&p384.serialize_pem(), &ca_cert.pem());
    assert!(matches!(res, Err(CodecError::InvalidKey(_))));
}

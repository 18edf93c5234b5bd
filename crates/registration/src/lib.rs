// Path: crates/registration/src/lib.rs
#![forbid(unsafe_code)]

//! The registration processor.
//!
//! Devices submit a PKCS#10 CSR and poll until they receive a signed client
//! certificate. The processor drives each request to a terminal status
//! through a [`RegistrationBackend`]: either the in-process CA signer
//! ([`LocalCaBackend`]) or a backend delegating to an external controller
//! ([`ControllerBackend`]). A reader/writer-locked cache keeps polling
//! cheap; a background sweep re-syncs it against the backend and expires
//! entries whose backing record has disappeared.

pub mod ca;
pub mod controller;
pub mod local;
pub mod processor;

pub use ca::CaSigner;
pub use controller::ControllerBackend;
pub use dasboot_api::registration::{
    DeviceRegistrationStore, RegistrationBackend, RegistrationEntry,
};
pub use local::LocalCaBackend;
pub use processor::RegistrationProcessor;

#[cfg(test)]
mod tests;

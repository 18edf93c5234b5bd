// Path: crates/api/src/lib.rs
#![forbid(unsafe_code)]

//! Collaborator traits for the DAS BOOT seeder.
//!
//! The seeder composes four external collaborators: an [`ArtifactProvider`]
//! it serves installers from, a read-only [`TopologyStore`] it resolves
//! devices and address plans against, a [`RegistrationBackend`] that drives
//! certificate signing, and (for the delegated backend) a
//! [`DeviceRegistrationStore`] owned by an external controller. This crate
//! defines those seams; implementations live with their owners.

pub mod artifact;
pub mod error;
pub mod identity;
pub mod registration;
pub mod topology;

pub use artifact::{ArtifactError, ArtifactProvider};
pub use identity::{ClientIdentity, ConnScheme, PeerAddr};
pub use registration::{DeviceRegistrationStore, RegistrationBackend, RegistrationEntry};
pub use topology::{
    DeviceRecord, DeviceRole, DeviceSoftware, ManagementConnection, TopologyError, TopologyStore,
};

//! # Adapters
//!
//! - `InMemoryCredentialStore`: tests and ephemeral deployments
//! - `FileSystemCredentialStore`: one JSON file per label
//! - `LocalCertificateAuthority`: in-process CA

pub mod file_store;
pub mod local_ca;
pub mod memory_store;

pub use file_store::FileSystemCredentialStore;
pub use local_ca::{CaConfig, LocalCertificateAuthority};
pub use memory_store::InMemoryCredentialStore;

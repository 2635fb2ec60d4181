//! # Ports
//!
//! - `CredentialStore` (outbound): durable label → credential mapping.
//! - `CertificateAuthority` (outbound): registration and enrollment.

pub mod certificate_authority;
pub mod credential_store;

pub use certificate_authority::*;
pub use credential_store::*;

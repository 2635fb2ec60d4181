//! # pl-01-identity
//!
//! Signing identities for the provenance ledger.
//!
//! ## Components
//!
//! | Component | Location | Purpose |
//! |-----------|----------|---------|
//! | Credential Store | `ports::CredentialStore`, `adapters/{memory_store,file_store}.rs` | Label → credentials |
//! | Certificate | `domain/certificate.rs` | CA-signed binding of a public key to an enrollment id |
//! | Signing identity | `domain/identity.rs` | Certificate + private key, signs proposals |
//! | Certificate authority | `ports::CertificateAuthority`, `adapters/local_ca.rs` | Register / enroll |
//! | Enrollment Manager | `service.rs` | `ensure_admin`, `ensure_user` |
//!
//! ## Enrollment States
//!
//! ```text
//! NoAdmin ──ensure_admin──→ AdminEnrolled ──register──→ UserRegistered ──enroll──→ UserEnrolled
//! ```
//!
//! ## Invariants
//!
//! - At most one stored credential per label; the first writer wins.
//! - At most one CA enrollment per label per process: enrollment for a label
//!   runs under that label's lock and re-checks the store before calling the CA.
//! - A failed admin enrollment surfaces `IdentityError::Unavailable` immediately.

#![warn(clippy::all)]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::*;
pub use domain::*;
pub use ports::*;
pub use service::*;

/// Label under which the administrative identity is stored.
pub const ADMIN_LABEL: &str = "admin";

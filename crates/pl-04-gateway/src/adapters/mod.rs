//! # Adapters

pub mod identity_files;
pub mod in_process;
pub mod tls;

pub use identity_files::load_identity;
pub use in_process::{InProcessConnection, InProcessConnector};
pub use tls::TlsTrust;

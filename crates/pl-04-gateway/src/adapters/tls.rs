//! TLS trust material.
//!
//! The trust anchor is the public key of the CA that issues peer
//! certificates, stored as a `TRUST ANCHOR` PEM block.

use crate::domain::GatewayError;
use chrono::Utc;
use pl_01_identity::{decode_pem, encode_pem, Certificate, IdentityRole};
use std::path::Path;
use tracing::debug;

pub const TRUST_ANCHOR_PEM_LABEL: &str = "TRUST ANCHOR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsTrust {
    ca_public_key: String,
}

impl TlsTrust {
    pub fn new(ca_public_key_hex: impl Into<String>) -> Self {
        Self {
            ca_public_key: ca_public_key_hex.into(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, GatewayError> {
        let pem = std::fs::read_to_string(path).map_err(|e| {
            GatewayError::Tls(format!("cannot read trust anchor {}: {e}", path.display()))
        })?;
        let key = decode_pem(&pem, TRUST_ANCHOR_PEM_LABEL)
            .map_err(|e| GatewayError::Tls(format!("{}: {e}", path.display())))?;
        debug!(path = %path.display(), "Loaded TLS trust anchor");
        Ok(Self::new(hex::encode(key)))
    }

    pub fn to_pem(&self) -> Result<String, GatewayError> {
        let key = hex::decode(&self.ca_public_key)
            .map_err(|_| GatewayError::Tls("trust anchor is not hex".into()))?;
        Ok(encode_pem(TRUST_ANCHOR_PEM_LABEL, &key))
    }

    pub fn write(&self, path: &Path) -> Result<(), GatewayError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| GatewayError::Tls(format!("{}: {e}", parent.display())))?;
        }
        std::fs::write(path, self.to_pem()?)
            .map_err(|e| GatewayError::Tls(format!("{}: {e}", path.display())))
    }

    /// Check a server certificate: issued by the anchor, currently valid,
    /// a peer certificate, and issued to `host_alias`.
    pub fn verify_server(
        &self,
        certificate_pem: &str,
        host_alias: &str,
    ) -> Result<Certificate, GatewayError> {
        let certificate = Certificate::from_pem(certificate_pem)
            .map_err(|e| GatewayError::Tls(format!("unreadable server certificate: {e}")))?;
        certificate
            .verify(&self.ca_public_key, Utc::now())
            .map_err(|e| GatewayError::Tls(format!("untrusted server certificate: {e}")))?;
        if certificate.tbs.role != IdentityRole::Peer {
            return Err(GatewayError::Tls(format!(
                "{} is not a peer certificate",
                certificate.subject()
            )));
        }
        if certificate.subject() != host_alias {
            return Err(GatewayError::Tls(format!(
                "server certificate is for {}, expected {host_alias}",
                certificate.subject()
            )));
        }
        Ok(certificate)
    }
}

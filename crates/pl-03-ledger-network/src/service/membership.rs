//! Membership: which certificate authorities are trusted, and the
//! endorsement policy evaluated at commit.

use crate::domain::{Endorsement, NetworkError};
use chrono::Utc;
use parking_lot::RwLock;
use pl_01_identity::{Certificate, IdentityRole};
use std::collections::{HashMap, HashSet};
use tracing::debug;

#[derive(Debug, Default)]
pub struct MembershipRegistry {
    /// MSP id → hex public key of its CA.
    msps: RwLock<HashMap<String, String>>,
}

impl MembershipRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_msp(&self, msp_id: impl Into<String>, ca_public_key: impl Into<String>) {
        self.msps.write().insert(msp_id.into(), ca_public_key.into());
    }

    /// Decode `pem` and check it was issued by a known CA and is currently
    /// valid. If `claimed_msp` is given the certificate must belong to it.
    pub fn validate_certificate(
        &self,
        pem: &str,
        claimed_msp: Option<&str>,
    ) -> Result<Certificate, NetworkError> {
        let certificate = Certificate::from_pem(pem)
            .map_err(|e| NetworkError::AccessDenied(format!("unreadable certificate: {e}")))?;
        if let Some(msp) = claimed_msp {
            if certificate.msp_id() != msp {
                return Err(NetworkError::AccessDenied(format!(
                    "certificate of {} belongs to {}, not {msp}",
                    certificate.subject(),
                    certificate.msp_id()
                )));
            }
        }
        let ca_key = self
            .msps
            .read()
            .get(certificate.msp_id())
            .cloned()
            .ok_or_else(|| {
                NetworkError::AccessDenied(format!("unknown MSP {}", certificate.msp_id()))
            })?;
        certificate
            .verify(&ca_key, Utc::now())
            .map_err(|e| NetworkError::AccessDenied(format!("{}: {e}", certificate.subject())))?;
        Ok(certificate)
    }

    /// Validate `pem` and check `signature_hex` over `message` against it.
    pub fn verify_signed(
        &self,
        pem: &str,
        claimed_msp: Option<&str>,
        message: &[u8],
        signature_hex: &str,
    ) -> Result<Certificate, NetworkError> {
        let certificate = self.validate_certificate(pem, claimed_msp)?;
        let signature = hex::decode(signature_hex)
            .map_err(|_| NetworkError::AccessDenied("signature is not hex".into()))?;
        certificate
            .verify_holder_signature(message, &signature)
            .map_err(|_| {
                NetworkError::AccessDenied(format!("bad signature by {}", certificate.subject()))
            })?;
        Ok(certificate)
    }
}

/// Number of distinct peers whose valid endorsements a transaction needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndorsementPolicy {
    pub required: usize,
}

impl Default for EndorsementPolicy {
    fn default() -> Self {
        Self { required: 1 }
    }
}

impl EndorsementPolicy {
    /// Whether `endorsements` over `payload` satisfy the policy. Endorsements
    /// that are malformed, not from a peer, or duplicated do not count.
    pub fn is_satisfied(
        &self,
        registry: &MembershipRegistry,
        payload: &[u8],
        endorsements: &[Endorsement],
    ) -> bool {
        let mut endorsers = HashSet::new();
        for endorsement in endorsements {
            match registry.verify_signed(&endorsement.endorser, None, payload, &endorsement.signature)
            {
                Ok(cert) if cert.tbs.role == IdentityRole::Peer => {
                    endorsers.insert(cert.subject().to_string());
                }
                Ok(cert) => debug!(subject = cert.subject(), "Endorsement not from a peer"),
                Err(e) => debug!(error = %e, "Endorsement rejected"),
            }
        }
        endorsers.len() >= self.required
    }
}

//! # Certificates
//!
//! A certificate binds an Ed25519 public key to an enrollment id, role,
//! affiliation and membership service provider. The CA signs the canonical
//! JSON encoding of the to-be-signed part. On the wire a certificate travels
//! as a `CERTIFICATE` PEM block.

use super::errors::IdentityError;
use super::keys::{decode_pem, encode_pem, verify_signature, KeyPair};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const CERTIFICATE_LABEL: &str = "CERTIFICATE";

/// Role recorded in a certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityRole {
    Admin,
    Client,
    Peer,
    Orderer,
}

/// The signed portion of a certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TbsCertificate {
    pub serial: String,
    pub subject: String,
    pub issuer: String,
    pub msp_id: String,
    pub role: IdentityRole,
    pub affiliation: String,
    /// Hex-encoded Ed25519 public key.
    pub public_key: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    #[serde(flatten)]
    pub tbs: TbsCertificate,
    /// Hex-encoded issuer signature over `tbs`.
    pub signature: String,
}

impl Certificate {
    /// Sign `tbs` with the issuer's key.
    pub fn issue(tbs: TbsCertificate, issuer_key: &KeyPair) -> Result<Self, IdentityError> {
        let signature = hex::encode(issuer_key.sign(&tbs_bytes(&tbs)?));
        Ok(Self { tbs, signature })
    }

    pub fn subject(&self) -> &str {
        &self.tbs.subject
    }

    pub fn msp_id(&self) -> &str {
        &self.tbs.msp_id
    }

    pub fn public_key(&self) -> &str {
        &self.tbs.public_key
    }

    /// Check the issuer signature and the validity window at `now`.
    pub fn verify(&self, issuer_public_key: &str, now: DateTime<Utc>) -> Result<(), IdentityError> {
        let signature =
            hex::decode(&self.signature).map_err(|_| IdentityError::SignatureVerificationFailed)?;
        verify_signature(issuer_public_key, &tbs_bytes(&self.tbs)?, &signature)?;
        if now < self.tbs.not_before || now > self.tbs.not_after {
            return Err(IdentityError::CertificateExpired {
                subject: self.tbs.subject.clone(),
            });
        }
        Ok(())
    }

    /// Verify a signature made by the holder of this certificate.
    pub fn verify_holder_signature(
        &self,
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), IdentityError> {
        verify_signature(&self.tbs.public_key, message, signature)
    }

    pub fn to_pem(&self) -> Result<String, IdentityError> {
        let json = serde_json::to_vec(self)
            .map_err(|e| IdentityError::InvalidCredential(e.to_string()))?;
        Ok(encode_pem(CERTIFICATE_LABEL, &json))
    }

    pub fn from_pem(pem: &str) -> Result<Self, IdentityError> {
        let json = decode_pem(pem, CERTIFICATE_LABEL)?;
        serde_json::from_slice(&json)
            .map_err(|e| IdentityError::InvalidCredential(format!("bad certificate: {e}")))
    }
}

fn tbs_bytes(tbs: &TbsCertificate) -> Result<Vec<u8>, IdentityError> {
    serde_json::to_vec(tbs).map_err(|e| IdentityError::InvalidCredential(e.to_string()))
}

//! Persisted form of a signing identity.

use serde::{Deserialize, Serialize};

/// Value of the `type` field for credentials issued by this system.
pub const CREDENTIAL_TYPE: &str = "Ed25519";

/// One Credential Store record: `{certificate, privateKey, membershipId, type}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    /// `CERTIFICATE` PEM block.
    pub certificate: String,
    /// `PRIVATE KEY` PEM block.
    pub private_key: String,
    /// Membership service provider id, e.g. `Org1MSP`.
    pub membership_id: String,
    #[serde(rename = "type")]
    pub credential_type: String,
}

impl Credential {
    pub fn new(
        certificate: impl Into<String>,
        private_key: impl Into<String>,
        membership_id: impl Into<String>,
    ) -> Self {
        Self {
            certificate: certificate.into(),
            private_key: private_key.into(),
            membership_id: membership_id.into(),
            credential_type: CREDENTIAL_TYPE.to_string(),
        }
    }
}

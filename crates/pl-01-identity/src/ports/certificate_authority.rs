use crate::domain::{CaError, IdentityError, IdentityRole, SigningIdentity};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Enrollment: exchange a registered id and its secret for a certificate over
/// a client-generated public key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentRequest {
    pub enrollment_id: String,
    pub secret: String,
    /// Hex-encoded Ed25519 public key.
    pub public_key: String,
    /// Signature by the matching private key over `enrollment_id`.
    pub proof_of_possession: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub certificate: String,
    pub ca_name: String,
}

/// Registration of a new identity by a registrar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    pub enrollment_id: String,
    pub affiliation: String,
    pub role: IdentityRole,
    /// Zero means unlimited.
    pub max_enrollments: u32,
}

/// A registration request signed by the registrar's identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedRegistration {
    pub request: RegistrationRequest,
    pub registrar_certificate: String,
    pub signature: String,
}

impl SignedRegistration {
    pub fn sign(request: RegistrationRequest, registrar: &SigningIdentity) -> Result<Self, IdentityError> {
        let bytes = serde_json::to_vec(&request)
            .map_err(|e| IdentityError::InvalidCredential(e.to_string()))?;
        Ok(Self {
            signature: hex::encode(registrar.sign(&bytes)),
            registrar_certificate: registrar.certificate_pem().to_string(),
            request,
        })
    }

    pub fn signed_bytes(&self) -> Result<Vec<u8>, CaError> {
        serde_json::to_vec(&self.request).map_err(|e| CaError::InvalidRequest(e.to_string()))
    }
}

#[async_trait]
pub trait CertificateAuthority: Send + Sync {
    /// Register an identity and return its one-time enrollment secret.
    async fn register(&self, registration: SignedRegistration) -> Result<String, CaError>;

    /// Enroll a registered identity.
    async fn enroll(&self, request: EnrollmentRequest) -> Result<Enrollment, CaError>;

    /// Membership service provider the issued certificates belong to.
    fn msp_id(&self) -> &str;
}

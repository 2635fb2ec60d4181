//! A loaded signing identity: parsed certificate plus private key.

use super::certificate::Certificate;
use super::credential::Credential;
use super::errors::IdentityError;
use super::keys::KeyPair;

#[derive(Debug, Clone)]
pub struct SigningIdentity {
    label: String,
    certificate: Certificate,
    certificate_pem: String,
    keypair: KeyPair,
}

impl SigningIdentity {
    /// Load a credential, checking that the private key matches the certificate.
    pub fn from_credential(label: &str, credential: &Credential) -> Result<Self, IdentityError> {
        let certificate = Certificate::from_pem(&credential.certificate)?;
        let keypair = KeyPair::from_pem(&credential.private_key)?;
        if keypair.public_key_hex() != certificate.public_key() {
            return Err(IdentityError::InvalidCredential(format!(
                "private key for '{label}' does not match its certificate"
            )));
        }
        if certificate.msp_id() != credential.membership_id {
            return Err(IdentityError::InvalidCredential(format!(
                "membership id mismatch for '{label}': credential says {}, certificate says {}",
                credential.membership_id,
                certificate.msp_id()
            )));
        }
        Ok(Self {
            label: label.to_string(),
            certificate,
            certificate_pem: credential.certificate.clone(),
            keypair,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn msp_id(&self) -> &str {
        self.certificate.msp_id()
    }

    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    pub fn certificate_pem(&self) -> &str {
        &self.certificate_pem
    }

    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.keypair.sign(message)
    }
}

//! # Ed25519 Keys
//!
//! Key pairs used by clients, peers and the certificate authority.
//! Private keys are exchanged as PEM blocks wrapping the 32-byte seed.

use super::errors::IdentityError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use zeroize::{Zeroize, Zeroizing};

const PRIVATE_KEY_LABEL: &str = "PRIVATE KEY";

/// Ed25519 key pair.
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    /// Generate a random key pair.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut rand::thread_rng()),
        }
    }

    /// Create from a 32-byte secret seed.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    /// Parse a `PRIVATE KEY` PEM block.
    pub fn from_pem(pem: &str) -> Result<Self, IdentityError> {
        let der = Zeroizing::new(decode_pem(pem, PRIVATE_KEY_LABEL)?);
        let mut seed: [u8; 32] = der.as_slice().try_into().map_err(|_| {
            IdentityError::InvalidCredential(format!(
                "private key must be 32 bytes, got {}",
                der.len()
            ))
        })?;
        let keypair = Self::from_seed(seed);
        seed.zeroize();
        Ok(keypair)
    }

    /// Encode the secret seed as a `PRIVATE KEY` PEM block.
    pub fn to_pem(&self) -> String {
        let seed = Zeroizing::new(self.signing_key.to_bytes());
        encode_pem(PRIVATE_KEY_LABEL, seed.as_slice())
    }

    /// Hex-encoded public key.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a message (deterministic).
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.signing_key.sign(message).to_bytes().to_vec()
    }
}

impl Clone for KeyPair {
    fn clone(&self) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&self.signing_key.to_bytes()),
        }
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key_hex())
            .finish_non_exhaustive()
    }
}

/// Verify `signature` over `message` with a hex-encoded Ed25519 public key.
pub fn verify_signature(
    public_key_hex: &str,
    message: &[u8],
    signature: &[u8],
) -> Result<(), IdentityError> {
    let key_bytes: [u8; 32] = hex::decode(public_key_hex)
        .ok()
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| IdentityError::InvalidCredential("malformed public key".into()))?;
    let verifying_key = VerifyingKey::from_bytes(&key_bytes)
        .map_err(|_| IdentityError::InvalidCredential("public key is not a curve point".into()))?;
    let signature =
        Signature::from_slice(signature).map_err(|_| IdentityError::SignatureVerificationFailed)?;
    verifying_key
        .verify(message, &signature)
        .map_err(|_| IdentityError::SignatureVerificationFailed)
}

/// Wrap `bytes` in a PEM block with 64-column base64 lines.
pub fn encode_pem(label: &str, bytes: &[u8]) -> String {
    let body = STANDARD.encode(bytes);
    let mut out = format!("-----BEGIN {label}-----\n");
    for chunk in body.as_bytes().chunks(64) {
        out.push_str(&String::from_utf8_lossy(chunk));
        out.push('\n');
    }
    out.push_str(&format!("-----END {label}-----\n"));
    out
}

/// Extract the payload of the first PEM block labelled `label`.
pub fn decode_pem(pem: &str, label: &str) -> Result<Vec<u8>, IdentityError> {
    let begin = format!("-----BEGIN {label}-----");
    let end = format!("-----END {label}-----");
    let start = pem
        .find(&begin)
        .ok_or_else(|| IdentityError::InvalidCredential(format!("missing {begin}")))?
        + begin.len();
    let stop = pem[start..]
        .find(&end)
        .ok_or_else(|| IdentityError::InvalidCredential(format!("missing {end}")))?
        + start;
    let body: String = pem[start..stop].split_whitespace().collect();
    STANDARD
        .decode(body)
        .map_err(|e| IdentityError::InvalidCredential(format!("bad {label} encoding: {e}")))
}

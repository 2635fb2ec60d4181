//! Signing identity from a certificate file and a private key file.

use crate::domain::GatewayError;
use pl_01_identity::{Credential, SigningIdentity};
use std::path::Path;

pub fn load_identity(
    label: &str,
    cert_path: &Path,
    key_path: &Path,
    msp_id: &str,
) -> Result<SigningIdentity, GatewayError> {
    let read = |path: &Path| {
        std::fs::read_to_string(path)
            .map_err(|e| GatewayError::Identity(format!("cannot read {}: {e}", path.display())))
    };
    let credential = Credential::new(read(cert_path)?, read(key_path)?, msp_id);
    SigningIdentity::from_credential(label, &credential)
        .map_err(|e| GatewayError::Identity(e.to_string()))
}

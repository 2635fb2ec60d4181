use shared_types::ErrorCode;
use thiserror::Error;

/// Errors raised by identity operations.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The identity is not enrolled (or could not be enrolled just now).
    #[error("identity '{label}' is unavailable: {reason}")]
    Unavailable { label: String, reason: String },

    #[error("certificate authority error: {0}")]
    CertificateAuthority(#[from] CaError),

    #[error("credential store error: {0}")]
    Store(#[from] StoreError),

    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    #[error("signature verification failed")]
    SignatureVerificationFailed,

    #[error("certificate for '{subject}' is outside its validity window")]
    CertificateExpired { subject: String },
}

impl IdentityError {
    pub fn unavailable(label: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            label: label.into(),
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            IdentityError::Unavailable { .. } | IdentityError::CertificateAuthority(_) => {
                ErrorCode::IdentityUnavailable
            }
            IdentityError::InvalidCredential(_) => ErrorCode::Validation,
            _ => ErrorCode::Internal,
        }
    }
}

/// Errors returned by a certificate authority.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CaError {
    #[error("authentication failure for '{0}'")]
    AuthenticationFailed(String),

    #[error("identity '{0}' is already registered")]
    AlreadyRegistered(String),

    #[error("identity '{0}' is not registered")]
    UnknownIdentity(String),

    #[error("identity '{0}' has reached its enrollment limit")]
    EnrollmentLimitReached(String),

    #[error("affiliation '{0}' is not known to this CA")]
    InvalidAffiliation(String),

    #[error("'{0}' is not authorized to register identities")]
    NotRegistrar(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("certificate authority unreachable: {0}")]
    Unreachable(String),
}

/// Errors from credential persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid label '{0}'")]
    InvalidLabel(String),

    #[error("I/O error for '{label}': {source}")]
    Io {
        label: String,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt credential for '{label}': {message}")]
    Corrupt { label: String, message: String },
}

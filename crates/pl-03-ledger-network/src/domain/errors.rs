use pl_02_ledger_store::StateError;
use shared_types::{ErrorBody, ErrorCode};
use thiserror::Error;

/// Errors returned by peers, the ordering service and committers.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// The creator's certificate or signature was rejected.
    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("bad proposal: {0}")]
    BadProposal(String),

    /// The contract rejected the invocation.
    #[error("{0}")]
    Contract(ErrorBody),

    /// Endorsing peers produced different results for the same proposal.
    #[error("endorsement mismatch: {0}")]
    EndorsementMismatch(String),

    #[error("ordering service unavailable")]
    OrdererUnavailable,

    #[error("peer {0} unavailable")]
    PeerUnavailable(String),

    #[error("block rejected: {0}")]
    InvalidBlock(String),

    #[error("invalid network configuration: {0}")]
    InvalidConfig(String),

    #[error("state error: {0}")]
    State(#[from] StateError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl NetworkError {
    pub fn code(&self) -> ErrorCode {
        match self {
            NetworkError::AccessDenied(_) => ErrorCode::IdentityUnavailable,
            NetworkError::BadProposal(_) => ErrorCode::Validation,
            NetworkError::Contract(body) => body.code,
            // Peers observed different state heights; retrying re-simulates.
            NetworkError::EndorsementMismatch(_) => ErrorCode::WriteConflict,
            NetworkError::OrdererUnavailable | NetworkError::PeerUnavailable(_) => {
                ErrorCode::Transport
            }
            NetworkError::InvalidBlock(_)
            | NetworkError::InvalidConfig(_)
            | NetworkError::State(_)
            | NetworkError::Serialization(_) => ErrorCode::Internal,
        }
    }

    /// Wire form. Contract errors pass through unchanged.
    pub fn to_body(&self) -> ErrorBody {
        match self {
            NetworkError::Contract(body) => body.clone(),
            other => ErrorBody::new(other.code(), other.to_string()),
        }
    }
}

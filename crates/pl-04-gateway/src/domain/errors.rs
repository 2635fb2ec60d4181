use super::config::ConfigError;
use pl_03_ledger_network::{NetworkError, TxValidationCode};
use shared_types::{ErrorBody, ErrorCode};
use std::fmt;
use thiserror::Error;

/// Phase of a transaction's lifecycle, each with its own deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Evaluate,
    Endorse,
    Submit,
    CommitStatus,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Evaluate => "evaluate",
            Phase::Endorse => "endorse",
            Phase::Submit => "submit",
            Phase::CommitStatus => "commit status",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Trust material missing, or the server certificate was not trusted.
    #[error("TLS error: {0}")]
    Tls(String),

    #[error("identity error: {0}")]
    Identity(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("{phase} timed out")]
    Timeout { phase: Phase, tx_id: Option<String> },

    /// The contract rejected the call during evaluation or endorsement.
    #[error("{0}")]
    Contract(ErrorBody),

    /// The network refused the transaction before ordering.
    #[error("{0}")]
    Rejected(ErrorBody),

    /// Ordered, but invalidated by the committing peers.
    #[error("transaction {tx_id} failed to commit: {code}")]
    Commit { tx_id: String, code: TxValidationCode },

    #[error("gateway session is closed")]
    Closed,
}

impl GatewayError {
    pub fn code(&self) -> ErrorCode {
        match self {
            GatewayError::Config(_) => ErrorCode::Internal,
            GatewayError::Tls(_) | GatewayError::Transport(_) | GatewayError::Closed => {
                ErrorCode::Transport
            }
            GatewayError::Identity(_) => ErrorCode::IdentityUnavailable,
            GatewayError::Timeout { .. } => ErrorCode::Timeout,
            GatewayError::Contract(body) | GatewayError::Rejected(body) => body.code,
            GatewayError::Commit { code, .. } => code.error_code().unwrap_or(ErrorCode::Internal),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.code().is_retryable()
    }

    /// Whether the transaction may have been ordered even though the call
    /// failed. The caller must query its commit status before retrying.
    pub fn requires_reconciliation(&self) -> bool {
        matches!(
            self,
            GatewayError::Timeout {
                phase: Phase::Submit | Phase::CommitStatus,
                ..
            }
        )
    }

    /// Transaction the error refers to, when one was created.
    pub fn tx_id(&self) -> Option<&str> {
        match self {
            GatewayError::Timeout { tx_id, .. } => tx_id.as_deref(),
            GatewayError::Commit { tx_id, .. } => Some(tx_id),
            _ => None,
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        match self {
            GatewayError::Contract(body) => body.clone(),
            other => ErrorBody::new(other.code(), other.to_string()),
        }
    }
}

impl From<NetworkError> for GatewayError {
    fn from(err: NetworkError) -> Self {
        match err {
            NetworkError::Contract(body) => GatewayError::Contract(body),
            NetworkError::AccessDenied(reason) => GatewayError::Identity(reason),
            NetworkError::OrdererUnavailable | NetworkError::PeerUnavailable(_) => {
                GatewayError::Transport(err.to_string())
            }
            other => GatewayError::Rejected(other.to_body()),
        }
    }
}

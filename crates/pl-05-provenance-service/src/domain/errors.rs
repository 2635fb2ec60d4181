use pl_02_ledger_store::ContractError;
use pl_04_gateway::GatewayError;
use shared_types::{ErrorBody, ErrorCode};
use thiserror::Error;

/// Every way a façade call can fail, one variant per caller-visible code.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    AlreadyExists(String),

    #[error("{0}")]
    NotFound(String),

    /// Lost an optimistic-concurrency race. The record may now exist.
    #[error("write conflict: {0}")]
    WriteConflict(String),

    #[error("identity unavailable: {0}")]
    IdentityUnavailable(String),

    #[error("transport error: {0}")]
    Transport(String),

    /// When `tx_id` is set the transaction may still commit.
    #[error("{message}")]
    Timeout {
        message: String,
        tx_id: Option<String>,
        outcome_unknown: bool,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ServiceError::Validation(_) => ErrorCode::Validation,
            ServiceError::AlreadyExists(_) => ErrorCode::AlreadyExists,
            ServiceError::NotFound(_) => ErrorCode::NotFound,
            ServiceError::WriteConflict(_) => ErrorCode::WriteConflict,
            ServiceError::IdentityUnavailable(_) => ErrorCode::IdentityUnavailable,
            ServiceError::Transport(_) => ErrorCode::Transport,
            ServiceError::Timeout { .. } => ErrorCode::Timeout,
            ServiceError::Internal(_) => ErrorCode::Internal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.code().is_retryable()
    }

    /// The submit may have been ordered: check its commit status before
    /// sending it again.
    pub fn requires_reconciliation(&self) -> bool {
        matches!(
            self,
            ServiceError::Timeout {
                outcome_unknown: true,
                ..
            }
        )
    }
}

impl From<GatewayError> for ServiceError {
    fn from(err: GatewayError) -> Self {
        if let GatewayError::Timeout { tx_id, .. } = &err {
            let outcome_unknown = err.requires_reconciliation();
            let message = match (tx_id, outcome_unknown) {
                (Some(id), true) => {
                    format!("{err}; transaction {id} may still commit, check its status before retrying")
                }
                _ => err.to_string(),
            };
            return ServiceError::Timeout {
                message,
                tx_id: tx_id.clone(),
                outcome_unknown,
            };
        }
        let message = match &err {
            GatewayError::Contract(body) | GatewayError::Rejected(body) => body.message.clone(),
            other => other.to_string(),
        };
        match err.code() {
            ErrorCode::Validation => ServiceError::Validation(message),
            ErrorCode::AlreadyExists => ServiceError::AlreadyExists(message),
            ErrorCode::NotFound => ServiceError::NotFound(message),
            ErrorCode::WriteConflict => ServiceError::WriteConflict(message),
            ErrorCode::IdentityUnavailable => ServiceError::IdentityUnavailable(message),
            ErrorCode::Transport => ServiceError::Transport(message),
            ErrorCode::Timeout => ServiceError::Timeout {
                message,
                tx_id: None,
                outcome_unknown: false,
            },
            ErrorCode::Internal => ServiceError::Internal(message),
        }
    }
}

/// Input rejected at the boundary, before anything is sent.
impl From<ContractError> for ServiceError {
    fn from(err: ContractError) -> Self {
        match err.code() {
            ErrorCode::Validation => ServiceError::Validation(err.to_string()),
            _ => ServiceError::Internal(err.to_string()),
        }
    }
}

impl From<ServiceError> for ErrorBody {
    fn from(err: ServiceError) -> Self {
        ErrorBody::new(err.code(), err.to_string())
    }
}

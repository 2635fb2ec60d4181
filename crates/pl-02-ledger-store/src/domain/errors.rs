//! # Error Types
//!
//! Contract errors are what a caller can see of a failed invocation. They
//! cross the peer boundary as an `ErrorBody`, so each variant maps onto one
//! `ErrorCode`.

use shared_types::{ErrorBody, ErrorCode, RecordKind};
use thiserror::Error;

// =============================================================================
// CONTRACT ERRORS
// =============================================================================

#[derive(Debug, Error)]
pub enum ContractError {
    /// A required argument is missing, empty or malformed.
    #[error("{0}")]
    Validation(String),

    /// A record already exists under the id.
    #[error("{} {id} already exists", .kind.label())]
    AlreadyExists { kind: RecordKind, id: String },

    /// Point lookup miss.
    #[error("{} {id} does not exist", .kind.label())]
    NotFound { kind: RecordKind, id: String },

    /// A key part contains the reserved separator or is otherwise unusable.
    #[error("invalid composite key: {0}")]
    InvalidKey(String),

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("state error: {0}")]
    State(#[from] StateError),
}

impl ContractError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ContractError::Validation(_)
            | ContractError::InvalidKey(_)
            | ContractError::UnknownFunction(_) => ErrorCode::Validation,
            ContractError::AlreadyExists { .. } => ErrorCode::AlreadyExists,
            ContractError::NotFound { .. } => ErrorCode::NotFound,
            ContractError::Serialization(_) | ContractError::State(_) => ErrorCode::Internal,
        }
    }
}

impl From<ContractError> for ErrorBody {
    fn from(err: ContractError) -> Self {
        ErrorBody::new(err.code(), err.to_string())
    }
}

// =============================================================================
// STATE ERRORS
// =============================================================================

/// Failures of the world-state backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("corrupt entry at {key:?}: {message}")]
    Corrupt { key: String, message: String },
}

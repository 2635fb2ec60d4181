//! # Error Codes
//!
//! The error vocabulary shared by every layer. Layer-specific error enums map
//! onto `ErrorCode`; only the code and a message cross a boundary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Caller-visible error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Missing or malformed input. Never retried.
    Validation,
    /// A durable record already exists under the id. Never retried with the same id.
    AlreadyExists,
    /// Point lookup miss.
    NotFound,
    /// Rejected at commit by optimistic concurrency control. Safe to retry with backoff.
    WriteConflict,
    /// The signing identity has not been enrolled yet.
    IdentityUnavailable,
    /// Network failure while talking to the ledger.
    Transport,
    /// A lifecycle phase exceeded its deadline.
    Timeout,
    /// Anything else; not expected in normal operation.
    Internal,
}

impl ErrorCode {
    /// Whether an identical request may succeed later.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorCode::WriteConflict
                | ErrorCode::IdentityUnavailable
                | ErrorCode::Transport
                | ErrorCode::Timeout
        )
    }

    /// Whether the error was caused by the caller's input rather than the system.
    pub fn is_caller_fault(self) -> bool {
        matches!(
            self,
            ErrorCode::Validation | ErrorCode::AlreadyExists | ErrorCode::NotFound
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Validation => "VALIDATION",
            ErrorCode::AlreadyExists => "ALREADY_EXISTS",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::WriteConflict => "WRITE_CONFLICT",
            ErrorCode::IdentityUnavailable => "IDENTITY_UNAVAILABLE",
            ErrorCode::Transport => "TRANSPORT",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serialized error: the body of a failed contract response and the `error`
/// member of an [`crate::ApiResponse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default)]
    pub retryable: bool,
}

impl ErrorBody {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            retryable: code.is_retryable(),
        }
    }

    /// Encode as the JSON message carried by a failed contract response.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.message.clone())
    }

    /// Decode a contract response message; plain-text messages become `Internal`.
    pub fn from_message(message: &str) -> Self {
        serde_json::from_str(message).unwrap_or_else(|_| Self::new(ErrorCode::Internal, message))
    }
}

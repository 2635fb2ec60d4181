//! # Shared Types Crate
//!
//! Ledger records, error codes and the `{success, data|error}` response
//! envelope used across the workspace.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: The on-ledger JSON shape of every record is
//!   defined here and nowhere else.
//! - **Deterministic Encoding**: Records serialize with a fixed field order and
//!   sorted metadata maps, so every endorser produces identical bytes.
//! - **Stable Error Codes**: `ErrorCode` is the only error vocabulary that
//!   crosses process or layer boundaries.

pub mod entities;
pub mod envelope;
pub mod errors;

pub use entities::*;
pub use envelope::ApiResponse;
pub use errors::*;

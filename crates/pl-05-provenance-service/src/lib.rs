//! # pl-05-provenance-service
//!
//! The façade external collaborators call. Inputs arrive as camelCase JSON,
//! are validated once here, and leave as `ApiResponse {success, data|error}`.
//!
//! | Operation | Path |
//! |-----------|------|
//! | `store_progress_update`, `store_document` | submit: endorse, order, wait for commit |
//! | `get_*`, `*_exists`, `query_*`, `get_all_*` | evaluate on one peer |
//! | `commit_status` | reconcile a submit whose outcome is unknown |
//!
//! Ledger keys never leave this layer except as the opaque `Key` of query
//! results.

#![warn(clippy::all)]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::*;
pub use domain::*;
pub use ports::*;
pub use service::*;

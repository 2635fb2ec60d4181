//! # Ports
//!
//! - `LedgerClient` (outbound): invoke a contract function, by submit or by evaluate.
//! - `TimeSource` (outbound): current time for derived timestamps.

pub mod ledger_client;

pub use ledger_client::*;

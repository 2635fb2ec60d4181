//! # pl-04-gateway
//!
//! Client session to a ledger peer. Opened once at startup, shared by every
//! request handler, closed once at shutdown.
//!
//! ## Components
//!
//! | Component | Location | Purpose |
//! |-----------|----------|---------|
//! | Config | `domain/config.rs` | Endpoint, trust anchor, identity paths, phase deadlines |
//! | Errors | `domain/errors.rs` | `GatewayError` and its caller-facing classification |
//! | Connection | `ports::Connection`, `ports::Connector` | Transport to the gateway peer |
//! | TLS trust | `adapters/tls.rs` | Loads the trust anchor, checks the server certificate |
//! | In-process transport | `adapters/in_process.rs` | Connects to a `GatewayService` in the same process |
//! | Session | `service.rs` | `Gateway` → `Network` → `Contract` |
//!
//! ## Transaction Phases
//!
//! ```text
//! evaluate ──(evaluate deadline)──→ result
//! submit   ──endorse (endorse deadline)──→ submit (submit deadline)──→ commit status (commit deadline)
//! ```
//!
//! Each deadline is enforced on its own. A timeout after the envelope was
//! handed to the orderer leaves the outcome unknown; the error carries the
//! transaction id so the caller can reconcile with `Contract::commit_status`.

#![warn(clippy::all)]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::*;
pub use domain::*;
pub use ports::*;
pub use service::*;

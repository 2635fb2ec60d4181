//! # Node Runtime Library
//!
//! Configuration loading and node assembly, exposed for testing. The entry
//! point is the `main.rs` binary.
//!
//! ```text
//! stdin ──JSON line──→ ProvenanceService ──→ Gateway ──→ LedgerNetwork
//!                                                          ├─ peers (endorse)
//!                                                          ├─ orderer
//!                                                          └─ committers
//! stdout ←─ApiResponse─┘
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod node;

pub use config::NodeConfig;
pub use node::Node;

//! # pl-02-ledger-store
//!
//! The on-ledger half of the provenance store: the contract that writes
//! immutable records with their secondary indexes, and the state machinery it
//! executes against.
//!
//! ## Components
//!
//! | Component | Location | Purpose |
//! |-----------|----------|---------|
//! | Composite keys | `domain/keys.rs` | Namespace + fields joined by U+0000 |
//! | Requests | `domain/requests.rs` | Typed, validated write arguments |
//! | Read/write sets | `domain/rwset.rs` | Simulation results validated at commit |
//! | Chaincode stub | `ports/stub.rs` | State access seen by the contract, scoped cursors |
//! | World state | `ports/world_state.rs`, `adapters/{memory_state,rocksdb_state}.rs` | Versioned key-value state |
//! | Simulator | `adapters/simulator.rs` | Stub implementation recording a read/write set |
//! | Contract | `contract.rs` | `StoreProgressUpdate`, `StoreDocument`, `Get*`, `Query*` |
//!
//! ## Write Path
//!
//! ```text
//! args ──from_args/validate──→ request ──exists?──→ put primary + index entries ──→ write set
//! ```
//!
//! The contract never applies writes itself. A write set reaches the world
//! state only when the committer has validated its read set, so a failed
//! precondition or a stale read leaves no trace.

#![warn(clippy::all)]

pub mod adapters;
pub mod contract;
pub mod domain;
pub mod ports;

pub use adapters::*;
pub use contract::*;
pub use domain::*;
pub use ports::*;

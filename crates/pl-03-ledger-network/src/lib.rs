//! # pl-03-ledger-network
//!
//! A single-organization ledger network that runs in process: endorsing
//! peers, an ordering service and one committer per peer.
//!
//! ## Transaction Flow
//!
//! ```text
//! client ──SignedProposal──→ GatewayService ──→ EndorsingPeer × policy.required
//!                                  │                 (simulate, sign read/write set)
//!        ←──PreparedTransaction────┘
//! client ──Envelope (signed)──→ OrderingService ──Block──→ Committer (each peer)
//!                                                          │ validate: signatures, policy,
//!                                                          │ MVCC reads, phantom ranges
//!        ←──CommitStatus───────── CommitNotifier ←─────────┘ apply valid writes
//! ```
//!
//! ## Invariants
//!
//! - Blocks are committed strictly in orderer sequence; each block header
//!   carries the hash of its predecessor.
//! - A transaction's writes are applied all together or not at all.
//! - A transaction whose read set is stale at commit time is marked
//!   `MvccReadConflict` / `PhantomReadConflict`, never silently re-executed.
//! - A transaction id is committed at most once.

#![warn(clippy::all)]

pub mod adapters;
pub mod domain;
pub mod network;
pub mod ports;
pub mod service;

#[cfg(test)]
mod test_support;

pub use adapters::*;
pub use domain::*;
pub use network::*;
pub use ports::*;
pub use service::*;

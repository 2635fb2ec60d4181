//! # Ports
//!
//! - `BlockStore` (outbound): a peer's append-only chain and transaction index.

pub mod block_store;

pub use block_store::*;

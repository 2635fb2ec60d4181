//! # Adapters
//!
//! World-state backends and the simulating stub.

pub mod memory_state;
#[cfg(feature = "rocksdb")]
pub mod rocksdb_state;
pub mod simulator;

pub use memory_state::InMemoryWorldState;
#[cfg(feature = "rocksdb")]
pub use rocksdb_state::{RocksDbWorldState, RocksDbWorldStateConfig};
pub use simulator::{TxContext, TxSimulator};

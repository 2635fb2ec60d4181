//! # Adapters

pub mod memory_block_store;

pub use memory_block_store::InMemoryBlockStore;

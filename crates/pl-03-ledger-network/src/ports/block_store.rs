use crate::domain::{Block, CommitStatus, NetworkError};

/// Append-only chain of committed blocks with a transaction-id index.
pub trait BlockStore: Send + Sync {
    /// Append the next block. Rejects a block whose number is not the current
    /// height or whose `previous_hash` does not match the last block.
    fn append(&self, block: Block) -> Result<(), NetworkError>;

    /// Number of blocks, genesis included.
    fn height(&self) -> u64;

    fn last_hash(&self) -> String;

    fn block(&self, number: u64) -> Option<Block>;

    /// Outcome of a committed transaction, if this store has it.
    fn tx_status(&self, tx_id: &str) -> Option<CommitStatus>;

    fn contains_tx(&self, tx_id: &str) -> bool {
        self.tx_status(tx_id).is_some()
    }
}

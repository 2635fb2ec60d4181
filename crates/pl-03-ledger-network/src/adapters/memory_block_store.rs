//! In-memory block store seeded with the channel's genesis block.

use crate::domain::{Block, CommitStatus, NetworkError};
use crate::ports::BlockStore;
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
struct TxLocation {
    block_number: u64,
    tx_index: usize,
}

#[derive(Debug)]
struct Inner {
    blocks: Vec<Block>,
    tx_index: HashMap<String, TxLocation>,
}

#[derive(Debug)]
pub struct InMemoryBlockStore {
    inner: RwLock<Inner>,
}

impl InMemoryBlockStore {
    pub fn new(channel_id: &str) -> Self {
        Self {
            inner: RwLock::new(Inner {
                blocks: vec![Block::genesis(channel_id)],
                tx_index: HashMap::new(),
            }),
        }
    }

    /// Walk the chain and check every link and data hash.
    pub fn verify_chain(&self) -> Result<(), NetworkError> {
        let inner = self.inner.read();
        for pair in inner.blocks.windows(2) {
            let (prev, block) = (&pair[0], &pair[1]);
            block.verify_data()?;
            if block.header.previous_hash != prev.hash() {
                return Err(NetworkError::InvalidBlock(format!(
                    "block {} does not link to block {}",
                    block.number(),
                    prev.number()
                )));
            }
        }
        Ok(())
    }
}

impl BlockStore for InMemoryBlockStore {
    fn append(&self, block: Block) -> Result<(), NetworkError> {
        let mut inner = self.inner.write();
        let height = inner.blocks.len() as u64;
        if block.number() != height {
            return Err(NetworkError::InvalidBlock(format!(
                "expected block {height}, got {}",
                block.number()
            )));
        }
        let last_hash = inner.blocks.last().map(Block::hash).unwrap_or_default();
        if block.header.previous_hash != last_hash {
            return Err(NetworkError::InvalidBlock(format!(
                "block {} previous hash mismatch",
                block.number()
            )));
        }
        for (tx_index, envelope) in block.data.iter().enumerate() {
            // The first occurrence of an id is the one that counts.
            inner
                .tx_index
                .entry(envelope.tx_id().to_string())
                .or_insert(TxLocation {
                    block_number: block.number(),
                    tx_index,
                });
        }
        inner.blocks.push(block);
        Ok(())
    }

    fn height(&self) -> u64 {
        self.inner.read().blocks.len() as u64
    }

    fn last_hash(&self) -> String {
        self.inner
            .read()
            .blocks
            .last()
            .map(Block::hash)
            .unwrap_or_default()
    }

    fn block(&self, number: u64) -> Option<Block> {
        self.inner.read().blocks.get(number as usize).cloned()
    }

    fn tx_status(&self, tx_id: &str) -> Option<CommitStatus> {
        let inner = self.inner.read();
        let location = *inner.tx_index.get(tx_id)?;
        let block = inner.blocks.get(location.block_number as usize)?;
        let code = *block.metadata.validation_codes.get(location.tx_index)?;
        let event = if code.is_valid() {
            block.data[location.tx_index]
                .transaction
                .payload
                .results
                .event
                .clone()
        } else {
            None
        };
        Some(CommitStatus {
            tx_id: tx_id.to_string(),
            block_number: location.block_number,
            code,
            event,
        })
    }
}

//! # Blocks
//!
//! `header_hash = sha256(number ‖ previous_hash ‖ data_hash)` and
//! `data_hash = sha256` over the serialized envelopes. Validation codes live in
//! the metadata: they are each peer's verdict and are not covered by the hash.

use super::errors::NetworkError;
use super::proposal::{sha256_hex, Envelope};
use super::status::TxValidationCode;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockHeader {
    pub number: u64,
    pub previous_hash: String,
    pub data_hash: String,
}

impl BlockHeader {
    pub fn hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.number.to_be_bytes());
        hasher.update(self.previous_hash.as_bytes());
        hasher.update(self.data_hash.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockMetadata {
    pub validation_codes: Vec<TxValidationCode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub header: BlockHeader,
    pub data: Vec<Envelope>,
    pub metadata: BlockMetadata,
}

impl Block {
    /// Empty block 0 of a channel. Identical on every node.
    pub fn genesis(channel_id: &str) -> Self {
        Self {
            header: BlockHeader {
                number: 0,
                previous_hash: String::new(),
                data_hash: sha256_hex(channel_id.as_bytes()),
            },
            data: Vec::new(),
            metadata: BlockMetadata::default(),
        }
    }

    pub fn new(number: u64, previous_hash: String, data: Vec<Envelope>) -> Result<Self, NetworkError> {
        Ok(Self {
            header: BlockHeader {
                number,
                previous_hash,
                data_hash: data_hash(&data)?,
            },
            data,
            metadata: BlockMetadata::default(),
        })
    }

    pub fn number(&self) -> u64 {
        self.header.number
    }

    pub fn hash(&self) -> String {
        self.header.hash()
    }

    /// Recompute the data hash and compare it to the header.
    pub fn verify_data(&self) -> Result<(), NetworkError> {
        if self.header.number > 0 && data_hash(&self.data)? != self.header.data_hash {
            return Err(NetworkError::InvalidBlock(format!(
                "block {} data hash mismatch",
                self.header.number
            )));
        }
        Ok(())
    }
}

pub fn data_hash(data: &[Envelope]) -> Result<String, NetworkError> {
    let mut hasher = Sha256::new();
    for envelope in data {
        hasher.update(serde_json::to_vec(envelope)?);
    }
    Ok(hex::encode(hasher.finalize()))
}

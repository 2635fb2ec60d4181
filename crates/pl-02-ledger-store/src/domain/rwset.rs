//! # Read/Write Sets
//!
//! What a simulated transaction observed and what it wants to write. The
//! committer re-checks the observations against the state at commit time:
//!
//! - every point read must still carry the version that was read;
//! - every range query must still return the same keys at the same versions.
//!
//! A transaction whose observations are stale is invalidated and none of its
//! writes are applied.

use serde::{Deserialize, Serialize};

/// Height at which a key was last written: block number and position within
/// the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version {
    pub block_num: u64,
    pub tx_num: u64,
}

impl Version {
    pub fn new(block_num: u64, tx_num: u64) -> Self {
        Self { block_num, tx_num }
    }
}

/// A point read. `version == None` records that the key was absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KvRead {
    pub key: String,
    pub version: Option<Version>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KvWrite {
    pub key: String,
    pub value: Vec<u8>,
}

/// Keys returned by one scan over `[start_key, end_key)`.
///
/// When the caller stopped before the end (`itr_exhausted == false`) only the
/// keys actually returned are checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeQueryInfo {
    pub start_key: String,
    pub end_key: String,
    pub itr_exhausted: bool,
    pub reads: Vec<KvRead>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRwSet {
    pub reads: Vec<KvRead>,
    pub range_queries: Vec<RangeQueryInfo>,
    /// In first-write order; a later write to the same key replaces the value.
    pub writes: Vec<KvWrite>,
}

impl TxRwSet {
    pub fn is_read_only(&self) -> bool {
        self.writes.is_empty()
    }
}

/// Event set by the contract; delivered with the commit status of its
/// transaction, and only if the transaction is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractEvent {
    pub chaincode_name: String,
    pub tx_id: String,
    pub event_name: String,
    pub payload: Vec<u8>,
}

/// Everything a simulation produces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationResults {
    pub rwset: TxRwSet,
    pub event: Option<ContractEvent>,
}

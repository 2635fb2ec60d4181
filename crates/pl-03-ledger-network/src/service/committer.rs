//! # Committer
//!
//! Validates each block's transactions in order and applies the writes of the
//! valid ones as a single world-state batch.
//!
//! ## Per-transaction checks
//!
//! 1. Transaction id not committed before (in this block or earlier).
//! 2. Proposal decodes, targets this channel, and its id matches nonce and creator.
//! 3. Creator certificate is valid; proposal and envelope signatures verify.
//! 4. Endorsements satisfy the policy over the exact payload.
//! 5. Every point read still has the version read (MVCC).
//! 6. Every scanned range still holds the same keys at the same versions.
//!
//! Keys written by an earlier valid transaction of the same block count as
//! changed for checks 5 and 6.
//!
//! ## Stages
//!
//! A block is validated, its writes are applied to world state, and only then
//! is it appended to the block store. The state savepoint records the block
//! number, so a block store that lags behind state can be replayed by
//! skipping blocks at or below the savepoint. Storage errors are retried per
//! stage with exponential backoff; validation is never repeated once writes
//! have landed. A committer that still cannot make progress is marked
//! faulted: it stops consuming blocks and its commit-status waiters are
//! released with an error.

use super::membership::{EndorsementPolicy, MembershipRegistry};
use super::notifier::CommitNotifier;
use crate::domain::{
    Block, CommitStatus, Envelope, NetworkError, TxValidationCode,
};
use crate::ports::BlockStore;
use pl_02_ledger_store::{RangeQueryInfo, UpdateBatch, Version, WorldState};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Attempts per stage before the committer gives up on a block.
pub const COMMIT_ATTEMPTS: u32 = 5;
const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(50);
const MAX_RETRY_DELAY: Duration = Duration::from_millis(500);

/// A validated block whose writes are ready to apply.
struct PreparedBlock {
    block: Block,
    batch: UpdateBatch,
    savepoint: Version,
    statuses: Vec<CommitStatus>,
    codes: Vec<TxValidationCode>,
}

pub struct Committer {
    peer_name: String,
    channel_id: String,
    state: Arc<dyn WorldState>,
    blocks: Arc<dyn BlockStore>,
    membership: Arc<MembershipRegistry>,
    policy: EndorsementPolicy,
    notifier: CommitNotifier,
    faulted: AtomicBool,
}

impl Committer {
    pub fn new(
        peer_name: impl Into<String>,
        channel_id: impl Into<String>,
        state: Arc<dyn WorldState>,
        blocks: Arc<dyn BlockStore>,
        membership: Arc<MembershipRegistry>,
        policy: EndorsementPolicy,
    ) -> Self {
        Self {
            peer_name: peer_name.into(),
            channel_id: channel_id.into(),
            state,
            blocks,
            membership,
            policy,
            notifier: CommitNotifier::new(),
            faulted: AtomicBool::new(false),
        }
    }

    pub fn peer_name(&self) -> &str {
        &self.peer_name
    }

    /// Whether this committer stopped after a block it could not commit.
    pub fn is_faulted(&self) -> bool {
        self.faulted.load(Ordering::SeqCst)
    }

    pub fn blocks(&self) -> &Arc<dyn BlockStore> {
        &self.blocks
    }

    pub fn height(&self) -> u64 {
        self.blocks.height()
    }

    pub fn tx_status(&self, tx_id: &str) -> Option<CommitStatus> {
        self.blocks.tx_status(tx_id)
    }

    /// Resolves when `tx_id` is committed on this peer. The sender is
    /// dropped without a value if the committer is or becomes faulted.
    pub fn commit_status(&self, tx_id: &str) -> oneshot::Receiver<CommitStatus> {
        self.notifier.subscribe(tx_id, self.blocks.as_ref())
    }

    /// Consume blocks from the ordering service until it closes or a block
    /// cannot be committed.
    pub fn run(self: Arc<Self>, mut incoming: mpsc::Receiver<Block>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(block) = incoming.recv().await {
                let number = block.number();
                if let Err(e) = self.commit_with_retry(block).await {
                    error!(peer = %self.peer_name, block = number, error = %e, "Block commit failed; committer faulted");
                    self.fault();
                    break;
                }
            }
            debug!(peer = %self.peer_name, "Committer stopped");
        })
    }

    /// Commit one block without retries.
    pub fn commit_block(&self, block: Block) -> Result<Vec<TxValidationCode>, NetworkError> {
        let prepared = self.prepare(block)?;
        self.apply_state(&prepared)?;
        self.append_block(&prepared)?;
        Ok(self.finish(prepared))
    }

    async fn commit_with_retry(&self, block: Block) -> Result<Vec<TxValidationCode>, NetworkError> {
        let prepared = self.retry("validate", || self.prepare(block.clone())).await?;
        self.retry("apply", || self.apply_state(&prepared)).await?;
        self.retry("append", || self.append_block(&prepared)).await?;
        Ok(self.finish(prepared))
    }

    /// Run `stage` until it succeeds, fails with a non-storage error, or
    /// runs out of attempts.
    async fn retry<T>(
        &self,
        name: &str,
        mut stage: impl FnMut() -> Result<T, NetworkError>,
    ) -> Result<T, NetworkError> {
        let mut delay = INITIAL_RETRY_DELAY;
        let mut attempt = 1;
        loop {
            match stage() {
                Ok(value) => return Ok(value),
                Err(e @ NetworkError::State(_)) if attempt < COMMIT_ATTEMPTS => {
                    warn!(peer = %self.peer_name, stage = name, attempt, error = %e, "Commit stage failed; retrying");
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(MAX_RETRY_DELAY);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn fault(&self) {
        self.faulted.store(true, Ordering::SeqCst);
        self.notifier.close();
    }

    fn prepare(&self, mut block: Block) -> Result<PreparedBlock, NetworkError> {
        block.verify_data()?;
        if block.number() != self.blocks.height() {
            return Err(NetworkError::InvalidBlock(format!(
                "expected block {}, got {}",
                self.blocks.height(),
                block.number()
            )));
        }
        if block.header.previous_hash != self.blocks.last_hash() {
            return Err(NetworkError::InvalidBlock(format!(
                "block {} does not extend the chain",
                block.number()
            )));
        }

        let number = block.number();
        let mut codes = Vec::with_capacity(block.data.len());
        let mut batch = UpdateBatch::new();
        let mut block_writes = HashSet::new();
        let mut block_tx_ids = HashSet::new();

        for (index, envelope) in block.data.iter().enumerate() {
            let code = self.validate(envelope, &block_tx_ids, &block_writes)?;
            block_tx_ids.insert(envelope.tx_id().to_string());
            if code.is_valid() {
                let version = Version::new(number, index as u64);
                for write in &envelope.transaction.payload.results.rwset.writes {
                    batch.put(write.key.clone(), write.value.clone(), version);
                    block_writes.insert(write.key.clone());
                }
            } else {
                warn!(
                    peer = %self.peer_name,
                    tx_id = envelope.tx_id(),
                    code = %code,
                    "Transaction invalidated"
                );
            }
            codes.push(code);
        }

        let statuses = block
            .data
            .iter()
            .zip(&codes)
            .map(|(envelope, code)| CommitStatus {
                tx_id: envelope.tx_id().to_string(),
                block_number: number,
                code: *code,
                event: if code.is_valid() {
                    envelope.transaction.payload.results.event.clone()
                } else {
                    None
                },
            })
            .collect();

        let last_tx = block.data.len().saturating_sub(1) as u64;
        block.metadata.validation_codes = codes.clone();
        Ok(PreparedBlock {
            block,
            batch,
            savepoint: Version::new(number, last_tx),
            statuses,
            codes,
        })
    }

    /// Re-applying the same batch is harmless: every write carries its
    /// final version.
    fn apply_state(&self, prepared: &PreparedBlock) -> Result<(), NetworkError> {
        self.state.apply(prepared.batch.clone(), prepared.savepoint)?;
        Ok(())
    }

    fn append_block(&self, prepared: &PreparedBlock) -> Result<(), NetworkError> {
        self.blocks.append(prepared.block.clone())
    }

    fn finish(&self, prepared: PreparedBlock) -> Vec<TxValidationCode> {
        for status in &prepared.statuses {
            self.notifier.notify(status);
        }
        self.notifier.prune();

        let valid = prepared.codes.iter().filter(|c| c.is_valid()).count();
        info!(
            peer = %self.peer_name,
            block = prepared.block.number(),
            valid,
            invalid = prepared.codes.len() - valid,
            "Committed block"
        );
        prepared.codes
    }

    fn validate(
        &self,
        envelope: &Envelope,
        block_tx_ids: &HashSet<String>,
        block_writes: &HashSet<String>,
    ) -> Result<TxValidationCode, NetworkError> {
        let tx = &envelope.transaction;
        if block_tx_ids.contains(&tx.tx_id) || self.blocks.contains_tx(&tx.tx_id) {
            return Ok(TxValidationCode::DuplicateTxId);
        }

        let Ok(proposal) = tx.signed_proposal.proposal() else {
            return Ok(TxValidationCode::BadPayload);
        };
        let header = &proposal.header;
        if header.tx_id != tx.tx_id
            || header.channel_id != self.channel_id
            || proposal.check_tx_id().is_err()
            || tx.payload.proposal_hash != tx.signed_proposal.hash()
        {
            return Ok(TxValidationCode::BadPayload);
        }

        let creator_ok = self
            .membership
            .verify_signed(
                &header.creator,
                Some(&header.creator_msp_id),
                &tx.signed_proposal.proposal_bytes,
                &tx.signed_proposal.signature,
            )
            .and_then(|_| {
                self.membership.verify_signed(
                    &header.creator,
                    Some(&header.creator_msp_id),
                    &tx.signing_bytes()?,
                    &envelope.signature,
                )
            });
        if let Err(e) = creator_ok {
            debug!(tx_id = %tx.tx_id, error = %e, "Creator check failed");
            return Ok(TxValidationCode::BadCreatorSignature);
        }

        if !self
            .policy
            .is_satisfied(&self.membership, &tx.payload.to_bytes()?, &tx.endorsements)
        {
            return Ok(TxValidationCode::EndorsementPolicyFailure);
        }

        let rwset = &tx.payload.results.rwset;
        for read in &rwset.reads {
            if block_writes.contains(&read.key) || self.state.version(&read.key)? != read.version {
                return Ok(TxValidationCode::MvccReadConflict);
            }
        }
        for query in &rwset.range_queries {
            if !self.range_unchanged(query, block_writes)? {
                return Ok(TxValidationCode::PhantomReadConflict);
            }
        }
        Ok(TxValidationCode::Valid)
    }

    /// Re-run a recorded scan. A scan the contract stopped early is only
    /// checked up to the last key it returned.
    fn range_unchanged(
        &self,
        query: &RangeQueryInfo,
        block_writes: &HashSet<String>,
    ) -> Result<bool, NetworkError> {
        let end = if query.itr_exhausted {
            query.end_key.clone()
        } else {
            match query.reads.last() {
                Some(last) => format!("{}\u{0}", last.key),
                None => return Ok(true),
            }
        };
        let in_range =
            |key: &str| key >= query.start_key.as_str() && (end.is_empty() || key < end.as_str());
        if block_writes.iter().any(|key| in_range(key)) {
            return Ok(false);
        }

        let current = self.state.scan(&query.start_key, &end, usize::MAX)?;
        Ok(current.len() == query.reads.len()
            && current
                .iter()
                .zip(&query.reads)
                .all(|((key, value), read)| *key == read.key && Some(value.version) == read.version))
    }
}

//! # Chaincode Stub
//!
//! The contract's only window onto the ledger. Reads see committed state;
//! writes are buffered into the transaction's write set.
//!
//! Range scans hand out a [`ScopedCursor`]. The cursor is lazy and pages
//! through the backing store; it can be restarted from its first key, and it
//! releases its server-side resources on `close()` or, on any other exit path,
//! when dropped.

use crate::domain::{partial_key_range, ContractError};
use chrono::{DateTime, Utc};

/// Server side of a range scan.
pub trait StateIterator {
    fn next_entry(&mut self) -> Result<Option<(String, Vec<u8>)>, ContractError>;

    /// Rewind to the first key of the range.
    fn restart(&mut self) -> Result<(), ContractError>;

    /// Release resources. Called exactly once.
    fn close(&mut self);
}

pub struct ScopedCursor<'a> {
    inner: Box<dyn StateIterator + 'a>,
    closed: bool,
}

impl<'a> ScopedCursor<'a> {
    pub fn new(inner: Box<dyn StateIterator + 'a>) -> Self {
        Self {
            inner,
            closed: false,
        }
    }

    pub fn restart(&mut self) -> Result<(), ContractError> {
        if self.closed {
            return Err(ContractError::validation("cursor is closed"));
        }
        self.inner.restart()
    }

    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.closed {
            self.closed = true;
            self.inner.close();
        }
    }
}

impl Iterator for ScopedCursor<'_> {
    type Item = Result<(String, Vec<u8>), ContractError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.closed {
            return None;
        }
        self.inner.next_entry().transpose()
    }
}

impl Drop for ScopedCursor<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

pub trait ChaincodeStub {
    fn tx_id(&self) -> &str;

    fn channel_id(&self) -> &str;

    /// Timestamp from the signed proposal header; identical on every endorser.
    fn tx_timestamp(&self) -> DateTime<Utc>;

    fn creator_msp_id(&self) -> &str;

    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, ContractError>;

    fn put_state(&self, key: &str, value: &[u8]) -> Result<(), ContractError>;

    /// Keys in `[start, end)`.
    fn get_state_by_range(&self, start: &str, end: &str) -> Result<ScopedCursor<'_>, ContractError>;

    /// Replaces any event set earlier in the same transaction.
    fn set_event(&self, name: &str, payload: Vec<u8>) -> Result<(), ContractError>;

    /// All composite keys of `object_type` whose leading attributes equal
    /// `attributes`.
    fn get_state_by_partial_composite_key(
        &self,
        object_type: &str,
        attributes: &[&str],
    ) -> Result<ScopedCursor<'_>, ContractError> {
        let (start, end) = partial_key_range(object_type, attributes)?;
        self.get_state_by_range(&start, &end)
    }
}

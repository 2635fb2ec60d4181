use crate::domain::{StateError, Version};

/// A stored value with the height of the transaction that wrote it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedValue {
    pub value: Vec<u8>,
    pub version: Version,
}

/// Writes of one block, applied together.
#[derive(Debug, Clone, Default)]
pub struct UpdateBatch {
    updates: Vec<(String, VersionedValue)>,
}

impl UpdateBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: impl Into<String>, value: Vec<u8>, version: Version) {
        self.updates
            .push((key.into(), VersionedValue { value, version }));
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    pub fn into_updates(self) -> Vec<(String, VersionedValue)> {
        self.updates
    }
}

/// Versioned, ordered key-value state.
///
/// Keys compare as UTF-8 bytes, which is also code point order, so composite
/// key ranges are contiguous.
pub trait WorldState: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<VersionedValue>, StateError>;

    /// Up to `limit` entries with `start <= key < end`, ascending. An empty
    /// `end` leaves the range open.
    fn scan(
        &self,
        start: &str,
        end: &str,
        limit: usize,
    ) -> Result<Vec<(String, VersionedValue)>, StateError>;

    /// Apply every update, or none, and record `height` as the last committed
    /// transaction. Later updates to a key replace earlier ones.
    fn apply(&self, batch: UpdateBatch, height: Version) -> Result<(), StateError>;

    /// Height of the last applied batch.
    fn height(&self) -> Result<Option<Version>, StateError>;

    fn version(&self, key: &str) -> Result<Option<Version>, StateError> {
        Ok(self.get(key)?.map(|v| v.version))
    }
}

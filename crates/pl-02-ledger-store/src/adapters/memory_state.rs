//! Ordered in-memory world state.

use crate::domain::{StateError, Version};
use crate::ports::{UpdateBatch, VersionedValue, WorldState};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::Bound;

#[derive(Debug, Default)]
struct Inner {
    entries: BTreeMap<String, VersionedValue>,
    height: Option<Version>,
}

#[derive(Debug, Default)]
pub struct InMemoryWorldState {
    inner: RwLock<Inner>,
}

impl InMemoryWorldState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }
}

impl WorldState for InMemoryWorldState {
    fn get(&self, key: &str) -> Result<Option<VersionedValue>, StateError> {
        Ok(self.inner.read().entries.get(key).cloned())
    }

    fn scan(
        &self,
        start: &str,
        end: &str,
        limit: usize,
    ) -> Result<Vec<(String, VersionedValue)>, StateError> {
        let upper = if end.is_empty() {
            Bound::Unbounded
        } else if start >= end {
            return Ok(Vec::new());
        } else {
            Bound::Excluded(end)
        };
        let inner = self.inner.read();
        Ok(inner
            .entries
            .range::<str, _>((Bound::Included(start), upper))
            .take(limit)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn apply(&self, batch: UpdateBatch, height: Version) -> Result<(), StateError> {
        let mut inner = self.inner.write();
        for (key, value) in batch.into_updates() {
            inner.entries.insert(key, value);
        }
        inner.height = Some(height);
        Ok(())
    }

    fn height(&self) -> Result<Option<Version>, StateError> {
        Ok(self.inner.read().height)
    }
}

//! # RocksDB World State
//!
//! Persistent world state. Values are stored as
//! `block_num (u64 BE) ‖ tx_num (u64 BE) ‖ value` in the `state` column
//! family; the savepoint lives in `meta`. A batch is one `WriteBatch`, so a
//! block's writes and its savepoint land together.

use crate::domain::{StateError, Version};
use crate::ports::{UpdateBatch, VersionedValue, WorldState};
use parking_lot::RwLock;
use rocksdb::{ColumnFamilyDescriptor, Direction, IteratorMode, Options, WriteBatch, DB};

pub const CF_STATE: &str = "state";
pub const CF_META: &str = "meta";

const SAVEPOINT_KEY: &[u8] = b"savepoint";
const VERSION_LEN: usize = 16;

#[derive(Debug, Clone)]
pub struct RocksDbWorldStateConfig {
    pub path: String,
    /// fsync every batch.
    pub sync_writes: bool,
    pub write_buffer_size: usize,
}

impl Default for RocksDbWorldStateConfig {
    fn default() -> Self {
        Self {
            path: "./data/world-state".to_string(),
            sync_writes: true,
            write_buffer_size: 64 * 1024 * 1024, // 64MB
        }
    }
}

impl RocksDbWorldStateConfig {
    /// Small buffers, no fsync.
    pub fn for_testing(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            sync_writes: false,
            write_buffer_size: 4 * 1024 * 1024,
        }
    }
}

pub struct RocksDbWorldState {
    db: RwLock<DB>,
    config: RocksDbWorldStateConfig,
}

impl RocksDbWorldState {
    pub fn open(config: RocksDbWorldStateConfig) -> Result<Self, StateError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_compression_type(rocksdb::DBCompressionType::Snappy);

        let descriptors = [CF_STATE, CF_META]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()));

        let db = DB::open_cf_descriptors(&opts, &config.path, descriptors)
            .map_err(|e| StateError::Backend(format!("failed to open RocksDB: {e}")))?;

        Ok(Self {
            db: RwLock::new(db),
            config,
        })
    }
}

fn missing_cf(name: &str) -> StateError {
    StateError::Backend(format!("column family {name} missing"))
}

fn encode(value: &VersionedValue) -> Vec<u8> {
    let mut out = Vec::with_capacity(VERSION_LEN + value.value.len());
    out.extend_from_slice(&encode_version(value.version));
    out.extend_from_slice(&value.value);
    out
}

fn encode_version(version: Version) -> [u8; VERSION_LEN] {
    let mut out = [0u8; VERSION_LEN];
    out[..8].copy_from_slice(&version.block_num.to_be_bytes());
    out[8..].copy_from_slice(&version.tx_num.to_be_bytes());
    out
}

fn decode_version(key: &str, raw: &[u8]) -> Result<Version, StateError> {
    let corrupt = || StateError::Corrupt {
        key: key.to_string(),
        message: format!("expected at least {VERSION_LEN} bytes, got {}", raw.len()),
    };
    let block = raw.get(..8).ok_or_else(corrupt)?;
    let tx = raw.get(8..VERSION_LEN).ok_or_else(corrupt)?;
    let mut b = [0u8; 8];
    let mut t = [0u8; 8];
    b.copy_from_slice(block);
    t.copy_from_slice(tx);
    Ok(Version::new(u64::from_be_bytes(b), u64::from_be_bytes(t)))
}

fn decode(key: &str, raw: &[u8]) -> Result<VersionedValue, StateError> {
    let version = decode_version(key, raw)?;
    Ok(VersionedValue {
        value: raw[VERSION_LEN..].to_vec(),
        version,
    })
}

impl WorldState for RocksDbWorldState {
    fn get(&self, key: &str) -> Result<Option<VersionedValue>, StateError> {
        let db = self.db.read();
        let cf = db.cf_handle(CF_STATE).ok_or_else(|| missing_cf(CF_STATE))?;
        db.get_cf(cf, key.as_bytes())
            .map_err(|e| StateError::Backend(format!("RocksDB get failed: {e}")))?
            .map(|raw| decode(key, &raw))
            .transpose()
    }

    fn scan(
        &self,
        start: &str,
        end: &str,
        limit: usize,
    ) -> Result<Vec<(String, VersionedValue)>, StateError> {
        if !end.is_empty() && start >= end {
            return Ok(Vec::new());
        }
        let db = self.db.read();
        let cf = db.cf_handle(CF_STATE).ok_or_else(|| missing_cf(CF_STATE))?;
        let mut results = Vec::new();

        for item in db.iterator_cf(cf, IteratorMode::From(start.as_bytes(), Direction::Forward)) {
            if results.len() >= limit {
                break;
            }
            let (raw_key, raw_value) =
                item.map_err(|e| StateError::Backend(format!("RocksDB scan failed: {e}")))?;
            let key = String::from_utf8(raw_key.to_vec()).map_err(|_| StateError::Corrupt {
                key: String::from_utf8_lossy(&raw_key).into_owned(),
                message: "key is not UTF-8".to_string(),
            })?;
            if !end.is_empty() && key.as_str() >= end {
                break;
            }
            let value = decode(&key, &raw_value)?;
            results.push((key, value));
        }
        Ok(results)
    }

    fn apply(&self, batch: UpdateBatch, height: Version) -> Result<(), StateError> {
        let db = self.db.write();
        let state_cf = db.cf_handle(CF_STATE).ok_or_else(|| missing_cf(CF_STATE))?;
        let meta_cf = db.cf_handle(CF_META).ok_or_else(|| missing_cf(CF_META))?;

        let mut write = WriteBatch::default();
        for (key, value) in batch.into_updates() {
            write.put_cf(state_cf, key.as_bytes(), encode(&value));
        }
        write.put_cf(meta_cf, SAVEPOINT_KEY, encode_version(height));

        let mut write_opts = rocksdb::WriteOptions::default();
        write_opts.set_sync(self.config.sync_writes);
        db.write_opt(write, &write_opts)
            .map_err(|e| StateError::Backend(format!("RocksDB batch write failed: {e}")))
    }

    fn height(&self) -> Result<Option<Version>, StateError> {
        let db = self.db.read();
        let cf = db.cf_handle(CF_META).ok_or_else(|| missing_cf(CF_META))?;
        db.get_cf(cf, SAVEPOINT_KEY)
            .map_err(|e| StateError::Backend(format!("RocksDB get failed: {e}")))?
            .map(|raw| decode_version("savepoint", &raw))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(dir: &tempfile::TempDir) -> RocksDbWorldState {
        let path = dir.path().to_string_lossy().to_string();
        RocksDbWorldState::open(RocksDbWorldStateConfig::for_testing(path)).unwrap()
    }

    #[test]
    fn test_apply_scan_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let state = open(&dir);
            let mut batch = UpdateBatch::new();
            batch.put("\u{0}ns\u{0}b\u{0}", b"2".to_vec(), Version::new(3, 1));
            batch.put("\u{0}ns\u{0}a\u{0}", b"1".to_vec(), Version::new(3, 0));
            batch.put("\u{0}other\u{0}", b"x".to_vec(), Version::new(3, 2));
            state.apply(batch, Version::new(3, 2)).unwrap();
        }

        let state = open(&dir);
        assert_eq!(state.height().unwrap(), Some(Version::new(3, 2)));
        let hits = state
            .scan("\u{0}ns\u{0}", "\u{0}ns\u{0}\u{10FFFF}", usize::MAX)
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0, "\u{0}ns\u{0}a\u{0}");
        assert_eq!(hits[0].1.version, Version::new(3, 0));
        assert_eq!(hits[1].1.value, b"2");
    }

    #[test]
    fn test_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let state = open(&dir);
        assert_eq!(state.height().unwrap(), None);
        assert_eq!(state.get("nothing").unwrap(), None);
    }
}

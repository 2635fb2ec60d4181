//! # Transaction Simulator
//!
//! `ChaincodeStub` used by endorsing peers. It executes the contract against
//! committed state and records what was read and written:
//!
//! - point reads keep the version first observed per key;
//! - each range scan records the keys it returned and whether it ran to the end;
//! - writes are buffered and never touch the world state.

use crate::domain::{
    ContractError, ContractEvent, KvRead, KvWrite, RangeQueryInfo, SimulationResults, TxRwSet,
    Version,
};
use crate::ports::{ChaincodeStub, ScopedCursor, StateIterator, VersionedValue, WorldState};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use tracing::warn;

/// Entries fetched from the world state per cursor page.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Header fields of the proposal being simulated.
#[derive(Debug, Clone)]
pub struct TxContext {
    pub channel_id: String,
    pub chaincode_name: String,
    pub tx_id: String,
    pub creator_msp_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Default)]
struct Recording {
    reads: BTreeMap<String, Option<Version>>,
    range_queries: Vec<RangeQueryInfo>,
    writes: Vec<KvWrite>,
    write_index: HashMap<String, usize>,
    event: Option<ContractEvent>,
    open_cursors: usize,
}

pub struct TxSimulator {
    state: Arc<dyn WorldState>,
    context: TxContext,
    page_size: usize,
    recording: Mutex<Recording>,
}

impl TxSimulator {
    pub fn new(state: Arc<dyn WorldState>, context: TxContext) -> Self {
        Self {
            state,
            context,
            page_size: DEFAULT_PAGE_SIZE,
            recording: Mutex::new(Recording::default()),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Cursors handed out and not yet released.
    pub fn open_cursors(&self) -> usize {
        self.recording.lock().open_cursors
    }

    pub fn into_results(self) -> SimulationResults {
        let recording = self.recording.into_inner();
        if recording.open_cursors > 0 {
            warn!(
                tx_id = %self.context.tx_id,
                open = recording.open_cursors,
                "Simulation finished with open cursors"
            );
        }
        SimulationResults {
            rwset: TxRwSet {
                reads: recording
                    .reads
                    .into_iter()
                    .map(|(key, version)| KvRead { key, version })
                    .collect(),
                range_queries: recording.range_queries,
                writes: recording.writes,
            },
            event: recording.event,
        }
    }

    fn record_range_read(&self, query: usize, key: &str, version: Version) {
        let mut recording = self.recording.lock();
        if let Some(info) = recording.range_queries.get_mut(query) {
            info.reads.push(KvRead {
                key: key.to_string(),
                version: Some(version),
            });
        }
    }

    fn set_exhausted(&self, query: usize, exhausted: bool) {
        let mut recording = self.recording.lock();
        if let Some(info) = recording.range_queries.get_mut(query) {
            info.itr_exhausted = exhausted;
            if !exhausted {
                info.reads.clear();
            }
        }
    }

    fn release_cursor(&self) {
        let mut recording = self.recording.lock();
        recording.open_cursors = recording.open_cursors.saturating_sub(1);
    }
}

impl ChaincodeStub for TxSimulator {
    fn tx_id(&self) -> &str {
        &self.context.tx_id
    }

    fn channel_id(&self) -> &str {
        &self.context.channel_id
    }

    fn tx_timestamp(&self) -> DateTime<Utc> {
        self.context.timestamp
    }

    fn creator_msp_id(&self) -> &str {
        &self.context.creator_msp_id
    }

    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, ContractError> {
        let value = self.state.get(key)?;
        self.recording
            .lock()
            .reads
            .entry(key.to_string())
            .or_insert_with(|| value.as_ref().map(|v| v.version));
        Ok(value.map(|v| v.value))
    }

    fn put_state(&self, key: &str, value: &[u8]) -> Result<(), ContractError> {
        if key.is_empty() {
            return Err(ContractError::InvalidKey("empty key".into()));
        }
        let mut recording = self.recording.lock();
        let write = KvWrite {
            key: key.to_string(),
            value: value.to_vec(),
        };
        match recording.write_index.get(key).copied() {
            Some(i) => recording.writes[i] = write,
            None => {
                let i = recording.writes.len();
                recording.write_index.insert(key.to_string(), i);
                recording.writes.push(write);
            }
        }
        Ok(())
    }

    fn get_state_by_range(&self, start: &str, end: &str) -> Result<ScopedCursor<'_>, ContractError> {
        let query = {
            let mut recording = self.recording.lock();
            recording.range_queries.push(RangeQueryInfo {
                start_key: start.to_string(),
                end_key: end.to_string(),
                itr_exhausted: false,
                reads: Vec::new(),
            });
            recording.open_cursors += 1;
            recording.range_queries.len() - 1
        };
        Ok(ScopedCursor::new(Box::new(SimulatorCursor {
            simulator: self,
            query,
            start: start.to_string(),
            end: end.to_string(),
            next_start: start.to_string(),
            page: VecDeque::new(),
            source_done: false,
        })))
    }

    fn set_event(&self, name: &str, payload: Vec<u8>) -> Result<(), ContractError> {
        if name.is_empty() {
            return Err(ContractError::validation("event name is empty"));
        }
        self.recording.lock().event = Some(ContractEvent {
            chaincode_name: self.context.chaincode_name.clone(),
            tx_id: self.context.tx_id.clone(),
            event_name: name.to_string(),
            payload,
        });
        Ok(())
    }
}

struct SimulatorCursor<'a> {
    simulator: &'a TxSimulator,
    query: usize,
    start: String,
    end: String,
    /// Smallest key not yet fetched.
    next_start: String,
    page: VecDeque<(String, VersionedValue)>,
    source_done: bool,
}

impl StateIterator for SimulatorCursor<'_> {
    fn next_entry(&mut self) -> Result<Option<(String, Vec<u8>)>, ContractError> {
        loop {
            if let Some((key, value)) = self.page.pop_front() {
                self.simulator
                    .record_range_read(self.query, &key, value.version);
                return Ok(Some((key, value.value)));
            }
            if self.source_done {
                self.simulator.set_exhausted(self.query, true);
                return Ok(None);
            }
            let size = self.simulator.page_size;
            let page = self.simulator.state.scan(&self.next_start, &self.end, size)?;
            if page.len() < size {
                self.source_done = true;
            }
            if let Some((last, _)) = page.last() {
                // Successor of `last` in key order.
                self.next_start = format!("{last}\u{0}");
            }
            self.page.extend(page);
        }
    }

    fn restart(&mut self) -> Result<(), ContractError> {
        self.next_start = self.start.clone();
        self.page.clear();
        self.source_done = false;
        self.simulator.set_exhausted(self.query, false);
        Ok(())
    }

    fn close(&mut self) {
        self.page.clear();
        self.simulator.release_cursor();
    }
}

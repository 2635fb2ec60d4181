//! Commit-status waiters.
//!
//! A waiter registers first and then checks the block store; the committer
//! indexes a block first and then notifies. Whichever order the two race in,
//! the waiter is answered. Answering twice is harmless: senders are removed
//! when used.
//!
//! Closing drops every sender, so waiters see a closed channel instead of
//! waiting out their deadline. Subscriptions after close are closed at once.

use crate::domain::CommitStatus;
use crate::ports::BlockStore;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::oneshot;
use tracing::debug;

#[derive(Debug, Default)]
pub struct CommitNotifier {
    waiters: DashMap<String, Vec<oneshot::Sender<CommitStatus>>>,
    closed: AtomicBool,
}

impl CommitNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receiver resolved once `tx_id` is committed, or immediately if it
    /// already is.
    pub fn subscribe(&self, tx_id: &str, store: &dyn BlockStore) -> oneshot::Receiver<CommitStatus> {
        let (tx, rx) = oneshot::channel();
        self.waiters.entry(tx_id.to_string()).or_default().push(tx);
        if let Some(status) = store.tx_status(tx_id) {
            self.notify(&status);
        }
        // Checked after registering so a concurrent close cannot miss us.
        if self.closed.load(Ordering::SeqCst) {
            self.waiters.remove(tx_id);
        }
        rx
    }

    /// Release every waiter without an answer and refuse new ones.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let released = self.waiters.len();
        self.waiters.clear();
        debug!(released, "Commit notifier closed");
    }

    pub fn notify(&self, status: &CommitStatus) {
        if let Some((_, senders)) = self.waiters.remove(&status.tx_id) {
            debug!(tx_id = %status.tx_id, waiters = senders.len(), "Notifying commit");
            for sender in senders {
                let _ = sender.send(status.clone());
            }
        }
    }

    /// Drop waiters whose receivers are gone, e.g. after a client timeout.
    pub fn prune(&self) {
        self.waiters.retain(|_, senders| {
            senders.retain(|sender| !sender.is_closed());
            !senders.is_empty()
        });
    }

    pub fn pending(&self) -> usize {
        self.waiters.len()
    }
}

//! # Ordering Service
//!
//! Solo orderer: envelopes are queued in arrival order and cut into blocks
//! when either `max_message_count` envelopes are pending or `batch_timeout`
//! has passed since the first one arrived. Every block is delivered to every
//! subscribed committer in sequence.
//!
//! `broadcast` resolves once the envelope is in a delivered block. An envelope
//! that never makes it into a block is rejected back to its broadcaster, so a
//! failed Submit always means "not ordered".

use crate::domain::{Block, Envelope, NetworkError};
use parking_lot::Mutex;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct OrdererConfig {
    pub max_message_count: usize,
    pub batch_timeout: Duration,
    /// Envelopes that may wait for ordering before `broadcast` blocks.
    pub queue_capacity: usize,
}

impl Default for OrdererConfig {
    fn default() -> Self {
        Self {
            max_message_count: 10,
            batch_timeout: Duration::from_millis(200),
            queue_capacity: 1024,
        }
    }
}

/// An envelope waiting for its block, with the broadcaster's acknowledgement.
struct Pending {
    envelope: Envelope,
    ack: oneshot::Sender<Result<u64, NetworkError>>,
}

pub struct OrderingService {
    sender: mpsc::Sender<Pending>,
    shutdown_tx: Mutex<Option<oneshot::Sender<()>>>,
}

impl OrderingService {
    /// Spawn the batching loop. Blocks are numbered from 1 and chained to
    /// `genesis_hash`.
    pub fn start(
        config: OrdererConfig,
        genesis_hash: String,
        subscribers: Vec<mpsc::Sender<Block>>,
    ) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(batch_loop(
            config,
            receiver,
            shutdown_rx,
            genesis_hash,
            subscribers,
        ));
        (
            Self {
                sender,
                shutdown_tx: Mutex::new(Some(shutdown_tx)),
            },
            handle,
        )
    }

    /// Queue an envelope and wait until it is in a delivered block. Returns
    /// the block number.
    pub async fn broadcast(&self, envelope: Envelope) -> Result<u64, NetworkError> {
        debug!(tx_id = envelope.tx_id(), "Broadcast received");
        let (ack, ack_rx) = oneshot::channel();
        self.sender
            .send(Pending { envelope, ack })
            .await
            .map_err(|_| NetworkError::OrdererUnavailable)?;
        ack_rx.await.map_err(|_| NetworkError::OrdererUnavailable)?
    }

    /// Stop cutting blocks. Queued envelopes that are not yet in a block are
    /// rejected with `OrdererUnavailable`.
    pub fn shutdown(&self) {
        if let Some(tx) = self.shutdown_tx.lock().take() {
            let _ = tx.send(());
        }
    }
}

async fn batch_loop(
    config: OrdererConfig,
    mut receiver: mpsc::Receiver<Pending>,
    mut shutdown_rx: oneshot::Receiver<()>,
    genesis_hash: String,
    subscribers: Vec<mpsc::Sender<Block>>,
) {
    let max_messages = config.max_message_count.max(1);
    let mut number = 1;
    let mut previous_hash = genesis_hash;

    loop {
        let first = tokio::select! {
            _ = &mut shutdown_rx => {
                info!("Ordering service received shutdown signal");
                break;
            }
            pending = receiver.recv() => match pending {
                Some(pending) => pending,
                None => break,
            },
        };

        let mut batch = vec![first];
        let mut stopping = false;
        let deadline = Instant::now() + config.batch_timeout;
        while batch.len() < max_messages {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    stopping = true;
                    break;
                }
                next = tokio::time::timeout_at(deadline, receiver.recv()) => match next {
                    Ok(Some(pending)) => batch.push(pending),
                    Ok(None) | Err(_) => break,
                },
            }
        }
        if stopping {
            info!(pending = batch.len(), "Ordering service received shutdown signal");
            reject(batch, || NetworkError::OrdererUnavailable);
            break;
        }

        let (envelopes, acks): (Vec<_>, Vec<_>) =
            batch.into_iter().map(|p| (p.envelope, p.ack)).unzip();
        let block = match Block::new(number, previous_hash.clone(), envelopes) {
            Ok(block) => block,
            Err(e) => {
                error!(block = number, error = %e, "Failed to cut block");
                let reason = e.to_string();
                for ack in acks {
                    let _ = ack.send(Err(NetworkError::InvalidBlock(reason.clone())));
                }
                continue;
            }
        };
        info!(block = number, transactions = block.data.len(), "Cut block");
        previous_hash = block.hash();
        number += 1;

        for subscriber in &subscribers {
            if subscriber.send(block.clone()).await.is_err() {
                warn!(block = block.number(), "Committer stopped; block not delivered");
            }
        }
        for ack in acks {
            // The broadcaster may have given up on its deadline.
            let _ = ack.send(Ok(block.number()));
        }
    }

    // Anything still queued will never be ordered.
    receiver.close();
    let mut rest = Vec::new();
    while let Ok(pending) = receiver.try_recv() {
        rest.push(pending);
    }
    reject(rest, || NetworkError::OrdererUnavailable);
    info!("Ordering service stopped");
}

fn reject(batch: Vec<Pending>, error: impl Fn() -> NetworkError) {
    for pending in batch {
        debug!(tx_id = pending.envelope.tx_id(), "Envelope rejected");
        let _ = pending.ack.send(Err(error()));
    }
}

//! Client-facing entry point of the network.
//!
//! Endorsement asks `policy.required` peers in order, skipping peers that are
//! offline. Their payloads must be byte-identical; otherwise the peers saw
//! different state and the client should retry.

use super::committer::Committer;
use super::membership::EndorsementPolicy;
use super::orderer::OrderingService;
use super::peer::EndorsingPeer;
use crate::domain::{CommitStatus, Envelope, NetworkError, PreparedTransaction, SignedProposal};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

pub struct GatewayService {
    peers: Vec<Arc<EndorsingPeer>>,
    committers: Vec<Arc<Committer>>,
    orderer: Arc<OrderingService>,
    policy: EndorsementPolicy,
}

impl GatewayService {
    pub fn new(
        peers: Vec<Arc<EndorsingPeer>>,
        committers: Vec<Arc<Committer>>,
        orderer: Arc<OrderingService>,
        policy: EndorsementPolicy,
    ) -> Self {
        Self {
            peers,
            committers,
            orderer,
            policy,
        }
    }

    /// Run a query on the first available peer.
    pub fn evaluate(&self, signed: &SignedProposal) -> Result<Vec<u8>, NetworkError> {
        let mut last_error = NetworkError::PeerUnavailable("no peers configured".into());
        for peer in &self.peers {
            match peer.evaluate(signed) {
                Err(NetworkError::PeerUnavailable(name)) => {
                    warn!(peer = %name, "Peer offline; trying next");
                    last_error = NetworkError::PeerUnavailable(name);
                }
                result => return result,
            }
        }
        Err(last_error)
    }

    /// Collect the endorsements the policy requires.
    #[instrument(skip_all)]
    pub fn endorse(&self, signed: &SignedProposal) -> Result<PreparedTransaction, NetworkError> {
        let proposal = signed.proposal()?;
        let mut responses = Vec::with_capacity(self.policy.required);
        for peer in &self.peers {
            if responses.len() == self.policy.required {
                break;
            }
            match peer.process_proposal(signed) {
                Ok(response) => responses.push(response),
                Err(NetworkError::PeerUnavailable(name)) => {
                    warn!(peer = %name, "Peer offline; trying next");
                }
                Err(e) => return Err(e),
            }
        }
        if responses.len() < self.policy.required || responses.is_empty() {
            return Err(NetworkError::PeerUnavailable(format!(
                "{} of {} required endorsers reachable",
                responses.len(),
                self.policy.required
            )));
        }

        let payload = responses[0].payload.clone();
        if responses.iter().any(|r| r.payload != payload) {
            return Err(NetworkError::EndorsementMismatch(format!(
                "peers disagree on the results of {}",
                proposal.tx_id()
            )));
        }
        debug!(tx_id = proposal.tx_id(), endorsements = responses.len(), "Proposal endorsed");
        Ok(PreparedTransaction {
            tx_id: proposal.tx_id().to_string(),
            signed_proposal: signed.clone(),
            payload,
            endorsements: responses.into_iter().map(|r| r.endorsement).collect(),
        })
    }

    pub async fn submit(&self, envelope: Envelope) -> Result<(), NetworkError> {
        let block = self.orderer.broadcast(envelope).await?;
        debug!(block, "Envelope ordered");
        Ok(())
    }

    /// Wait until every peer has committed `tx_id`, so a follow-up query on
    /// any peer observes it. Returns the first peer's verdict. A faulted
    /// committer fails the wait at once.
    pub async fn commit_status(&self, tx_id: &str) -> Result<CommitStatus, NetworkError> {
        if let Some(faulted) = self.committers.iter().find(|c| c.is_faulted()) {
            warn!(peer = faulted.peer_name(), tx_id, "Committer faulted");
            return Err(NetworkError::PeerUnavailable(faulted.peer_name().to_string()));
        }
        let receivers: Vec<_> = self
            .committers
            .iter()
            .map(|committer| (committer.peer_name(), committer.commit_status(tx_id)))
            .collect();
        let mut first = None;
        for (peer, receiver) in receivers {
            let status = receiver
                .await
                .map_err(|_| NetworkError::PeerUnavailable(peer.to_string()))?;
            first.get_or_insert(status);
        }
        first.ok_or_else(|| NetworkError::PeerUnavailable("no committers configured".into()))
    }
}

//! Endorsing peer: checks a signed proposal, runs the contract in a
//! simulator against the peer's world state and signs the outcome.

use super::membership::MembershipRegistry;
use crate::domain::{
    Endorsement, NetworkError, Proposal, ProposalResponse, ResponsePayload, SignedProposal,
};
use pl_01_identity::SigningIdentity;
use pl_02_ledger_store::{ProvenanceContract, SimulationResults, TxContext, TxSimulator, WorldState};
use shared_types::ErrorBody;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct EndorsingPeer {
    identity: SigningIdentity,
    channel_id: String,
    chaincode_name: String,
    state: Arc<dyn WorldState>,
    contract: ProvenanceContract,
    membership: Arc<MembershipRegistry>,
    available: AtomicBool,
}

impl EndorsingPeer {
    pub fn new(
        identity: SigningIdentity,
        channel_id: impl Into<String>,
        chaincode_name: impl Into<String>,
        state: Arc<dyn WorldState>,
        membership: Arc<MembershipRegistry>,
    ) -> Self {
        Self {
            identity,
            channel_id: channel_id.into(),
            chaincode_name: chaincode_name.into(),
            state,
            contract: ProvenanceContract::new(),
            membership,
            available: AtomicBool::new(true),
        }
    }

    pub fn name(&self) -> &str {
        self.identity.label()
    }

    /// Certificate the peer presents to clients.
    pub fn certificate_pem(&self) -> &str {
        self.identity.certificate_pem()
    }

    pub fn state(&self) -> &Arc<dyn WorldState> {
        &self.state
    }

    /// Take the peer offline (or back online).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Simulate a proposal and endorse the results.
    pub fn process_proposal(&self, signed: &SignedProposal) -> Result<ProposalResponse, NetworkError> {
        let proposal = self.check_proposal(signed)?;
        let (response, results) = self.simulate(&proposal)?;
        let payload = ResponsePayload {
            proposal_hash: signed.hash(),
            results,
            response,
        };
        let signature = hex::encode(self.identity.sign(&payload.to_bytes()?));
        debug!(peer = self.name(), tx_id = proposal.tx_id(), "Endorsed proposal");
        Ok(ProposalResponse {
            payload,
            endorsement: Endorsement {
                endorser: self.identity.certificate_pem().to_string(),
                signature,
            },
        })
    }

    /// Run a proposal against current state and return the contract result.
    /// Nothing is signed and the read/write set is discarded.
    pub fn evaluate(&self, signed: &SignedProposal) -> Result<Vec<u8>, NetworkError> {
        let proposal = self.check_proposal(signed)?;
        let (response, results) = self.simulate(&proposal)?;
        if !results.rwset.is_read_only() {
            debug!(
                peer = self.name(),
                tx_id = proposal.tx_id(),
                "Discarding writes of evaluated proposal"
            );
        }
        Ok(response)
    }

    fn check_proposal(&self, signed: &SignedProposal) -> Result<Proposal, NetworkError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(NetworkError::PeerUnavailable(self.name().to_string()));
        }
        let proposal = signed.proposal()?;
        let header = &proposal.header;
        if header.channel_id != self.channel_id {
            return Err(NetworkError::BadProposal(format!(
                "unknown channel {}",
                header.channel_id
            )));
        }
        if header.chaincode_name != self.chaincode_name {
            return Err(NetworkError::BadProposal(format!(
                "chaincode {} is not installed",
                header.chaincode_name
            )));
        }
        proposal.check_tx_id()?;
        self.membership.verify_signed(
            &header.creator,
            Some(&header.creator_msp_id),
            &signed.proposal_bytes,
            &signed.signature,
        )?;
        Ok(proposal)
    }

    fn simulate(&self, proposal: &Proposal) -> Result<(Vec<u8>, SimulationResults), NetworkError> {
        let header = &proposal.header;
        let simulator = TxSimulator::new(
            self.state.clone(),
            TxContext {
                channel_id: header.channel_id.clone(),
                chaincode_name: header.chaincode_name.clone(),
                tx_id: header.tx_id.clone(),
                creator_msp_id: header.creator_msp_id.clone(),
                timestamp: header.timestamp,
            },
        );
        match self
            .contract
            .invoke(&simulator, &proposal.function, &proposal.args)
        {
            Ok(response) => Ok((response, simulator.into_results())),
            Err(err) => {
                debug!(
                    peer = self.name(),
                    tx_id = %header.tx_id,
                    function = %proposal.function,
                    error = %err,
                    "Contract rejected proposal"
                );
                if err.code() == shared_types::ErrorCode::Internal {
                    warn!(peer = self.name(), error = %err, "Contract failure");
                }
                Err(NetworkError::Contract(ErrorBody::from(err)))
            }
        }
    }
}

//! # Proposals and Envelopes
//!
//! ```text
//! Proposal ──serialize──→ proposal_bytes ──creator signs──→ SignedProposal
//! SignedProposal ──peer simulates──→ ResponsePayload ──peer signs──→ Endorsement
//! SignedProposal + ResponsePayload + Endorsements ──creator signs──→ Envelope
//! ```
//!
//! `tx_id = hex(sha256(nonce ‖ creator))`, so a transaction id cannot be
//! chosen freely and a replayed proposal keeps its id.

use super::errors::NetworkError;
use chrono::{DateTime, Utc};
use pl_02_ledger_store::SimulationResults;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const NONCE_LEN: usize = 24;

pub fn compute_tx_id(nonce: &[u8], creator: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(nonce);
    hasher.update(creator);
    hex::encode(hasher.finalize())
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalHeader {
    pub channel_id: String,
    pub chaincode_name: String,
    pub tx_id: String,
    /// Hex-encoded random nonce.
    pub nonce: String,
    /// Creator certificate (PEM).
    pub creator: String,
    pub creator_msp_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub header: ProposalHeader,
    pub function: String,
    pub args: Vec<String>,
}

impl Proposal {
    pub fn new(
        channel_id: &str,
        chaincode_name: &str,
        function: &str,
        args: Vec<String>,
        creator_pem: &str,
        creator_msp_id: &str,
    ) -> Self {
        let nonce: [u8; NONCE_LEN] = rand::random();
        Self {
            header: ProposalHeader {
                channel_id: channel_id.to_string(),
                chaincode_name: chaincode_name.to_string(),
                tx_id: compute_tx_id(&nonce, creator_pem.as_bytes()),
                nonce: hex::encode(nonce),
                creator: creator_pem.to_string(),
                creator_msp_id: creator_msp_id.to_string(),
                timestamp: Utc::now(),
            },
            function: function.to_string(),
            args,
        }
    }

    pub fn tx_id(&self) -> &str {
        &self.header.tx_id
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, NetworkError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Check that the transaction id is derived from the nonce and creator.
    pub fn check_tx_id(&self) -> Result<(), NetworkError> {
        let nonce = hex::decode(&self.header.nonce)
            .map_err(|_| NetworkError::BadProposal("nonce is not hex".into()))?;
        if compute_tx_id(&nonce, self.header.creator.as_bytes()) != self.header.tx_id {
            return Err(NetworkError::BadProposal(format!(
                "transaction id {} does not match nonce and creator",
                self.header.tx_id
            )));
        }
        Ok(())
    }
}

/// A proposal as signed by its creator. The bytes are what was signed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedProposal {
    pub proposal_bytes: Vec<u8>,
    /// Hex-encoded creator signature over `proposal_bytes`.
    pub signature: String,
}

impl SignedProposal {
    pub fn sign(
        proposal: &Proposal,
        sign: impl FnOnce(&[u8]) -> Vec<u8>,
    ) -> Result<Self, NetworkError> {
        let proposal_bytes = proposal.to_bytes()?;
        let signature = hex::encode(sign(&proposal_bytes));
        Ok(Self {
            proposal_bytes,
            signature,
        })
    }

    pub fn proposal(&self) -> Result<Proposal, NetworkError> {
        serde_json::from_slice(&self.proposal_bytes)
            .map_err(|e| NetworkError::BadProposal(format!("undecodable proposal: {e}")))
    }

    pub fn hash(&self) -> String {
        sha256_hex(&self.proposal_bytes)
    }
}

/// What an endorser attests to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsePayload {
    pub proposal_hash: String,
    pub results: SimulationResults,
    /// Contract return value (JSON).
    pub response: Vec<u8>,
}

impl ResponsePayload {
    pub fn to_bytes(&self) -> Result<Vec<u8>, NetworkError> {
        Ok(serde_json::to_vec(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endorsement {
    /// Endorsing peer's certificate (PEM).
    pub endorser: String,
    /// Hex signature over the serialized `ResponsePayload`.
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalResponse {
    pub payload: ResponsePayload,
    pub endorsement: Endorsement,
}

/// Endorsed proposal returned to the client, ready to be signed and ordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedTransaction {
    pub tx_id: String,
    pub signed_proposal: SignedProposal,
    pub payload: ResponsePayload,
    pub endorsements: Vec<Endorsement>,
}

impl PreparedTransaction {
    /// Bytes the creator signs to produce the envelope.
    pub fn signing_bytes(&self) -> Result<Vec<u8>, NetworkError> {
        Ok(serde_json::to_vec(&(
            &self.signed_proposal,
            &self.payload,
            &self.endorsements,
        ))?)
    }

    pub fn into_envelope(
        self,
        sign: impl FnOnce(&[u8]) -> Vec<u8>,
    ) -> Result<Envelope, NetworkError> {
        let signature = hex::encode(sign(&self.signing_bytes()?));
        Ok(Envelope {
            transaction: self,
            signature,
        })
    }
}

/// Transaction as submitted to the ordering service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub transaction: PreparedTransaction,
    /// Hex creator signature over `transaction.signing_bytes()`.
    pub signature: String,
}

impl Envelope {
    pub fn tx_id(&self) -> &str {
        &self.transaction.tx_id
    }
}

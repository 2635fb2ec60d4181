//! Shared fixtures for the unit tests of this crate.

use crate::domain::{Envelope, PreparedTransaction, Proposal, ProposalResponse, SignedProposal};
use crate::service::{EndorsingPeer, MembershipRegistry};
use pl_01_identity::{
    CaConfig, Credential, IdentityRole, KeyPair, LocalCertificateAuthority, SigningIdentity,
};
use pl_02_ledger_store::{InMemoryWorldState, WorldState};
use std::sync::Arc;

pub const CHANNEL: &str = "mychannel";
pub const CHAINCODE: &str = "provenance";

pub fn node(ca: &LocalCertificateAuthority, name: &str, role: IdentityRole) -> SigningIdentity {
    let key = KeyPair::generate();
    let pem = ca
        .issue_node_certificate(name, role, &key.public_key_hex())
        .unwrap();
    SigningIdentity::from_credential(name, &Credential::new(pem, key.to_pem(), "Org1MSP")).unwrap()
}

pub struct Fixture {
    pub ca: LocalCertificateAuthority,
    pub membership: Arc<MembershipRegistry>,
    pub client: SigningIdentity,
    pub peers: Vec<Arc<EndorsingPeer>>,
}

impl Fixture {
    /// Peers share one world state, as if they had committed the same blocks.
    pub fn new(peer_count: usize) -> Self {
        let ca = LocalCertificateAuthority::new(CaConfig::default());
        let membership = Arc::new(MembershipRegistry::new());
        membership.add_msp("Org1MSP", ca.public_key_hex());
        let client = node(&ca, "alice", IdentityRole::Client);
        let state: Arc<dyn WorldState> = Arc::new(InMemoryWorldState::new());
        let peers = (0..peer_count)
            .map(|i| {
                Arc::new(EndorsingPeer::new(
                    node(&ca, &format!("peer{i}.org1.example.com"), IdentityRole::Peer),
                    CHANNEL,
                    CHAINCODE,
                    state.clone(),
                    membership.clone(),
                ))
            })
            .collect();
        Self {
            ca,
            membership,
            client,
            peers,
        }
    }

    pub fn state(&self) -> Arc<dyn WorldState> {
        self.peers[0].state().clone()
    }

    pub fn proposal(&self, function: &str, args: &[&str]) -> SignedProposal {
        let proposal = Proposal::new(
            CHANNEL,
            CHAINCODE,
            function,
            args.iter().map(|a| a.to_string()).collect(),
            self.client.certificate_pem(),
            self.client.msp_id(),
        );
        SignedProposal::sign(&proposal, |bytes| self.client.sign(bytes)).unwrap()
    }

    /// Endorse on every peer and wrap the result in a signed envelope.
    pub fn envelope(&self, signed: &SignedProposal) -> Envelope {
        let responses: Vec<ProposalResponse> = self
            .peers
            .iter()
            .map(|peer| peer.process_proposal(signed).unwrap())
            .collect();
        PreparedTransaction {
            tx_id: signed.proposal().unwrap().tx_id().to_string(),
            signed_proposal: signed.clone(),
            payload: responses[0].payload.clone(),
            endorsements: responses.into_iter().map(|r| r.endorsement).collect(),
        }
        .into_envelope(|bytes| self.client.sign(bytes))
        .unwrap()
    }
}

pub fn progress_args<'a>(id: &'a str, property: &'a str) -> [&'a str; 8] {
    [
        id,
        "proj-1",
        property,
        "",
        "QmHash",
        "foundation poured",
        "alice",
        "2024-01-01T00:00:00Z",
    ]
}

//! # Network Assembly
//!
//! Boots a complete single-organization network in the current tokio runtime:
//! one endorsing peer and one committer per configured peer, a solo orderer,
//! and the `GatewayService` clients connect to.

use crate::adapters::InMemoryBlockStore;
use crate::domain::{Block, NetworkError};
use crate::service::{
    Committer, EndorsementPolicy, EndorsingPeer, GatewayService, MembershipRegistry,
    OrdererConfig, OrderingService,
};
use pl_01_identity::{
    CertificateAuthority, Credential, IdentityRole, KeyPair, LocalCertificateAuthority,
    SigningIdentity,
};
use pl_02_ledger_store::{InMemoryWorldState, StateError, WorldState};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

/// Blocks buffered between the orderer and a slow committer.
const DELIVERY_BUFFER: usize = 64;

#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub channel_id: String,
    pub chaincode_name: String,
    pub peer_count: usize,
    pub endorsement_policy: EndorsementPolicy,
    pub orderer: OrdererConfig,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            channel_id: "mychannel".to_string(),
            chaincode_name: "provenance".to_string(),
            peer_count: 2,
            endorsement_policy: EndorsementPolicy { required: 2 },
            orderer: OrdererConfig::default(),
        }
    }
}

impl NetworkConfig {
    pub fn validate(&self) -> Result<(), NetworkError> {
        if self.channel_id.is_empty() || self.chaincode_name.is_empty() {
            return Err(NetworkError::InvalidConfig(
                "channel and chaincode names must be set".into(),
            ));
        }
        if self.peer_count == 0 {
            return Err(NetworkError::InvalidConfig("at least one peer is required".into()));
        }
        let required = self.endorsement_policy.required;
        if required == 0 || required > self.peer_count {
            return Err(NetworkError::InvalidConfig(format!(
                "endorsement policy needs {required} of {} peers",
                self.peer_count
            )));
        }
        if self.orderer.max_message_count == 0 {
            return Err(NetworkError::InvalidConfig(
                "orderer max_message_count must be positive".into(),
            ));
        }
        Ok(())
    }
}

pub struct LedgerNetwork {
    config: NetworkConfig,
    membership: Arc<MembershipRegistry>,
    peers: Vec<Arc<EndorsingPeer>>,
    committers: Vec<Arc<Committer>>,
    orderer: Arc<OrderingService>,
    gateway: Arc<GatewayService>,
    tasks: Vec<JoinHandle<()>>,
}

impl LedgerNetwork {
    /// Start a network whose peers keep world state in memory.
    pub fn start(config: NetworkConfig, ca: &LocalCertificateAuthority) -> Result<Self, NetworkError> {
        Self::start_with_state(config, ca, |_| {
            Ok(Arc::new(InMemoryWorldState::new()) as Arc<dyn WorldState>)
        })
    }

    /// Start a network, asking `make_state` for each peer's world state.
    pub fn start_with_state<F>(
        config: NetworkConfig,
        ca: &LocalCertificateAuthority,
        mut make_state: F,
    ) -> Result<Self, NetworkError>
    where
        F: FnMut(&str) -> Result<Arc<dyn WorldState>, StateError>,
    {
        config.validate()?;
        let membership = Arc::new(MembershipRegistry::new());
        membership.add_msp(ca.msp_id(), ca.public_key_hex());

        let genesis_hash = Block::genesis(&config.channel_id).hash();
        let mut peers = Vec::with_capacity(config.peer_count);
        let mut committers = Vec::with_capacity(config.peer_count);
        let mut tasks = Vec::with_capacity(config.peer_count + 1);
        let mut subscribers = Vec::with_capacity(config.peer_count);

        for index in 0..config.peer_count {
            let name = format!("peer{index}.org1.example.com");
            let identity = node_identity(ca, &name)?;
            let state = make_state(&name)?;

            peers.push(Arc::new(EndorsingPeer::new(
                identity,
                config.channel_id.clone(),
                config.chaincode_name.clone(),
                state.clone(),
                membership.clone(),
            )));

            let committer = Arc::new(Committer::new(
                name,
                config.channel_id.clone(),
                state,
                Arc::new(InMemoryBlockStore::new(&config.channel_id)),
                membership.clone(),
                config.endorsement_policy,
            ));
            let (block_tx, block_rx) = mpsc::channel(DELIVERY_BUFFER);
            subscribers.push(block_tx);
            tasks.push(committer.clone().run(block_rx));
            committers.push(committer);
        }

        let (orderer, orderer_task) =
            OrderingService::start(config.orderer.clone(), genesis_hash, subscribers);
        let orderer = Arc::new(orderer);
        tasks.push(orderer_task);

        let gateway = Arc::new(GatewayService::new(
            peers.clone(),
            committers.clone(),
            orderer.clone(),
            config.endorsement_policy,
        ));

        info!(
            channel = %config.channel_id,
            chaincode = %config.chaincode_name,
            peers = config.peer_count,
            required_endorsements = config.endorsement_policy.required,
            "Ledger network started"
        );
        Ok(Self {
            config,
            membership,
            peers,
            committers,
            orderer,
            gateway,
            tasks,
        })
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn gateway(&self) -> Arc<GatewayService> {
        self.gateway.clone()
    }

    pub fn membership(&self) -> &Arc<MembershipRegistry> {
        &self.membership
    }

    pub fn peer(&self, index: usize) -> Option<&Arc<EndorsingPeer>> {
        self.peers.get(index)
    }

    pub fn committer(&self, index: usize) -> Option<&Arc<Committer>> {
        self.committers.get(index)
    }

    /// Stop the orderer and wait for committers to drain delivered blocks.
    pub async fn shutdown(self) {
        self.orderer.shutdown();
        for task in self.tasks {
            let _ = task.await;
        }
        info!(channel = %self.config.channel_id, "Ledger network stopped");
    }
}

fn node_identity(ca: &LocalCertificateAuthority, name: &str) -> Result<SigningIdentity, NetworkError> {
    let key = KeyPair::generate();
    let pem = ca
        .issue_node_certificate(name, IdentityRole::Peer, &key.public_key_hex())
        .map_err(|e| NetworkError::InvalidConfig(format!("cannot provision {name}: {e}")))?;
    SigningIdentity::from_credential(name, &Credential::new(pem, key.to_pem(), ca.msp_id()))
        .map_err(|e| NetworkError::InvalidConfig(format!("cannot provision {name}: {e}")))
}

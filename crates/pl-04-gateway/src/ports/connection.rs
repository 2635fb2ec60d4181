use crate::adapters::TlsTrust;
use crate::domain::GatewayError;
use async_trait::async_trait;
use pl_03_ledger_network::{CommitStatus, Envelope, PreparedTransaction, SignedProposal};
use std::sync::Arc;

/// Where to connect and which server identity to expect.
#[derive(Debug, Clone)]
pub struct ConnectTarget {
    pub endpoint: String,
    pub host_alias: String,
    pub trust: TlsTrust,
}

#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, target: &ConnectTarget) -> Result<Arc<dyn Connection>, GatewayError>;
}

/// An open connection. Shared by every request of a session.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Run a proposal on one peer; nothing is ordered.
    async fn evaluate(&self, proposal: SignedProposal) -> Result<Vec<u8>, GatewayError>;

    /// Collect endorsements for a proposal.
    async fn endorse(&self, proposal: SignedProposal) -> Result<PreparedTransaction, GatewayError>;

    /// Hand a signed envelope to the ordering service. Resolves once it is in
    /// a delivered block; an error means it was not ordered.
    async fn submit(&self, envelope: Envelope) -> Result<(), GatewayError>;

    /// Wait until the transaction is committed.
    async fn commit_status(&self, tx_id: &str) -> Result<CommitStatus, GatewayError>;

    async fn close(&self);
}

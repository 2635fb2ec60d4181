use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pl_02_ledger_store::ContractFunction;
use pl_03_ledger_network::CommitStatus;
use pl_04_gateway::GatewayError;

#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Order a transaction and wait for its commit.
    async fn submit(
        &self,
        function: ContractFunction,
        args: Vec<String>,
    ) -> Result<Vec<u8>, GatewayError>;

    /// Read current state without ordering.
    async fn evaluate(
        &self,
        function: ContractFunction,
        args: Vec<String>,
    ) -> Result<Vec<u8>, GatewayError>;

    async fn commit_status(&self, tx_id: &str) -> Result<CommitStatus, GatewayError>;
}

/// Time source trait for testability
pub trait TimeSource: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

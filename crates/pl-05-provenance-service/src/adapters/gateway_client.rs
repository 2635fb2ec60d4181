//! `LedgerClient` over a gateway session contract.

use crate::ports::LedgerClient;
use async_trait::async_trait;
use pl_02_ledger_store::ContractFunction;
use pl_03_ledger_network::CommitStatus;
use pl_04_gateway::{Contract, GatewayError};

#[async_trait]
impl LedgerClient for Contract {
    async fn submit(
        &self,
        function: ContractFunction,
        args: Vec<String>,
    ) -> Result<Vec<u8>, GatewayError> {
        self.submit_transaction(function.name(), &args).await
    }

    async fn evaluate(
        &self,
        function: ContractFunction,
        args: Vec<String>,
    ) -> Result<Vec<u8>, GatewayError> {
        self.evaluate_transaction(function.name(), &args).await
    }

    async fn commit_status(&self, tx_id: &str) -> Result<CommitStatus, GatewayError> {
        Contract::commit_status(self, tx_id).await
    }
}

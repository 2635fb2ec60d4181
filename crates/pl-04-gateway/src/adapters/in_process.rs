//! Transport to a `GatewayService` running in the same process.
//!
//! Evaluation and endorsement run the contract synchronously, so they are
//! moved to the blocking pool; the caller's deadline then still fires while a
//! slow simulation is in progress.

use crate::domain::GatewayError;
use crate::ports::{ConnectTarget, Connection, Connector};
use async_trait::async_trait;
use pl_03_ledger_network::{
    CommitStatus, Envelope, GatewayService, NetworkError, PreparedTransaction, SignedProposal,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Accepts connections addressed to `endpoint` and presents
/// `server_certificate` for the TLS check.
pub struct InProcessConnector {
    endpoint: String,
    server_certificate: String,
    service: Arc<GatewayService>,
}

impl InProcessConnector {
    pub fn new(
        endpoint: impl Into<String>,
        server_certificate: impl Into<String>,
        service: Arc<GatewayService>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            server_certificate: server_certificate.into(),
            service,
        }
    }
}

#[async_trait]
impl Connector for InProcessConnector {
    async fn connect(&self, target: &ConnectTarget) -> Result<Arc<dyn Connection>, GatewayError> {
        if target.endpoint != self.endpoint {
            return Err(GatewayError::Transport(format!(
                "connection refused: {}",
                target.endpoint
            )));
        }
        target
            .trust
            .verify_server(&self.server_certificate, &target.host_alias)?;
        info!(endpoint = %target.endpoint, host = %target.host_alias, "Connected to gateway peer");
        Ok(Arc::new(InProcessConnection {
            service: self.service.clone(),
            closed: AtomicBool::new(false),
        }))
    }
}

pub struct InProcessConnection {
    service: Arc<GatewayService>,
    closed: AtomicBool,
}

impl InProcessConnection {
    fn check_open(&self) -> Result<(), GatewayError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(GatewayError::Transport("connection closed".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Connection for InProcessConnection {
    async fn evaluate(&self, proposal: SignedProposal) -> Result<Vec<u8>, GatewayError> {
        self.check_open()?;
        let service = self.service.clone();
        blocking(move || service.evaluate(&proposal)).await
    }

    async fn endorse(&self, proposal: SignedProposal) -> Result<PreparedTransaction, GatewayError> {
        self.check_open()?;
        let service = self.service.clone();
        blocking(move || service.endorse(&proposal)).await
    }

    async fn submit(&self, envelope: Envelope) -> Result<(), GatewayError> {
        self.check_open()?;
        Ok(self.service.submit(envelope).await?)
    }

    async fn commit_status(&self, tx_id: &str) -> Result<CommitStatus, GatewayError> {
        self.check_open()?;
        Ok(self.service.commit_status(tx_id).await?)
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!("In-process connection closed");
        }
    }
}

async fn blocking<T, F>(call: F) -> Result<T, GatewayError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, NetworkError> + Send + 'static,
{
    tokio::task::spawn_blocking(call)
        .await
        .map_err(|e| GatewayError::Transport(format!("gateway task failed: {e}")))?
        .map_err(GatewayError::from)
}

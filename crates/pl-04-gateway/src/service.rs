//! # Gateway Session
//!
//! `Gateway::connect` loads the trust anchor, connects, and returns the
//! session handle. `Network` and `Contract` are cheap views onto it and are
//! safe to clone and use from many tasks at once. `Gateway::close` consumes
//! the handle, so teardown happens once; contracts still held afterwards fail
//! with `GatewayError::Closed`.

use crate::adapters::TlsTrust;
use crate::domain::{GatewayConfig, GatewayError, Phase, TimeoutConfig};
use crate::ports::{ConnectTarget, Connection, Connector};
use pl_01_identity::SigningIdentity;
use pl_03_ledger_network::{CommitStatus, Proposal, SignedProposal};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

struct Session {
    identity: SigningIdentity,
    connection: Arc<dyn Connection>,
    timeouts: TimeoutConfig,
    closed: AtomicBool,
}

impl Session {
    fn check_open(&self) -> Result<(), GatewayError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(GatewayError::Closed)
        } else {
            Ok(())
        }
    }

    fn sign_proposal(
        &self,
        channel: &str,
        chaincode: &str,
        function: &str,
        args: &[String],
    ) -> Result<SignedProposal, GatewayError> {
        let proposal = Proposal::new(
            channel,
            chaincode,
            function,
            args.to_vec(),
            self.identity.certificate_pem(),
            self.identity.msp_id(),
        );
        Ok(SignedProposal::sign(&proposal, |bytes| self.identity.sign(bytes))?)
    }
}

pub struct Gateway {
    session: Arc<Session>,
    endpoint: String,
}

impl Gateway {
    /// Validate `config`, load its trust anchor and connect as `identity`.
    pub async fn connect(
        config: &GatewayConfig,
        identity: SigningIdentity,
        connector: &dyn Connector,
    ) -> Result<Self, GatewayError> {
        config.validate()?;
        if identity.msp_id() != config.msp_id {
            return Err(GatewayError::Identity(format!(
                "identity '{}' belongs to {}, gateway is configured for {}",
                identity.label(),
                identity.msp_id(),
                config.msp_id
            )));
        }
        let target = ConnectTarget {
            endpoint: config.peer_endpoint.clone(),
            host_alias: config.peer_host_alias.clone(),
            trust: TlsTrust::load(&config.tls_cert_path)?,
        };
        let connection = connector.connect(&target).await?;
        info!(
            endpoint = %config.peer_endpoint,
            identity = identity.label(),
            msp_id = identity.msp_id(),
            "Gateway connected"
        );
        Ok(Self {
            session: Arc::new(Session {
                identity,
                connection,
                timeouts: config.timeouts,
                closed: AtomicBool::new(false),
            }),
            endpoint: config.peer_endpoint.clone(),
        })
    }

    pub fn identity(&self) -> &SigningIdentity {
        &self.session.identity
    }

    pub fn network(&self, channel: &str) -> Network {
        Network {
            session: self.session.clone(),
            channel: channel.to_string(),
        }
    }

    /// Tear down the connection.
    pub async fn close(self) {
        if !self.session.closed.swap(true, Ordering::SeqCst) {
            self.session.connection.close().await;
            info!(endpoint = %self.endpoint, "Gateway closed");
        }
    }
}

#[derive(Clone)]
pub struct Network {
    session: Arc<Session>,
    channel: String,
}

impl Network {
    pub fn name(&self) -> &str {
        &self.channel
    }

    pub fn contract(&self, chaincode: &str) -> Contract {
        Contract {
            session: self.session.clone(),
            channel: self.channel.clone(),
            chaincode: chaincode.to_string(),
        }
    }
}

/// A transaction handed to the orderer but not yet known to be committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedTransaction {
    pub tx_id: String,
    /// Contract result as endorsed. Only meaningful once the commit is valid.
    pub result: Vec<u8>,
}

#[derive(Clone)]
pub struct Contract {
    session: Arc<Session>,
    channel: String,
    chaincode: String,
}

impl Contract {
    pub fn name(&self) -> &str {
        &self.chaincode
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Query current state on one peer.
    #[instrument(skip(self, args), fields(chaincode = %self.chaincode))]
    pub async fn evaluate_transaction(
        &self,
        function: &str,
        args: &[String],
    ) -> Result<Vec<u8>, GatewayError> {
        self.session.check_open()?;
        let signed = self
            .session
            .sign_proposal(&self.channel, &self.chaincode, function, args)?;
        with_deadline(
            Phase::Evaluate,
            self.session.timeouts.evaluate,
            None,
            self.session.connection.evaluate(signed),
        )
        .await
    }

    /// Endorse, order and wait for the commit. Returns the contract result
    /// once the transaction is valid on the ledger.
    #[instrument(skip(self, args), fields(chaincode = %self.chaincode))]
    pub async fn submit_transaction(
        &self,
        function: &str,
        args: &[String],
    ) -> Result<Vec<u8>, GatewayError> {
        let submitted = self.submit_async(function, args).await?;
        let status = self.commit_status(&submitted.tx_id).await?;
        if !status.is_valid() {
            warn!(tx_id = %submitted.tx_id, code = %status.code, "Transaction invalidated");
            return Err(GatewayError::Commit {
                tx_id: submitted.tx_id,
                code: status.code,
            });
        }
        debug!(tx_id = %submitted.tx_id, block = status.block_number, "Transaction committed");
        Ok(submitted.result)
    }

    /// Endorse and order without waiting for the commit.
    pub async fn submit_async(
        &self,
        function: &str,
        args: &[String],
    ) -> Result<SubmittedTransaction, GatewayError> {
        self.session.check_open()?;
        let signed = self
            .session
            .sign_proposal(&self.channel, &self.chaincode, function, args)?;
        let tx_id = signed.proposal()?.tx_id().to_string();
        let timeouts = self.session.timeouts;

        let prepared = with_deadline(
            Phase::Endorse,
            timeouts.endorse,
            Some(&tx_id),
            self.session.connection.endorse(signed),
        )
        .await?;
        let result = prepared.payload.response.clone();
        let envelope = prepared.into_envelope(|bytes| self.session.identity.sign(bytes))?;

        with_deadline(
            Phase::Submit,
            timeouts.submit,
            Some(&tx_id),
            self.session.connection.submit(envelope),
        )
        .await?;
        debug!(%tx_id, "Transaction submitted");
        Ok(SubmittedTransaction { tx_id, result })
    }

    /// Wait for the commit of a submitted transaction.
    pub async fn commit_status(&self, tx_id: &str) -> Result<CommitStatus, GatewayError> {
        self.session.check_open()?;
        with_deadline(
            Phase::CommitStatus,
            self.session.timeouts.commit_status,
            Some(tx_id),
            self.session.connection.commit_status(tx_id),
        )
        .await
    }
}

async fn with_deadline<T, F>(
    phase: Phase,
    limit: Duration,
    tx_id: Option<&str>,
    call: F,
) -> Result<T, GatewayError>
where
    F: Future<Output = Result<T, GatewayError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            warn!(%phase, ?limit, tx_id, "Deadline exceeded");
            Err(GatewayError::Timeout {
                phase,
                tx_id: tx_id.map(str::to_string),
            })
        }
    }
}

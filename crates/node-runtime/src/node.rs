//! # Node Assembly
//!
//! ## Startup Sequence
//!
//! 1. Start the local certificate authority and the ledger network
//! 2. Publish the CA key as the gateway's TLS trust anchor
//! 3. Enroll the admin, then the application user (skipped when identity
//!    files are configured)
//! 4. Connect the gateway session and bind the provenance service to the
//!    configured channel and chaincode
//!
//! Shutdown runs in reverse: the session closes before the network stops.

use crate::config::NodeConfig;
use anyhow::{Context, Result};
use chrono::Utc;
use pl_01_identity::{
    CaConfig, Certificate, CredentialStore, EnrollmentConfig, EnrollmentManager, EnsureOutcome,
    FileSystemCredentialStore, LocalCertificateAuthority, SigningIdentity, StoreError, ADMIN_LABEL,
};
use pl_03_ledger_network::{EndorsementPolicy, LedgerNetwork, NetworkConfig};
use pl_04_gateway::{load_identity, Contract, Gateway, InProcessConnector, TlsTrust};
use pl_05_provenance_service::ProvenanceService;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

/// A running node: network, open session and the service bound to it.
pub struct Node {
    network: LedgerNetwork,
    gateway: Gateway,
    service: ProvenanceService<Contract>,
}

impl Node {
    pub async fn boot(config: NodeConfig) -> Result<Self> {
        config.validate().context("invalid node configuration")?;

        let ca = Arc::new(LocalCertificateAuthority::new(CaConfig {
            msp_id: config.gateway.msp_id.clone(),
            bootstrap_id: config.ca_admin_id.clone(),
            bootstrap_secret: config.ca_admin_secret.clone(),
            ..CaConfig::default()
        }));
        let network = start_network(&config, &ca)?;

        TlsTrust::new(ca.public_key_hex())
            .write(&config.gateway.tls_cert_path)
            .context("failed to write TLS trust anchor")?;

        let identity = provision_identity(&config, ca).await?;

        let server_certificate = network
            .peer(0)
            .context("ledger network has no peers")?
            .certificate_pem()
            .to_string();
        let connector = InProcessConnector::new(
            config.gateway.peer_endpoint.clone(),
            server_certificate,
            network.gateway(),
        );
        let gateway = Gateway::connect(&config.gateway, identity, &connector)
            .await
            .context("failed to open gateway session")?;
        let contract = gateway
            .network(&config.gateway.channel_name)
            .contract(&config.gateway.chaincode_name);

        info!(
            channel = %config.gateway.channel_name,
            chaincode = %config.gateway.chaincode_name,
            identity = gateway.identity().label(),
            "Node ready"
        );
        Ok(Self {
            network,
            gateway,
            service: ProvenanceService::new(Arc::new(contract)),
        })
    }

    pub fn service(&self) -> &ProvenanceService<Contract> {
        &self.service
    }

    /// Answer newline-delimited JSON commands until `input` ends. Each
    /// response is one JSON line. Returns the number of commands handled.
    pub async fn serve<R, W>(&self, input: R, mut output: W) -> Result<usize>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        let mut handled = 0;
        while let Some(line) = lines.next_line().await.context("failed to read command")? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let response = self.service.handle_json(line).await;
            let mut encoded =
                serde_json::to_string(&response).context("failed to encode response")?;
            encoded.push('\n');
            output
                .write_all(encoded.as_bytes())
                .await
                .context("failed to write response")?;
            output.flush().await.context("failed to write response")?;
            handled += 1;
        }
        debug!(handled, "Command stream ended");
        Ok(handled)
    }

    pub async fn shutdown(self) {
        self.gateway.close().await;
        self.network.shutdown().await;
        info!("Node stopped");
    }
}

fn network_config(config: &NodeConfig) -> NetworkConfig {
    NetworkConfig {
        channel_id: config.gateway.channel_name.clone(),
        chaincode_name: config.gateway.chaincode_name.clone(),
        peer_count: config.peer_count,
        endorsement_policy: EndorsementPolicy {
            required: config.peer_count,
        },
        ..NetworkConfig::default()
    }
}

#[cfg(not(feature = "rocksdb"))]
fn start_network(config: &NodeConfig, ca: &LocalCertificateAuthority) -> Result<LedgerNetwork> {
    LedgerNetwork::start(network_config(config), ca).context("failed to start ledger network")
}

#[cfg(feature = "rocksdb")]
fn start_network(config: &NodeConfig, ca: &LocalCertificateAuthority) -> Result<LedgerNetwork> {
    use pl_02_ledger_store::{RocksDbWorldState, RocksDbWorldStateConfig, WorldState};

    let root = config.state_path.clone();
    LedgerNetwork::start_with_state(network_config(config), ca, |peer| {
        let path = root.join(peer);
        info!(peer, path = %path.display(), "Opening world state");
        let state = RocksDbWorldState::open(RocksDbWorldStateConfig {
            path: path.to_string_lossy().into_owned(),
            ..RocksDbWorldStateConfig::default()
        })?;
        Ok(Arc::new(state) as Arc<dyn WorldState>)
    })
    .context("failed to start ledger network")
}

/// The session identity: from `CERT_PATH`/`KEY_PATH` when both are set,
/// otherwise enrolled into the wallet on first use.
async fn provision_identity(
    config: &NodeConfig,
    ca: Arc<LocalCertificateAuthority>,
) -> Result<SigningIdentity> {
    if let (Some(cert_path), Some(key_path)) = (&config.gateway.cert_path, &config.gateway.key_path)
    {
        info!(cert = %cert_path.display(), "Loading identity from files");
        return load_identity(&config.app_user_id, cert_path, key_path, &config.gateway.msp_id)
            .context("failed to load identity files");
    }

    let store = Arc::new(
        FileSystemCredentialStore::open(&config.wallet_path).with_context(|| {
            format!("failed to open wallet at {}", config.wallet_path.display())
        })?,
    );
    let discarded = discard_untrusted(store.as_ref(), &ca.public_key_hex())
        .context("failed to inspect wallet")?;
    if discarded > 0 {
        warn!(discarded, "Discarded credentials not issued by the current CA");
    }

    let manager = EnrollmentManager::new(
        store,
        ca,
        EnrollmentConfig {
            admin_label: ADMIN_LABEL.to_string(),
            admin_enrollment_id: config.ca_admin_id.clone(),
            admin_secret: config.ca_admin_secret.clone(),
        },
    );
    let admin = manager.ensure_admin().await.context("admin enrollment failed")?;
    let user = manager
        .ensure_user(&config.app_user_id, &config.app_user_affiliation)
        .await
        .with_context(|| format!("enrollment of '{}' failed", config.app_user_id))?;
    info!(
        admin_enrolled = admin == EnsureOutcome::Enrolled,
        user_enrolled = user == EnsureOutcome::Enrolled,
        user = %config.app_user_id,
        "Identities ready"
    );
    manager
        .identity(&config.app_user_id)
        .context("application identity unavailable")
}

/// Remove credentials whose certificate does not verify against
/// `ca_public_key`. The local CA generates a fresh key on every start, so a
/// wallet kept from an earlier run holds certificates the network rejects.
fn discard_untrusted(store: &dyn CredentialStore, ca_public_key: &str) -> Result<usize, StoreError> {
    let now = Utc::now();
    let mut discarded = 0;
    for label in store.list()? {
        let Some(credential) = store.get(&label)? else {
            continue;
        };
        let trusted = Certificate::from_pem(&credential.certificate)
            .map(|cert| cert.verify(ca_public_key, now).is_ok())
            .unwrap_or(false);
        if !trusted && store.remove(&label)? {
            debug!(label = %label, "Removed untrusted credential");
            discarded += 1;
        }
    }
    Ok(discarded)
}

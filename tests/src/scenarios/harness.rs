//! # Test Ledger
//!
//! A complete in-process deployment per test: certificate authority, ledger
//! network, enrolled application identity, gateway session and the
//! provenance service bound to it. Files live in a temporary directory that
//! is removed with the ledger.

use pl_01_identity::{
    CaConfig, EnrollmentConfig, EnrollmentManager, FileSystemCredentialStore,
    LocalCertificateAuthority, SigningIdentity,
};
use pl_03_ledger_network::{LedgerNetwork, NetworkConfig, OrdererConfig};
use pl_04_gateway::{
    Contract, Gateway, GatewayConfig, GatewayError, InProcessConnector, TimeoutConfig, TlsTrust,
};
use pl_05_provenance_service::{DocumentInput, ProgressUpdateInput, ProvenanceService};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const APP_USER: &str = "appUser";
pub const APP_USER_AFFILIATION: &str = "org1.department1";

#[derive(Debug, Clone)]
pub struct LedgerOptions {
    pub network: NetworkConfig,
    pub timeouts: TimeoutConfig,
    pub user: String,
}

impl Default for LedgerOptions {
    fn default() -> Self {
        Self {
            network: NetworkConfig {
                orderer: OrdererConfig {
                    batch_timeout: Duration::from_millis(50),
                    ..OrdererConfig::default()
                },
                ..NetworkConfig::default()
            },
            timeouts: TimeoutConfig::default(),
            user: APP_USER.to_string(),
        }
    }
}

pub struct TestLedger {
    ca: Arc<LocalCertificateAuthority>,
    network: LedgerNetwork,
    config: GatewayConfig,
    connector: InProcessConnector,
    gateway: Gateway,
    contract: Contract,
    service: ProvenanceService<Contract>,
    _dir: TempDir,
}

impl TestLedger {
    pub async fn start() -> Self {
        Self::start_with(LedgerOptions::default()).await
    }

    pub async fn start_with(options: LedgerOptions) -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let ca = Arc::new(LocalCertificateAuthority::new(CaConfig::default()));
        let network = LedgerNetwork::start(options.network, &ca).expect("network starts");

        let tls_cert_path = dir.path().join("crypto").join("tls-ca.pem");
        TlsTrust::new(ca.public_key_hex())
            .write(&tls_cert_path)
            .expect("trust anchor written");

        let store = FileSystemCredentialStore::open(dir.path().join("wallet")).expect("wallet");
        let manager = EnrollmentManager::new(Arc::new(store), ca.clone(), EnrollmentConfig::default());
        manager.ensure_admin().await.expect("admin enrolled");
        manager
            .ensure_user(&options.user, APP_USER_AFFILIATION)
            .await
            .expect("user enrolled");
        let identity = manager.identity(&options.user).expect("user identity");

        let config = GatewayConfig {
            tls_cert_path,
            channel_name: network.config().channel_id.clone(),
            chaincode_name: network.config().chaincode_name.clone(),
            timeouts: options.timeouts,
            ..GatewayConfig::default()
        };
        let connector = InProcessConnector::new(
            config.peer_endpoint.clone(),
            network.peer(0).expect("peer0").certificate_pem(),
            network.gateway(),
        );
        let gateway = Gateway::connect(&config, identity, &connector)
            .await
            .expect("gateway connects");
        let contract = gateway
            .network(&config.channel_name)
            .contract(&config.chaincode_name);
        let service = ProvenanceService::new(Arc::new(contract.clone()));

        Self {
            ca,
            network,
            config,
            connector,
            gateway,
            contract,
            service,
            _dir: dir,
        }
    }

    pub fn ca(&self) -> &Arc<LocalCertificateAuthority> {
        &self.ca
    }

    pub fn network(&self) -> &LedgerNetwork {
        &self.network
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub fn contract(&self) -> &Contract {
        &self.contract
    }

    pub fn service(&self) -> &ProvenanceService<Contract> {
        &self.service
    }

    /// Open a second session as `identity` against the same network.
    pub async fn connect(&self, identity: SigningIdentity) -> Result<Gateway, GatewayError> {
        Gateway::connect(&self.config, identity, &self.connector).await
    }

    /// Block height on every committing peer.
    pub fn heights(&self) -> Vec<u64> {
        (0..self.network.config().peer_count)
            .filter_map(|i| self.network.committer(i))
            .map(|committer| committer.height())
            .collect()
    }

    pub async fn shutdown(self) {
        self.gateway.close().await;
        self.network.shutdown().await;
    }
}

pub fn progress_input(progress_id: &str, project_id: &str, property_id: &str) -> ProgressUpdateInput {
    ProgressUpdateInput {
        progress_id: progress_id.to_string(),
        project_id: project_id.to_string(),
        property_id: property_id.to_string(),
        milestone_id: None,
        content_hash: format!("Qm{progress_id}"),
        description: format!("progress {progress_id}"),
        uploaded_by: "alice".to_string(),
        timestamp: Some("2024-03-01T10:00:00Z".to_string()),
        metadata: None,
    }
}

pub fn document_input(document_id: &str, project_id: &str, document_type: &str) -> DocumentInput {
    DocumentInput {
        document_id: document_id.to_string(),
        project_id: project_id.to_string(),
        property_id: None,
        document_name: format!("{document_id}.pdf"),
        document_type: document_type.to_string(),
        content_hash: format!("Qm{document_id}"),
        uploaded_by: "alice".to_string(),
        timestamp: Some("2024-03-01T10:00:00Z".to_string()),
        metadata: None,
    }
}

//! # Node Configuration
//!
//! The gateway session settings plus everything the node needs to provision
//! an identity for that session.

use pl_04_gateway::{ConfigError, GatewayConfig};
use std::path::PathBuf;

/// Complete node configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub gateway: GatewayConfig,
    /// Directory of the file-system credential store.
    pub wallet_path: PathBuf,
    /// Registrar identity bootstrapped into the certificate authority.
    pub ca_admin_id: String,
    pub ca_admin_secret: String,
    /// Label the application identity is enrolled and stored under.
    pub app_user_id: String,
    pub app_user_affiliation: String,
    /// Number of peers in the in-process network. Every peer must endorse.
    pub peer_count: usize,
    /// Root directory of the per-peer world state databases.
    pub state_path: PathBuf,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            wallet_path: PathBuf::from("wallet"),
            ca_admin_id: "admin".to_string(),
            ca_admin_secret: "adminpw".to_string(),
            app_user_id: "appUser".to_string(),
            app_user_affiliation: "org1.department1".to_string(),
            peer_count: 2,
            state_path: PathBuf::from("data/world-state"),
        }
    }
}

impl NodeConfig {
    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self {
            gateway: GatewayConfig::from_lookup(&lookup)?,
            ..Self::default()
        };
        if let Some(v) = lookup("WALLET_PATH") {
            config.wallet_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("CA_ADMIN_ID") {
            config.ca_admin_id = v;
        }
        if let Some(v) = lookup("CA_ADMIN_SECRET") {
            config.ca_admin_secret = v;
        }
        if let Some(v) = lookup("APP_USER_ID") {
            config.app_user_id = v;
        }
        if let Some(v) = lookup("APP_USER_AFFILIATION") {
            config.app_user_affiliation = v;
        }
        if let Some(v) = lookup("PEER_COUNT") {
            config.peer_count = v
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("PEER_COUNT: '{v}' is not a number")))?;
        }
        if let Some(v) = lookup("STATE_PATH") {
            config.state_path = PathBuf::from(v);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.gateway.validate()?;
        if self.ca_admin_id.is_empty() {
            return Err(ConfigError::Missing("CA_ADMIN_ID"));
        }
        if self.ca_admin_secret.is_empty() {
            return Err(ConfigError::Missing("CA_ADMIN_SECRET"));
        }
        if self.app_user_id.is_empty() {
            return Err(ConfigError::Missing("APP_USER_ID"));
        }
        if self.peer_count == 0 {
            return Err(ConfigError::Invalid("PEER_COUNT must be positive".into()));
        }
        Ok(())
    }

    /// Whether the session identity is read from `CERT_PATH`/`KEY_PATH`
    /// instead of the credential store.
    pub fn uses_identity_files(&self) -> bool {
        self.gateway.cert_path.is_some() && self.gateway.key_path.is_some()
    }
}

//! Gateway configuration with validation.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Session configuration. Every field has a default suitable for the local
/// network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Address of the gateway peer.
    pub peer_endpoint: String,
    /// Name the peer's TLS certificate must carry.
    pub peer_host_alias: String,
    /// Trust anchor for the peer's TLS certificate.
    pub tls_cert_path: PathBuf,
    /// Signing certificate. When unset the identity comes from the credential store.
    pub cert_path: Option<PathBuf>,
    /// Private key matching `cert_path`.
    pub key_path: Option<PathBuf>,
    pub msp_id: String,
    pub channel_name: String,
    pub chaincode_name: String,
    pub timeouts: TimeoutConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            peer_endpoint: "localhost:7051".to_string(),
            peer_host_alias: "peer0.org1.example.com".to_string(),
            tls_cert_path: PathBuf::from("crypto/tls-ca.pem"),
            cert_path: None,
            key_path: None,
            msp_id: "Org1MSP".to_string(),
            channel_name: "mychannel".to_string(),
            chaincode_name: "provenance".to_string(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with whatever `lookup` returns for each variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(v) = lookup("PEER_ENDPOINT") {
            config.peer_endpoint = v;
        }
        if let Some(v) = lookup("PEER_HOST_ALIAS") {
            config.peer_host_alias = v;
        }
        if let Some(v) = lookup("TLS_CERT_PATH") {
            config.tls_cert_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("CERT_PATH") {
            config.cert_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("KEY_PATH") {
            config.key_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("MSP_ID") {
            config.msp_id = v;
        }
        if let Some(v) = lookup("CHANNEL_NAME") {
            config.channel_name = v;
        }
        if let Some(v) = lookup("CHAINCODE_NAME") {
            config.chaincode_name = v;
        }

        let timeouts = &mut config.timeouts;
        for (var, slot) in [
            ("EVALUATE_TIMEOUT", &mut timeouts.evaluate),
            ("ENDORSE_TIMEOUT", &mut timeouts.endorse),
            ("SUBMIT_TIMEOUT", &mut timeouts.submit),
            ("COMMIT_STATUS_TIMEOUT", &mut timeouts.commit_status),
        ] {
            if let Some(v) = lookup(var) {
                *slot = humantime_serde::parse_duration(&v)
                    .map_err(|e| ConfigError::InvalidTimeout(format!("{var}={v}: {e}")))?;
            }
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("peer_endpoint", &self.peer_endpoint),
            ("peer_host_alias", &self.peer_host_alias),
            ("msp_id", &self.msp_id),
            ("channel_name", &self.channel_name),
            ("chaincode_name", &self.chaincode_name),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Missing(name));
            }
        }
        if self.cert_path.is_some() != self.key_path.is_some() {
            return Err(ConfigError::Invalid(
                "cert_path and key_path must be set together".into(),
            ));
        }
        self.timeouts.validate()
    }
}

/// One deadline per transaction phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    #[serde(with = "humantime_serde")]
    pub evaluate: Duration,
    #[serde(with = "humantime_serde")]
    pub endorse: Duration,
    #[serde(with = "humantime_serde")]
    pub submit: Duration,
    #[serde(with = "humantime_serde")]
    pub commit_status: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            evaluate: Duration::from_secs(5),
            endorse: Duration::from_secs(15),
            submit: Duration::from_secs(5),
            commit_status: Duration::from_secs(60),
        }
    }
}

impl TimeoutConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("evaluate", self.evaluate),
            ("endorse", self.endorse),
            ("submit", self.submit),
            ("commit_status", self.commit_status),
        ] {
            if value.is_zero() {
                return Err(ConfigError::InvalidTimeout(format!("{name} timeout cannot be 0")));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing configuration value: {0}")]
    Missing(&'static str),
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Durations as `"500ms"`, `"5s"`, `"2m"` or plain seconds.
pub mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        // "ms" before "s" and "m".
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid milliseconds")
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid seconds")
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.trim()
                .parse::<u64>()
                .map(|m| Duration::from_secs(m * 60))
                .map_err(|_| "invalid minutes")
        } else {
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid duration format")
        }
    }
}

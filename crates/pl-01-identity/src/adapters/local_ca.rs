//! # Local Certificate Authority
//!
//! In-process CA used by the bundled network and by tests. It keeps a
//! registry of enrollment ids with their one-time secrets and issues
//! Ed25519 certificates signed by its own key.
//!
//! ## Rules
//!
//! - The bootstrap identity is pre-registered as a registrar with unlimited
//!   enrollments.
//! - Only registrars may register identities; the registration must be signed
//!   by a certificate this CA issued.
//! - An affiliation is accepted if it equals a configured affiliation or is a
//!   dotted child of one (`org1.dept1` under `org1`).
//! - Registered identities default to a single enrollment.

use crate::domain::{verify_signature, CaError, Certificate, IdentityRole, KeyPair, TbsCertificate};
use crate::ports::{CertificateAuthority, Enrollment, EnrollmentRequest, SignedRegistration};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct CaConfig {
    pub name: String,
    pub msp_id: String,
    pub bootstrap_id: String,
    pub bootstrap_secret: String,
    pub affiliations: Vec<String>,
    pub certificate_validity: Duration,
}

impl Default for CaConfig {
    fn default() -> Self {
        Self {
            name: "ca.org1.example.com".to_string(),
            msp_id: "Org1MSP".to_string(),
            bootstrap_id: "admin".to_string(),
            bootstrap_secret: "adminpw".to_string(),
            affiliations: vec!["org1".to_string(), "org2".to_string()],
            certificate_validity: Duration::from_secs(365 * 24 * 60 * 60),
        }
    }
}

#[derive(Debug)]
struct RegistryEntry {
    secret: String,
    role: IdentityRole,
    affiliation: String,
    max_enrollments: u32,
    enrollments: u32,
    registrar: bool,
}

pub struct LocalCertificateAuthority {
    config: CaConfig,
    key: KeyPair,
    registry: Mutex<HashMap<String, RegistryEntry>>,
    available: AtomicBool,
}

impl LocalCertificateAuthority {
    pub fn new(config: CaConfig) -> Self {
        let mut registry = HashMap::new();
        registry.insert(
            config.bootstrap_id.clone(),
            RegistryEntry {
                secret: config.bootstrap_secret.clone(),
                role: IdentityRole::Admin,
                affiliation: String::new(),
                max_enrollments: 0,
                enrollments: 0,
                registrar: true,
            },
        );
        Self {
            config,
            key: KeyPair::generate(),
            registry: Mutex::new(registry),
            available: AtomicBool::new(true),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Hex public key that verifies every certificate this CA issues.
    pub fn public_key_hex(&self) -> String {
        self.key.public_key_hex()
    }

    /// Simulate an outage: while unavailable every call fails with `Unreachable`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of certificates issued for `enrollment_id`.
    pub fn enrollment_count(&self, enrollment_id: &str) -> u32 {
        self.registry
            .lock()
            .get(enrollment_id)
            .map_or(0, |entry| entry.enrollments)
    }

    pub fn is_registered(&self, enrollment_id: &str) -> bool {
        self.registry.lock().contains_key(enrollment_id)
    }

    /// Issue a certificate directly, bypassing registration. Used to provision
    /// peer and orderer identities when the network is assembled.
    pub fn issue_node_certificate(
        &self,
        subject: &str,
        role: IdentityRole,
        public_key: &str,
    ) -> Result<String, CaError> {
        self.issue(subject, role, "", public_key)
    }

    fn check_available(&self) -> Result<(), CaError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CaError::Unreachable(self.config.name.clone()))
        }
    }

    fn is_valid_affiliation(&self, affiliation: &str) -> bool {
        self.config.affiliations.iter().any(|known| {
            affiliation == known
                || affiliation
                    .strip_prefix(known.as_str())
                    .is_some_and(|rest| rest.starts_with('.') && rest.len() > 1)
        })
    }

    fn issue(
        &self,
        subject: &str,
        role: IdentityRole,
        affiliation: &str,
        public_key: &str,
    ) -> Result<String, CaError> {
        let now = Utc::now();
        let validity = chrono::Duration::from_std(self.config.certificate_validity)
            .map_err(|e| CaError::InvalidRequest(format!("certificate validity: {e}")))?;
        let tbs = TbsCertificate {
            serial: uuid::Uuid::new_v4().simple().to_string(),
            subject: subject.to_string(),
            issuer: self.config.name.clone(),
            msp_id: self.config.msp_id.clone(),
            role,
            affiliation: affiliation.to_string(),
            public_key: public_key.to_string(),
            not_before: now,
            not_after: now + validity,
        };
        Certificate::issue(tbs, &self.key)
            .and_then(|cert| cert.to_pem())
            .map_err(|e| CaError::InvalidRequest(e.to_string()))
    }
}

#[async_trait]
impl CertificateAuthority for LocalCertificateAuthority {
    async fn register(&self, registration: SignedRegistration) -> Result<String, CaError> {
        self.check_available()?;

        let registrar = Certificate::from_pem(&registration.registrar_certificate)
            .map_err(|e| CaError::InvalidRequest(e.to_string()))?;
        registrar
            .verify(&self.key.public_key_hex(), Utc::now())
            .map_err(|_| CaError::AuthenticationFailed(registrar.subject().to_string()))?;
        let signature = hex::decode(&registration.signature)
            .map_err(|_| CaError::AuthenticationFailed(registrar.subject().to_string()))?;
        registrar
            .verify_holder_signature(&registration.signed_bytes()?, &signature)
            .map_err(|_| CaError::AuthenticationFailed(registrar.subject().to_string()))?;

        let request = &registration.request;
        if request.enrollment_id.trim().is_empty() {
            return Err(CaError::InvalidRequest("enrollment id is empty".into()));
        }
        if !self.is_valid_affiliation(&request.affiliation) {
            return Err(CaError::InvalidAffiliation(request.affiliation.clone()));
        }

        let mut registry = self.registry.lock();
        let is_registrar = registry
            .get(registrar.subject())
            .is_some_and(|entry| entry.registrar);
        if !is_registrar {
            warn!(registrar = registrar.subject(), "Registration refused");
            return Err(CaError::NotRegistrar(registrar.subject().to_string()));
        }
        if registry.contains_key(&request.enrollment_id) {
            return Err(CaError::AlreadyRegistered(request.enrollment_id.clone()));
        }

        let secret = hex::encode(rand::random::<[u8; 16]>());
        registry.insert(
            request.enrollment_id.clone(),
            RegistryEntry {
                secret: secret.clone(),
                role: request.role,
                affiliation: request.affiliation.clone(),
                max_enrollments: request.max_enrollments,
                enrollments: 0,
                registrar: false,
            },
        );
        info!(
            enrollment_id = %request.enrollment_id,
            affiliation = %request.affiliation,
            registrar = registrar.subject(),
            "Registered identity"
        );
        Ok(secret)
    }

    async fn enroll(&self, request: EnrollmentRequest) -> Result<Enrollment, CaError> {
        self.check_available()?;

        let proof = hex::decode(&request.proof_of_possession)
            .map_err(|_| CaError::InvalidRequest("malformed proof of possession".into()))?;
        verify_signature(&request.public_key, request.enrollment_id.as_bytes(), &proof)
            .map_err(|_| CaError::InvalidRequest("proof of possession failed".into()))?;

        let (role, affiliation) = {
            let mut registry = self.registry.lock();
            let entry = registry
                .get_mut(&request.enrollment_id)
                .ok_or_else(|| CaError::UnknownIdentity(request.enrollment_id.clone()))?;
            if entry.secret != request.secret {
                return Err(CaError::AuthenticationFailed(request.enrollment_id.clone()));
            }
            if entry.max_enrollments > 0 && entry.enrollments >= entry.max_enrollments {
                return Err(CaError::EnrollmentLimitReached(request.enrollment_id.clone()));
            }
            entry.enrollments += 1;
            (entry.role, entry.affiliation.clone())
        };

        let certificate = self.issue(&request.enrollment_id, role, &affiliation, &request.public_key)?;
        info!(enrollment_id = %request.enrollment_id, "Enrolled identity");
        Ok(Enrollment {
            certificate,
            ca_name: self.config.name.clone(),
        })
    }

    fn msp_id(&self) -> &str {
        &self.config.msp_id
    }
}

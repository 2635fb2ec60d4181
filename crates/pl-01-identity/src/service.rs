//! Enrollment Manager: turns CA registration and enrollment into stored
//! credentials, idempotently and at most once per label.

use crate::domain::{
    CaError, Credential, IdentityError, IdentityRole, KeyPair, SigningIdentity,
};
use crate::ports::{
    validate_label, CertificateAuthority, CredentialStore, EnrollmentRequest,
    RegistrationRequest, SignedRegistration,
};
use crate::ADMIN_LABEL;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Bootstrap credentials for the administrative identity.
#[derive(Debug, Clone)]
pub struct EnrollmentConfig {
    pub admin_label: String,
    pub admin_enrollment_id: String,
    pub admin_secret: String,
}

impl Default for EnrollmentConfig {
    fn default() -> Self {
        Self {
            admin_label: ADMIN_LABEL.to_string(),
            admin_enrollment_id: "admin".to_string(),
            admin_secret: "adminpw".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentState {
    NoAdmin,
    AdminEnrolled,
    /// Registered with the CA but the enrollment has not completed yet.
    UserRegistered,
    UserEnrolled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// A credential was already stored; the CA was not contacted.
    AlreadyEnrolled,
    Enrolled,
}

pub struct EnrollmentManager<S, C> {
    store: Arc<S>,
    ca: Arc<C>,
    config: EnrollmentConfig,
    /// Per-label single-flight locks.
    locks: DashMap<String, Arc<tokio::sync::Mutex<()>>>,
    /// Secrets of identities registered but not yet enrolled, so a failed
    /// enrollment can be retried without registering twice.
    pending_secrets: Mutex<HashMap<String, String>>,
}

impl<S, C> EnrollmentManager<S, C>
where
    S: CredentialStore + 'static,
    C: CertificateAuthority + 'static,
{
    pub fn new(store: Arc<S>, ca: Arc<C>, config: EnrollmentConfig) -> Self {
        Self {
            store,
            ca,
            config,
            locks: DashMap::new(),
            pending_secrets: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn admin_label(&self) -> &str {
        &self.config.admin_label
    }

    /// Enroll the administrator unless its credential is already stored.
    ///
    /// A CA failure is reported as `IdentityError::Unavailable`.
    #[instrument(skip(self), fields(label = %self.config.admin_label))]
    pub async fn ensure_admin(&self) -> Result<EnsureOutcome, IdentityError> {
        let label = self.config.admin_label.clone();
        validate_label(&label)?;
        let _guard = self.acquire(&label).await;

        if self.store.exists(&label)? {
            debug!("Admin credential already stored");
            return Ok(EnsureOutcome::AlreadyEnrolled);
        }

        let key = KeyPair::generate();
        let request = enrollment_request(&self.config.admin_enrollment_id, &self.config.admin_secret, &key);
        let enrollment = self.ca.enroll(request).await.map_err(|e| {
            error!(error = %e, "Admin enrollment failed");
            IdentityError::unavailable(&label, e.to_string())
        })?;

        self.persist(&label, enrollment.certificate, &key)
    }

    /// Register and enroll `user_id` under `affiliation` unless a credential
    /// for it is already stored. Requires the admin identity.
    #[instrument(skip(self))]
    pub async fn ensure_user(
        &self,
        user_id: &str,
        affiliation: &str,
    ) -> Result<EnsureOutcome, IdentityError> {
        validate_label(user_id)?;
        let _guard = self.acquire(user_id).await;

        if self.store.exists(user_id)? {
            debug!("User credential already stored");
            return Ok(EnsureOutcome::AlreadyEnrolled);
        }

        let admin = self.identity(&self.config.admin_label).map_err(|e| {
            warn!(error = %e, "Cannot register user without admin identity");
            IdentityError::unavailable(user_id, "admin identity is not enrolled")
        })?;

        let pending = self.pending_secrets.lock().get(user_id).cloned();
        let secret = match pending {
            Some(secret) => {
                debug!("Reusing secret from earlier registration");
                secret
            }
            None => {
                let request = RegistrationRequest {
                    enrollment_id: user_id.to_string(),
                    affiliation: affiliation.to_string(),
                    role: IdentityRole::Client,
                    max_enrollments: 1,
                };
                let signed = SignedRegistration::sign(request, &admin)?;
                let secret = self.ca.register(signed).await.map_err(|e| match e {
                    CaError::AlreadyRegistered(_) => IdentityError::unavailable(
                        user_id,
                        "registered with the CA but its secret is not known to this process",
                    ),
                    other => IdentityError::CertificateAuthority(other),
                })?;
                self.pending_secrets
                    .lock()
                    .insert(user_id.to_string(), secret.clone());
                info!("Registered user with CA");
                secret
            }
        };

        let key = KeyPair::generate();
        let enrollment = self
            .ca
            .enroll(enrollment_request(user_id, &secret, &key))
            .await?;
        self.pending_secrets.lock().remove(user_id);

        self.persist(user_id, enrollment.certificate, &key)
    }

    /// Load the signing identity stored under `label`.
    pub fn identity(&self, label: &str) -> Result<SigningIdentity, IdentityError> {
        let credential = self
            .store
            .get(label)?
            .ok_or_else(|| IdentityError::unavailable(label, "no credential stored"))?;
        SigningIdentity::from_credential(label, &credential)
    }

    /// Where `user_id` sits in the enrollment state machine.
    pub fn state(&self, user_id: &str) -> Result<EnrollmentState, IdentityError> {
        if self.store.exists(user_id)? {
            return Ok(EnrollmentState::UserEnrolled);
        }
        if self.pending_secrets.lock().contains_key(user_id) {
            return Ok(EnrollmentState::UserRegistered);
        }
        if self.store.exists(&self.config.admin_label)? {
            Ok(EnrollmentState::AdminEnrolled)
        } else {
            Ok(EnrollmentState::NoAdmin)
        }
    }

    async fn acquire(&self, label: &str) -> LabelGuard<'_> {
        let lock = self
            .locks
            .entry(label.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone();
        LabelGuard {
            locks: &self.locks,
            label: label.to_string(),
            guard: Some(lock.lock_owned().await),
        }
    }

    fn persist(
        &self,
        label: &str,
        certificate: String,
        key: &KeyPair,
    ) -> Result<EnsureOutcome, IdentityError> {
        let credential = Credential::new(certificate, key.to_pem(), self.ca.msp_id());
        SigningIdentity::from_credential(label, &credential)?;

        if self.store.put_if_absent(label, &credential)? {
            info!(label, "Stored new credential");
            Ok(EnsureOutcome::Enrolled)
        } else {
            warn!(label, "Credential appeared concurrently; keeping the stored one");
            Ok(EnsureOutcome::AlreadyEnrolled)
        }
    }
}

fn enrollment_request(enrollment_id: &str, secret: &str, key: &KeyPair) -> EnrollmentRequest {
    EnrollmentRequest {
        enrollment_id: enrollment_id.to_string(),
        secret: secret.to_string(),
        public_key: key.public_key_hex(),
        proof_of_possession: hex::encode(key.sign(enrollment_id.as_bytes())),
    }
}

/// Single-flight lock on one label. The map entry goes away with its last
/// holder or waiter.
struct LabelGuard<'a> {
    locks: &'a DashMap<String, Arc<tokio::sync::Mutex<()>>>,
    label: String,
    guard: Option<tokio::sync::OwnedMutexGuard<()>>,
}

impl Drop for LabelGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        self.locks
            .remove_if(&self.label, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{CaConfig, InMemoryCredentialStore, LocalCertificateAuthority};
    use crate::ports::Enrollment;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    type Manager = EnrollmentManager<InMemoryCredentialStore, LocalCertificateAuthority>;

    fn setup() -> (Arc<Manager>, Arc<LocalCertificateAuthority>, Arc<InMemoryCredentialStore>) {
        let store = Arc::new(InMemoryCredentialStore::new());
        let ca = Arc::new(LocalCertificateAuthority::new(CaConfig::default()));
        let manager = Arc::new(EnrollmentManager::new(
            store.clone(),
            ca.clone(),
            EnrollmentConfig::default(),
        ));
        (manager, ca, store)
    }

    // =========================================================================
    // Admin
    // =========================================================================

    #[tokio::test]
    async fn test_ensure_admin_is_idempotent() {
        let (manager, ca, store) = setup();
        assert_eq!(manager.state("alice").unwrap(), EnrollmentState::NoAdmin);

        assert_eq!(manager.ensure_admin().await.unwrap(), EnsureOutcome::Enrolled);
        assert_eq!(manager.ensure_admin().await.unwrap(), EnsureOutcome::AlreadyEnrolled);
        assert_eq!(ca.enrollment_count("admin"), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(manager.state("alice").unwrap(), EnrollmentState::AdminEnrolled);

        let admin = manager.identity(ADMIN_LABEL).unwrap();
        assert_eq!(admin.msp_id(), "Org1MSP");
    }

    #[tokio::test]
    async fn test_admin_failure_is_unavailable() {
        let (manager, ca, store) = setup();
        ca.set_available(false);

        let err = manager.ensure_admin().await.unwrap_err();
        assert!(matches!(err, IdentityError::Unavailable { .. }));
        assert_eq!(err.code(), shared_types::ErrorCode::IdentityUnavailable);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_admin_wrong_secret_is_unavailable() {
        let store = Arc::new(InMemoryCredentialStore::new());
        let ca = Arc::new(LocalCertificateAuthority::new(CaConfig::default()));
        let config = EnrollmentConfig {
            admin_secret: "not-the-secret".into(),
            ..Default::default()
        };
        let manager = EnrollmentManager::new(store, ca, config);
        assert!(matches!(
            manager.ensure_admin().await,
            Err(IdentityError::Unavailable { .. })
        ));
    }

    // =========================================================================
    // Users
    // =========================================================================

    #[tokio::test]
    async fn test_ensure_user_twice() {
        let (manager, ca, _store) = setup();
        manager.ensure_admin().await.unwrap();

        let first = manager.ensure_user("alice", "org1.dept1").await.unwrap();
        let second = manager.ensure_user("alice", "org1.dept1").await.unwrap();
        assert_eq!(first, EnsureOutcome::Enrolled);
        assert_eq!(second, EnsureOutcome::AlreadyEnrolled);
        assert_eq!(ca.enrollment_count("alice"), 1);
        assert_eq!(manager.state("alice").unwrap(), EnrollmentState::UserEnrolled);

        let alice = manager.identity("alice").unwrap();
        assert_eq!(alice.certificate().tbs.affiliation, "org1.dept1");
    }

    #[tokio::test]
    async fn test_ensure_user_without_admin() {
        let (manager, ca, _store) = setup();
        let err = manager.ensure_user("alice", "org1").await.unwrap_err();
        assert!(matches!(err, IdentityError::Unavailable { .. }));
        assert!(!ca.is_registered("alice"));
    }

    #[tokio::test]
    async fn test_concurrent_ensure_user_enrolls_once() {
        let (manager, ca, _store) = setup();
        manager.ensure_admin().await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = manager.clone();
                tokio::spawn(async move { manager.ensure_user("alice", "org1.dept1").await })
            })
            .collect();

        let mut enrolled = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() == EnsureOutcome::Enrolled {
                enrolled += 1;
            }
        }
        assert_eq!(enrolled, 1);
        assert_eq!(ca.enrollment_count("alice"), 1);
        // Per-label locks do not outlive the calls that took them.
        assert!(manager.locks.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_label_rejected() {
        let (manager, _ca, _store) = setup();
        manager.ensure_admin().await.unwrap();
        assert!(manager.ensure_user("../alice", "org1").await.is_err());
    }

    #[tokio::test]
    async fn test_missing_identity_is_unavailable() {
        let (manager, _ca, _store) = setup();
        assert!(matches!(
            manager.identity("nobody"),
            Err(IdentityError::Unavailable { .. })
        ));
    }

    // =========================================================================
    // Retry after a failed enrollment
    // =========================================================================

    /// Fails the next non-admin enrollment once, after registration succeeded.
    struct FlakyCa {
        inner: LocalCertificateAuthority,
        fail_next_enroll: AtomicBool,
        registrations: AtomicUsize,
    }

    #[async_trait]
    impl CertificateAuthority for FlakyCa {
        async fn register(&self, registration: SignedRegistration) -> Result<String, CaError> {
            self.registrations.fetch_add(1, Ordering::SeqCst);
            self.inner.register(registration).await
        }

        async fn enroll(&self, request: EnrollmentRequest) -> Result<Enrollment, CaError> {
            if request.enrollment_id != "admin" && self.fail_next_enroll.swap(false, Ordering::SeqCst) {
                return Err(CaError::Unreachable("flaky".into()));
            }
            self.inner.enroll(request).await
        }

        fn msp_id(&self) -> &str {
            self.inner.msp_id()
        }
    }

    #[tokio::test]
    async fn test_retry_reuses_registration() {
        let ca = Arc::new(FlakyCa {
            inner: LocalCertificateAuthority::new(CaConfig::default()),
            fail_next_enroll: AtomicBool::new(true),
            registrations: AtomicUsize::new(0),
        });
        let manager = EnrollmentManager::new(
            Arc::new(InMemoryCredentialStore::new()),
            ca.clone(),
            EnrollmentConfig::default(),
        );
        manager.ensure_admin().await.unwrap();

        let err = manager.ensure_user("bob", "org2").await.unwrap_err();
        assert_eq!(err.code(), shared_types::ErrorCode::IdentityUnavailable);
        assert_eq!(manager.state("bob").unwrap(), EnrollmentState::UserRegistered);

        assert_eq!(manager.ensure_user("bob", "org2").await.unwrap(), EnsureOutcome::Enrolled);
        assert_eq!(ca.registrations.load(Ordering::SeqCst), 1);
        assert_eq!(ca.inner.enrollment_count("bob"), 1);
    }
}

//! # Enrollment and Session Identity
//!
//! Admin and user enrollment against the local CA, and what the network
//! does with identities it did or did not issue.

#[cfg(test)]
mod tests {
    use crate::scenarios::harness::{document_input, LedgerOptions, TestLedger};
    use pl_01_identity::{
        CaConfig, Credential, CredentialStore, EnrollmentConfig, EnrollmentManager,
        EnrollmentState, EnsureOutcome, FileSystemCredentialStore, IdentityRole, KeyPair,
        LocalCertificateAuthority, SigningIdentity,
    };
    use pl_05_provenance_service::ProvenanceService;
    use shared_types::ErrorCode;
    use std::sync::Arc;

    type Manager = EnrollmentManager<FileSystemCredentialStore, LocalCertificateAuthority>;

    fn manager(dir: &std::path::Path, ca: Arc<LocalCertificateAuthority>) -> Manager {
        let store = FileSystemCredentialStore::open(dir.join("wallet")).unwrap();
        EnrollmentManager::new(Arc::new(store), ca, EnrollmentConfig::default())
    }

    // =============================================================================
    // ENROLLMENT
    // =============================================================================

    #[tokio::test]
    async fn test_ensure_user_twice_enrolls_once() {
        let dir = tempfile::tempdir().unwrap();
        let ca = Arc::new(LocalCertificateAuthority::new(CaConfig::default()));
        let manager = manager(dir.path(), ca.clone());

        assert_eq!(manager.state("alice").unwrap(), EnrollmentState::NoAdmin);
        assert_eq!(manager.ensure_admin().await.unwrap(), EnsureOutcome::Enrolled);
        assert_eq!(manager.state("alice").unwrap(), EnrollmentState::AdminEnrolled);

        let first = manager.ensure_user("alice", "org1.dept1").await.unwrap();
        let second = manager.ensure_user("alice", "org1.dept1").await.unwrap();
        assert_eq!(first, EnsureOutcome::Enrolled);
        assert_eq!(second, EnsureOutcome::AlreadyEnrolled);
        assert_eq!(ca.enrollment_count("alice"), 1);
        assert_eq!(manager.state("alice").unwrap(), EnrollmentState::UserEnrolled);

        let identity = manager.identity("alice").unwrap();
        assert_eq!(identity.msp_id(), "Org1MSP");
        assert!(dir.path().join("wallet").join("alice.id").exists());
    }

    #[tokio::test]
    async fn test_concurrent_ensure_user_enrolls_once() {
        let dir = tempfile::tempdir().unwrap();
        let ca = Arc::new(LocalCertificateAuthority::new(CaConfig::default()));
        let manager = manager(dir.path(), ca.clone());
        manager.ensure_admin().await.unwrap();

        let (a, b) = tokio::join!(
            manager.ensure_user("alice", "org1.dept1"),
            manager.ensure_user("alice", "org1.dept1")
        );
        let mut outcomes = vec![a.unwrap(), b.unwrap()];
        outcomes.sort_by_key(|o| *o == EnsureOutcome::Enrolled);
        assert_eq!(
            outcomes,
            vec![EnsureOutcome::AlreadyEnrolled, EnsureOutcome::Enrolled]
        );
        assert_eq!(ca.enrollment_count("alice"), 1);
    }

    #[tokio::test]
    async fn test_wallet_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let ca = Arc::new(LocalCertificateAuthority::new(CaConfig::default()));
        {
            let manager = manager(dir.path(), ca.clone());
            manager.ensure_admin().await.unwrap();
            manager.ensure_user("alice", "org1.dept1").await.unwrap();
        }

        let reopened = manager(dir.path(), ca.clone());
        assert_eq!(
            reopened.ensure_user("alice", "org1.dept1").await.unwrap(),
            EnsureOutcome::AlreadyEnrolled
        );
        assert_eq!(
            reopened.store().list().unwrap(),
            vec!["admin".to_string(), "alice".to_string()]
        );
        assert_eq!(ca.enrollment_count("alice"), 1);
    }

    #[tokio::test]
    async fn test_user_requires_admin() {
        let dir = tempfile::tempdir().unwrap();
        let ca = Arc::new(LocalCertificateAuthority::new(CaConfig::default()));
        let manager = manager(dir.path(), ca.clone());

        let err = manager.ensure_user("alice", "org1.dept1").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::IdentityUnavailable);
        assert!(!ca.is_registered("alice"));
    }

    #[tokio::test]
    async fn test_ca_outage_then_recovery() {
        let dir = tempfile::tempdir().unwrap();
        let ca = Arc::new(LocalCertificateAuthority::new(CaConfig::default()));
        let manager = manager(dir.path(), ca.clone());

        ca.set_available(false);
        let err = manager.ensure_admin().await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::IdentityUnavailable);
        assert!(!manager.store().exists("admin").unwrap());

        ca.set_available(true);
        assert_eq!(manager.ensure_admin().await.unwrap(), EnsureOutcome::Enrolled);
    }

    // =============================================================================
    // SESSION IDENTITY
    // =============================================================================

    #[tokio::test]
    async fn test_enrolled_user_transacts() {
        let ledger = TestLedger::start_with(LedgerOptions {
            user: "alice".into(),
            ..LedgerOptions::default()
        })
        .await;
        assert_eq!(ledger.gateway().identity().label(), "alice");

        let stored = ledger
            .service()
            .store_document(document_input("doc-1", "proj-1", "permit"))
            .await
            .unwrap();
        assert_eq!(stored.document_id, "doc-1");

        ledger.shutdown().await;
    }

    #[tokio::test]
    async fn test_identity_from_foreign_ca_is_rejected() {
        let ledger = TestLedger::start().await;

        let foreign_ca = LocalCertificateAuthority::new(CaConfig::default());
        let key = KeyPair::generate();
        let pem = foreign_ca
            .issue_node_certificate("mallory", IdentityRole::Client, &key.public_key_hex())
            .unwrap();
        let identity = SigningIdentity::from_credential(
            "mallory",
            &Credential::new(pem, key.to_pem(), "Org1MSP"),
        )
        .unwrap();

        let gateway = ledger.connect(identity).await.unwrap();
        let contract = gateway.network("mychannel").contract("provenance");
        let service = ProvenanceService::new(Arc::new(contract));

        let before = ledger.heights();
        let err = service.get_all_documents().await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::IdentityUnavailable);
        let err = service
            .store_document(document_input("doc-1", "proj-1", "permit"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::IdentityUnavailable);
        assert_eq!(ledger.heights(), before);

        gateway.close().await;
        ledger.shutdown().await;
    }

    #[tokio::test]
    async fn test_closed_session_refuses_calls() {
        let ledger = TestLedger::start().await;
        let contract = ledger.contract().clone();

        ledger.shutdown().await;

        let err = contract
            .evaluate_transaction("GetAllDocuments", &[])
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Transport);
    }
}

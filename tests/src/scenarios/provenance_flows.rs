//! # Provenance Flows
//!
//! Store, read and query records through the full stack: service → gateway
//! session → endorsing peers → orderer → committers.

#[cfg(test)]
mod tests {
    use crate::scenarios::harness::{document_input, progress_input, LedgerOptions, TestLedger};
    use chrono::{DateTime, Utc};
    use pl_03_ledger_network::{OrdererConfig, TxValidationCode};
    use pl_04_gateway::TimeoutConfig;
    use pl_05_provenance_service::{ProgressUpdateInput, ServiceError};
    use serde_json::json;
    use shared_types::{Document, ErrorCode, ProgressUpdate, QueryRecord};
    use std::collections::BTreeSet;
    use std::time::Duration;

    fn progress_ids(records: &[QueryRecord<ProgressUpdate>]) -> BTreeSet<String> {
        records.iter().map(|r| r.record.progress_id.clone()).collect()
    }

    fn document_ids(records: &[QueryRecord<Document>]) -> BTreeSet<String> {
        records.iter().map(|r| r.record.document_id.clone()).collect()
    }

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    // =============================================================================
    // STORE AND READ BACK
    // =============================================================================

    #[tokio::test]
    async fn test_progress_update_lifecycle() {
        let ledger = TestLedger::start().await;
        let service = ledger.service();

        let input = ProgressUpdateInput {
            milestone_id: Some("m-3".into()),
            description: "foundation poured".into(),
            metadata: Some(json!({"floor": 3})),
            ..progress_input("pg-1", "proj-1", "unit-5")
        };
        let stored = service.store_progress_update(input).await.unwrap();
        assert_eq!(stored.doc_type, "progressUpdate");
        assert_eq!(stored.milestone_id.as_deref(), Some("m-3"));
        assert_eq!(stored.metadata, json!({"floor": 3}));

        let fetched = service.get_progress_update("pg-1").await.unwrap();
        assert_eq!(fetched, stored);
        assert!(service.progress_update_exists("pg-1").await.unwrap());
        assert!(!service.progress_update_exists("pg-2").await.unwrap());

        let by_property = service.query_progress_updates_by_property("unit-5").await.unwrap();
        assert_eq!(by_property.len(), 1);
        assert_eq!(by_property[0].record, stored);

        ledger.shutdown().await;
    }

    #[tokio::test]
    async fn test_foundation_poured_scenario() {
        let ledger = TestLedger::start().await;
        let service = ledger.service();

        let input = ProgressUpdateInput {
            progress_id: "pg-1".into(),
            project_id: "proj-1".into(),
            property_id: "unit-5".into(),
            milestone_id: None,
            content_hash: "Qm123".into(),
            description: "Foundation poured".into(),
            uploaded_by: "u1".into(),
            timestamp: Some("2024-01-01T00:00:00Z".into()),
            metadata: None,
        };
        service.store_progress_update(input).await.unwrap();

        let fetched = service.get_progress_update("pg-1").await.unwrap();
        assert_eq!(fetched.progress_id, "pg-1");
        assert_eq!(fetched.project_id, "proj-1");
        assert_eq!(fetched.property_id, "unit-5");
        assert_eq!(fetched.milestone_id, None);
        assert_eq!(fetched.content_hash, "Qm123");
        assert_eq!(fetched.description, "Foundation poured");
        assert_eq!(fetched.uploaded_by, "u1");
        assert_eq!(fetched.timestamp, "2024-01-01T00:00:00Z");
        assert_eq!(fetched.metadata, json!({}));

        let results = service.query_progress_updates_by_property("unit-5").await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].key.contains("unit-5"));
        assert!(results[0].key.contains("pg-1"));
        assert_eq!(results[0].record, fetched);

        ledger.shutdown().await;
    }

    #[tokio::test]
    async fn test_every_peer_commits_the_same_chain() {
        let ledger = TestLedger::start().await;
        let before = ledger.heights();

        ledger
            .service()
            .store_document(document_input("doc-1", "proj-1", "permit"))
            .await
            .unwrap();

        let after = ledger.heights();
        assert_eq!(after.len(), 2);
        assert!(after.iter().zip(&before).all(|(a, b)| a > b));
        assert_eq!(after[0], after[1]);

        let hashes: Vec<_> = (0..2)
            .map(|i| ledger.network().committer(i).unwrap().blocks().last_hash())
            .collect();
        assert_eq!(hashes[0], hashes[1]);

        ledger.shutdown().await;
    }

    #[tokio::test]
    async fn test_duplicate_store_keeps_first_record() {
        let ledger = TestLedger::start().await;
        let service = ledger.service();

        let first = service
            .store_progress_update(progress_input("pg-1", "proj-1", "unit-5"))
            .await
            .unwrap();

        let second = ProgressUpdateInput {
            description: "overwritten?".into(),
            ..progress_input("pg-1", "proj-1", "unit-5")
        };
        let err = service.store_progress_update(second).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::AlreadyExists);
        assert!(!err.is_retryable());

        let fetched = service.get_progress_update("pg-1").await.unwrap();
        assert_eq!(fetched.description, first.description);

        ledger.shutdown().await;
    }

    #[tokio::test]
    async fn test_missing_timestamp_is_filled_in() {
        let ledger = TestLedger::start().await;

        let input = ProgressUpdateInput {
            timestamp: None,
            ..progress_input("pg-1", "proj-1", "unit-5")
        };
        let stored = ledger.service().store_progress_update(input).await.unwrap();
        assert!(DateTime::parse_from_rfc3339(&stored.timestamp).is_ok());
        assert!(stored.created_at <= Utc::now());

        ledger.shutdown().await;
    }

    // =============================================================================
    // QUERIES
    // =============================================================================

    #[tokio::test]
    async fn test_progress_queries_by_property_and_project() {
        let ledger = TestLedger::start().await;
        let service = ledger.service();

        for (id, project, property) in [
            ("pg-1", "proj-1", "unit-5"),
            ("pg-2", "proj-1", "unit-5"),
            ("pg-3", "proj-1", "unit-6"),
            ("pg-4", "proj-2", "unit-5"),
        ] {
            service
                .store_progress_update(progress_input(id, project, property))
                .await
                .unwrap();
        }

        let by_property = service.query_progress_updates_by_property("unit-5").await.unwrap();
        assert_eq!(progress_ids(&by_property), set(&["pg-1", "pg-2", "pg-4"]));

        let by_project = service.query_progress_updates_by_project("proj-1").await.unwrap();
        assert_eq!(progress_ids(&by_project), set(&["pg-1", "pg-2", "pg-3"]));
        assert!(by_project.iter().all(|r| r.record.project_id == "proj-1"));

        assert!(service
            .query_progress_updates_by_property("unit-404")
            .await
            .unwrap()
            .is_empty());

        let all = service.get_all_progress_updates().await.unwrap();
        assert_eq!(all.len(), 4);

        ledger.shutdown().await;
    }

    #[tokio::test]
    async fn test_document_queries() {
        let ledger = TestLedger::start().await;
        let service = ledger.service();

        for (id, project, doc_type) in [
            ("doc-1", "proj-1", "permit"),
            ("doc-2", "proj-1", "invoice"),
            ("doc-3", "proj-2", "permit"),
        ] {
            service
                .store_document(document_input(id, project, doc_type))
                .await
                .unwrap();
        }

        let permits = service.query_documents_by_type("permit").await.unwrap();
        assert_eq!(document_ids(&permits), set(&["doc-1", "doc-3"]));
        let proj_1 = service.query_documents_by_project("proj-1").await.unwrap();
        assert_eq!(document_ids(&proj_1), set(&["doc-1", "doc-2"]));
        assert_eq!(service.get_all_documents().await.unwrap().len(), 3);
        assert!(service.get_all_progress_updates().await.unwrap().is_empty());

        ledger.shutdown().await;
    }

    // =============================================================================
    // VALIDATION
    // =============================================================================

    #[tokio::test]
    async fn test_invalid_input_changes_nothing() {
        let ledger = TestLedger::start().await;
        let service = ledger.service();
        let before = ledger.heights();

        let empty_description = ProgressUpdateInput {
            description: String::new(),
            ..progress_input("pg-1", "proj-1", "unit-5")
        };
        let err = service.store_progress_update(empty_description).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Validation);

        let missing_hash = ProgressUpdateInput {
            content_hash: String::new(),
            ..progress_input("pg-1", "proj-1", "unit-5")
        };
        let err = service.store_progress_update(missing_hash).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Validation);

        let bad_timestamp = ProgressUpdateInput {
            timestamp: Some("yesterday".into()),
            ..progress_input("pg-2", "proj-1", "unit-5")
        };
        let err = service.store_progress_update(bad_timestamp).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Validation);

        assert_eq!(
            service.get_progress_update(" ").await.unwrap_err().code(),
            ErrorCode::Validation
        );
        assert_eq!(
            service.get_progress_update("pg-1").await.unwrap_err().code(),
            ErrorCode::NotFound
        );

        assert_eq!(ledger.heights(), before);
        assert!(service.get_all_progress_updates().await.unwrap().is_empty());

        ledger.shutdown().await;
    }

    #[tokio::test]
    async fn test_contract_rejects_invalid_args_during_endorsement() {
        let ledger = TestLedger::start().await;
        let before = ledger.heights();

        // Bypass the service so the contract sees the bad request itself.
        let args: Vec<String> = [
            "pg-1", "proj-1", "unit-5", "", "", "desc", "alice", "2024-01-01T00:00:00Z", "{}",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let err = ledger
            .contract()
            .submit_transaction("StoreProgressUpdate", &args)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Validation);
        assert!(!err.requires_reconciliation());
        assert_eq!(ledger.heights(), before);

        ledger.shutdown().await;
    }

    // =============================================================================
    // COMMIT STATUS
    // =============================================================================

    #[tokio::test]
    async fn test_submit_async_then_commit_status() {
        let ledger = TestLedger::start().await;

        let args = document_input("doc-7", "proj-1", "permit")
            .into_request(Utc::now())
            .to_args();
        let submitted = ledger
            .contract()
            .submit_async("StoreDocument", &args)
            .await
            .unwrap();

        let status = ledger.service().commit_status(&submitted.tx_id).await.unwrap();
        assert!(status.valid);
        assert_eq!(status.code, TxValidationCode::Valid);
        assert_eq!(status.event.as_deref(), Some("DocumentStored"));

        for i in 0..2 {
            let recorded = ledger
                .network()
                .committer(i)
                .unwrap()
                .tx_status(&submitted.tx_id)
                .unwrap();
            assert_eq!(recorded.block_number, status.block_number);
        }
        assert!(ledger.service().document_exists("doc-7").await.unwrap());

        ledger.shutdown().await;
    }

    #[tokio::test]
    async fn test_commit_timeout_is_reconciled() {
        let mut options = LedgerOptions::default();
        options.network.orderer = OrdererConfig {
            batch_timeout: Duration::from_millis(500),
            ..OrdererConfig::default()
        };
        // Ordering acknowledges once the block is cut, so the submit deadline
        // expires while the envelope waits in the batch.
        options.timeouts = TimeoutConfig {
            submit: Duration::from_millis(50),
            ..TimeoutConfig::default()
        };
        let ledger = TestLedger::start_with(options).await;
        let service = ledger.service();

        let err = service
            .store_document(document_input("doc-8", "proj-1", "permit"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Timeout);
        assert!(err.requires_reconciliation());
        let tx_id = match &err {
            ServiceError::Timeout { tx_id: Some(id), .. } => id.clone(),
            other => panic!("expected a timeout naming the transaction, got {other:?}"),
        };
        assert!(err.to_string().contains(&tx_id));

        // The block is cut once the batch timeout elapses.
        tokio::time::sleep(Duration::from_millis(700)).await;
        let status = service.commit_status(&tx_id).await.unwrap();
        assert!(status.valid);
        let stored = service.get_document("doc-8").await.unwrap();
        assert_eq!(stored.document_type, "permit");

        ledger.shutdown().await;
    }

    #[tokio::test]
    async fn test_unknown_transaction_status_times_out() {
        let options = LedgerOptions {
            timeouts: TimeoutConfig {
                commit_status: Duration::from_millis(50),
                ..TimeoutConfig::default()
            },
            ..LedgerOptions::default()
        };
        let ledger = TestLedger::start_with(options).await;

        let err = ledger.service().commit_status("no-such-tx").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Timeout);
        assert_eq!(
            ledger.service().commit_status("").await.unwrap_err().code(),
            ErrorCode::Validation
        );

        ledger.shutdown().await;
    }
}

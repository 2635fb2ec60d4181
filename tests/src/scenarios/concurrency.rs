//! # Concurrent Writers
//!
//! Stores racing on one id must leave exactly one record, and the loser
//! must learn why. Stores on distinct ids must not interfere.

#[cfg(test)]
mod tests {
    use crate::scenarios::harness::{document_input, TestLedger};
    use futures::future::join_all;
    use pl_05_provenance_service::DocumentInput;
    use shared_types::ErrorCode;

    // =============================================================================
    // SAME ID
    // =============================================================================

    #[tokio::test]
    async fn test_concurrent_store_same_document() {
        let ledger = TestLedger::start().await;
        let service = ledger.service();

        let first = DocumentInput {
            document_name: "site-plan-a.pdf".into(),
            ..document_input("doc-9", "proj-1", "plan")
        };
        let second = DocumentInput {
            document_name: "site-plan-b.pdf".into(),
            ..document_input("doc-9", "proj-1", "plan")
        };

        let (a, b) = tokio::join!(service.store_document(first), service.store_document(second));
        let (winner, loser) = match (a, b) {
            (Ok(doc), Err(err)) | (Err(err), Ok(doc)) => (doc, err),
            (a, b) => panic!("expected exactly one winner, got {a:?} and {b:?}"),
        };
        assert!(
            matches!(loser.code(), ErrorCode::AlreadyExists | ErrorCode::WriteConflict),
            "unexpected loser error: {loser:?}"
        );

        let stored = ledger.service().get_document("doc-9").await.unwrap();
        assert_eq!(stored.document_name, winner.document_name);
        assert_eq!(
            ledger.service().query_documents_by_project("proj-1").await.unwrap().len(),
            1
        );

        ledger.shutdown().await;
    }

    #[tokio::test]
    async fn test_write_conflict_is_retryable_and_resolves_to_already_exists() {
        let ledger = TestLedger::start().await;
        let service = ledger.service();

        let input = document_input("doc-10", "proj-1", "plan");
        let (a, b) = tokio::join!(
            service.store_document(input.clone()),
            service.store_document(input.clone())
        );
        let loser = match (a, b) {
            (Ok(_), Err(err)) | (Err(err), Ok(_)) => err,
            (a, b) => panic!("expected exactly one winner, got {a:?} and {b:?}"),
        };

        if loser.code() == ErrorCode::WriteConflict {
            assert!(loser.is_retryable());
            // Retrying now sees the committed record.
            let retry = service.store_document(input).await.unwrap_err();
            assert_eq!(retry.code(), ErrorCode::AlreadyExists);
        } else {
            assert_eq!(loser.code(), ErrorCode::AlreadyExists);
        }

        ledger.shutdown().await;
    }

    // =============================================================================
    // DISTINCT IDS
    // =============================================================================

    #[tokio::test]
    async fn test_concurrent_distinct_documents_all_commit() {
        let ledger = TestLedger::start().await;
        let service = ledger.service();

        let inputs: Vec<_> = (0..8)
            .map(|i| document_input(&format!("doc-{i}"), "proj-1", "photo"))
            .collect();
        let results = join_all(inputs.into_iter().map(|input| service.store_document(input))).await;
        assert!(results.iter().all(Result::is_ok), "{results:?}");

        let photos = service.query_documents_by_type("photo").await.unwrap();
        assert_eq!(photos.len(), 8);

        ledger.shutdown().await;
    }
}

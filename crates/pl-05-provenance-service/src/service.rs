//! # Provenance Service
//!
//! Validates input once, calls the ledger through a `LedgerClient`, decodes
//! the JSON result. `handle` wraps every operation in an `ApiResponse`.

use crate::domain::{Command, DocumentInput, ProgressUpdateInput, ServiceError};
use crate::ports::{LedgerClient, SystemTimeSource, TimeSource};
use pl_02_ledger_store::ContractFunction;
use pl_03_ledger_network::TxValidationCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::{ApiResponse, Document, ErrorBody, ProgressUpdate, QueryRecord};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Commit outcome reported to a caller reconciling a submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionStatus {
    pub tx_id: String,
    pub block_number: u64,
    pub valid: bool,
    pub code: TxValidationCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
}

pub struct ProvenanceService<C> {
    client: Arc<C>,
    clock: Arc<dyn TimeSource>,
}

impl<C: LedgerClient> ProvenanceService<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self::with_clock(client, Arc::new(SystemTimeSource))
    }

    pub fn with_clock(client: Arc<C>, clock: Arc<dyn TimeSource>) -> Self {
        Self { client, clock }
    }

    // =========================================================================
    // Submit
    // =========================================================================

    #[instrument(skip(self, input), fields(progress_id = %input.progress_id))]
    pub async fn store_progress_update(
        &self,
        input: ProgressUpdateInput,
    ) -> Result<ProgressUpdate, ServiceError> {
        let request = input.into_request(self.clock.now());
        request.validate()?;
        let payload = self
            .client
            .submit(ContractFunction::StoreProgressUpdate, request.to_args())
            .await?;
        let record: ProgressUpdate = decode(&payload)?;
        info!(progress_id = %record.progress_id, property_id = %record.property_id, "Progress update stored");
        Ok(record)
    }

    #[instrument(skip(self, input), fields(document_id = %input.document_id))]
    pub async fn store_document(&self, input: DocumentInput) -> Result<Document, ServiceError> {
        let request = input.into_request(self.clock.now());
        request.validate()?;
        let payload = self
            .client
            .submit(ContractFunction::StoreDocument, request.to_args())
            .await?;
        let record: Document = decode(&payload)?;
        info!(document_id = %record.document_id, document_type = %record.document_type, "Document stored");
        Ok(record)
    }

    /// Outcome of an earlier submit, e.g. after a timeout.
    pub async fn commit_status(&self, tx_id: &str) -> Result<TransactionStatus, ServiceError> {
        let tx_id = require("txId", tx_id)?;
        let status = self.client.commit_status(tx_id).await?;
        Ok(TransactionStatus {
            valid: status.is_valid(),
            tx_id: status.tx_id,
            block_number: status.block_number,
            code: status.code,
            event: status.event.map(|e| e.event_name),
        })
    }

    // =========================================================================
    // Evaluate
    // =========================================================================

    pub async fn get_progress_update(&self, progress_id: &str) -> Result<ProgressUpdate, ServiceError> {
        self.lookup(ContractFunction::GetProgressUpdate, "progressId", progress_id)
            .await
    }

    pub async fn get_document(&self, document_id: &str) -> Result<Document, ServiceError> {
        self.lookup(ContractFunction::GetDocument, "documentId", document_id)
            .await
    }

    pub async fn progress_update_exists(&self, progress_id: &str) -> Result<bool, ServiceError> {
        self.lookup(ContractFunction::ProgressUpdateExists, "progressId", progress_id)
            .await
    }

    pub async fn document_exists(&self, document_id: &str) -> Result<bool, ServiceError> {
        self.lookup(ContractFunction::DocumentExists, "documentId", document_id)
            .await
    }

    pub async fn query_progress_updates_by_property(
        &self,
        property_id: &str,
    ) -> Result<Vec<QueryRecord<ProgressUpdate>>, ServiceError> {
        self.lookup(
            ContractFunction::QueryProgressUpdatesByProperty,
            "propertyId",
            property_id,
        )
        .await
    }

    pub async fn query_progress_updates_by_project(
        &self,
        project_id: &str,
    ) -> Result<Vec<QueryRecord<ProgressUpdate>>, ServiceError> {
        self.lookup(
            ContractFunction::QueryProgressUpdatesByProject,
            "projectId",
            project_id,
        )
        .await
    }

    pub async fn query_documents_by_project(
        &self,
        project_id: &str,
    ) -> Result<Vec<QueryRecord<Document>>, ServiceError> {
        self.lookup(ContractFunction::QueryDocumentsByProject, "projectId", project_id)
            .await
    }

    pub async fn query_documents_by_type(
        &self,
        document_type: &str,
    ) -> Result<Vec<QueryRecord<Document>>, ServiceError> {
        self.lookup(ContractFunction::QueryDocumentsByType, "documentType", document_type)
            .await
    }

    pub async fn get_all_progress_updates(
        &self,
    ) -> Result<Vec<QueryRecord<ProgressUpdate>>, ServiceError> {
        let payload = self
            .client
            .evaluate(ContractFunction::GetAllProgressUpdates, Vec::new())
            .await?;
        decode(&payload)
    }

    pub async fn get_all_documents(&self) -> Result<Vec<QueryRecord<Document>>, ServiceError> {
        let payload = self
            .client
            .evaluate(ContractFunction::GetAllDocuments, Vec::new())
            .await?;
        decode(&payload)
    }

    async fn lookup<T: DeserializeOwned>(
        &self,
        function: ContractFunction,
        name: &str,
        value: &str,
    ) -> Result<T, ServiceError> {
        let value = require(name, value)?;
        let payload = self
            .client
            .evaluate(function, vec![value.to_string()])
            .await?;
        debug!(%function, bytes = payload.len(), "Evaluated");
        decode(&payload)
    }

    // =========================================================================
    // Command dispatch
    // =========================================================================

    /// Parse one JSON command and run it.
    pub async fn handle_json(&self, line: &str) -> ApiResponse<Value> {
        match serde_json::from_str::<Command>(line) {
            Ok(command) => self.handle(command).await,
            Err(e) => ApiResponse::err(ErrorBody::from(ServiceError::Validation(format!(
                "invalid command: {e}"
            )))),
        }
    }

    pub async fn handle(&self, command: Command) -> ApiResponse<Value> {
        let result = match command {
            Command::StoreProgressUpdate(input) => to_value(self.store_progress_update(input).await),
            Command::StoreDocument(input) => to_value(self.store_document(input).await),
            Command::GetProgressUpdate { progress_id } => {
                to_value(self.get_progress_update(&progress_id).await)
            }
            Command::GetDocument { document_id } => to_value(self.get_document(&document_id).await),
            Command::ProgressUpdateExists { progress_id } => {
                to_value(self.progress_update_exists(&progress_id).await)
            }
            Command::DocumentExists { document_id } => {
                to_value(self.document_exists(&document_id).await)
            }
            Command::QueryProgressUpdatesByProperty { property_id } => {
                to_value(self.query_progress_updates_by_property(&property_id).await)
            }
            Command::QueryProgressUpdatesByProject { project_id } => {
                to_value(self.query_progress_updates_by_project(&project_id).await)
            }
            Command::QueryDocumentsByProject { project_id } => {
                to_value(self.query_documents_by_project(&project_id).await)
            }
            Command::QueryDocumentsByType { document_type } => {
                to_value(self.query_documents_by_type(&document_type).await)
            }
            Command::GetAllProgressUpdates => to_value(self.get_all_progress_updates().await),
            Command::GetAllDocuments => to_value(self.get_all_documents().await),
            Command::CommitStatus { tx_id } => to_value(self.commit_status(&tx_id).await),
        };
        if let Err(e) = &result {
            if e.code().is_caller_fault() {
                debug!(code = %e.code(), error = %e, "Request rejected");
            } else {
                warn!(
                    code = %e.code(),
                    retryable = e.is_retryable(),
                    reconcile = e.requires_reconciliation(),
                    error = %e,
                    "Request failed"
                );
            }
        }
        ApiResponse::from_result(result)
    }
}

/// Ids are opaque: whitespace-only is rejected, anything else is passed through
/// unchanged so reads address exactly the key the write stored.
fn require<'a>(name: &str, value: &'a str) -> Result<&'a str, ServiceError> {
    if value.trim().is_empty() {
        Err(ServiceError::Validation(format!("{name} is required")))
    } else {
        Ok(value)
    }
}

fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T, ServiceError> {
    serde_json::from_slice(payload)
        .map_err(|e| ServiceError::Internal(format!("undecodable contract response: {e}")))
}

fn to_value<T: Serialize>(result: Result<T, ServiceError>) -> Result<Value, ServiceError> {
    result.and_then(|data| {
        serde_json::to_value(data).map_err(|e| ServiceError::Internal(e.to_string()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use parking_lot::Mutex;
    use pl_02_ledger_store::{
        InMemoryWorldState, ProvenanceContract, TxContext, TxSimulator, UpdateBatch, Version,
        WorldState,
    };
    use pl_03_ledger_network::CommitStatus;
    use pl_04_gateway::{GatewayError, Phase};
    use serde_json::json;
    use shared_types::ErrorCode;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    // =========================================================================
    // Fake ledger: runs the contract against an in-memory world state and
    // commits each submit as its own block.
    // =========================================================================

    struct FakeLedger {
        state: Arc<InMemoryWorldState>,
        contract: ProvenanceContract,
        blocks: AtomicU64,
        submits: AtomicUsize,
        failures: Mutex<VecDeque<GatewayError>>,
    }

    impl FakeLedger {
        fn new() -> Self {
            Self {
                state: Arc::new(InMemoryWorldState::new()),
                contract: ProvenanceContract::new(),
                blocks: AtomicU64::new(0),
                submits: AtomicUsize::new(0),
                failures: Mutex::new(VecDeque::new()),
            }
        }

        fn fail_next(&self, err: GatewayError) {
            self.failures.lock().push_back(err);
        }

        fn run(
            &self,
            function: ContractFunction,
            args: &[String],
        ) -> Result<(TxSimulator, Vec<u8>), GatewayError> {
            if let Some(err) = self.failures.lock().pop_front() {
                return Err(err);
            }
            let simulator = TxSimulator::new(
                self.state.clone(),
                TxContext {
                    channel_id: "mychannel".into(),
                    chaincode_name: "provenance".into(),
                    tx_id: format!("tx{}", self.blocks.load(Ordering::SeqCst)),
                    creator_msp_id: "Org1MSP".into(),
                    timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
                },
            );
            let payload = self
                .contract
                .invoke(&simulator, function.name(), args)
                .map_err(|e| GatewayError::Contract(e.into()))?;
            Ok((simulator, payload))
        }
    }

    #[async_trait]
    impl LedgerClient for FakeLedger {
        async fn submit(
            &self,
            function: ContractFunction,
            args: Vec<String>,
        ) -> Result<Vec<u8>, GatewayError> {
            self.submits.fetch_add(1, Ordering::SeqCst);
            let (simulator, payload) = self.run(function, &args)?;
            let block = self.blocks.fetch_add(1, Ordering::SeqCst) + 1;
            let version = Version::new(block, 0);
            let mut batch = UpdateBatch::new();
            for write in simulator.into_results().rwset.writes {
                batch.put(write.key, write.value, version);
            }
            self.state.apply(batch, version).unwrap();
            Ok(payload)
        }

        async fn evaluate(
            &self,
            function: ContractFunction,
            args: Vec<String>,
        ) -> Result<Vec<u8>, GatewayError> {
            self.run(function, &args).map(|(_, payload)| payload)
        }

        async fn commit_status(&self, tx_id: &str) -> Result<CommitStatus, GatewayError> {
            Err(GatewayError::Timeout {
                phase: Phase::CommitStatus,
                tx_id: Some(tx_id.to_string()),
            })
        }
    }

    struct FixedClock(DateTime<Utc>);

    impl TimeSource for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn service() -> (ProvenanceService<FakeLedger>, Arc<FakeLedger>) {
        let ledger = Arc::new(FakeLedger::new());
        let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 6, 1, 11, 59, 0).unwrap()));
        (ProvenanceService::with_clock(ledger.clone(), clock), ledger)
    }

    fn update(id: &str, project: &str, property: &str) -> ProgressUpdateInput {
        ProgressUpdateInput {
            progress_id: id.into(),
            project_id: project.into(),
            property_id: property.into(),
            content_hash: format!("Qm{id}"),
            description: "slab poured".into(),
            uploaded_by: "alice".into(),
            ..ProgressUpdateInput::default()
        }
    }

    fn document(id: &str, document_type: &str) -> DocumentInput {
        DocumentInput {
            document_id: id.into(),
            project_id: "proj-1".into(),
            document_name: format!("{id}.pdf"),
            document_type: document_type.into(),
            content_hash: format!("Qm{id}"),
            uploaded_by: "alice".into(),
            timestamp: Some("2024-05-01T08:00:00Z".into()),
            ..DocumentInput::default()
        }
    }

    // =========================================================================
    // Submit
    // =========================================================================

    #[tokio::test]
    async fn test_store_then_get() {
        let (service, _) = service();
        let stored = service
            .store_progress_update(ProgressUpdateInput {
                milestone_id: Some("ms-2".into()),
                metadata: Some(json!({"camera": "north"})),
                ..update("pg-1", "proj-1", "unit-5")
            })
            .await
            .unwrap();

        assert_eq!(stored.timestamp, "2024-06-01T11:59:00.000Z");
        assert_eq!(stored.created_at, Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap());

        let fetched = service.get_progress_update("pg-1").await.unwrap();
        assert_eq!(fetched, stored);
        assert_eq!(fetched.milestone_id.as_deref(), Some("ms-2"));
        assert_eq!(fetched.metadata, json!({"camera": "north"}));
        assert!(service.progress_update_exists("pg-1").await.unwrap());
        assert!(!service.progress_update_exists("pg-2").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_store_already_exists() {
        let (service, _) = service();
        let first = service.store_document(document("doc-9", "permit")).await.unwrap();

        let err = service
            .store_document(DocumentInput {
                document_name: "other.pdf".into(),
                ..document("doc-9", "permit")
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::AlreadyExists(_)));
        assert_eq!(service.get_document("doc-9").await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_validation_never_reaches_ledger() {
        let (service, ledger) = service();
        let err = service
            .store_progress_update(ProgressUpdateInput {
                content_hash: String::new(),
                ..update("pg-1", "proj-1", "unit-5")
            })
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::Validation);
        assert_eq!(ledger.submits.load(Ordering::SeqCst), 0);
        assert!(service.get_all_progress_updates().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bad_timestamp_rejected() {
        let (service, _) = service();
        let err = service
            .store_document(DocumentInput {
                timestamp: Some("yesterday".into()),
                ..document("doc-1", "permit")
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_write_conflict_surfaced() {
        let (service, ledger) = service();
        ledger.fail_next(GatewayError::Commit {
            tx_id: "abc".into(),
            code: TxValidationCode::MvccReadConflict,
        });

        let err = service
            .store_document(document("doc-9", "permit"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::WriteConflict(_)));
        assert!(err.is_retryable());
    }

    // =========================================================================
    // Queries
    // =========================================================================

    #[tokio::test]
    async fn test_property_query_subset_of_project_query() {
        let (service, _) = service();
        for (id, property) in [("pg-1", "unit-5"), ("pg-2", "unit-6"), ("pg-3", "unit-5")] {
            service
                .store_progress_update(update(id, "proj-1", property))
                .await
                .unwrap();
        }
        service
            .store_progress_update(update("pg-4", "proj-2", "unit-5"))
            .await
            .unwrap();

        let by_property = service
            .query_progress_updates_by_property("unit-5")
            .await
            .unwrap();
        let mut ids: Vec<&str> = by_property
            .iter()
            .map(|r| r.record.progress_id.as_str())
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["pg-1", "pg-3", "pg-4"]);
        assert!(by_property.iter().all(|r| r.record.property_id == "unit-5"));

        let by_project = service
            .query_progress_updates_by_project("proj-1")
            .await
            .unwrap();
        assert_eq!(by_project.len(), 3);
        assert!(by_project.iter().all(|r| r.record.project_id == "proj-1"));
    }

    #[tokio::test]
    async fn test_document_queries() {
        let (service, _) = service();
        service.store_document(document("doc-1", "permit")).await.unwrap();
        service.store_document(document("doc-2", "deed")).await.unwrap();

        let permits = service.query_documents_by_type("permit").await.unwrap();
        assert_eq!(permits.len(), 1);
        assert_eq!(permits[0].record.document_id, "doc-1");
        assert_eq!(service.query_documents_by_project("proj-1").await.unwrap().len(), 2);
        assert_eq!(service.get_all_documents().await.unwrap().len(), 2);
        assert!(service.query_documents_by_type("invoice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_missing_and_blank_id() {
        let (service, _) = service();
        assert!(matches!(
            service.get_document("doc-404").await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            service.get_document("  ").await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_ids_with_whitespace_are_distinct_keys() {
        let (service, _) = service();
        service
            .store_progress_update(update("pg-1", "proj-1", "unit-5"))
            .await
            .unwrap();
        let padded = service
            .store_progress_update(update("pg-1 ", "proj-1", "unit-5 "))
            .await
            .unwrap();
        assert_eq!(padded.progress_id, "pg-1 ");

        let plain = service.get_progress_update("pg-1").await.unwrap();
        assert_eq!(plain.progress_id, "pg-1");
        assert_eq!(plain.property_id, "unit-5");
        let padded = service.get_progress_update("pg-1 ").await.unwrap();
        assert_eq!(padded.progress_id, "pg-1 ");
        assert_eq!(padded.property_id, "unit-5 ");

        let by_property = service
            .query_progress_updates_by_property("unit-5 ")
            .await
            .unwrap();
        let ids: Vec<&str> = by_property
            .iter()
            .map(|r| r.record.progress_id.as_str())
            .collect();
        assert_eq!(ids, vec!["pg-1 "]);
        assert!(matches!(
            service.get_progress_update("pg-2 ").await,
            Err(ServiceError::NotFound(_))
        ));
    }

    // =========================================================================
    // Command dispatch
    // =========================================================================

    #[tokio::test]
    async fn test_handle_json_envelopes() {
        let (service, _) = service();
        let stored = service
            .handle_json(
                r#"{"op":"storeProgressUpdate","progressId":"pg-1","projectId":"proj-1",
                    "propertyId":"unit-5","contentHash":"QmA","description":"d","uploadedBy":"u1"}"#,
            )
            .await;
        assert!(stored.success);
        assert_eq!(stored.data.unwrap()["progressId"], "pg-1");

        let again = service
            .handle_json(
                r#"{"op":"storeProgressUpdate","progressId":"pg-1","projectId":"proj-1",
                    "propertyId":"unit-5","contentHash":"QmA","description":"d","uploadedBy":"u1"}"#,
            )
            .await;
        assert!(!again.success);
        assert_eq!(again.error_code(), Some(ErrorCode::AlreadyExists));

        let garbage = service.handle_json("{not json").await;
        assert_eq!(garbage.error_code(), Some(ErrorCode::Validation));
    }

    #[tokio::test]
    async fn test_unconfirmed_outcome_distinct_from_invalid_input() {
        let (service, ledger) = service();
        ledger.fail_next(GatewayError::Timeout {
            phase: Phase::CommitStatus,
            tx_id: Some("abc".into()),
        });

        let response = service
            .handle(Command::StoreDocument(document("doc-1", "permit")))
            .await;
        let error = response.error.unwrap();
        assert_eq!(error.code, ErrorCode::Timeout);
        assert!(error.retryable);
        assert!(error.message.contains("abc"));

        let status = service
            .handle(Command::CommitStatus { tx_id: "abc".into() })
            .await;
        assert_eq!(status.error_code(), Some(ErrorCode::Timeout));
    }
}

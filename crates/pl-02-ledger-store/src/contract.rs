//! # Provenance Contract
//!
//! Append-only records with secondary indexes. Every store runs
//! validate → existence check → primary write → index writes inside one
//! transaction; the committer makes the whole write set durable or none of it.
//!
//! | Function | Kind | Result |
//! |----------|------|--------|
//! | `StoreProgressUpdate` | submit | record |
//! | `StoreDocument` | submit | record |
//! | `GetProgressUpdate`, `GetDocument` | evaluate | record |
//! | `ProgressUpdateExists`, `DocumentExists` | evaluate | `true` / `false` |
//! | `QueryProgressUpdatesByProperty`, `QueryProgressUpdatesByProject` | evaluate | `[{Key, Record}]` |
//! | `QueryDocumentsByProject`, `QueryDocumentsByType` | evaluate | `[{Key, Record}]` |
//! | `GetAllProgressUpdates`, `GetAllDocuments` | evaluate | `[{Key, Record}]` |

use crate::domain::{
    create_composite_key, document_key, progress_update_key, single_arg, trailing_attribute,
    ContractError, StoreDocumentRequest, StoreProgressUpdateRequest, DOCUMENT_TYPE_DOCUMENT_INDEX,
    INDEX_ENTRY_VALUE, PROJECT_DOCUMENT_INDEX, PROJECT_PROPERTY_PROGRESS_INDEX,
    PROPERTY_PROGRESS_INDEX,
};
use crate::ports::ChaincodeStub;
use serde::de::DeserializeOwned;
use serde_json::json;
use shared_types::{Document, ProgressUpdate, QueryRecord, RecordKind};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Event emitted when a progress update is stored; payload `{"progressId": ..}`.
pub const PROGRESS_UPDATE_STORED_EVENT: &str = "ProgressUpdateStored";
/// Event emitted when a document is stored; payload `{"documentId": ..}`.
pub const DOCUMENT_STORED_EVENT: &str = "DocumentStored";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractFunction {
    StoreProgressUpdate,
    StoreDocument,
    GetProgressUpdate,
    GetDocument,
    ProgressUpdateExists,
    DocumentExists,
    QueryProgressUpdatesByProperty,
    QueryProgressUpdatesByProject,
    QueryDocumentsByProject,
    QueryDocumentsByType,
    GetAllProgressUpdates,
    GetAllDocuments,
}

impl ContractFunction {
    pub const ALL: [ContractFunction; 12] = [
        Self::StoreProgressUpdate,
        Self::StoreDocument,
        Self::GetProgressUpdate,
        Self::GetDocument,
        Self::ProgressUpdateExists,
        Self::DocumentExists,
        Self::QueryProgressUpdatesByProperty,
        Self::QueryProgressUpdatesByProject,
        Self::QueryDocumentsByProject,
        Self::QueryDocumentsByType,
        Self::GetAllProgressUpdates,
        Self::GetAllDocuments,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::StoreProgressUpdate => "StoreProgressUpdate",
            Self::StoreDocument => "StoreDocument",
            Self::GetProgressUpdate => "GetProgressUpdate",
            Self::GetDocument => "GetDocument",
            Self::ProgressUpdateExists => "ProgressUpdateExists",
            Self::DocumentExists => "DocumentExists",
            Self::QueryProgressUpdatesByProperty => "QueryProgressUpdatesByProperty",
            Self::QueryProgressUpdatesByProject => "QueryProgressUpdatesByProject",
            Self::QueryDocumentsByProject => "QueryDocumentsByProject",
            Self::QueryDocumentsByType => "QueryDocumentsByType",
            Self::GetAllProgressUpdates => "GetAllProgressUpdates",
            Self::GetAllDocuments => "GetAllDocuments",
        }
    }

    /// Whether the function changes state and must be submitted.
    pub fn is_submit(self) -> bool {
        matches!(self, Self::StoreProgressUpdate | Self::StoreDocument)
    }
}

impl fmt::Display for ContractFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ContractFunction {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| ContractError::UnknownFunction(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProvenanceContract;

impl ProvenanceContract {
    pub fn new() -> Self {
        Self
    }

    /// Dispatch a positional-argument call and serialize the result as JSON.
    pub fn invoke(
        &self,
        stub: &dyn ChaincodeStub,
        function: &str,
        args: &[String],
    ) -> Result<Vec<u8>, ContractError> {
        let function: ContractFunction = function.parse()?;
        debug!(tx_id = stub.tx_id(), %function, "Invoking contract");
        let payload = match function {
            ContractFunction::StoreProgressUpdate => {
                let request = StoreProgressUpdateRequest::from_args(args)?;
                serde_json::to_vec(&self.store_progress_update(stub, request)?)?
            }
            ContractFunction::StoreDocument => {
                let request = StoreDocumentRequest::from_args(args)?;
                serde_json::to_vec(&self.store_document(stub, request)?)?
            }
            ContractFunction::GetProgressUpdate => {
                let id = single_arg(function.name(), "progressId", args)?;
                serde_json::to_vec(&self.get_progress_update(stub, id)?)?
            }
            ContractFunction::GetDocument => {
                let id = single_arg(function.name(), "documentId", args)?;
                serde_json::to_vec(&self.get_document(stub, id)?)?
            }
            ContractFunction::ProgressUpdateExists => {
                let id = single_arg(function.name(), "progressId", args)?;
                serde_json::to_vec(&self.progress_update_exists(stub, id)?)?
            }
            ContractFunction::DocumentExists => {
                let id = single_arg(function.name(), "documentId", args)?;
                serde_json::to_vec(&self.document_exists(stub, id)?)?
            }
            ContractFunction::QueryProgressUpdatesByProperty => {
                let property_id = single_arg(function.name(), "propertyId", args)?;
                serde_json::to_vec(&self.query_progress_updates_by_property(stub, property_id)?)?
            }
            ContractFunction::QueryProgressUpdatesByProject => {
                let project_id = single_arg(function.name(), "projectId", args)?;
                serde_json::to_vec(&self.query_progress_updates_by_project(stub, project_id)?)?
            }
            ContractFunction::QueryDocumentsByProject => {
                let project_id = single_arg(function.name(), "projectId", args)?;
                serde_json::to_vec(&self.query_documents_by_project(stub, project_id)?)?
            }
            ContractFunction::QueryDocumentsByType => {
                let document_type = single_arg(function.name(), "documentType", args)?;
                serde_json::to_vec(&self.query_documents_by_type(stub, document_type)?)?
            }
            ContractFunction::GetAllProgressUpdates => {
                expect_no_args(function, args)?;
                serde_json::to_vec(&self.get_all_progress_updates(stub)?)?
            }
            ContractFunction::GetAllDocuments => {
                expect_no_args(function, args)?;
                serde_json::to_vec(&self.get_all_documents(stub)?)?
            }
        };
        Ok(payload)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    pub fn store_progress_update(
        &self,
        stub: &dyn ChaincodeStub,
        request: StoreProgressUpdateRequest,
    ) -> Result<ProgressUpdate, ContractError> {
        request.validate()?;
        let id = request.progress_id.clone();
        let key = progress_update_key(&id)?;
        let by_project = create_composite_key(
            PROJECT_PROPERTY_PROGRESS_INDEX,
            &[&request.project_id, &request.property_id, &id],
        )?;
        let by_property =
            create_composite_key(PROPERTY_PROGRESS_INDEX, &[&request.property_id, &id])?;

        if stub.get_state(&key)?.is_some() {
            return Err(ContractError::AlreadyExists {
                kind: RecordKind::ProgressUpdate,
                id,
            });
        }

        let record = request.into_record(stub.tx_timestamp());
        stub.put_state(&key, &serde_json::to_vec(&record)?)?;
        stub.put_state(&by_project, INDEX_ENTRY_VALUE)?;
        stub.put_state(&by_property, INDEX_ENTRY_VALUE)?;
        stub.set_event(
            PROGRESS_UPDATE_STORED_EVENT,
            serde_json::to_vec(&json!({ "progressId": id }))?,
        )?;

        info!(
            tx_id = stub.tx_id(),
            progress_id = %record.progress_id,
            project_id = %record.project_id,
            property_id = %record.property_id,
            "Progress update staged"
        );
        Ok(record)
    }

    pub fn store_document(
        &self,
        stub: &dyn ChaincodeStub,
        request: StoreDocumentRequest,
    ) -> Result<Document, ContractError> {
        request.validate()?;
        let id = request.document_id.clone();
        let key = document_key(&id)?;
        let by_project = create_composite_key(PROJECT_DOCUMENT_INDEX, &[&request.project_id, &id])?;
        let by_type =
            create_composite_key(DOCUMENT_TYPE_DOCUMENT_INDEX, &[&request.document_type, &id])?;

        if stub.get_state(&key)?.is_some() {
            return Err(ContractError::AlreadyExists {
                kind: RecordKind::Document,
                id,
            });
        }

        let record = request.into_record(stub.tx_timestamp());
        stub.put_state(&key, &serde_json::to_vec(&record)?)?;
        stub.put_state(&by_project, INDEX_ENTRY_VALUE)?;
        stub.put_state(&by_type, INDEX_ENTRY_VALUE)?;
        stub.set_event(
            DOCUMENT_STORED_EVENT,
            serde_json::to_vec(&json!({ "documentId": id }))?,
        )?;

        info!(
            tx_id = stub.tx_id(),
            document_id = %record.document_id,
            document_type = %record.document_type,
            "Document staged"
        );
        Ok(record)
    }

    // =========================================================================
    // Point lookups
    // =========================================================================

    pub fn get_progress_update(
        &self,
        stub: &dyn ChaincodeStub,
        progress_id: &str,
    ) -> Result<ProgressUpdate, ContractError> {
        read_record(stub, RecordKind::ProgressUpdate, progress_id)?.ok_or_else(|| {
            ContractError::NotFound {
                kind: RecordKind::ProgressUpdate,
                id: progress_id.to_string(),
            }
        })
    }

    pub fn get_document(
        &self,
        stub: &dyn ChaincodeStub,
        document_id: &str,
    ) -> Result<Document, ContractError> {
        read_record(stub, RecordKind::Document, document_id)?.ok_or_else(|| {
            ContractError::NotFound {
                kind: RecordKind::Document,
                id: document_id.to_string(),
            }
        })
    }

    pub fn progress_update_exists(
        &self,
        stub: &dyn ChaincodeStub,
        progress_id: &str,
    ) -> Result<bool, ContractError> {
        Ok(stub.get_state(&progress_update_key(progress_id)?)?.is_some())
    }

    pub fn document_exists(
        &self,
        stub: &dyn ChaincodeStub,
        document_id: &str,
    ) -> Result<bool, ContractError> {
        Ok(stub.get_state(&document_key(document_id)?)?.is_some())
    }

    // =========================================================================
    // Index queries
    // =========================================================================

    /// Progress updates for one property, via `property~progress`.
    pub fn query_progress_updates_by_property(
        &self,
        stub: &dyn ChaincodeStub,
        property_id: &str,
    ) -> Result<Vec<QueryRecord<ProgressUpdate>>, ContractError> {
        query_index(stub, PROPERTY_PROGRESS_INDEX, &[property_id], RecordKind::ProgressUpdate)
    }

    /// Progress updates for every property of a project, via the leading
    /// field of `project~property~progress`. Ordered by property, then id.
    pub fn query_progress_updates_by_project(
        &self,
        stub: &dyn ChaincodeStub,
        project_id: &str,
    ) -> Result<Vec<QueryRecord<ProgressUpdate>>, ContractError> {
        query_index(
            stub,
            PROJECT_PROPERTY_PROGRESS_INDEX,
            &[project_id],
            RecordKind::ProgressUpdate,
        )
    }

    pub fn query_documents_by_project(
        &self,
        stub: &dyn ChaincodeStub,
        project_id: &str,
    ) -> Result<Vec<QueryRecord<Document>>, ContractError> {
        query_index(stub, PROJECT_DOCUMENT_INDEX, &[project_id], RecordKind::Document)
    }

    pub fn query_documents_by_type(
        &self,
        stub: &dyn ChaincodeStub,
        document_type: &str,
    ) -> Result<Vec<QueryRecord<Document>>, ContractError> {
        query_index(stub, DOCUMENT_TYPE_DOCUMENT_INDEX, &[document_type], RecordKind::Document)
    }

    // =========================================================================
    // Full scans (administrative)
    // =========================================================================

    /// Every progress update on the ledger.
    ///
    /// Cost is O(ledger size) in time and memory; not for request paths.
    pub fn get_all_progress_updates(
        &self,
        stub: &dyn ChaincodeStub,
    ) -> Result<Vec<QueryRecord<ProgressUpdate>>, ContractError> {
        get_all(stub, RecordKind::ProgressUpdate)
    }

    /// Every document on the ledger.
    ///
    /// Cost is O(ledger size) in time and memory; not for request paths.
    pub fn get_all_documents(
        &self,
        stub: &dyn ChaincodeStub,
    ) -> Result<Vec<QueryRecord<Document>>, ContractError> {
        get_all(stub, RecordKind::Document)
    }
}

fn expect_no_args(function: ContractFunction, args: &[String]) -> Result<(), ContractError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(ContractError::validation(format!(
            "{function} takes no arguments, got {}",
            args.len()
        )))
    }
}

fn primary_key(kind: RecordKind, id: &str) -> Result<String, ContractError> {
    match kind {
        RecordKind::ProgressUpdate => progress_update_key(id),
        RecordKind::Document => document_key(id),
    }
}

fn read_record<T: DeserializeOwned>(
    stub: &dyn ChaincodeStub,
    kind: RecordKind,
    id: &str,
) -> Result<Option<T>, ContractError> {
    stub.get_state(&primary_key(kind, id)?)?
        .map(|bytes| serde_json::from_slice(&bytes))
        .transpose()
        .map_err(ContractError::from)
}

/// Scan an index by partial key and dereference each entry's trailing id.
fn query_index<T: DeserializeOwned>(
    stub: &dyn ChaincodeStub,
    index: &str,
    attributes: &[&str],
    kind: RecordKind,
) -> Result<Vec<QueryRecord<T>>, ContractError> {
    let mut cursor = stub.get_state_by_partial_composite_key(index, attributes)?;
    let mut results = Vec::new();
    for entry in cursor.by_ref() {
        let (key, _) = entry?;
        let id = trailing_attribute(&key)?;
        match read_record(stub, kind, &id)? {
            Some(record) => results.push(QueryRecord { key, record }),
            None => warn!(index, id = %id, "Index entry without primary record"),
        }
    }
    cursor.close();
    debug!(index, hits = results.len(), "Index query complete");
    Ok(results)
}

fn get_all<T: DeserializeOwned>(
    stub: &dyn ChaincodeStub,
    kind: RecordKind,
) -> Result<Vec<QueryRecord<T>>, ContractError> {
    let mut cursor = stub.get_state_by_partial_composite_key(kind.doc_type(), &[])?;
    let mut results = Vec::new();
    for entry in cursor.by_ref() {
        let (key, bytes) = entry?;
        results.push(QueryRecord {
            key,
            record: serde_json::from_slice(&bytes)?,
        });
    }
    cursor.close();
    Ok(results)
}

//! One JSON command per façade operation, tagged by `op`.
//!
//! ```json
//! {"op": "storeDocument", "documentId": "doc-9", "projectId": "proj-1", ...}
//! {"op": "queryProgressUpdatesByProperty", "propertyId": "unit-5"}
//! ```

use super::inputs::{DocumentInput, ProgressUpdateInput};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Command {
    StoreProgressUpdate(ProgressUpdateInput),
    StoreDocument(DocumentInput),
    #[serde(rename_all = "camelCase")]
    GetProgressUpdate { progress_id: String },
    #[serde(rename_all = "camelCase")]
    GetDocument { document_id: String },
    #[serde(rename_all = "camelCase")]
    ProgressUpdateExists { progress_id: String },
    #[serde(rename_all = "camelCase")]
    DocumentExists { document_id: String },
    #[serde(rename_all = "camelCase")]
    QueryProgressUpdatesByProperty { property_id: String },
    #[serde(rename_all = "camelCase")]
    QueryProgressUpdatesByProject { project_id: String },
    #[serde(rename_all = "camelCase")]
    QueryDocumentsByProject { project_id: String },
    #[serde(rename_all = "camelCase")]
    QueryDocumentsByType { document_type: String },
    GetAllProgressUpdates,
    GetAllDocuments,
    #[serde(rename_all = "camelCase")]
    CommitStatus { tx_id: String },
}

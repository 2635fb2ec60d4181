//! Caller-facing request bodies.
//!
//! `timestamp` is optional here; when absent the service fills in the current
//! time. Everything else is checked by the ledger request types.

use chrono::{DateTime, SecondsFormat, Utc};
use pl_02_ledger_store::{StoreDocumentRequest, StoreProgressUpdateRequest};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressUpdateInput {
    pub progress_id: String,
    pub project_id: String,
    pub property_id: String,
    pub milestone_id: Option<String>,
    pub content_hash: String,
    pub description: String,
    pub uploaded_by: String,
    pub timestamp: Option<String>,
    pub metadata: Option<Value>,
}

impl ProgressUpdateInput {
    pub fn into_request(self, now: DateTime<Utc>) -> StoreProgressUpdateRequest {
        StoreProgressUpdateRequest {
            progress_id: self.progress_id,
            project_id: self.project_id,
            property_id: self.property_id,
            milestone_id: non_empty(self.milestone_id),
            content_hash: self.content_hash,
            description: self.description,
            uploaded_by: self.uploaded_by,
            timestamp: timestamp_or_now(self.timestamp, now),
            metadata: metadata_or_empty(self.metadata),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentInput {
    pub document_id: String,
    pub project_id: String,
    pub property_id: Option<String>,
    pub document_name: String,
    pub document_type: String,
    pub content_hash: String,
    pub uploaded_by: String,
    pub timestamp: Option<String>,
    pub metadata: Option<Value>,
}

impl DocumentInput {
    pub fn into_request(self, now: DateTime<Utc>) -> StoreDocumentRequest {
        StoreDocumentRequest {
            document_id: self.document_id,
            project_id: self.project_id,
            property_id: non_empty(self.property_id),
            document_name: self.document_name,
            document_type: self.document_type,
            content_hash: self.content_hash,
            uploaded_by: self.uploaded_by,
            timestamp: timestamp_or_now(self.timestamp, now),
            metadata: metadata_or_empty(self.metadata),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn timestamp_or_now(timestamp: Option<String>, now: DateTime<Utc>) -> String {
    non_empty(timestamp).unwrap_or_else(|| now.to_rfc3339_opts(SecondsFormat::Millis, true))
}

fn metadata_or_empty(metadata: Option<Value>) -> Value {
    match metadata {
        Some(Value::Null) | None => Value::Object(serde_json::Map::new()),
        Some(value) => value,
    }
}

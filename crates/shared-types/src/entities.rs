//! # Ledger Records
//!
//! The two primary entity kinds stored on the ledger and the `{Key, Record}`
//! pair returned by index scans.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Discriminator stored in every progress update record.
pub const PROGRESS_UPDATE_DOC_TYPE: &str = "progressUpdate";

/// Discriminator stored in every document record.
pub const DOCUMENT_DOC_TYPE: &str = "document";

fn empty_metadata() -> Value {
    Value::Object(serde_json::Map::new())
}

/// One construction-progress submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    /// Always `"progressUpdate"`.
    pub doc_type: String,
    pub progress_id: String,
    pub project_id: String,
    pub property_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestone_id: Option<String>,
    /// Content-addressed reference to the off-chain media.
    pub content_hash: String,
    pub description: String,
    pub uploaded_by: String,
    /// Caller-supplied event time (ISO-8601).
    pub timestamp: String,
    #[serde(default = "empty_metadata")]
    pub metadata: Value,
    /// Ledger-assigned time, taken from the transaction header.
    pub created_at: DateTime<Utc>,
}

/// One stored legal or administrative file reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Always `"document"`.
    pub doc_type: String,
    pub document_id: String,
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_id: Option<String>,
    pub document_name: String,
    /// Free-form category, e.g. `"permit"` or `"deed"`.
    pub document_type: String,
    pub content_hash: String,
    pub uploaded_by: String,
    pub timestamp: String,
    #[serde(default = "empty_metadata")]
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

/// A query hit: the ledger key that matched plus the dereferenced record.
///
/// The key is opaque to callers; it is only guaranteed to contain the field
/// values the record was indexed under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRecord<T> {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Record")]
    pub record: T,
}

/// Entity namespaces held on the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    ProgressUpdate,
    Document,
}

impl RecordKind {
    /// The `docType` discriminator for this kind.
    pub fn doc_type(self) -> &'static str {
        match self {
            RecordKind::ProgressUpdate => PROGRESS_UPDATE_DOC_TYPE,
            RecordKind::Document => DOCUMENT_DOC_TYPE,
        }
    }

    /// Human-readable label used in error messages.
    pub fn label(self) -> &'static str {
        match self {
            RecordKind::ProgressUpdate => "progress update",
            RecordKind::Document => "document",
        }
    }
}

//! # Typed Write Requests
//!
//! The contract receives positional string arguments. They are parsed into one
//! request struct per operation and validated there, before any state access.
//!
//! Positional layout:
//!
//! ```text
//! StoreProgressUpdate(progressId, projectId, propertyId, milestoneId, contentHash,
//!                     description, uploadedBy, timestamp, metadata="{}")
//! StoreDocument(documentId, projectId, propertyId, documentName, documentType,
//!               contentHash, uploadedBy, timestamp, metadata="{}")
//! ```
//!
//! An empty `milestoneId` / `propertyId` (for documents) means "absent".

use super::errors::ContractError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::{Document, ProgressUpdate, DOCUMENT_DOC_TYPE, PROGRESS_UPDATE_DOC_TYPE};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreProgressUpdateRequest {
    pub progress_id: String,
    pub project_id: String,
    pub property_id: String,
    pub milestone_id: Option<String>,
    pub content_hash: String,
    pub description: String,
    pub uploaded_by: String,
    pub timestamp: String,
    pub metadata: Value,
}

impl StoreProgressUpdateRequest {
    pub fn from_args(args: &[String]) -> Result<Self, ContractError> {
        check_arity("StoreProgressUpdate", args, 8)?;
        Ok(Self {
            progress_id: args[0].clone(),
            project_id: args[1].clone(),
            property_id: args[2].clone(),
            milestone_id: optional(&args[3]),
            content_hash: args[4].clone(),
            description: args[5].clone(),
            uploaded_by: args[6].clone(),
            timestamp: args[7].clone(),
            metadata: parse_metadata(args.get(8))?,
        })
    }

    pub fn to_args(&self) -> Vec<String> {
        vec![
            self.progress_id.clone(),
            self.project_id.clone(),
            self.property_id.clone(),
            self.milestone_id.clone().unwrap_or_default(),
            self.content_hash.clone(),
            self.description.clone(),
            self.uploaded_by.clone(),
            self.timestamp.clone(),
            self.metadata.to_string(),
        ]
    }

    pub fn validate(&self) -> Result<(), ContractError> {
        require(&[
            ("progressId", &self.progress_id),
            ("projectId", &self.project_id),
            ("propertyId", &self.property_id),
            ("contentHash", &self.content_hash),
            ("description", &self.description),
            ("uploadedBy", &self.uploaded_by),
            ("timestamp", &self.timestamp),
        ])?;
        validate_timestamp(&self.timestamp)
    }

    pub fn into_record(self, created_at: DateTime<Utc>) -> ProgressUpdate {
        ProgressUpdate {
            doc_type: PROGRESS_UPDATE_DOC_TYPE.to_string(),
            progress_id: self.progress_id,
            project_id: self.project_id,
            property_id: self.property_id,
            milestone_id: self.milestone_id,
            content_hash: self.content_hash,
            description: self.description,
            uploaded_by: self.uploaded_by,
            timestamp: self.timestamp,
            metadata: self.metadata,
            created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreDocumentRequest {
    pub document_id: String,
    pub project_id: String,
    pub property_id: Option<String>,
    pub document_name: String,
    pub document_type: String,
    pub content_hash: String,
    pub uploaded_by: String,
    pub timestamp: String,
    pub metadata: Value,
}

impl StoreDocumentRequest {
    pub fn from_args(args: &[String]) -> Result<Self, ContractError> {
        check_arity("StoreDocument", args, 8)?;
        Ok(Self {
            document_id: args[0].clone(),
            project_id: args[1].clone(),
            property_id: optional(&args[2]),
            document_name: args[3].clone(),
            document_type: args[4].clone(),
            content_hash: args[5].clone(),
            uploaded_by: args[6].clone(),
            timestamp: args[7].clone(),
            metadata: parse_metadata(args.get(8))?,
        })
    }

    pub fn to_args(&self) -> Vec<String> {
        vec![
            self.document_id.clone(),
            self.project_id.clone(),
            self.property_id.clone().unwrap_or_default(),
            self.document_name.clone(),
            self.document_type.clone(),
            self.content_hash.clone(),
            self.uploaded_by.clone(),
            self.timestamp.clone(),
            self.metadata.to_string(),
        ]
    }

    pub fn validate(&self) -> Result<(), ContractError> {
        require(&[
            ("documentId", &self.document_id),
            ("projectId", &self.project_id),
            ("documentName", &self.document_name),
            ("documentType", &self.document_type),
            ("contentHash", &self.content_hash),
            ("uploadedBy", &self.uploaded_by),
            ("timestamp", &self.timestamp),
        ])?;
        validate_timestamp(&self.timestamp)
    }

    pub fn into_record(self, created_at: DateTime<Utc>) -> Document {
        Document {
            doc_type: DOCUMENT_DOC_TYPE.to_string(),
            document_id: self.document_id,
            project_id: self.project_id,
            property_id: self.property_id,
            document_name: self.document_name,
            document_type: self.document_type,
            content_hash: self.content_hash,
            uploaded_by: self.uploaded_by,
            timestamp: self.timestamp,
            metadata: self.metadata,
            created_at,
        }
    }
}

/// Single-id argument of the point lookups, existence checks and queries.
pub fn single_arg<'a>(function: &str, name: &str, args: &'a [String]) -> Result<&'a str, ContractError> {
    match args {
        [value] if !value.trim().is_empty() => Ok(value.as_str()),
        [_] => Err(ContractError::validation(format!("{name} is required"))),
        _ => Err(ContractError::validation(format!(
            "{function} expects 1 argument, got {}",
            args.len()
        ))),
    }
}

fn check_arity(function: &str, args: &[String], required: usize) -> Result<(), ContractError> {
    if args.len() == required || args.len() == required + 1 {
        Ok(())
    } else {
        Err(ContractError::validation(format!(
            "{function} expects {required} or {} arguments, got {}",
            required + 1,
            args.len()
        )))
    }
}

fn require(fields: &[(&str, &String)]) -> Result<(), ContractError> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ContractError::validation(format!(
            "missing required fields: {}",
            missing.join(", ")
        )))
    }
}

fn optional(arg: &str) -> Option<String> {
    if arg.trim().is_empty() {
        None
    } else {
        Some(arg.to_string())
    }
}

fn parse_metadata(arg: Option<&String>) -> Result<Value, ContractError> {
    match arg.map(|a| a.trim()) {
        None | Some("") => Ok(Value::Object(serde_json::Map::new())),
        Some(raw) => serde_json::from_str(raw)
            .map_err(|e| ContractError::validation(format!("metadata is not valid JSON: {e}"))),
    }
}

fn validate_timestamp(timestamp: &str) -> Result<(), ContractError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|_| ())
        .map_err(|_| ContractError::validation(format!("timestamp {timestamp:?} is not ISO-8601")))
}

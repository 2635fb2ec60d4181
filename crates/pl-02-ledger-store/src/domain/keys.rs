//! # Composite Keys
//!
//! A composite key is `U+0000 objectType U+0000 attr1 U+0000 ... attrN U+0000`.
//! Because every part is terminated by the separator, the key built from the
//! first `k` attributes is a strict prefix of exactly those keys whose first
//! `k` attributes are equal. Scanning `[partial, partial + U+10FFFF)` therefore
//! selects them and nothing else.
//!
//! Primary records are stored under single-attribute composite keys
//! (`progressUpdate`/`document` + id), index entries under the four index
//! namespaces with a one-byte `U+0000` value.

use super::errors::ContractError;
use shared_types::{DOCUMENT_DOC_TYPE, PROGRESS_UPDATE_DOC_TYPE};

/// Separator and namespace marker for composite keys.
pub const COMPOSITE_KEY_SEPARATOR: char = '\u{0}';

/// Upper bound for partial-key range scans.
pub const MAX_UNICODE_RUNE: char = char::MAX;

/// Value stored under every index entry.
pub const INDEX_ENTRY_VALUE: &[u8] = &[0];

pub const PROJECT_PROPERTY_PROGRESS_INDEX: &str = "project~property~progress";
pub const PROPERTY_PROGRESS_INDEX: &str = "property~progress";
pub const PROJECT_DOCUMENT_INDEX: &str = "project~document";
pub const DOCUMENT_TYPE_DOCUMENT_INDEX: &str = "documentType~document";

/// Build a composite key. No part may contain the separator or `U+10FFFF`.
pub fn create_composite_key(object_type: &str, attributes: &[&str]) -> Result<String, ContractError> {
    validate_part(object_type)?;
    let mut key = String::with_capacity(
        2 + object_type.len() + attributes.iter().map(|a| a.len() + 1).sum::<usize>(),
    );
    key.push(COMPOSITE_KEY_SEPARATOR);
    key.push_str(object_type);
    key.push(COMPOSITE_KEY_SEPARATOR);
    for attribute in attributes {
        validate_part(attribute)?;
        key.push_str(attribute);
        key.push(COMPOSITE_KEY_SEPARATOR);
    }
    Ok(key)
}

/// Inverse of [`create_composite_key`].
pub fn split_composite_key(key: &str) -> Result<(String, Vec<String>), ContractError> {
    let body = key
        .strip_prefix(COMPOSITE_KEY_SEPARATOR)
        .and_then(|rest| rest.strip_suffix(COMPOSITE_KEY_SEPARATOR))
        .ok_or_else(|| ContractError::InvalidKey(format!("{key:?} is not a composite key")))?;
    let mut parts = body.split(COMPOSITE_KEY_SEPARATOR).map(str::to_string);
    let object_type = parts.next().unwrap_or_default();
    Ok((object_type, parts.collect()))
}

/// Half-open key range `[start, end)` covering every key that extends the
/// partial key `object_type + attributes`.
pub fn partial_key_range(
    object_type: &str,
    attributes: &[&str],
) -> Result<(String, String), ContractError> {
    let start = create_composite_key(object_type, attributes)?;
    let mut end = start.clone();
    end.push(MAX_UNICODE_RUNE);
    Ok((start, end))
}

/// Trailing attribute of a composite key: the record id for index entries.
pub fn trailing_attribute(key: &str) -> Result<String, ContractError> {
    let (_, attributes) = split_composite_key(key)?;
    attributes
        .into_iter()
        .last()
        .ok_or_else(|| ContractError::InvalidKey(format!("{key:?} has no attributes")))
}

pub fn progress_update_key(progress_id: &str) -> Result<String, ContractError> {
    create_composite_key(PROGRESS_UPDATE_DOC_TYPE, &[progress_id])
}

pub fn document_key(document_id: &str) -> Result<String, ContractError> {
    create_composite_key(DOCUMENT_DOC_TYPE, &[document_id])
}

fn validate_part(part: &str) -> Result<(), ContractError> {
    if part.contains(COMPOSITE_KEY_SEPARATOR) || part.contains(MAX_UNICODE_RUNE) {
        return Err(ContractError::InvalidKey(format!(
            "{part:?} contains a reserved character"
        )));
    }
    Ok(())
}

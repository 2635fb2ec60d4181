use crate::domain::{Credential, StoreError};

/// Durable mapping from identity label to credential.
///
/// Implementations must be safe for concurrent use. Writes are create-only:
/// an existing credential is never replaced by `put_if_absent`, so concurrent
/// writers for the same label converge on the first one stored.
pub trait CredentialStore: Send + Sync {
    fn get(&self, label: &str) -> Result<Option<Credential>, StoreError>;

    /// Store `credential` unless the label is taken. Returns `true` if stored.
    fn put_if_absent(&self, label: &str, credential: &Credential) -> Result<bool, StoreError>;

    /// All stored labels, sorted.
    fn list(&self) -> Result<Vec<String>, StoreError>;

    /// Delete a credential ahead of rotation. Returns `true` if one was removed.
    fn remove(&self, label: &str) -> Result<bool, StoreError>;

    fn exists(&self, label: &str) -> Result<bool, StoreError> {
        Ok(self.get(label)?.is_some())
    }
}

/// Labels become file names, so they are restricted to a safe alphabet.
pub fn validate_label(label: &str) -> Result<(), StoreError> {
    let valid = !label.is_empty()
        && label.len() <= 128
        && !label.starts_with('.')
        && label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '@'));
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidLabel(label.to_string()))
    }
}

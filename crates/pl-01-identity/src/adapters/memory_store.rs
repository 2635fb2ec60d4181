use crate::domain::{Credential, StoreError};
use crate::ports::{validate_label, CredentialStore};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// In-memory credential store.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    credentials: RwLock<BTreeMap<String, Credential>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.credentials.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.read().is_empty()
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn get(&self, label: &str) -> Result<Option<Credential>, StoreError> {
        validate_label(label)?;
        Ok(self.credentials.read().get(label).cloned())
    }

    fn put_if_absent(&self, label: &str, credential: &Credential) -> Result<bool, StoreError> {
        validate_label(label)?;
        let mut credentials = self.credentials.write();
        if credentials.contains_key(label) {
            return Ok(false);
        }
        credentials.insert(label.to_string(), credential.clone());
        Ok(true)
    }

    fn list(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.credentials.read().keys().cloned().collect())
    }

    fn remove(&self, label: &str) -> Result<bool, StoreError> {
        validate_label(label)?;
        Ok(self.credentials.write().remove(label).is_some())
    }
}

//! # File-System Credential Store
//!
//! Layout: `<dir>/<label>.id`, each a JSON `Credential`.
//!
//! Writes go to a uniquely named temporary file that is then hard-linked to
//! the final name. `hard_link` fails if the target exists, which makes the
//! create-only rule hold across threads and processes, and readers never see
//! a partially written file.

use crate::domain::{Credential, StoreError};
use crate::ports::{validate_label, CredentialStore};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

const EXTENSION: &str = "id";

#[derive(Debug, Clone)]
pub struct FileSystemCredentialStore {
    dir: PathBuf,
}

impl FileSystemCredentialStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            label: dir.display().to_string(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, label: &str) -> PathBuf {
        self.dir.join(format!("{label}.{EXTENSION}"))
    }
}

impl CredentialStore for FileSystemCredentialStore {
    fn get(&self, label: &str) -> Result<Option<Credential>, StoreError> {
        validate_label(label)?;
        let bytes = match fs::read(self.path_for(label)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Io {
                    label: label.to_string(),
                    source,
                })
            }
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                label: label.to_string(),
                message: e.to_string(),
            })
    }

    fn put_if_absent(&self, label: &str, credential: &Credential) -> Result<bool, StoreError> {
        validate_label(label)?;
        let io_err = |source: std::io::Error| StoreError::Io {
            label: label.to_string(),
            source,
        };

        let json = serde_json::to_vec_pretty(credential).map_err(|e| StoreError::Corrupt {
            label: label.to_string(),
            message: e.to_string(),
        })?;

        let tmp = self
            .dir
            .join(format!(".{label}.{}.tmp", uuid::Uuid::new_v4().simple()));
        let write_tmp = || -> std::io::Result<()> {
            let mut file = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&tmp)?;
            file.write_all(&json)?;
            file.sync_all()
        };
        if let Err(source) = write_tmp() {
            let _ = fs::remove_file(&tmp);
            return Err(io_err(source));
        }

        let linked = fs::hard_link(&tmp, self.path_for(label));
        let _ = fs::remove_file(&tmp);
        match linked {
            Ok(()) => {
                debug!(label, dir = %self.dir.display(), "Stored credential");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(source) => Err(io_err(source)),
        }
    }

    fn list(&self) -> Result<Vec<String>, StoreError> {
        let entries = fs::read_dir(&self.dir).map_err(|source| StoreError::Io {
            label: self.dir.display().to_string(),
            source,
        })?;
        let mut labels: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                    return None;
                }
                path.file_stem()
                    .and_then(|s| s.to_str())
                    .filter(|s| !s.starts_with('.'))
                    .map(str::to_string)
            })
            .collect();
        labels.sort();
        Ok(labels)
    }

    fn remove(&self, label: &str) -> Result<bool, StoreError> {
        validate_label(label)?;
        match fs::remove_file(self.path_for(label)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StoreError::Io {
                label: label.to_string(),
                source,
            }),
        }
    }
}

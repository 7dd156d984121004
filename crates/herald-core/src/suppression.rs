//! Persisted "don't show again" choices.
//!
//! The store is a single JSON array of dialog identifiers. It is re-read on
//! every query because another window or process may have written it.
//! `mark_suppressed` is a plain read-modify-write: two writers racing can lose
//! one identifier. Writes are rare enough that this is accepted.

use std::io::Write;
use std::path::{Path, PathBuf};

use log::{error, info};

use crate::error::StoreError;

pub trait SuppressionStore: Send + Sync {
    /// Never fails: an unreadable or corrupt store counts as empty so the
    /// dialog is shown again.
    fn is_suppressed(&self, id: &str) -> bool;

    /// # Errors
    /// Returns [`StoreError::Io`] when the store cannot be written.
    fn mark_suppressed(&self, id: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
pub struct FileSuppressionStore {
    path: PathBuf,
}

impl FileSuppressionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored identifiers. A missing file is an empty list.
    ///
    /// # Errors
    /// Returns [`StoreError::Io`] on read failures other than a missing file
    /// and [`StoreError::Corrupt`] when the content is not an array of strings.
    pub fn load(&self) -> Result<Vec<String>, StoreError> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    context: "failed to read suppression store",
                    path: self.path.display().to_string(),
                    source,
                });
            }
        };

        serde_json::from_str(&data).map_err(|source| StoreError::Corrupt {
            path: self.path.display().to_string(),
            source,
        })
    }

    fn load_or_empty(&self) -> Vec<String> {
        self.load().unwrap_or_else(|e| {
            error!("{e}");
            Vec::new()
        })
    }

    fn save(&self, ids: &[String]) -> Result<(), StoreError> {
        let io_error = |context: &'static str, source: std::io::Error| StoreError::Io {
            context,
            path: self.path.display().to_string(),
            source,
        };

        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent)
            .map_err(|e| io_error("failed to create directory for", e))?;

        let content = serde_json::to_string_pretty(ids).map_err(|e| {
            io_error("failed to serialize suppression store", std::io::Error::other(e))
        })?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent)
            .map_err(|e| io_error("failed to create temp file for", e))?;
        tmp.write_all(content.as_bytes())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| io_error("failed to write suppression store", e))?;
        tmp.persist(&self.path)
            .map_err(|e| io_error("failed to replace suppression store", e.error))?;

        Ok(())
    }
}

impl SuppressionStore for FileSuppressionStore {
    fn is_suppressed(&self, id: &str) -> bool {
        self.load_or_empty().iter().any(|stored| stored == id)
    }

    fn mark_suppressed(&self, id: &str) -> Result<(), StoreError> {
        let mut ids = self.load_or_empty();
        if ids.iter().any(|stored| stored == id) {
            return Ok(());
        }

        ids.push(id.to_string());
        self.save(&ids)?;
        info!("Disabled dialog {id}");
        Ok(())
    }
}

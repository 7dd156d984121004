use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("failed to read package manifest {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("package manifest {path} has no usable `version`: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A `package.json`-style file shipped next to the application binary that
/// records the installed version.
#[derive(Debug, Clone)]
pub struct PackageManifest {
    path: PathBuf,
}

#[derive(Deserialize)]
struct PackageFile {
    version: String,
}

impl PackageManifest {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the `version` field. The value is returned as written; callers
    /// validate its syntax.
    ///
    /// # Errors
    /// Returns an error when the file cannot be read or has no string
    /// `version` field.
    pub fn read_version(&self) -> Result<String, PackageError> {
        let path = self.path.display().to_string();
        let data = std::fs::read_to_string(&self.path).map_err(|source| PackageError::Read {
            path: path.clone(),
            source,
        })?;
        let package: PackageFile =
            serde_json::from_str(&data).map_err(|source| PackageError::Parse { path, source })?;
        Ok(package.version)
    }
}

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use herald_platform::AppPaths;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_manifest_url")]
    pub manifest_url: String,

    #[serde(default = "default_download_url")]
    pub download_url: String,

    /// Ed25519 public key, hex or base64.
    #[serde(default)]
    pub trusted_public_key: String,

    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    /// JSON file with a `version` field. The compiled-in version is used
    /// when unset.
    #[serde(default)]
    pub package_manifest: Option<PathBuf>,

    #[serde(default)]
    pub debug_logging: bool,

    #[serde(default = "default_max_log_size_bytes")]
    pub max_log_size_bytes: u64,
}

fn default_manifest_url() -> String {
    "https://updates.example.com/herald/update.jws".to_string()
}

fn default_download_url() -> String {
    "https://updates.example.com/herald/download".to_string()
}

fn default_http_timeout() -> u64 {
    20
}

fn default_max_log_size_bytes() -> u64 {
    5 * 1024 * 1024
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            manifest_url: default_manifest_url(),
            download_url: default_download_url(),
            trusted_public_key: String::new(),
            http_timeout_secs: default_http_timeout(),
            package_manifest: None,
            debug_logging: false,
            max_log_size_bytes: default_max_log_size_bytes(),
        }
    }
}

impl Settings {
    pub fn load() -> Self {
        let Ok(paths) = AppPaths::new() else {
            return Self::default();
        };
        Self::load_from_path(&paths.settings_file())
    }

    fn load_from_path(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) -> Result<(), std::io::Error> {
        let paths = AppPaths::new().map_err(std::io::Error::other)?;
        paths.ensure_dirs()?;
        self.save_to_path(&paths.settings_file())
    }

    fn save_to_path(&self, path: &Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
    }

    /// Clamped to 5..=120 seconds.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.clamp(5, 120))
    }
}

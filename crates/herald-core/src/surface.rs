//! Collaborators the orchestrator drives but does not implement.

use async_trait::async_trait;
use herald_platform::{PackageManifest, SystemProxy};

/// What the user chose in a confirmation dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DialogOutcome {
    pub accepted: bool,
    pub suppress_requested: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChoiceOptions<'a> {
    /// Stable identifier used for "don't show again".
    pub identifier: &'a str,
    pub offer_suppression: bool,
}

#[async_trait]
pub trait DialogSurface: Send + Sync {
    async fn present_choice(&self, message: &str, options: ChoiceOptions<'_>) -> DialogOutcome;

    /// Resolves only once the user has acknowledged the message.
    async fn present_fatal(&self, message: &str);
}

/// Process-level side effects owned by the host application.
pub trait AppControl: Send + Sync {
    /// Fire-and-forget.
    fn open_external(&self, url: &str);

    /// Ends the process. Implementations used in production do not return.
    fn terminate(&self);
}

pub trait ProxySource: Send + Sync {
    fn https_proxy(&self) -> Option<String>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoProxy;

impl ProxySource for NoProxy {
    fn https_proxy(&self) -> Option<String> {
        None
    }
}

impl ProxySource for Option<String> {
    fn https_proxy(&self) -> Option<String> {
        self.clone()
    }
}

impl ProxySource for SystemProxy {
    fn https_proxy(&self) -> Option<String> {
        self.https()
    }
}

/// Where the installed application's version comes from. Read once per
/// check cycle.
pub trait VersionSource: Send + Sync {
    fn installed_version(&self) -> Result<String, String>;
}

impl VersionSource for PackageManifest {
    fn installed_version(&self) -> Result<String, String> {
        self.read_version().map_err(|e| e.to_string())
    }
}

/// A version known at build time, usually `env!("CARGO_PKG_VERSION")`.
#[derive(Debug, Clone)]
pub struct FixedVersion(pub String);

impl VersionSource for FixedVersion {
    fn installed_version(&self) -> Result<String, String> {
        Ok(self.0.clone())
    }
}

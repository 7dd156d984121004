//! One update-check cycle, from fetching the manifest to the critical gate.
//!
//! The cycle is a straight line of awaited steps: fetch, verify, compare,
//! optionally ask the user, then check the minimum supported version. Only a
//! critical check failure or an installed version below the published
//! minimum ends the process, and both wait for the user to acknowledge a
//! fatal dialog first.

use std::cmp::Ordering;
use std::sync::Arc;

use log::{error, info, warn};

use crate::error::{UpdateError, UpdateErrorKind};
use crate::fetch::ManifestSource;
use crate::manifest::{self, TrustedKey, UpdateDescriptor};
use crate::suppression::SuppressionStore;
use crate::surface::{AppControl, ChoiceOptions, DialogSurface, VersionSource};
use crate::version;

/// Identifier of the "new version available" confirmation.
pub const NEW_VERSION_DIALOG_ID: &str = "question.update.new";

#[derive(Debug, Clone)]
pub struct UpdateConfig {
    pub manifest_url: String,
    pub download_url: String,
    pub trusted_key: TrustedKey,
}

/// Dialog texts. `{version}` in `new_version` is replaced with the available
/// version.
#[derive(Debug, Clone)]
pub struct UpdateMessages {
    pub new_version: String,
    pub critical_update: String,
    pub check_failed: String,
}

impl Default for UpdateMessages {
    fn default() -> Self {
        Self {
            new_version: "A new version {version} is available. Do you want to download it?"
                .to_string(),
            critical_update: "This version is no longer supported. Please install the latest \
                              version to continue. The application will now close."
                .to_string(),
            check_failed: "Unable to check for application updates.".to_string(),
        }
    }
}

impl UpdateMessages {
    fn new_version_text(&self, version: &str) -> String {
        self.new_version.replace("{version}", version)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CheckOptions {
    /// Treat network and verification failures of this cycle as critical.
    pub critical: bool,
}

/// How a cycle that left the application running ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    NoUpdate,
    Accepted,
    Declined,
    /// The update dialog was skipped because the user asked not to see it.
    Suppressed,
    CheckFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Continue(Resolution),
    Terminated,
}

pub struct Collaborators {
    pub manifests: Arc<dyn ManifestSource>,
    pub installed: Arc<dyn VersionSource>,
    pub store: Arc<dyn SuppressionStore>,
    pub dialogs: Arc<dyn DialogSurface>,
    pub app: Arc<dyn AppControl>,
}

pub struct UpdateOrchestrator {
    config: UpdateConfig,
    messages: UpdateMessages,
    collaborators: Collaborators,
}

impl UpdateOrchestrator {
    #[must_use]
    pub fn new(config: UpdateConfig, collaborators: Collaborators) -> Self {
        Self {
            config,
            messages: UpdateMessages::default(),
            collaborators,
        }
    }

    #[must_use]
    pub fn with_messages(mut self, messages: UpdateMessages) -> Self {
        self.messages = messages;
        self
    }

    /// Run a full check cycle. Recoverable failures are logged and end the
    /// cycle with [`Resolution::CheckFailed`]; they never reach the caller.
    pub async fn run(&self, options: CheckOptions) -> CycleOutcome {
        info!("Update: Check for new update");

        let (installed, descriptor) = match self.check(options).await {
            Ok(checked) => checked,
            Err(error) => return self.fail(error).await,
        };

        match version::compare(&installed, descriptor.version()) {
            Ok(Ordering::Less) => {}
            Ok(_) => {
                info!("Update: New version wasn't found (installed {installed})");
                return CycleOutcome::Continue(Resolution::NoUpdate);
            }
            Err(e) => return self.fail(UpdateError::recoverable(e)).await,
        }

        info!(
            "Update: New version {} was found (installed {installed})",
            descriptor.version()
        );
        let resolution = self.offer_update(&descriptor).await;
        self.critical_gate(&installed, &descriptor, resolution).await
    }

    async fn check(&self, options: CheckOptions) -> Result<(String, UpdateDescriptor), UpdateError> {
        let installed = self
            .collaborators
            .installed
            .installed_version()
            .map_err(|e| UpdateError::critical(UpdateErrorKind::InstalledVersion(e)))?;
        version::parse_version(&installed).map_err(|e| {
            UpdateError::critical(UpdateErrorKind::InstalledVersion(e.to_string()))
        })?;

        let token = self
            .collaborators
            .manifests
            .fetch(&self.config.manifest_url)
            .await
            .map_err(|e| UpdateError::recoverable(e).escalate(options.critical))?;

        let descriptor = manifest::verify(&token, &self.config.trusted_key)
            .map_err(|e| UpdateError::recoverable(e).escalate(options.critical))?;

        Ok((installed, descriptor))
    }

    async fn offer_update(&self, descriptor: &UpdateDescriptor) -> Resolution {
        let store = &self.collaborators.store;
        if store.is_suppressed(NEW_VERSION_DIALOG_ID) {
            info!(
                "Update: dialog {NEW_VERSION_DIALOG_ID} is suppressed, not offering {}",
                descriptor.version()
            );
            return Resolution::Suppressed;
        }

        let outcome = self
            .collaborators
            .dialogs
            .present_choice(
                &self.messages.new_version_text(descriptor.version()),
                ChoiceOptions {
                    identifier: NEW_VERSION_DIALOG_ID,
                    offer_suppression: true,
                },
            )
            .await;

        let resolution = if outcome.accepted {
            info!(
                "User agreed to download new version {}",
                descriptor.version()
            );
            self.collaborators
                .app
                .open_external(&self.config.download_url);
            Resolution::Accepted
        } else {
            info!(
                "User refused to download new version {}",
                descriptor.version()
            );
            Resolution::Declined
        };

        if outcome.suppress_requested
            && let Err(e) = store.mark_suppressed(NEW_VERSION_DIALOG_ID)
        {
            error!("Cannot persist suppression of {NEW_VERSION_DIALOG_ID}: {e}");
        }

        resolution
    }

    async fn critical_gate(
        &self,
        installed: &str,
        descriptor: &UpdateDescriptor,
        resolution: Resolution,
    ) -> CycleOutcome {
        let Some(minimum) = descriptor.minimum_version() else {
            return CycleOutcome::Continue(resolution);
        };

        match version::compare(installed, minimum) {
            Ok(Ordering::Less) => {
                info!(
                    "Update {} is critical. Installed {installed} is below minimum {minimum}",
                    descriptor.version()
                );
                self.terminate_after(&self.messages.critical_update).await
            }
            Ok(_) => CycleOutcome::Continue(resolution),
            Err(e) => {
                error!("Update: verified manifest carried an unusable minimum version: {e}");
                CycleOutcome::Continue(resolution)
            }
        }
    }

    async fn fail(&self, error: UpdateError) -> CycleOutcome {
        error!(
            "Update check failed ({}, critical={}) for {}: {error}",
            error.kind_name(),
            error.critical,
            self.config.manifest_url
        );

        if !error.critical {
            return CycleOutcome::Continue(Resolution::CheckFailed);
        }

        let message = format!("{} {error}", self.messages.check_failed);
        self.terminate_after(&message).await
    }

    async fn terminate_after(&self, message: &str) -> CycleOutcome {
        self.collaborators.dialogs.present_fatal(message).await;
        warn!("Close application");
        self.collaborators.app.terminate();
        CycleOutcome::Terminated
    }
}

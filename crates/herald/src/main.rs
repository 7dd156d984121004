mod console;
mod logging;
mod settings;

use std::sync::Arc;

use log::{error, info, warn};

use herald_core::surface::{FixedVersion, VersionSource};
use herald_core::{
    CheckOptions, Collaborators, FileSuppressionStore, HttpManifestFetcher, TrustedKey,
    UpdateConfig, UpdateOrchestrator,
};
use herald_platform::{AppPaths, PackageManifest, SystemProxy};

use crate::console::{ConsoleDialogs, ProcessControl};
use crate::settings::Settings;

#[tokio::main]
async fn main() {
    let paths = match AppPaths::new() {
        Ok(paths) => paths,
        Err(e) => {
            eprintln!("herald: {e}");
            return;
        }
    };
    let dirs_created = paths.ensure_dirs();

    let settings = Settings::load();
    logging::init_logging(
        &paths.log_file(),
        settings.debug_logging,
        settings.max_log_size_bytes,
    );

    if let Err(e) = dirs_created {
        warn!("Cannot create application directories, suppression choices may not persist: {e}");
    }

    if !paths.settings_file().exists()
        && let Err(e) = settings.save()
    {
        error!("Failed to write default settings: {e}");
    }

    let trusted_key = match TrustedKey::parse(&settings.trusted_public_key) {
        Ok(key) => key,
        Err(e) => {
            error!(
                "Skipping update check, {}: {e}",
                paths.settings_file().display()
            );
            return;
        }
    };

    let installed: Arc<dyn VersionSource> = match &settings.package_manifest {
        Some(path) => Arc::new(PackageManifest::new(path)),
        None => Arc::new(FixedVersion(env!("CARGO_PKG_VERSION").to_string())),
    };

    let orchestrator = UpdateOrchestrator::new(
        UpdateConfig {
            manifest_url: settings.manifest_url.clone(),
            download_url: settings.download_url.clone(),
            trusted_key,
        },
        Collaborators {
            manifests: Arc::new(
                HttpManifestFetcher::new(SystemProxy::default())
                    .with_timeout(settings.http_timeout()),
            ),
            installed,
            store: Arc::new(FileSuppressionStore::new(paths.suppressed_dialogs_file())),
            dialogs: Arc::new(ConsoleDialogs),
            app: Arc::new(ProcessControl),
        },
    );

    let outcome = orchestrator.run(CheckOptions::default()).await;
    info!("Update check finished: {outcome:?}");
}

//! Update discovery for Herald hosts.
//!
//! This crate holds everything between "is there a newer release?" and "keep
//! running or quit":
//! - Fetching the signed update manifest, optionally through an HTTPS proxy.
//! - Verifying the manifest signature before any of its fields are used.
//! - Semantic-version precedence.
//! - The persisted set of dialogs the user chose not to see again.
//! - The check-cycle orchestrator and the collaborator traits it drives.

pub mod error;
mod fetch;
mod manifest;
mod orchestrator;
mod suppression;
pub mod surface;
pub mod version;

/// Error taxonomy surfaced by fetch, verification, storage and the cycle.
pub use error::{FetchError, MalformedVersion, StoreError, UpdateError, UpdateErrorKind, VerifyError};
/// Manifest retrieval over HTTP(S).
pub use fetch::{DEFAULT_FETCH_TIMEOUT, HttpManifestFetcher, ManifestSource, RawManifestToken};
/// Signature verification and the verified update descriptor.
pub use manifest::{TrustedKey, UpdateDescriptor, verify};
/// Check-cycle state machine.
pub use orchestrator::{
    CheckOptions, Collaborators, CycleOutcome, NEW_VERSION_DIALOG_ID, Resolution, UpdateConfig,
    UpdateMessages, UpdateOrchestrator,
};
/// "Don't show again" persistence.
pub use suppression::{FileSuppressionStore, SuppressionStore};

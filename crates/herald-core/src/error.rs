use thiserror::Error;

/// Transport-level failure while retrieving the signed manifest.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build HTTP client for {endpoint}: {source}")]
    Client {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("invalid HTTPS proxy {proxy}: {source}")]
    Proxy {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {endpoint} failed: {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("manifest request to {endpoint} failed with HTTP {status}")]
    HttpStatus {
        endpoint: String,
        status: reqwest::StatusCode,
    },
    #[error("manifest response from {endpoint} was empty")]
    EmptyBody { endpoint: String },
}

impl FetchError {
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Request { source, .. } if source.is_timeout())
    }
}

/// The manifest could not be trusted or decoded.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("manifest is not a three-part signed token")]
    MalformedToken,
    #[error("manifest {part} is not valid base64url: {source}")]
    Encoding {
        part: &'static str,
        #[source]
        source: base64::DecodeError,
    },
    #[error("manifest header is invalid: {0}")]
    Header(#[source] serde_json::Error),
    #[error("unsupported manifest signature algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("manifest signature does not match the trusted key")]
    Signature,
    #[error("manifest payload is invalid: {0}")]
    Payload(#[source] serde_json::Error),
    #[error("manifest field `{field}` is not a semantic version")]
    Version {
        field: &'static str,
        #[source]
        source: MalformedVersion,
    },
    #[error("trusted key is invalid: {0}")]
    TrustedKey(String),
}

#[derive(Debug, Error)]
#[error("malformed version {value:?}: {source}")]
pub struct MalformedVersion {
    pub value: String,
    #[source]
    pub source: semver::Error,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{context} {path}: {source}")]
    Io {
        context: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("suppression store {path} is corrupt: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Anything that ended a check cycle early.
#[derive(Debug, Error)]
pub enum UpdateErrorKind {
    #[error(transparent)]
    Network(#[from] FetchError),
    #[error(transparent)]
    Verification(#[from] VerifyError),
    #[error(transparent)]
    MalformedVersion(#[from] MalformedVersion),
    #[error("installed version is unknown: {0}")]
    InstalledVersion(String),
}

/// Error surfaced at the orchestrator boundary. A critical error ends the
/// process after the user acknowledges the fatal dialog.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct UpdateError {
    pub kind: UpdateErrorKind,
    pub critical: bool,
}

impl UpdateError {
    pub fn recoverable(kind: impl Into<UpdateErrorKind>) -> Self {
        Self {
            kind: kind.into(),
            critical: false,
        }
    }

    pub fn critical(kind: impl Into<UpdateErrorKind>) -> Self {
        Self {
            kind: kind.into(),
            critical: true,
        }
    }

    #[must_use]
    pub fn escalate(mut self, critical: bool) -> Self {
        self.critical |= critical;
        self
    }

    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            UpdateErrorKind::Network(_) => "network",
            UpdateErrorKind::Verification(_) => "verification",
            UpdateErrorKind::MalformedVersion(_) => "malformed-version",
            UpdateErrorKind::InstalledVersion(_) => "installed-version",
        }
    }
}

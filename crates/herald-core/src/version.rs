use std::cmp::Ordering;

use semver::Version;

use crate::error::MalformedVersion;

/// Parse a semantic version, tolerating a single leading `v`.
///
/// # Errors
/// Returns [`MalformedVersion`] when the value is not valid SemVer 2.0.
pub fn parse_version(value: &str) -> Result<Version, MalformedVersion> {
    let trimmed = value.trim();
    let bare = trimmed.strip_prefix('v').unwrap_or(trimmed);
    Version::parse(bare).map_err(|source| MalformedVersion {
        value: value.to_string(),
        source,
    })
}

/// Compare two versions by SemVer precedence. Build metadata is ignored.
#[must_use]
pub fn precedence(a: &Version, b: &Version) -> Ordering {
    (a.major, a.minor, a.patch, &a.pre).cmp(&(b.major, b.minor, b.patch, &b.pre))
}

/// Compare two version strings by SemVer precedence.
///
/// # Errors
/// Returns [`MalformedVersion`] for whichever side fails to parse first.
pub fn compare(a: &str, b: &str) -> Result<Ordering, MalformedVersion> {
    Ok(precedence(&parse_version(a)?, &parse_version(b)?))
}

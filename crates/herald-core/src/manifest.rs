//! Trust boundary for update manifests.
//!
//! A manifest is a compact JWS token (`header.payload.signature`, each part
//! base64url) signed with Ed25519. Nothing inside the payload is decoded
//! before the signature has been checked against the trusted key.

use base64::Engine as _;
use base64::alphabet;
use base64::engine::general_purpose::{self, GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use ed25519_dalek::{Signature, VerifyingKey};
use serde::Deserialize;

use crate::error::VerifyError;
use crate::fetch::RawManifestToken;
use crate::version::parse_version;

const SIGNING_ALGORITHM: &str = "EdDSA";

const BASE64_URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Ed25519 public key the publisher signs manifests with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedKey(VerifyingKey);

impl TrustedKey {
    /// Parse a key given as 64 hex characters or as base64 of 32 bytes.
    ///
    /// # Errors
    /// Returns [`VerifyError::TrustedKey`] when the value does not decode to a
    /// valid Ed25519 point.
    pub fn parse(raw: &str) -> Result<Self, VerifyError> {
        let bytes = decode_hex_or_base64(raw)?;
        let key_bytes: [u8; 32] = bytes.try_into().map_err(|_| {
            VerifyError::TrustedKey("Ed25519 public key must decode to 32 bytes".to_string())
        })?;
        Self::from_bytes(&key_bytes)
    }

    /// # Errors
    /// Returns [`VerifyError::TrustedKey`] when the bytes are not a valid point.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, VerifyError> {
        VerifyingKey::from_bytes(bytes)
            .map(Self)
            .map_err(|_| VerifyError::TrustedKey("invalid Ed25519 public key bytes".to_string()))
    }
}

/// Verified contents of a manifest. Both versions are known to be valid
/// semantic versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateDescriptor {
    version: String,
    minimum_version: Option<String>,
}

impl UpdateDescriptor {
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Installed versions below this one are unsupported.
    #[must_use]
    pub fn minimum_version(&self) -> Option<&str> {
        self.minimum_version.as_deref()
    }
}

#[derive(Deserialize)]
struct Header {
    alg: String,
}

#[derive(Deserialize)]
struct Payload {
    version: String,
    #[serde(default, alias = "minimumVersion", alias = "minimum_version")]
    min: Option<String>,
}

/// Check the manifest signature, then decode and validate its payload.
///
/// # Errors
/// Returns [`VerifyError`] when the token is malformed, signed with another
/// algorithm or key, or carries a payload without a valid `version`.
pub fn verify(token: &RawManifestToken, key: &TrustedKey) -> Result<UpdateDescriptor, VerifyError> {
    let mut parts = token.as_str().split('.');
    let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(VerifyError::MalformedToken);
    };

    let header_bytes = decode_part("header", header_b64)?;
    let header: Header = serde_json::from_slice(&header_bytes).map_err(VerifyError::Header)?;
    if header.alg != SIGNING_ALGORITHM {
        return Err(VerifyError::UnsupportedAlgorithm(header.alg));
    }

    let signature_bytes = decode_part("signature", signature_b64)?;
    let signature = Signature::from_slice(&signature_bytes).map_err(|_| VerifyError::Signature)?;
    let signing_input = &token.as_str()[..header_b64.len() + 1 + payload_b64.len()];
    key.0
        .verify_strict(signing_input.as_bytes(), &signature)
        .map_err(|_| VerifyError::Signature)?;

    let payload_bytes = decode_part("payload", payload_b64)?;
    let payload = decode_payload(&payload_bytes)?;

    parse_version(&payload.version).map_err(|source| VerifyError::Version {
        field: "version",
        source,
    })?;
    if let Some(min) = &payload.min {
        parse_version(min).map_err(|source| VerifyError::Version {
            field: "min",
            source,
        })?;
    }

    Ok(UpdateDescriptor {
        version: payload.version,
        minimum_version: payload.min,
    })
}

/// The payload must be a JSON object. Going through a map first keeps serde
/// from filling the struct positionally out of an array.
fn decode_payload(bytes: &[u8]) -> Result<Payload, VerifyError> {
    let fields: serde_json::Map<String, serde_json::Value> =
        serde_json::from_slice(bytes).map_err(VerifyError::Payload)?;
    serde_json::from_value(serde_json::Value::Object(fields)).map_err(VerifyError::Payload)
}

fn decode_part(part: &'static str, encoded: &str) -> Result<Vec<u8>, VerifyError> {
    BASE64_URL
        .decode(encoded)
        .map_err(|source| VerifyError::Encoding { part, source })
}

fn decode_hex_or_base64(raw: &str) -> Result<Vec<u8>, VerifyError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(VerifyError::TrustedKey("key is empty".to_string()));
    }
    if trimmed.len() % 2 == 0 && trimmed.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return decode_hex(trimmed);
    }

    general_purpose::STANDARD
        .decode(trimmed)
        .or_else(|_| general_purpose::STANDARD_NO_PAD.decode(trimmed))
        .or_else(|_| BASE64_URL.decode(trimmed))
        .map_err(|_| VerifyError::TrustedKey("key must be hex or base64 encoded".to_string()))
}

fn decode_hex(hex: &str) -> Result<Vec<u8>, VerifyError> {
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| VerifyError::TrustedKey("invalid hex digit".to_string()))
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    use base64::Engine as _;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use ed25519_dalek::{Signer, SigningKey};

    use super::TrustedKey;
    use crate::fetch::RawManifestToken;

    pub(crate) fn signing_key() -> SigningKey {
        SigningKey::from_bytes(&[7_u8; 32])
    }

    pub(crate) fn trusted_key() -> TrustedKey {
        TrustedKey::from_bytes(&signing_key().verifying_key().to_bytes())
            .expect("test key should be valid")
    }

    pub(crate) fn sign_with(key: &SigningKey, header: &str, payload: &str) -> RawManifestToken {
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(payload)
        );
        let signature = key.sign(signing_input.as_bytes());
        RawManifestToken::new(&format!(
            "{signing_input}.{}",
            URL_SAFE_NO_PAD.encode(signature.to_bytes())
        ))
    }

    pub(crate) fn signed_manifest(payload: &str) -> RawManifestToken {
        sign_with(&signing_key(), r#"{"alg":"EdDSA","typ":"JWT"}"#, payload)
    }
}

#[cfg(test)]
mod tests {
    use base64::Engine as _;
    use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
    use ed25519_dalek::SigningKey;

    use super::test_support::{sign_with, signed_manifest, signing_key, trusted_key};
    use super::{TrustedKey, verify};
    use crate::error::VerifyError;
    use crate::fetch::RawManifestToken;

    #[test]
    fn verifies_and_decodes_signed_manifest() {
        let token = signed_manifest(r#"{"version":"1.3.0","min":"1.1.0","notes":"ignored"}"#);

        let descriptor = verify(&token, &trusted_key()).expect("manifest should verify");

        assert_eq!(descriptor.version(), "1.3.0");
        assert_eq!(descriptor.minimum_version(), Some("1.1.0"));
    }

    #[test]
    fn accepts_minimum_version_alias() {
        let token = signed_manifest(r#"{"version":"2.0.0","minimumVersion":"1.5.0"}"#);

        let descriptor = verify(&token, &trusted_key()).expect("manifest should verify");

        assert_eq!(descriptor.minimum_version(), Some("1.5.0"));
    }

    #[test]
    fn minimum_version_is_optional() {
        let token = signed_manifest(r#"{"version":"2.0.0"}"#);

        let descriptor = verify(&token, &trusted_key()).expect("manifest should verify");

        assert_eq!(descriptor.minimum_version(), None);
    }

    #[test]
    fn rejects_manifest_signed_by_another_key() {
        let attacker = SigningKey::from_bytes(&[9_u8; 32]);
        let token = sign_with(
            &attacker,
            r#"{"alg":"EdDSA"}"#,
            r#"{"version":"9.9.9","min":"9.9.9"}"#,
        );

        let error = verify(&token, &trusted_key()).expect_err("foreign signature must fail");

        assert!(matches!(error, VerifyError::Signature));
    }

    #[test]
    fn rejects_tampered_payload() {
        let token = signed_manifest(r#"{"version":"1.3.0"}"#);
        let mut parts: Vec<String> = token.as_str().split('.').map(str::to_string).collect();
        parts[1] = URL_SAFE_NO_PAD.encode(r#"{"version":"1.3.0","min":"1.3.0"}"#);
        let tampered = RawManifestToken::new(&parts.join("."));

        let error = verify(&tampered, &trusted_key()).expect_err("tampered payload must fail");

        assert!(matches!(error, VerifyError::Signature));
    }

    #[test]
    fn signature_is_checked_before_payload_is_parsed() {
        let attacker = SigningKey::from_bytes(&[9_u8; 32]);
        let token = sign_with(&attacker, r#"{"alg":"EdDSA"}"#, "not json at all");

        let error = verify(&token, &trusted_key()).expect_err("foreign signature must fail");

        assert!(matches!(error, VerifyError::Signature));
    }

    #[test]
    fn rejects_other_algorithms() {
        let token = sign_with(&signing_key(), r#"{"alg":"none"}"#, r#"{"version":"1.0.0"}"#);

        let error = verify(&token, &trusted_key()).expect_err("alg none must fail");

        assert!(matches!(error, VerifyError::UnsupportedAlgorithm(alg) if alg == "none"));
    }

    #[test]
    fn rejects_tokens_without_three_parts() {
        for raw in ["", "abc", "a.b", "a.b.c.d"] {
            let error = verify(&RawManifestToken::new(raw), &trusted_key())
                .expect_err("malformed token must fail");
            assert!(matches!(error, VerifyError::MalformedToken), "{raw}");
        }
    }

    #[test]
    fn rejects_payload_without_version() {
        let token = signed_manifest(r#"{"min":"1.0.0"}"#);

        let error = verify(&token, &trusted_key()).expect_err("missing version must fail");

        assert!(matches!(error, VerifyError::Payload(_)));
    }

    #[test]
    fn rejects_payload_that_is_not_an_object() {
        let token = signed_manifest(r#"["1.0.0"]"#);

        let error = verify(&token, &trusted_key()).expect_err("array payload must fail");

        assert!(matches!(error, VerifyError::Payload(_)));
    }

    #[test]
    fn rejects_positional_array_carrying_a_minimum() {
        for payload in [r#"["1.0.0","9.9.9"]"#, r#""1.0.0""#, "null"] {
            let token = signed_manifest(payload);

            let error = verify(&token, &trusted_key()).expect_err("non-object payload must fail");

            assert!(matches!(error, VerifyError::Payload(_)), "{payload}");
        }
    }

    #[test]
    fn rejects_unparsable_versions() {
        let token = signed_manifest(r#"{"version":"one point two"}"#);
        let error = verify(&token, &trusted_key()).expect_err("bad version must fail");
        assert!(matches!(error, VerifyError::Version { field: "version", .. }));

        let token = signed_manifest(r#"{"version":"1.2.0","min":"1.x"}"#);
        let error = verify(&token, &trusted_key()).expect_err("bad minimum must fail");
        assert!(matches!(error, VerifyError::Version { field: "min", .. }));
    }

    #[test]
    fn trusted_key_parses_hex_and_base64() {
        let bytes = signing_key().verifying_key().to_bytes();
        let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();

        assert_eq!(
            TrustedKey::parse(&hex).expect("hex key"),
            trusted_key()
        );
        assert_eq!(
            TrustedKey::parse(&STANDARD.encode(bytes)).expect("base64 key"),
            trusted_key()
        );
        assert!(TrustedKey::parse("").is_err());
        assert!(TrustedKey::parse("abcd").is_err());
    }
}

//! Parsing, canonicalization and rendering of policy documents (C1).
//!
//! Provider wire format is URL-encoded JSON (IAM returns policy documents
//! this way for inline policies, managed policy versions, and assume-role
//! policies); bucket policies and on-disk YAML carry plain JSON/YAML.
//! `iam-policy-autopilot-access-denied/src/aws/iam_client.rs` decodes this
//! once, inline, for a single call site (`get_inline_policy`); this module
//! generalises that into the codec reused by the cloud fetcher and the
//! snapshot store alike.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

use crate::json::{canonicalize, JsonValue};

#[derive(thiserror::Error, Debug)]
pub enum PolicyCodecError {
    #[error("invalid URL escape at byte offset {offset}")]
    UrlDecode { offset: usize },
    #[error("invalid policy JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A parsed, canonicalized policy document.
///
/// Equality compares canonical forms (see `json::JsonValue`'s `PartialEq`),
/// satisfying the data model invariant that two `PolicyDocument`s are equal
/// iff their canonical serializations are byte-equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDocument {
    canonical: JsonValue,
}

impl PolicyDocument {
    /// Wrap an already-canonical value. Used by callers (e.g. the YAML
    /// snapshot store) that construct a `JsonValue` directly rather than
    /// going through JSON text.
    pub fn from_canonical(value: JsonValue) -> Self {
        PolicyDocument {
            canonical: canonicalize(value),
        }
    }

    pub fn as_json_value(&self) -> JsonValue {
        self.canonical.clone()
    }

    /// Two-space-indented, deterministic JSON rendering, used verbatim as
    /// the `--policy-document` CLI argument.
    pub fn render_pretty_json(&self) -> String {
        let value: Value = self.canonical.clone().into();
        serde_json::to_string_pretty(&value).expect("canonical JsonValue always serializes")
    }

    /// Compact JSON, used where the plan needs a single-line embed.
    pub fn render_compact_json(&self) -> String {
        let value: Value = self.canonical.clone().into();
        serde_json::to_string(&value).expect("canonical JsonValue always serializes")
    }

    /// Inverse of `parse_url_encoded_json`, for round-trip tests and for
    /// any caller that needs to hand a policy back to the provider in its
    /// native wire encoding.
    pub fn encode_url_escaped(&self) -> String {
        let json = self.render_compact_json();
        utf8_percent_encode(&json, POLICY_ENCODE_SET).to_string()
    }
}

impl fmt::Display for PolicyDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render_compact_json())
    }
}

/// Serializes/deserializes as its canonical `JsonValue` body; this is
/// what lets the YAML snapshot store embed a policy document inline as
/// a nested mapping rather than a quoted JSON string, and what
/// re-canonicalizes on load so `Load(Dump(A)) == A` holds regardless of
/// key order in the source file.
impl Serialize for PolicyDocument {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.canonical.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PolicyDocument {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = JsonValue::deserialize(deserializer)?;
        Ok(PolicyDocument::from_canonical(value))
    }
}

const POLICY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

pub fn parse_plain_json(s: &str) -> Result<PolicyDocument, PolicyCodecError> {
    let value: Value = serde_json::from_str(s)?;
    Ok(PolicyDocument::from_canonical(JsonValue::from(value)))
}

pub fn parse_url_encoded_json(s: &str) -> Result<PolicyDocument, PolicyCodecError> {
    let decoded = percent_decode_str(s)
        .decode_utf8()
        .map_err(|e| PolicyCodecError::UrlDecode {
            offset: e.utf8_error().valid_up_to(),
        })?;
    parse_plain_json(&decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_round_trip_modulo_canonicalization() {
        let doc = parse_plain_json(r#"{"Action":["s3:Put","s3:Get"]}"#).unwrap();
        let encoded = doc.encode_url_escaped();
        let decoded = parse_url_encoded_json(&encoded).unwrap();
        assert_eq!(doc, decoded);
    }

    #[test]
    fn pretty_json_is_two_space_indented() {
        let doc = parse_plain_json(r#"{"Version":"2012-10-17"}"#).unwrap();
        let pretty = doc.render_pretty_json();
        assert!(pretty.contains("\n  \"Version\""));
    }

    #[test]
    fn invalid_json_is_a_codec_error() {
        let err = parse_plain_json("{not json").unwrap_err();
        assert!(matches!(err, PolicyCodecError::Json(_)));
    }

    #[test]
    fn equal_after_canonicalization_despite_different_source_order() {
        let a = parse_plain_json(r#"{"Action":["s3:Get","s3:Put"]}"#).unwrap();
        let b = parse_plain_json(r#"{"Action":["s3:Put","s3:Get"]}"#).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn single_element_array_equals_scalar() {
        let a = parse_plain_json(r#"{"Action":"s3:Get"}"#).unwrap();
        let b = parse_plain_json(r#"{"Action":["s3:Get"]}"#).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn serde_round_trip_preserves_canonical_equality() {
        let doc = parse_plain_json(r#"{"Action":["s3:Put","s3:Get"]}"#).unwrap();
        let text = serde_json::to_string(&doc).unwrap();
        let parsed: PolicyDocument = serde_json::from_str(&text).unwrap();
        assert_eq!(doc, parsed);
    }
}

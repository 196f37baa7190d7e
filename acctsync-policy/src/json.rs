//! Tagged-sum JSON representation used by the canonicalizer.
//!
//! The donor tool normalises policy documents via Go's `reflect` package,
//! walking arbitrary `interface{}` values at runtime. Per the redesign
//! guidance this is replaced with an explicit sum type and pattern
//! matching — no reflection, no runtime type assertions.

use std::fmt;

use indexmap::IndexMap;
use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Number, Value};

/// An ordered, string-keyed JSON value.
///
/// Object key order is preserved from the source document so pretty
/// serialization is stable, but `PartialEq` on `Object` compares by
/// key-set and value equality (see `Invariant` in the data model: two
/// `PolicyDocument`s compare equal iff their *canonical* serializations
/// are byte-equal, and canonical form sorts/collapses arrays but never
/// reorders object keys).
///
/// `Serialize`/`Deserialize` are hand-written rather than derived so the
/// same type speaks both `serde_json` and `serde_yaml`'s data models; a
/// YAML mapping may carry non-string keys (numbers, bools), and these are
/// stringified on the way in, matching the on-disk schema's requirement
/// that map keys are strings at every depth.
#[derive(Debug, Clone)]
pub enum JsonValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<JsonValue>),
    Object(IndexMap<String, JsonValue>),
}

impl PartialEq for JsonValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => {
                a.len() == b.len() && a.iter().all(|(k, v)| b.get(k) == Some(v))
            }
            _ => false,
        }
    }
}

impl Eq for JsonValue {}

impl From<Value> for JsonValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(b),
            Value::Number(n) => JsonValue::Number(n),
            Value::String(s) => JsonValue::String(s),
            Value::Array(items) => JsonValue::Array(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => {
                let mut out = IndexMap::with_capacity(map.len());
                for (k, v) in map {
                    out.insert(k, v.into());
                }
                JsonValue::Object(out)
            }
        }
    }
}

impl From<JsonValue> for Value {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(b),
            JsonValue::Number(n) => Value::Number(n),
            JsonValue::String(s) => Value::String(s),
            JsonValue::Array(items) => Value::Array(items.into_iter().map(Into::into).collect()),
            JsonValue::Object(map) => {
                let mut out = serde_json::Map::with_capacity(map.len());
                for (k, v) in map {
                    out.insert(k, v.into());
                }
                Value::Object(out)
            }
        }
    }
}

/// Recursively normalises a parsed policy value:
///   1. arrays of length 1 collapse to their single element
///   2. string arrays of length > 1 are sorted lexicographically
///   3. object values are normalised recursively, key order untouched
///
/// Idempotent: `canonicalize(canonicalize(v)) == canonicalize(v)`.
pub fn canonicalize(value: JsonValue) -> JsonValue {
    match value {
        JsonValue::Array(items) => {
            let normalised: Vec<JsonValue> = items.into_iter().map(canonicalize).collect();
            if normalised.len() == 1 {
                return normalised.into_iter().next().expect("checked len == 1");
            }
            if normalised.len() > 1 && normalised.iter().all(is_string) {
                let mut strings: Vec<String> = normalised
                    .into_iter()
                    .map(|v| match v {
                        JsonValue::String(s) => s,
                        _ => unreachable!("all elements checked to be strings"),
                    })
                    .collect();
                strings.sort();
                return JsonValue::Array(strings.into_iter().map(JsonValue::String).collect());
            }
            JsonValue::Array(normalised)
        }
        JsonValue::Object(map) => {
            let mut out = IndexMap::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k, canonicalize(v));
            }
            JsonValue::Object(out)
        }
        other => other,
    }
}

fn is_string(v: &JsonValue) -> bool {
    matches!(v, JsonValue::String(_))
}

impl Serialize for JsonValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            JsonValue::Null => serializer.serialize_unit(),
            JsonValue::Bool(b) => serializer.serialize_bool(*b),
            JsonValue::Number(n) => n.serialize(serializer),
            JsonValue::String(s) => serializer.serialize_str(s),
            JsonValue::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            JsonValue::Object(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
        }
    }
}

/// A map key that accepts any YAML/JSON scalar and stringifies it.
struct StringifiedKey(String);

impl<'de> Deserialize<'de> for StringifiedKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct KeyVisitor;

        impl<'de> Visitor<'de> for KeyVisitor {
            type Value = StringifiedKey;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "a scalar map key")
            }

            fn visit_str<E>(self, v: &str) -> Result<StringifiedKey, E> {
                Ok(StringifiedKey(v.to_owned()))
            }

            fn visit_string<E>(self, v: String) -> Result<StringifiedKey, E> {
                Ok(StringifiedKey(v))
            }

            fn visit_bool<E>(self, v: bool) -> Result<StringifiedKey, E> {
                Ok(StringifiedKey(v.to_string()))
            }

            fn visit_i64<E>(self, v: i64) -> Result<StringifiedKey, E> {
                Ok(StringifiedKey(v.to_string()))
            }

            fn visit_u64<E>(self, v: u64) -> Result<StringifiedKey, E> {
                Ok(StringifiedKey(v.to_string()))
            }

            fn visit_f64<E>(self, v: f64) -> Result<StringifiedKey, E> {
                Ok(StringifiedKey(v.to_string()))
            }
        }

        deserializer.deserialize_any(KeyVisitor)
    }
}

impl<'de> Deserialize<'de> for JsonValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct JsonValueVisitor;

        impl<'de> Visitor<'de> for JsonValueVisitor {
            type Value = JsonValue;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "a JSON-like value")
            }

            fn visit_unit<E>(self) -> Result<JsonValue, E> {
                Ok(JsonValue::Null)
            }

            fn visit_none<E>(self) -> Result<JsonValue, E> {
                Ok(JsonValue::Null)
            }

            fn visit_some<D>(self, deserializer: D) -> Result<JsonValue, D::Error>
            where
                D: Deserializer<'de>,
            {
                Deserialize::deserialize(deserializer)
            }

            fn visit_bool<E>(self, v: bool) -> Result<JsonValue, E> {
                Ok(JsonValue::Bool(v))
            }

            fn visit_i64<E>(self, v: i64) -> Result<JsonValue, E> {
                Ok(JsonValue::Number(v.into()))
            }

            fn visit_u64<E>(self, v: u64) -> Result<JsonValue, E> {
                Ok(JsonValue::Number(v.into()))
            }

            fn visit_f64<E>(self, v: f64) -> Result<JsonValue, E>
            where
                E: serde::de::Error,
            {
                Number::from_f64(v)
                    .map(JsonValue::Number)
                    .ok_or_else(|| serde::de::Error::custom("non-finite number"))
            }

            fn visit_str<E>(self, v: &str) -> Result<JsonValue, E> {
                Ok(JsonValue::String(v.to_owned()))
            }

            fn visit_string<E>(self, v: String) -> Result<JsonValue, E> {
                Ok(JsonValue::String(v))
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<JsonValue, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut items = Vec::new();
                while let Some(item) = seq.next_element()? {
                    items.push(item);
                }
                Ok(JsonValue::Array(items))
            }

            fn visit_map<A>(self, mut map: A) -> Result<JsonValue, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut out = IndexMap::new();
                while let Some((key, value)) = map.next_entry::<StringifiedKey, JsonValue>()? {
                    out.insert(key.0, value);
                }
                Ok(JsonValue::Object(out))
            }
        }

        deserializer.deserialize_any(JsonValueVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn canon(v: Value) -> JsonValue {
        canonicalize(JsonValue::from(v))
    }

    #[test]
    fn single_element_array_collapses() {
        let got = canon(json!({"Action": ["s3:Get"]}));
        let want = canon(json!({"Action": "s3:Get"}));
        assert_eq!(got, want);
    }

    #[test]
    fn multi_element_string_arrays_sort() {
        let got = canon(json!({"Action": ["s3:Put", "s3:Get"]}));
        let want = canon(json!({"Action": ["s3:Get", "s3:Put"]}));
        assert_eq!(got, want);
    }

    #[test]
    fn canonicalization_is_idempotent() {
        let once = canon(json!({"Action": ["s3:Put", "s3:Get"], "Resource": ["arn:aws:s3:::x"]}));
        let twice = canonicalize(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn nested_objects_are_recursed_into() {
        let got = canon(json!({
            "Statement": [{"Action": ["b", "a"]}]
        }));
        let want = canon(json!({
            "Statement": {"Action": ["a", "b"]}
        }));
        assert_eq!(got, want);
    }

    #[test]
    fn object_key_order_is_irrelevant_to_equality() {
        let a = canon(json!({"A": 1, "B": 2}));
        let b = canon(json!({"B": 2, "A": 1}));
        assert_eq!(a, b);
    }

    #[test]
    fn non_string_arrays_are_not_sorted() {
        let got = canon(json!({"Numbers": [3, 1, 2]}));
        if let JsonValue::Object(map) = got {
            assert_eq!(map.get("Numbers"), Some(&JsonValue::from(json!([3, 1, 2]))));
        } else {
            panic!("expected object");
        }
    }

    #[test]
    fn serde_round_trips_through_json_text() {
        let original = JsonValue::from(json!({"Action": ["s3:Get", "s3:Put"], "Count": 3}));
        let text = serde_json::to_string(&original).unwrap();
        let parsed: JsonValue = serde_json::from_str(&text).unwrap();
        assert_eq!(original, parsed);
    }
}

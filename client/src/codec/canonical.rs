//! Canonical JSON rendering of transaction payloads.
//!
//! Every object's keys are sorted by byte order at every depth, arrays keep
//! their element order, scalars pass through untouched, and the result is
//! serialized without whitespace. The function is pure: no clock, no
//! randomness, no hidden state. Feeding its output back in yields the same
//! output.
//!
//! The ordering is rebuilt explicitly instead of trusting
//! `serde_json::Map`'s backing store, which switches to insertion order as
//! soon as any crate in the build enables `preserve_order`.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors produced while canonicalizing a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The top-level value was not a JSON object.
    #[error("canonical input must be an object, got {0}")]
    TypeMismatch(&'static str),

    /// The value cannot be represented as JSON (non-string map keys,
    /// failing `Serialize` impls, ...).
    #[error("value is not JSON-serializable: {0}")]
    NotSerializable(String),
}

/// The canonical rendering of a payload: the key-sorted object used for
/// submission and the exact bytes used for signing.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalForm {
    ordered: Map<String, Value>,
    bytes: Vec<u8>,
}

impl CanonicalForm {
    /// The key-sorted object, as placed in the wire transaction.
    pub fn ordered(&self) -> &Map<String, Value> {
        &self.ordered
    }

    /// The compact JSON bytes. These are what gets signed and verified.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The canonical bytes as text. Always valid UTF-8 since serde_json
    /// only emits UTF-8.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.bytes).unwrap_or_default()
    }

    /// Clones the ordered object into a standalone [`Value`].
    pub fn to_value(&self) -> Value {
        Value::Object(self.ordered.clone())
    }
}

/// Canonicalizes a JSON object.
///
/// Fails with [`CodecError::TypeMismatch`] when `value` is not an object.
pub fn canonicalize(value: &Value) -> Result<CanonicalForm, CodecError> {
    let map = match value {
        Value::Object(map) => map,
        other => return Err(CodecError::TypeMismatch(kind_name(other))),
    };

    let ordered = sort_map(map);
    let bytes =
        serde_json::to_vec(&ordered).map_err(|e| CodecError::NotSerializable(e.to_string()))?;

    Ok(CanonicalForm { ordered, bytes })
}

/// Canonicalizes anything that implements `Serialize` by first lowering it
/// to a JSON value.
///
/// Fails with [`CodecError::NotSerializable`] when the lowering fails, e.g.
/// for maps whose keys are not strings or numbers.
pub fn canonicalize_serializable<T: Serialize + ?Sized>(
    value: &T,
) -> Result<CanonicalForm, CodecError> {
    let value =
        serde_json::to_value(value).map_err(|e| CodecError::NotSerializable(e.to_string()))?;
    canonicalize(&value)
}

fn sort_map(map: &Map<String, Value>) -> Map<String, Value> {
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

    let mut sorted = Map::new();
    for (key, value) in entries {
        sorted.insert(key.clone(), sort_value(value));
    }
    sorted
}

fn sort_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(sort_map(map)),
        Value::Array(items) => Value::Array(items.iter().map(sort_value).collect()),
        scalar => scalar.clone(),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

use canonical_json::to_string;
use serde_json::{Map, Number, Value};

use crate::value::CanonicalValue;
use std::collections::BTreeMap;
use std::fmt;

/// Error returned when a value cannot be brought into canonical form.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CanonicalizationError {
    /// A duplicate mapping key was supplied while building a mapping.
    #[error("duplicate key detected: {0}")]
    DuplicateKey(String),
    /// Fractional or non-finite number detected; only integers are canonical.
    #[error("non-integer number detected at {0}")]
    NonIntegerNumber(String),
    /// Integer outside the signed 64-bit range.
    #[error("number out of range: {0}")]
    NumberOutOfRange(String),
    /// The canonical serializer failed.
    #[error("canonical rendering failed: {0}")]
    Render(String),
}

/// Helper for building JSON paths in error messages.
#[derive(Debug, Clone)]
struct Path {
    segments: Vec<String>,
}

impl Path {
    fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    fn push_field(&self, field: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(field.to_string());
        Self { segments }
    }

    fn push_index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(format!("[{}]", index));
        Self { segments }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            write!(f, "root")
        } else {
            write!(f, "{}", self.segments.join("."))
        }
    }
}

/// Produces the one canonical string for `value`.
///
/// The value is lowered to JSON and rendered by `canonical_json`: mapping
/// keys in ascending byte order, sequences in element order, non-ASCII and
/// control characters as `\uXXXX` escapes, no insignificant whitespace.
///
/// # Errors
///
/// Returns [`CanonicalizationError::Render`] if the serializer fails.
pub fn canonicalize(value: &CanonicalValue) -> Result<String, CanonicalizationError> {
    to_string(&to_json(value)).map_err(|err| CanonicalizationError::Render(err.to_string()))
}

/// Converts arbitrary JSON into canonical form.
///
/// # Errors
///
/// Returns [`CanonicalizationError`] if the JSON contains a fractional number
/// or an integer that does not fit in `i64`.
pub fn canonicalize_json(value: &Value) -> Result<String, CanonicalizationError> {
    let value = CanonicalValue::try_from(value)?;
    canonicalize(&value)
}

impl TryFrom<&Value> for CanonicalValue {
    type Error = CanonicalizationError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        from_json(value, Path::root())
    }
}

fn from_json(value: &Value, path: Path) -> Result<CanonicalValue, CanonicalizationError> {
    match value {
        Value::Null => Ok(CanonicalValue::Null),
        Value::Bool(b) => Ok(CanonicalValue::Bool(*b)),
        Value::Number(num) => {
            if let Some(i) = num.as_i64() {
                Ok(CanonicalValue::Number(i))
            } else if num.is_u64() {
                Err(CanonicalizationError::NumberOutOfRange(format!(
                    "{} at {}",
                    num, path
                )))
            } else {
                Err(CanonicalizationError::NonIntegerNumber(path.to_string()))
            }
        }
        Value::String(s) => Ok(CanonicalValue::String(s.clone())),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(idx, item)| from_json(item, path.push_index(idx)))
            .collect::<Result<Vec<_>, _>>()
            .map(CanonicalValue::Sequence),
        Value::Object(map) => {
            let mut out = BTreeMap::new();
            for (key, child) in map {
                out.insert(key.clone(), from_json(child, path.push_field(key))?);
            }
            Ok(CanonicalValue::Mapping(out))
        }
    }
}

fn to_json(value: &CanonicalValue) -> Value {
    match value {
        CanonicalValue::Null => Value::Null,
        CanonicalValue::Bool(b) => Value::Bool(*b),
        CanonicalValue::Number(n) => Value::Number(Number::from(*n)),
        CanonicalValue::String(s) => Value::String(s.clone()),
        CanonicalValue::Sequence(items) => Value::Array(items.iter().map(to_json).collect()),
        CanonicalValue::Mapping(map) => {
            let mut out = Map::new();
            for (key, child) in map {
                out.insert(key.clone(), to_json(child));
            }
            Value::Object(out)
        }
    }
}

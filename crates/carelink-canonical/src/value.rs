use std::collections::BTreeMap;

use crate::canonicalizer::CanonicalizationError;

/// Structured value accepted by the canonicalizer.
///
/// Numbers are integers only: amounts are carried in minor units (cents,
/// token base units) so the canonical form never depends on float formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanonicalValue {
    /// Explicit absence (`null`).
    Null,
    /// Boolean literal.
    Bool(bool),
    /// Signed integer.
    Number(i64),
    /// UTF-8 string.
    String(String),
    /// Ordered sequence; element order is significant.
    Sequence(Vec<CanonicalValue>),
    /// Key/value mapping; key order is not significant.
    Mapping(BTreeMap<String, CanonicalValue>),
}

impl CanonicalValue {
    /// Builds a mapping from key/value pairs in any order.
    ///
    /// Fails with [`CanonicalizationError::DuplicateKey`] when a key repeats,
    /// since picking either value would make the result order-dependent.
    pub fn mapping<K, I>(pairs: I) -> Result<Self, CanonicalizationError>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, CanonicalValue)>,
    {
        let mut map = BTreeMap::new();
        for (key, value) in pairs {
            let key = key.into();
            if map.contains_key(&key) {
                return Err(CanonicalizationError::DuplicateKey(key));
            }
            map.insert(key, value);
        }
        Ok(CanonicalValue::Mapping(map))
    }

    /// Builds a sequence, preserving element order.
    pub fn sequence<I>(items: I) -> Self
    where
        I: IntoIterator<Item = CanonicalValue>,
    {
        CanonicalValue::Sequence(items.into_iter().collect())
    }

    /// Canonical string for this value. Shorthand for [`crate::canonicalize`].
    pub fn to_canonical_string(&self) -> Result<String, CanonicalizationError> {
        crate::canonicalizer::canonicalize(self)
    }
}

impl From<bool> for CanonicalValue {
    fn from(value: bool) -> Self {
        CanonicalValue::Bool(value)
    }
}

impl From<i64> for CanonicalValue {
    fn from(value: i64) -> Self {
        CanonicalValue::Number(value)
    }
}

impl From<i32> for CanonicalValue {
    fn from(value: i32) -> Self {
        CanonicalValue::Number(i64::from(value))
    }
}

impl From<u32> for CanonicalValue {
    fn from(value: u32) -> Self {
        CanonicalValue::Number(i64::from(value))
    }
}

impl TryFrom<u64> for CanonicalValue {
    type Error = CanonicalizationError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        i64::try_from(value)
            .map(CanonicalValue::Number)
            .map_err(|_| CanonicalizationError::NumberOutOfRange(value.to_string()))
    }
}

impl From<&str> for CanonicalValue {
    fn from(value: &str) -> Self {
        CanonicalValue::String(value.to_string())
    }
}

impl From<String> for CanonicalValue {
    fn from(value: String) -> Self {
        CanonicalValue::String(value)
    }
}

impl<T: Into<CanonicalValue>> From<Option<T>> for CanonicalValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(CanonicalValue::Null)
    }
}

impl From<Vec<CanonicalValue>> for CanonicalValue {
    fn from(value: Vec<CanonicalValue>) -> Self {
        CanonicalValue::Sequence(value)
    }
}

impl From<BTreeMap<String, CanonicalValue>> for CanonicalValue {
    fn from(value: BTreeMap<String, CanonicalValue>) -> Self {
        CanonicalValue::Mapping(value)
    }
}

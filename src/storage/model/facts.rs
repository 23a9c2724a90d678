//! Fact values gathered by collectors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Named facts of one collector. Keys are kept sorted so that records of
/// two runs diff cleanly.
pub type Facts = BTreeMap<String, FactValue>;

/// A single fact value: a scalar, an ordered list, or a nested mapping.
///
/// Non-negative integers are always `UInt`, so a value read back from JSON
/// compares equal to the one that was written.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(untagged)]
pub enum FactValue {
    Null,
    Bool(bool),
    UInt(u64),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<FactValue>),
    Map(Facts),
}

impl FactValue {
    /// Builds a mapping value from `(key, value)` pairs.
    pub fn map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<FactValue>,
    {
        FactValue::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FactValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[FactValue]> {
        match self {
            FactValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Facts> {
        match self {
            FactValue::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            FactValue::UInt(v) => Some(v),
            FactValue::Int(v) if v >= 0 => Some(v as u64),
            _ => None,
        }
    }

    /// Looks up `key` when this value is a mapping.
    pub fn get(&self, key: &str) -> Option<&FactValue> {
        self.as_map().and_then(|m| m.get(key))
    }
}

impl From<bool> for FactValue {
    fn from(v: bool) -> Self {
        FactValue::Bool(v)
    }
}

impl From<i64> for FactValue {
    fn from(v: i64) -> Self {
        match u64::try_from(v) {
            Ok(u) => FactValue::UInt(u),
            Err(_) => FactValue::Int(v),
        }
    }
}

impl From<i32> for FactValue {
    fn from(v: i32) -> Self {
        FactValue::from(i64::from(v))
    }
}

impl From<u64> for FactValue {
    fn from(v: u64) -> Self {
        FactValue::UInt(v)
    }
}

impl From<u32> for FactValue {
    fn from(v: u32) -> Self {
        FactValue::UInt(u64::from(v))
    }
}

impl From<u16> for FactValue {
    fn from(v: u16) -> Self {
        FactValue::UInt(u64::from(v))
    }
}

impl From<usize> for FactValue {
    fn from(v: usize) -> Self {
        FactValue::UInt(v as u64)
    }
}

impl From<f64> for FactValue {
    fn from(v: f64) -> Self {
        FactValue::Float(v)
    }
}

impl From<String> for FactValue {
    fn from(v: String) -> Self {
        FactValue::Text(v)
    }
}

impl From<&str> for FactValue {
    fn from(v: &str) -> Self {
        FactValue::Text(v.to_string())
    }
}

impl<T: Into<FactValue>> From<Option<T>> for FactValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(FactValue::Null)
    }
}

impl<T: Into<FactValue>> From<Vec<T>> for FactValue {
    fn from(v: Vec<T>) -> Self {
        FactValue::List(v.into_iter().map(Into::into).collect())
    }
}

impl From<Facts> for FactValue {
    fn from(v: Facts) -> Self {
        FactValue::Map(v)
    }
}

impl From<BTreeMap<String, String>> for FactValue {
    fn from(v: BTreeMap<String, String>) -> Self {
        FactValue::Map(v.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

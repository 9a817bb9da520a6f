//! Row records from the dataset and their scalar cell values.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::BTreeMap;
use std::fmt;

/// A single spreadsheet cell: text, a number, or nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum CellValue {
    Text(String),
    Number(Number),
    Blank,
}

impl CellValue {
    /// Blank cells and empty strings both count as "no value".
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Blank => true,
            CellValue::Text(s) => s.is_empty(),
            CellValue::Number(_) => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Blank => Ok(()),
        }
    }
}

impl From<Value> for CellValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => CellValue::Blank,
            Value::String(s) => CellValue::Text(s),
            Value::Number(n) => CellValue::Number(n),
            Value::Bool(b) => CellValue::Text(b.to_string()),
            other => CellValue::Text(other.to_string()),
        }
    }
}

impl From<CellValue> for Value {
    fn from(cell: CellValue) -> Self {
        match cell {
            CellValue::Text(s) => Value::String(s),
            CellValue::Number(n) => Value::Number(n),
            CellValue::Blank => Value::Null,
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n.into())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        Number::from_f64(n)
            .map(CellValue::Number)
            .unwrap_or(CellValue::Blank)
    }
}

/// One dataset row keyed by column header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowRecord(BTreeMap<String, CellValue>);

impl RowRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<CellValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Builder-style insert, handy for fixtures.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Exact, case-sensitive key lookup.
    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.0.get(key)
    }

    /// Exact lookup first, then the first key equal ignoring case.
    pub fn lookup(&self, key: &str) -> Option<&CellValue> {
        self.0.get(key).or_else(|| {
            let wanted = key.to_lowercase();
            self.0
                .iter()
                .find(|(k, _)| k.to_lowercase() == wanted)
                .map(|(_, v)| v)
        })
    }

    /// Value shown for `placeholder` in the preview sample.
    ///
    /// Tries the upper-cased key, then the key as written; blank cells fall
    /// through and the final fallback is `---`.
    pub fn preview_value(&self, placeholder: &str) -> String {
        [placeholder.to_uppercase(), placeholder.to_string()]
            .iter()
            .filter_map(|key| self.0.get(key))
            .find(|value| !value.is_blank())
            .map(|value| value.to_string())
            .unwrap_or_else(|| "---".to_string())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CellValue)> {
        self.0.iter()
    }
}

impl<K, V> FromIterator<(K, V)> for RowRecord
where
    K: Into<String>,
    V: Into<CellValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

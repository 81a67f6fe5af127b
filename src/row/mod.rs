//! Untyped row values as they come out of the staging store.
//!
//! Extract cells keep the shape the loader coerced them into; nothing in
//! this module knows about tables or schemas. Column order is preserved so
//! serialized rows come out byte-identical between runs.

pub mod guard;

use std::fmt;

use rustc_hash::FxHashMap;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// One staged cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Absent or blank in the extract
    Null,
    /// Integer-typed or integral numeric value
    Int(i64),
    /// Fractional numeric value
    Float(f64),
    /// Everything else, including dates (kept as extract text)
    Text(String),
}

impl CellValue {
    /// True for the null cell
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow the text payload, when this is a text cell
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Integer payload, when this is an integer cell
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric payload widened to f64, for integer and float cells
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Canonical identifier text: the stable key form used in entity ids
    /// and contact indexes. Null renders empty.
    #[must_use]
    pub fn id_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Int(v) => v.to_string(),
            Self::Float(v) => v.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// One staged row: ordered column names with their untyped values.
///
/// Duplicate column names are refused at insert time; merge layers decide
/// what a refused insert means (first occurrence wins there).
#[derive(Debug, Clone, Default)]
pub struct RawRow {
    columns: Vec<String>,
    values: Vec<CellValue>,
    index: FxHashMap<String, usize>,
}

impl RawRow {
    /// Create an empty row
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty row with space for `capacity` columns
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            columns: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
            index: FxHashMap::default(),
        }
    }

    /// Build a row from (column, value) pairs. Duplicate names keep the
    /// first value, matching merge semantics.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, CellValue)>,
        S: Into<String>,
    {
        let mut row = Self::new();
        for (column, value) in pairs {
            row.insert(column.into(), value);
        }
        row
    }

    /// Append a column. Returns false (and leaves the row unchanged) when a
    /// column of that name is already present.
    pub fn insert(&mut self, column: String, value: CellValue) -> bool {
        if self.index.contains_key(&column) {
            return false;
        }
        self.index.insert(column.clone(), self.columns.len());
        self.columns.push(column);
        self.values.push(value);
        true
    }

    /// Value of a column, `None` when the column is not present at all
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.index.get(column).map(|&i| &self.values[i])
    }

    /// True when a column of this name is present (even if its value is null)
    #[must_use]
    pub fn contains_column(&self, column: &str) -> bool {
        self.index.contains_key(column)
    }

    /// Column names in declared order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    /// (column, value) pairs in declared order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Number of columns
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// True when the row has no columns
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl PartialEq for RawRow {
    fn eq(&self, other: &Self) -> bool {
        self.columns == other.columns && self.values == other.values
    }
}

impl Serialize for RawRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

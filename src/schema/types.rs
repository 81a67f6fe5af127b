//! Epic column types and extract value coercion.
//!
//! The vendor documents every column as one of a small set of type labels.
//! Staged values are coerced from extract text using the same rules the
//! SQLite staging loader applies, so both store backends agree on cell
//! shapes.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::row::CellValue;

/// Documented column type of an extract column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ColumnType {
    /// Free text, category labels, most identifiers
    #[default]
    Varchar,
    /// Decimal-bearing numerics (amounts, quantities)
    Numeric,
    /// Whole-number values and numeric identifiers
    Integer,
    /// Floating-point values
    Float,
    /// Timestamps; staged as extract text, parsed on demand
    DateTime,
}

impl ColumnType {
    /// Parse a documented type label. Unknown labels default to `Varchar`,
    /// matching the staging loader's TEXT fallback.
    #[must_use]
    pub fn parse(label: &str) -> Self {
        match label.trim() {
            "NUMERIC" => Self::Numeric,
            "INTEGER" => Self::Integer,
            "FLOAT" => Self::Float,
            "DATETIME" | "DATETIME (Local)" | "DATETIME (UTC)" | "DATETIME (Attached)" => {
                Self::DateTime
            }
            _ => Self::Varchar,
        }
    }

    /// The canonical documentation label
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Varchar => "VARCHAR",
            Self::Numeric => "NUMERIC",
            Self::Integer => "INTEGER",
            Self::Float => "FLOAT",
            Self::DateTime => "DATETIME",
        }
    }

    /// True for the timestamp flavors
    #[must_use]
    pub fn is_datetime(self) -> bool {
        self == Self::DateTime
    }
}

impl From<String> for ColumnType {
    fn from(label: String) -> Self {
        Self::parse(&label)
    }
}

impl From<ColumnType> for String {
    fn from(value: ColumnType) -> Self {
        value.label().to_string()
    }
}

/// Coerce one extract cell into its staged value.
///
/// Blank cells become null. Integer columns parse as i64, falling back to
/// float-then-truncate for exponent forms, then to text. Numeric and float
/// columns parse as f64, collapsed to an integer cell when the value is
/// integral and the literal carries no decimal point. Everything else,
/// timestamps included, stays trimmed text.
#[must_use]
pub fn coerce(raw: &str, column_type: ColumnType) -> CellValue {
    let value = raw.trim();
    if value.is_empty() {
        return CellValue::Null;
    }
    match column_type {
        ColumnType::Integer => match value.parse::<i64>() {
            Ok(v) => CellValue::Int(v),
            Err(_) => match value.parse::<f64>() {
                Ok(f) if f.is_finite() && in_i64_range(f) => CellValue::Int(f.trunc() as i64),
                _ => CellValue::Text(value.to_string()),
            },
        },
        ColumnType::Numeric | ColumnType::Float => match value.parse::<f64>() {
            Ok(f) => {
                if f.is_finite() && f.fract() == 0.0 && in_i64_range(f) && !value.contains('.') {
                    CellValue::Int(f as i64)
                } else {
                    CellValue::Float(f)
                }
            }
            Err(_) => CellValue::Text(value.to_string()),
        },
        ColumnType::Varchar | ColumnType::DateTime => CellValue::Text(value.to_string()),
    }
}

/// Timestamp formats seen in extracts, tried in order
const DATETIME_FORMATS: [&str; 4] = [
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// Date formats seen in extracts, tried in order
const DATE_FORMATS: [&str; 2] = ["%m/%d/%Y", "%Y-%m-%d"];

/// Parse an extract timestamp, accepting date-only forms at midnight
#[must_use]
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let value = text.trim();
    if value.is_empty() {
        return None;
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }
    parse_date(value).map(|d| d.and_hms_opt(0, 0, 0).unwrap_or_default())
}

/// Parse an extract date, dropping any time component first
#[must_use]
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let value = text.trim();
    if value.is_empty() {
        return None;
    }
    let date_part = value.split_whitespace().next().unwrap_or(value);
    for format in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(date_part, format) {
            return Some(d);
        }
    }
    None
}

fn in_i64_range(f: f64) -> bool {
    f >= i64::MIN as f64 && f <= i64::MAX as f64
}

//! Ordering for child sequence columns.
//!
//! Line and sequence columns usually stage as integers but arrive as text
//! in some extracts, so plain lexicographic ordering would put line 10
//! before line 2. Comparison is numeric whenever a cell parses as a
//! number; absent and null cells sort last so partially sequenced
//! collections keep their sequenced prefix first.

use std::cmp::Ordering;

use crate::row::CellValue;

enum SequenceKey<'a> {
    Number(f64),
    Text(&'a str),
}

fn sequence_key(cell: Option<&CellValue>) -> Option<SequenceKey<'_>> {
    match cell? {
        CellValue::Null => None,
        CellValue::Int(v) => Some(SequenceKey::Number(*v as f64)),
        CellValue::Float(v) => Some(SequenceKey::Number(*v)),
        CellValue::Text(s) => match s.trim().parse::<f64>() {
            Ok(n) => Some(SequenceKey::Number(n)),
            Err(_) => Some(SequenceKey::Text(s)),
        },
    }
}

/// Compare two optional sequence cells.
///
/// Numbers order numerically and before text; ties report `Equal` so a
/// stable sort preserves staged order.
#[must_use]
pub fn sequence_ordering(a: Option<&CellValue>, b: Option<&CellValue>) -> Ordering {
    match (sequence_key(a), sequence_key(b)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(SequenceKey::Number(x)), Some(SequenceKey::Number(y))) => x.total_cmp(&y),
        (Some(SequenceKey::Number(_)), Some(SequenceKey::Text(_))) => Ordering::Less,
        (Some(SequenceKey::Text(_)), Some(SequenceKey::Number(_))) => Ordering::Greater,
        (Some(SequenceKey::Text(x)), Some(SequenceKey::Text(y))) => x.cmp(y),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_text_orders_numerically() {
        let two = CellValue::from("2");
        let ten = CellValue::from("10");
        assert_eq!(sequence_ordering(Some(&two), Some(&ten)), Ordering::Less);
    }

    #[test]
    fn test_null_and_absent_sort_last() {
        let one = CellValue::Int(1);
        assert_eq!(sequence_ordering(Some(&one), None), Ordering::Less);
        assert_eq!(
            sequence_ordering(Some(&CellValue::Null), Some(&one)),
            Ordering::Greater
        );
    }

    #[test]
    fn test_mixed_int_and_text_cells_agree() {
        let staged = CellValue::Int(3);
        let raw = CellValue::from("3");
        assert_eq!(sequence_ordering(Some(&staged), Some(&raw)), Ordering::Equal);
    }
}

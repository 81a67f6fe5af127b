//! Field-mapping manifests and the drift check.
//!
//! For each covered physical table the manifest partitions every populated
//! column into mapped (carried into the graph) or intentionally skipped
//! (with an authored reason). A populated column in neither set is drift:
//! upstream added data the mapping has never looked at. Verification fails
//! on it by name; production projection proceeds with the column flagged.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::store::TableStore;

/// A column carried into the subject graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappedColumn {
    /// Extract column name
    pub column: String,
    /// Where the value lands in the composed record
    pub destination: String,
}

/// A column deliberately left out of the graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedColumn {
    /// Extract column name
    pub column: String,
    /// Authored reason the column is not carried
    pub reason: String,
}

/// Mapping manifest of one physical table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Physical table the manifest covers
    pub table: String,
    /// Columns carried into the graph
    #[serde(default)]
    pub mapped: Vec<MappedColumn>,
    /// Columns left out on purpose
    #[serde(default)]
    pub skipped: Vec<SkippedColumn>,
}

/// Outcome of checking one manifest against staged data
#[derive(Debug, Clone, Default)]
pub struct ManifestCheck {
    /// Populated columns in neither manifest set, in first-seen order
    pub drifted: Vec<String>,
    /// Manifest entries for columns with no populated data in this extract
    pub stale: Vec<String>,
}

impl ManifestCheck {
    /// True when no populated column escaped classification
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.drifted.is_empty()
    }
}

impl Manifest {
    /// Every classified column name, mapped and skipped alike
    #[must_use]
    pub fn classified(&self) -> FxHashSet<&str> {
        self.mapped
            .iter()
            .map(|m| m.column.as_str())
            .chain(self.skipped.iter().map(|s| s.column.as_str()))
            .collect()
    }

    /// True when the column appears in either set
    #[must_use]
    pub fn covers(&self, column: &str) -> bool {
        self.mapped.iter().any(|m| m.column == column)
            || self.skipped.iter().any(|s| s.column == column)
    }

    /// Compare the manifest against the columns that actually carry data.
    ///
    /// # Errors
    /// Fails when the table cannot be scanned; a table absent from the
    /// store checks clean apart from every entry reading as stale.
    pub fn check(&self, store: &dyn TableStore) -> Result<ManifestCheck> {
        let observed = if store.table_exists(&self.table) {
            observed_columns(store, &self.table)?
        } else {
            Vec::new()
        };
        let observed_set: FxHashSet<&str> = observed.iter().map(String::as_str).collect();
        let classified = self.classified();

        let drifted = observed
            .iter()
            .filter(|column| !classified.contains(column.as_str()))
            .cloned()
            .collect();
        let stale = self
            .mapped
            .iter()
            .map(|m| m.column.as_str())
            .chain(self.skipped.iter().map(|s| s.column.as_str()))
            .filter(|column| !observed_set.contains(column))
            .map(str::to_string)
            .collect();

        Ok(ManifestCheck { drifted, stale })
    }
}

/// Columns of a table with at least one non-null staged value, in
/// first-seen column order
pub fn observed_columns(store: &dyn TableStore, table: &str) -> Result<Vec<String>> {
    let rows = store.scan(table)?;
    let mut seen = FxHashSet::default();
    let mut observed = Vec::new();
    for row in &rows {
        for (column, value) in row.iter() {
            if !value.is_null() && seen.insert(column.to_string()) {
                observed.push(column.to_string());
            }
        }
    }
    Ok(observed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::{CellValue, RawRow};
    use crate::store::MemoryStore;

    fn account_store() -> MemoryStore {
        MemoryStore::new().with_table(
            "ACCOUNT",
            vec![RawRow::from_pairs([
                ("ACCOUNT_ID", CellValue::Int(9001)),
                ("ACCOUNT_NAME", CellValue::from("MOUSE,MICKEY")),
                ("CITY", CellValue::Null),
            ])],
        )
    }

    #[test]
    fn test_unclassified_populated_column_is_drift() {
        let manifest = Manifest {
            table: "ACCOUNT".to_string(),
            mapped: vec![MappedColumn {
                column: "ACCOUNT_ID".to_string(),
                destination: "account.id".to_string(),
            }],
            skipped: vec![],
        };
        let check = manifest.check(&account_store()).unwrap();
        assert_eq!(check.drifted, vec!["ACCOUNT_NAME".to_string()]);
        assert!(!check.is_clean());
    }

    #[test]
    fn test_never_populated_column_is_not_drift() {
        let manifest = Manifest {
            table: "ACCOUNT".to_string(),
            mapped: vec![
                MappedColumn {
                    column: "ACCOUNT_ID".to_string(),
                    destination: "account.id".to_string(),
                },
                MappedColumn {
                    column: "ACCOUNT_NAME".to_string(),
                    destination: "account.name".to_string(),
                },
            ],
            skipped: vec![SkippedColumn {
                column: "CITY".to_string(),
                reason: "demographics carried on PATIENT".to_string(),
            }],
        };
        let check = manifest.check(&account_store()).unwrap();
        assert!(check.is_clean());
        // CITY never carries data here, so the entry reads as stale
        assert_eq!(check.stale, vec!["CITY".to_string()]);
    }
}

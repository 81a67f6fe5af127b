//! Runtime interception of column reads.
//!
//! Every engine read of a merged row goes through a `ColumnGuard`. In
//! trusting mode the guard is a plain lookup. In verifying mode a read of a
//! column the schema registry does not declare for that logical table is an
//! error naming the column and the declared set, so schema drift surfaces at
//! the first touch instead of as a silent null.

use itertools::Itertools;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{ProjectionError, Result};
use crate::row::{CellValue, RawRow};

/// How reads are checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Plain lookups, no declared-set checking
    Trusting,
    /// Undeclared reads are errors
    Verifying,
}

/// Column-read interceptor for merged logical rows.
///
/// The declared set for a logical table is the union of its split tables'
/// schema columns, plus the fixed allow-list of synthetic names (child
/// attachment keys, computed display fields).
#[derive(Debug, Clone)]
pub struct ColumnGuard {
    declared: FxHashMap<String, FxHashSet<String>>,
    synthetic: FxHashSet<String>,
    mode: AccessMode,
}

impl ColumnGuard {
    /// Create a guard in the given mode with no tables declared yet
    #[must_use]
    pub fn new(mode: AccessMode) -> Self {
        Self {
            declared: FxHashMap::default(),
            synthetic: FxHashSet::default(),
            mode,
        }
    }

    /// Guard that never checks
    #[must_use]
    pub fn trusting() -> Self {
        Self::new(AccessMode::Trusting)
    }

    /// Guard that fails undeclared reads
    #[must_use]
    pub fn verifying() -> Self {
        Self::new(AccessMode::Verifying)
    }

    /// The guard's access mode
    #[must_use]
    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Register the declared columns of a logical table, extending any
    /// earlier declaration (split unions build up across calls)
    pub fn declare_table<I, S>(&mut self, table: &str, columns: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set = self.declared.entry(table.to_string()).or_default();
        set.extend(columns.into_iter().map(Into::into));
    }

    /// Allow-list a synthetic column name that no physical schema declares
    pub fn allow_synthetic<S: Into<String>>(&mut self, name: S) {
        self.synthetic.insert(name.into());
    }

    /// Read a column through the guard.
    ///
    /// # Errors
    /// In verifying mode, reading a column that is neither declared for the
    /// table nor allow-listed fails with the declared set in the message.
    pub fn read<'r>(
        &self,
        table: &str,
        row: &'r RawRow,
        column: &str,
    ) -> Result<Option<&'r CellValue>> {
        if self.mode == AccessMode::Verifying && !self.is_declared(table, column) {
            return Err(ProjectionError::UndeclaredColumn {
                table: table.to_string(),
                column: column.to_string(),
                declared: self.declared_names(table),
            });
        }
        Ok(row.get(column))
    }

    /// True when the column is readable on the table without error
    #[must_use]
    pub fn is_declared(&self, table: &str, column: &str) -> bool {
        if self.synthetic.contains(column) {
            return true;
        }
        self.declared
            .get(table)
            .is_some_and(|set| set.contains(column))
    }

    fn declared_names(&self, table: &str) -> String {
        match self.declared.get(table) {
            Some(set) => set.iter().map(String::as_str).sorted().join(", "),
            None => "(table not registered)".to_string(),
        }
    }
}

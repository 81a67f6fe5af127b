//! Row merge across declared split tables.
//!
//! One logical row is reassembled by querying every declared split with the
//! same identifier (shaped by that split's transform) and left-merging the
//! pieces onto the base row. Missing split tables degrade to the base
//! columns; a base miss yields an explicit not-found row rather than an
//! error, so callers can render "unknown" entities.

use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::error::Result;
use crate::mapping::SplitCatalog;
use crate::row::{CellValue, RawRow};
use crate::store::TableStore;

/// A reassembled logical row
#[derive(Debug, Clone)]
pub struct MergedRow {
    /// Merged columns, first occurrence winning on collision
    pub row: RawRow,
    /// False when the base split had no row for the identifier; the row
    /// then carries only the identifier
    pub found: bool,
}

/// Merges split-table rows into logical rows
pub struct RowMerge<'a> {
    store: &'a dyn TableStore,
    splits: &'a SplitCatalog,
}

impl<'a> RowMerge<'a> {
    /// Create a merge engine over a store and split declarations
    pub fn new(store: &'a dyn TableStore, splits: &'a SplitCatalog) -> Self {
        Self { store, splits }
    }

    /// Reassemble the logical row for one identifier.
    ///
    /// # Errors
    /// `UnknownSplitGroup` when the logical table is undeclared, or a store
    /// failure underneath a query. Missing split tables are diagnostics,
    /// not errors.
    pub fn merged_row(
        &self,
        logical: &str,
        id: &CellValue,
        sink: &mut DiagnosticSink,
    ) -> Result<MergedRow> {
        let group = self.splits.resolve(logical)?;
        let mut merged = RawRow::new();
        let mut found = false;

        for (position, split) in group.splits.iter().enumerate() {
            if !self.store.table_exists(&split.table) {
                sink.record(
                    Diagnostic::new(
                        DiagnosticKind::SplitTableMissing,
                        logical,
                        format!("physical table {} absent from store", split.table),
                    )
                    .with_column(&split.join_column),
                );
                if position == 0 {
                    break;
                }
                continue;
            }

            let key = split.transform.apply(id);
            let mut rows = self
                .store
                .rows_where(&split.table, &split.join_column, &key)?;
            if rows.is_empty() {
                if position == 0 {
                    break;
                }
                continue;
            }
            if rows.len() > 1 {
                sink.record(
                    Diagnostic::new(
                        DiagnosticKind::MultipleSplitRows,
                        logical,
                        format!(
                            "{} rows in {} for identifier {}",
                            rows.len(),
                            split.table,
                            key.id_text()
                        ),
                    )
                    .with_column(&split.join_column),
                );
            }

            if position == 0 {
                found = true;
            }
            let row = rows.swap_remove(0);
            for (column, value) in row.iter() {
                if merged.insert(column.to_string(), value.clone()) {
                    continue;
                }
                // join columns repeat across splits; not collisions
                if column == split.join_column {
                    log::debug!("Join column {column} repeats in {} for {logical}", split.table);
                } else {
                    sink.record(
                        Diagnostic::new(
                            DiagnosticKind::ColumnCollision,
                            logical,
                            format!("value from {} shadowed, first occurrence kept", split.table),
                        )
                        .with_column(column),
                    );
                }
            }
        }

        if !found {
            let base = group.base();
            let mut row = RawRow::new();
            row.insert(base.join_column.clone(), base.transform.apply(id));
            return Ok(MergedRow { row, found: false });
        }

        Ok(MergedRow { row: merged, found })
    }
}

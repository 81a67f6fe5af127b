//! Patient-scope enforcement for top-level queries.
//!
//! Every root-table query is filtered to one subject, either directly
//! through the table's own subject column or through a declared bridge
//! join. There is no unscoped path: a table with neither declaration is a
//! configuration error. The single fallback (bridge table absent from the
//! extract) degrades to an unfiltered read and is recorded, which is only
//! sound because extracts are produced per subject.

use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::error::{ProjectionError, Result};
use crate::mapping::MappingCatalog;
use crate::row::{CellValue, RawRow};
use crate::store::TableStore;
use rustc_hash::FxHashSet;

/// Subject-scoped query layer over the staging store
pub struct ScopeGuard<'a> {
    store: &'a dyn TableStore,
    catalog: &'a MappingCatalog,
}

impl<'a> ScopeGuard<'a> {
    /// Create a guard over a store and catalog
    pub fn new(store: &'a dyn TableStore, catalog: &'a MappingCatalog) -> Self {
        Self { store, catalog }
    }

    /// Base-table rows of `table` that belong to `subject`.
    ///
    /// # Errors
    /// `UnscopedTable` when the table declares neither a subject column nor
    /// a bridge; store failures propagate.
    pub fn subject_rows(
        &self,
        table: &str,
        subject: &CellValue,
        sink: &mut DiagnosticSink,
    ) -> Result<Vec<RawRow>> {
        let spec = self
            .catalog
            .table(table)
            .ok_or_else(|| ProjectionError::UnscopedTable {
                table: table.to_string(),
            })?;

        let base = self.catalog.splits().resolve(table)?.base().clone();
        if !self.store.table_exists(&base.table) {
            sink.record(Diagnostic::new(
                DiagnosticKind::SplitTableMissing,
                table,
                format!("base table {} absent from store", base.table),
            ));
            return Ok(Vec::new());
        }

        if let Some(subject_column) = &spec.subject_column {
            return self.store.rows_where(&base.table, subject_column, subject);
        }

        let Some(bridge) = self.catalog.bridge(table) else {
            return Err(ProjectionError::UnscopedTable {
                table: table.to_string(),
            });
        };

        if !self.store.table_exists(&bridge.bridge_table) {
            sink.record(Diagnostic::new(
                DiagnosticKind::BridgeFallback,
                table,
                format!(
                    "bridge table {} absent, reading {} unfiltered (single-subject extract)",
                    bridge.bridge_table, base.table
                ),
            ));
            return self.store.scan(&base.table);
        }

        // Two-step join: subject -> bridge rows -> entity rows, preserving
        // bridge row order and deduplicating repeated entity identifiers.
        let bridge_rows =
            self.store
                .rows_where(&bridge.bridge_table, &bridge.subject_column, subject)?;
        let mut seen = FxHashSet::default();
        let mut rows = Vec::new();
        for bridge_row in &bridge_rows {
            let Some(entity_id) = bridge_row.get(&bridge.entity_column) else {
                continue;
            };
            if entity_id.is_null() || !seen.insert(entity_id.id_text()) {
                continue;
            }
            rows.extend(
                self.store
                    .rows_where(&base.table, &bridge.entity_column, entity_id)?,
            );
        }
        Ok(rows)
    }
}

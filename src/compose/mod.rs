//! Subject record composition.
//!
//! Composition walks the catalog's root tables for one subject: scope the
//! base rows, merge each identity's splits into a logical row, attach
//! ordered child collections, and carry cross-references as typed fields
//! instead of nesting them. Contact indexing and parent-chain resolution
//! run afterwards over the finished graph.

pub mod chain;
pub mod contact;
pub mod entity;

pub use chain::ChainResolver;
pub use contact::{ContactIndex, HEURISTIC_BASIS, HeuristicLink, heuristic_history_links};
pub use entity::{
    ChildCollection, EntityId, LogicalEntity, ProvenanceField, ReferenceField, SubjectGraph,
};

use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::error::{ProjectionError, Result};
use crate::mapping::{MappingCatalog, TableSpec};
use crate::mapping::relation::RelationshipKind;
use crate::merge::{MergedRow, RowMerge};
use crate::row::{CellValue, RawRow};
use crate::row::guard::ColumnGuard;
use crate::scope::ScopeGuard;
use crate::store::TableStore;
use crate::utils::order::sequence_ordering;

/// Hard bound on nested child composition; a catalog needing more is
/// misdeclared
const MAX_COMPOSE_DEPTH: usize = 32;

/// Composes one subject's record graph from a staged extract
pub struct Composer<'a> {
    store: &'a dyn TableStore,
    catalog: &'a MappingCatalog,
    guard: &'a ColumnGuard,
    scope: ScopeGuard<'a>,
    merge: RowMerge<'a>,
}

impl<'a> Composer<'a> {
    pub fn new(
        store: &'a dyn TableStore,
        catalog: &'a MappingCatalog,
        guard: &'a ColumnGuard,
    ) -> Self {
        Self {
            store,
            catalog,
            guard,
            scope: ScopeGuard::new(store, catalog),
            merge: RowMerge::new(store, catalog.splits()),
        }
    }

    /// Compose the record graph for one subject.
    ///
    /// Root tables project in catalog order. A configuration problem in one
    /// table skips that table with a diagnostic; the rest still project.
    ///
    /// # Errors
    /// Store failures and guard violations abort the subject.
    pub fn compose(&self, subject: &str, sink: &mut DiagnosticSink) -> Result<SubjectGraph> {
        let mut graph = SubjectGraph::new(subject);
        let subject_cell = CellValue::Text(subject.to_string());
        for root in self.catalog.root_tables() {
            if let Err(err) = self.compose_root(root, &subject_cell, &mut graph, sink) {
                if err.is_table_scoped() {
                    sink.record(Diagnostic::new(
                        DiagnosticKind::TableSkipped,
                        &root.table,
                        err.to_string(),
                    ));
                } else {
                    return Err(err);
                }
            }
        }
        Ok(graph)
    }

    fn compose_root(
        &self,
        spec: &TableSpec,
        subject: &CellValue,
        graph: &mut SubjectGraph,
        sink: &mut DiagnosticSink,
    ) -> Result<()> {
        let rows = self.scope.subject_rows(&spec.table, subject, sink)?;
        for (ordinal, row) in rows.into_iter().enumerate() {
            match self.identity_cell(spec, &row)? {
                Some(id) => {
                    let entity_id = EntityId::new(spec.table.clone(), id.id_text());
                    let seen = graph.slot(&entity_id).is_some();
                    let slot = self.compose_entity(&spec.table, &id, graph, sink, 0)?;
                    if !seen {
                        graph.add_root(slot);
                    }
                }
                None => {
                    let synthetic = format!("{}#{}", subject.id_text(), ordinal + 1);
                    let slot = self.compose_inline(&spec.table, synthetic, row, graph)?;
                    graph.add_root(slot);
                }
            }
        }
        Ok(())
    }

    fn identity_cell(&self, spec: &TableSpec, row: &RawRow) -> Result<Option<CellValue>> {
        let Some(column) = &spec.identity_column else {
            return Ok(None);
        };
        Ok(self
            .guard
            .read(&spec.table, row, column)?
            .filter(|c| !c.is_null())
            .cloned())
    }

    /// Compose an identity-bearing entity, reusing it when already in the
    /// graph. The merged row is reassembled from the identity so the entity
    /// is the same no matter which path reached it first.
    fn compose_entity(
        &self,
        table: &str,
        id: &CellValue,
        graph: &mut SubjectGraph,
        sink: &mut DiagnosticSink,
        depth: usize,
    ) -> Result<usize> {
        let entity_id = EntityId::new(table.to_string(), id.id_text());
        if let Some(slot) = graph.slot(&entity_id) {
            return Ok(slot);
        }
        if depth > MAX_COMPOSE_DEPTH {
            return Err(ProjectionError::InvalidCatalog(format!(
                "child nesting deeper than {MAX_COMPOSE_DEPTH} at {table}"
            )));
        }
        let MergedRow { row, found } = self.merge.merged_row(table, id, sink)?;
        let children = self.compose_children(table, id, graph, sink, depth)?;
        let (references, provenance) = self.reference_fields(table, &row)?;
        Ok(graph.push_entity(LogicalEntity {
            table: table.to_string(),
            id: entity_id,
            row,
            found,
            children,
            references,
            provenance,
        }))
    }

    /// Compose an identity-less row under a synthetic identifier; such
    /// entities never have children of their own.
    fn compose_inline(
        &self,
        table: &str,
        synthetic_id: String,
        row: RawRow,
        graph: &mut SubjectGraph,
    ) -> Result<usize> {
        let (references, provenance) = self.reference_fields(table, &row)?;
        Ok(graph.push_entity(LogicalEntity {
            table: table.to_string(),
            id: EntityId::new(table.to_string(), synthetic_id),
            row,
            found: true,
            children: Vec::new(),
            references,
            provenance,
        }))
    }

    fn compose_children(
        &self,
        table: &str,
        parent_id: &CellValue,
        graph: &mut SubjectGraph,
        sink: &mut DiagnosticSink,
        depth: usize,
    ) -> Result<Vec<ChildCollection>> {
        let mut collections = Vec::new();
        for child in self.catalog.children_of(table) {
            let base = self.catalog.splits().resolve(&child.table)?.base();
            if !self.store.table_exists(&base.table) {
                sink.record(Diagnostic::new(
                    DiagnosticKind::MissingChildTable,
                    &child.table,
                    format!("physical table {} absent", base.table),
                ));
                collections.push(ChildCollection {
                    name: child.attach_as.clone(),
                    table: child.table.clone(),
                    members: Vec::new(),
                });
                continue;
            }
            let mut rows = self
                .store
                .rows_where(&base.table, &child.foreign_key, parent_id)?;
            if let Some(order_column) = &child.order_by {
                let mut keyed: Vec<(Option<CellValue>, RawRow)> = Vec::with_capacity(rows.len());
                for row in rows {
                    let key = self.guard.read(&child.table, &row, order_column)?.cloned();
                    keyed.push((key, row));
                }
                keyed.sort_by(|a, b| sequence_ordering(a.0.as_ref(), b.0.as_ref()));
                rows = keyed.into_iter().map(|(_, row)| row).collect();
            }

            let identity_column = self
                .catalog
                .table(&child.table)
                .and_then(|s| s.identity_column.as_deref());
            let mut members = Vec::with_capacity(rows.len());
            for (ordinal, row) in rows.into_iter().enumerate() {
                let identity = match identity_column {
                    Some(column) => self
                        .guard
                        .read(&child.table, &row, column)?
                        .filter(|c| !c.is_null())
                        .cloned(),
                    None => None,
                };
                let slot = match identity {
                    Some(cell) => {
                        self.compose_entity(&child.table, &cell, graph, sink, depth + 1)?
                    }
                    None => {
                        let synthetic = format!("{}#{}", parent_id.id_text(), ordinal + 1);
                        self.compose_inline(&child.table, synthetic, row, graph)?
                    }
                };
                members.push(slot);
            }
            collections.push(ChildCollection {
                name: child.attach_as.clone(),
                table: child.table.clone(),
                members,
            });
        }
        Ok(collections)
    }

    fn reference_fields(
        &self,
        table: &str,
        row: &RawRow,
    ) -> Result<(Vec<ReferenceField>, Vec<ProvenanceField>)> {
        let mut references = Vec::new();
        let mut provenance = Vec::new();
        for spec in self.catalog.relationships().for_table(table) {
            match spec.kind {
                RelationshipKind::StructuralChild => {}
                RelationshipKind::CrossReference => {
                    if let Some(value) = self
                        .guard
                        .read(table, row, &spec.column)?
                        .filter(|c| !c.is_null())
                    {
                        references.push(ReferenceField {
                            column: spec.column.clone(),
                            target: spec.target.clone(),
                            value: value.clone(),
                            meaning: spec.meaning.clone(),
                        });
                    }
                }
                RelationshipKind::ProvenanceStamp => {
                    if let Some(value) = self
                        .guard
                        .read(table, row, &spec.column)?
                        .filter(|c| !c.is_null())
                    {
                        provenance.push(ProvenanceField {
                            column: spec.column.clone(),
                            value: value.clone(),
                            meaning: spec.meaning.clone(),
                        });
                    }
                }
            }
        }
        Ok((references, provenance))
    }
}

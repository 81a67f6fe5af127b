//! Parent-chain resolution for order-shaped entities.
//!
//! A parent order and its instantiated child are distinct identities that
//! may sit on different contacts, with result rows keyed by the child. The
//! resolver walks the link table upward until no further parent exists and
//! merges the child's result collection into the ultimate parent's, so
//! results are visible from the order actually reasoned about. A visited
//! set bounds the walk; a cycle abandons resolution for that one order.

use rustc_hash::FxHashSet;
use smallvec::{SmallVec, smallvec};

use crate::compose::entity::{ChildCollection, EntityId, SubjectGraph};
use crate::config::{ChainResults, EngineConfig};
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::error::Result;
use crate::mapping::{ChainSpec, MappingCatalog};
use crate::row::CellValue;
use crate::store::TableStore;

/// Walks configured parent chains over a composed graph
pub struct ChainResolver<'a> {
    store: &'a dyn TableStore,
    catalog: &'a MappingCatalog,
    config: &'a EngineConfig,
}

impl<'a> ChainResolver<'a> {
    pub fn new(
        store: &'a dyn TableStore,
        catalog: &'a MappingCatalog,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            store,
            catalog,
            config,
        }
    }

    /// Resolve every configured chain.
    ///
    /// # Errors
    /// Fails only on store query errors; integrity problems in the link
    /// data surface as diagnostics.
    pub fn resolve(&self, graph: &mut SubjectGraph, sink: &mut DiagnosticSink) -> Result<()> {
        for spec in self.catalog.chain_specs() {
            self.resolve_chain(spec, graph, sink)?;
        }
        Ok(())
    }

    fn resolve_chain(
        &self,
        spec: &ChainSpec,
        graph: &mut SubjectGraph,
        sink: &mut DiagnosticSink,
    ) -> Result<()> {
        if !self.store.table_exists(&spec.link_table) {
            sink.record(Diagnostic::new(
                DiagnosticKind::MissingChildTable,
                &spec.table,
                format!("link table {} absent, parent chains unresolved", spec.link_table),
            ));
            return Ok(());
        }
        let Some(identity_column) = self
            .catalog
            .table(&spec.table)
            .and_then(|t| t.identity_column.clone())
        else {
            return Ok(());
        };

        let members: Vec<(usize, CellValue)> = graph
            .entities()
            .enumerate()
            .filter(|(_, e)| e.table == spec.table)
            .filter_map(|(slot, e)| e.row.get(&identity_column).map(|c| (slot, c.clone())))
            .collect();

        let mut moves: Vec<(usize, usize)> = Vec::new();
        for (slot, identity) in members {
            let Some(parent) = self.ultimate_parent(spec, &identity, sink)? else {
                continue;
            };
            let parent_id = EntityId::new(spec.table.clone(), parent.id_text());
            let Some(parent_slot) = graph.slot(&parent_id) else {
                sink.record(
                    Diagnostic::new(
                        DiagnosticKind::UnresolvedReference,
                        &spec.table,
                        format!("chain parent {parent_id} is not in the subject graph"),
                    )
                    .with_column(&spec.parent_column),
                );
                continue;
            };
            if parent_slot != slot {
                moves.push((slot, parent_slot));
            }
        }

        // Snapshot every moving collection before touching any of them, so
        // a mid-chain order never re-donates results it just received.
        let snapshots: Vec<(usize, usize, String, Vec<usize>)> = moves
            .iter()
            .filter_map(|&(child, parent)| {
                graph
                    .entity_at(child)
                    .and_then(|e| e.collection(&spec.results_attach_as))
                    .filter(|c| !c.members.is_empty())
                    .map(|c| (child, parent, c.table.clone(), c.members.clone()))
            })
            .collect();

        for (child, parent, table, result_slots) in snapshots {
            let parent_entity = graph.entity_at_mut(parent);
            match parent_entity
                .children
                .iter_mut()
                .find(|c| c.name == spec.results_attach_as)
            {
                Some(collection) => collection.members.extend(&result_slots),
                None => parent_entity.children.push(ChildCollection {
                    name: spec.results_attach_as.clone(),
                    table,
                    members: result_slots,
                }),
            }
            if self.config.chain_results == ChainResults::ParentOnly {
                if let Some(collection) = graph
                    .entity_at_mut(child)
                    .children
                    .iter_mut()
                    .find(|c| c.name == spec.results_attach_as)
                {
                    collection.members.clear();
                }
            }
        }
        Ok(())
    }

    /// Follow the link table upward from one identity.
    ///
    /// Returns the last reachable ancestor, `None` when the entity has no
    /// parent or the walk was abandoned on a cycle or the depth bound.
    fn ultimate_parent(
        &self,
        spec: &ChainSpec,
        start: &CellValue,
        sink: &mut DiagnosticSink,
    ) -> Result<Option<CellValue>> {
        let mut visited = FxHashSet::default();
        visited.insert(start.id_text());
        let mut path: SmallVec<[String; 8]> = smallvec![start.id_text()];
        let mut current = start.clone();
        let mut ancestor: Option<CellValue> = None;

        loop {
            if path.len() > self.config.max_chain_depth {
                sink.record(Diagnostic::new(
                    DiagnosticKind::ChainCycle,
                    &spec.table,
                    format!(
                        "depth limit {} exceeded walking {}",
                        self.config.max_chain_depth,
                        path.join(" -> ")
                    ),
                ));
                return Ok(None);
            }
            let links = self
                .store
                .rows_where(&spec.link_table, &spec.child_column, &current)?;
            let Some(parent_cell) = links
                .iter()
                .find_map(|row| row.get(&spec.parent_column).filter(|c| !c.is_null()))
            else {
                break;
            };
            if links.len() > 1 {
                log::debug!(
                    "{} link rows in {} for child {}",
                    links.len(),
                    spec.link_table,
                    current.id_text()
                );
            }
            let key = parent_cell.id_text();
            if !visited.insert(key.clone()) {
                path.push(key);
                sink.record(Diagnostic::new(
                    DiagnosticKind::ChainCycle,
                    &spec.table,
                    format!("link cycle {}", path.join(" -> ")),
                ));
                return Ok(None);
            }
            path.push(key);
            ancestor = Some(parent_cell.clone());
            current = parent_cell.clone();
        }
        Ok(ancestor)
    }
}

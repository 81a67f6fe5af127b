//! The subject projection pipeline.
//!
//! `SubjectProjector` runs the stages for one subject in order: compose the
//! entity graph from scoped, split-merged rows; resolve parent-order
//! chains; index contact identities and check every cross-reference; then
//! derive heuristic history links when enabled. Batch entry points fan
//! subjects across the rayon pool or a tokio runtime; each subject is
//! independent and output order always matches input order.

pub mod verify;

pub use verify::{VerificationReport, Verifier};

use std::sync::Arc;
use std::time::Instant;

use indicatif::ParallelProgressIterator;
use rayon::prelude::*;
use serde::Serialize;

use crate::compose::{
    ChainResolver, Composer, ContactIndex, HeuristicLink, SubjectGraph, heuristic_history_links,
};
use crate::config::EngineConfig;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::error::Result;
use crate::mapping::MappingCatalog;
use crate::row::guard::ColumnGuard;
use crate::schema::SchemaRegistry;
use crate::store::TableStore;
use crate::utils::progress::create_projection_progress_bar;

/// One subject's fully projected record
#[derive(Debug, Serialize)]
pub struct SubjectRecord {
    /// Subject identifier the record was projected for
    pub subject: String,
    /// The composed entity graph
    pub graph: SubjectGraph,
    /// Contact identity index over the graph
    pub contacts: ContactIndex,
    /// Heuristic same-day/provider pairings, present only when derived
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub heuristic_links: Vec<HeuristicLink>,
    /// Everything observed while projecting, in observation order
    pub diagnostics: Vec<Diagnostic>,
}

/// Projects subject records from a staged extract
#[derive(Debug, Clone)]
pub struct SubjectProjector {
    registry: Arc<SchemaRegistry>,
    catalog: Arc<MappingCatalog>,
    config: EngineConfig,
    guard: ColumnGuard,
}

impl SubjectProjector {
    /// Build a projector over a registry snapshot and mapping catalog.
    ///
    /// The column guard is assembled here once: every logical table's
    /// declared set is the union of its split tables' schema columns, and
    /// the catalog's synthetic names are allow-listed. Verification mode in
    /// the config turns the guard on.
    #[must_use]
    pub fn new(
        registry: Arc<SchemaRegistry>,
        catalog: Arc<MappingCatalog>,
        config: EngineConfig,
    ) -> Self {
        let guard = build_guard(&registry, &catalog, &config);
        Self {
            registry,
            catalog,
            config,
            guard,
        }
    }

    /// The registry snapshot this projector reads types from
    #[must_use]
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// The mapping catalog driving composition
    #[must_use]
    pub fn catalog(&self) -> &MappingCatalog {
        &self.catalog
    }

    /// The engine configuration
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Project the record of one subject.
    ///
    /// # Errors
    /// Store failures, guard violations in verifying mode, and
    /// subject-fatal configuration faults abort the projection. Per-table
    /// configuration faults and integrity findings land in the record's
    /// diagnostics instead.
    pub fn project(&self, store: &dyn TableStore, subject: &str) -> Result<SubjectRecord> {
        let start = Instant::now();
        let mut sink = DiagnosticSink::new();

        let composer = Composer::new(store, &self.catalog, &self.guard);
        let mut graph = composer.compose(subject, &mut sink)?;

        let resolver = ChainResolver::new(store, &self.catalog, &self.config);
        resolver.resolve(&mut graph, &mut sink)?;

        let contacts = ContactIndex::build(&graph, &self.catalog);
        contacts.validate(&graph, &self.catalog, &mut sink);

        let heuristic_links = if self.config.heuristic_history_links {
            heuristic_history_links(&graph, &self.catalog, &contacts)
        } else {
            Vec::new()
        };

        log::debug!(
            "Projected subject {} in {:?}: {} entities, {} diagnostics",
            subject,
            start.elapsed(),
            graph.len(),
            sink.len()
        );
        Ok(SubjectRecord {
            subject: subject.to_string(),
            graph,
            contacts,
            heuristic_links,
            diagnostics: sink.into_records(),
        })
    }

    /// Project many subjects across the rayon pool.
    ///
    /// Output order matches input order regardless of which worker finished
    /// first.
    ///
    /// # Errors
    /// The first subject-fatal error aborts the batch.
    pub fn project_many(
        &self,
        store: &dyn TableStore,
        subjects: &[String],
    ) -> Result<Vec<SubjectRecord>> {
        let start = Instant::now();
        log::info!("Projecting {} subjects", subjects.len());

        let bar = create_projection_progress_bar(subjects.len() as u64, Some("Projecting subjects"));
        let results: Vec<Result<SubjectRecord>> = subjects
            .par_iter()
            .progress_with(bar)
            .map(|subject| self.project(store, subject))
            .collect();

        let mut records = Vec::with_capacity(results.len());
        for result in results {
            records.push(result?);
        }
        log::info!(
            "Projected {} subjects in {:?}",
            records.len(),
            start.elapsed()
        );
        Ok(records)
    }

    /// Project many subjects from async code.
    ///
    /// Projection is CPU-bound, so the batch moves onto the blocking pool
    /// and runs through `project_many` there.
    ///
    /// # Errors
    /// The first subject-fatal error aborts the batch.
    pub async fn project_many_async(
        &self,
        store: Arc<dyn TableStore>,
        subjects: Vec<String>,
    ) -> Result<Vec<SubjectRecord>> {
        let projector = self.clone();
        tokio::task::spawn_blocking(move || projector.project_many(store.as_ref(), &subjects))
            .await
            .map_err(|e| anyhow::anyhow!("Projection task join error: {e}"))?
    }
}

/// Assemble the column guard for a registry snapshot and catalog
fn build_guard(
    registry: &SchemaRegistry,
    catalog: &MappingCatalog,
    config: &EngineConfig,
) -> ColumnGuard {
    let mut guard = if config.verification {
        ColumnGuard::verifying()
    } else {
        ColumnGuard::trusting()
    };
    for group in catalog.splits().iter() {
        for split in &group.splits {
            if let Some(schema) = registry.get(&split.table) {
                guard.declare_table(&group.logical, schema.column_names());
            }
        }
    }
    for name in catalog.synthetic_columns() {
        guard.allow_synthetic(name.as_str());
    }
    for name in catalog.attach_names() {
        guard.allow_synthetic(name);
    }
    guard
}

//! Extract verification.
//!
//! Verification is the loud mode: the mapping catalog must be consistent
//! with the schema registry, every manifest must classify every populated
//! column of its table, and a full projection pass with the column guard on
//! must touch only declared columns. Drift of any of these fails the run by
//! name. Integrity findings (unresolved references, collisions) stay
//! diagnostics; they describe the extract, not the mapping.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::config::EngineConfig;
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::error::Result;
use crate::mapping::MappingCatalog;
use crate::projector::SubjectProjector;
use crate::schema::SchemaRegistry;
use crate::store::TableStore;

/// Outcome of one verification run
#[derive(Debug, Serialize)]
pub struct VerificationReport {
    /// True when nothing failed
    pub passed: bool,
    /// What failed, one entry per finding
    pub failures: Vec<String>,
    /// Non-fatal observations from the sweep and the projection pass
    pub diagnostics: Vec<Diagnostic>,
}

/// Runs the drift checks over a staged extract
pub struct Verifier {
    registry: Arc<SchemaRegistry>,
    catalog: Arc<MappingCatalog>,
}

impl Verifier {
    /// Build a verifier over a registry snapshot and mapping catalog
    #[must_use]
    pub fn new(registry: Arc<SchemaRegistry>, catalog: Arc<MappingCatalog>) -> Self {
        Self { registry, catalog }
    }

    /// Verify the extract and project every given subject in guarded mode.
    ///
    /// # Errors
    /// Fails only on store access errors; every drift finding lands in the
    /// report instead.
    pub fn verify(&self, store: &dyn TableStore, subjects: &[String]) -> Result<VerificationReport> {
        let start = Instant::now();
        let mut failures = Vec::new();
        let mut sink = DiagnosticSink::new();

        if let Err(err) = self.catalog.validate(&self.registry) {
            failures.push(err.to_string());
        }

        manifest_sweep(&self.catalog, store, &mut sink)?;
        for drift in sink.of_kind(DiagnosticKind::ManifestDrift) {
            failures.push(drift.to_string());
        }

        let projector = SubjectProjector::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.catalog),
            EngineConfig::verifying(),
        );
        for subject in subjects {
            match projector.project(store, subject) {
                Ok(record) => {
                    for diagnostic in record.diagnostics {
                        sink.record(diagnostic);
                    }
                }
                Err(err) => failures.push(format!("projecting subject {subject}: {err}")),
            }
        }

        let passed = failures.is_empty();
        if passed {
            log::info!(
                "Verification passed for {} subjects in {:?}",
                subjects.len(),
                start.elapsed()
            );
        } else {
            log::warn!(
                "Verification failed with {} findings in {:?}",
                failures.len(),
                start.elapsed()
            );
        }
        Ok(VerificationReport {
            passed,
            failures,
            diagnostics: sink.into_records(),
        })
    }
}

/// Check every manifest against the staged data.
///
/// Each populated column missing from both manifest sets records one
/// `ManifestDrift` diagnostic; each manifest entry for a column carrying no
/// data records one `StaleManifestEntry`. Production callers run this once
/// per extract and proceed; verification turns the drift records into
/// failures.
///
/// # Errors
/// Fails when a manifested table cannot be scanned.
pub fn manifest_sweep(
    catalog: &MappingCatalog,
    store: &dyn TableStore,
    sink: &mut DiagnosticSink,
) -> Result<()> {
    for manifest in catalog.manifests() {
        let check = manifest.check(store)?;
        for column in &check.drifted {
            sink.record(
                Diagnostic::new(
                    DiagnosticKind::ManifestDrift,
                    &manifest.table,
                    "populated column missing from both manifest sets",
                )
                .with_column(column),
            );
        }
        for column in &check.stale {
            sink.record(
                Diagnostic::new(
                    DiagnosticKind::StaleManifestEntry,
                    &manifest.table,
                    "manifest entry never carries data in this extract",
                )
                .with_column(column),
            );
        }
    }
    Ok(())
}

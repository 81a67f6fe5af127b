//! Diagnostics stream for projection runs.
//!
//! Expected degradations and detected integrity faults are recorded here,
//! independent of the subject graph itself, so a harness can consume them
//! without scraping log output. Every record is also logged: integrity and
//! drift findings at warn level, expected fallbacks at debug level.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Classification of a single diagnostic record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A later split shadowed an already-merged column; first value kept
    ColumnCollision,
    /// One identifier matched more than one row within a single split
    MultipleSplitRows,
    /// A declared split table is absent from the staging store
    SplitTableMissing,
    /// A declared child table is absent from the staging store
    MissingChildTable,
    /// Bridge table absent; the query ran unfiltered on a one-subject extract
    BridgeFallback,
    /// Populated column missing from both manifest sets
    ManifestDrift,
    /// Manifest entry for a column with no populated data in this extract
    StaleManifestEntry,
    /// Parent-order chain loops back on itself
    ChainCycle,
    /// Cross-reference to a contact identifier absent from the extract
    UnresolvedReference,
    /// Root table skipped because of an isolated configuration error
    TableSkipped,
}

impl DiagnosticKind {
    /// Expected degradations log at debug; integrity findings log at warn
    #[must_use]
    pub fn is_expected(self) -> bool {
        matches!(
            self,
            Self::SplitTableMissing
                | Self::MissingChildTable
                | Self::BridgeFallback
                | Self::StaleManifestEntry
        )
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ColumnCollision => "column_collision",
            Self::MultipleSplitRows => "multiple_split_rows",
            Self::SplitTableMissing => "split_table_missing",
            Self::MissingChildTable => "missing_child_table",
            Self::BridgeFallback => "bridge_fallback",
            Self::ManifestDrift => "manifest_drift",
            Self::StaleManifestEntry => "stale_manifest_entry",
            Self::ChainCycle => "chain_cycle",
            Self::UnresolvedReference => "unresolved_reference",
            Self::TableSkipped => "table_skipped",
        };
        write!(f, "{name}")
    }
}

/// One diagnostic record tied to a table and optionally a column/subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// What was observed
    pub kind: DiagnosticKind,
    /// Logical table the observation concerns
    pub table: String,
    /// Column, when the observation is column-scoped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    /// Human-readable detail (identifiers, counts, reasons)
    pub detail: String,
}

impl Diagnostic {
    /// Create a diagnostic for a table-level observation
    pub fn new<T: Into<String>, D: Into<String>>(kind: DiagnosticKind, table: T, detail: D) -> Self {
        Self {
            kind,
            table: table.into(),
            column: None,
            detail: detail.into(),
        }
    }

    /// Attach the column the observation concerns
    #[must_use]
    pub fn with_column<C: Into<String>>(mut self, column: C) -> Self {
        self.column = Some(column.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.column {
            Some(col) => write!(f, "[{}] {}.{}: {}", self.kind, self.table, col, self.detail),
            None => write!(f, "[{}] {}: {}", self.kind, self.table, self.detail),
        }
    }
}

/// Ordered collector for the diagnostics of one projection run
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    records: Vec<Diagnostic>,
}

impl DiagnosticSink {
    /// Create an empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic and log it at the level its kind calls for
    pub fn record(&mut self, diagnostic: Diagnostic) {
        if diagnostic.kind.is_expected() {
            log::debug!("{diagnostic}");
        } else {
            log::warn!("{diagnostic}");
        }
        self.records.push(diagnostic);
    }

    /// Number of records collected so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when nothing has been recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records of a given kind
    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.records.iter().filter(move |d| d.kind == kind)
    }

    /// Borrow the collected records
    #[must_use]
    pub fn records(&self) -> &[Diagnostic] {
        &self.records
    }

    /// Consume the sink, yielding the records in recording order
    #[must_use]
    pub fn into_records(self) -> Vec<Diagnostic> {
        self.records
    }
}

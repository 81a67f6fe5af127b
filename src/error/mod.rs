//! Error types for the EHI projection engine.
//!
//! One crate-wide error enum covers configuration faults, integrity faults
//! detected while composing a subject graph, and the I/O layers underneath
//! the staging store. Expected degradations (missing split tables, bridge
//! fallbacks) are not errors; they surface as diagnostics instead.

use arrow::error::ArrowError;

/// Errors that can occur while projecting subject records
#[derive(Debug, thiserror::Error)]
pub enum ProjectionError {
    /// A logical table was asked for without a declared split group
    #[error("unknown split group for logical table '{0}'")]
    UnknownSplitGroup(String),

    /// An identifier column was read without a relationship classification
    #[error("no relationship classification for {table}.{column}")]
    UnclassifiedColumn {
        /// Logical table owning the column
        table: String,
        /// The unclassified column
        column: String,
    },

    /// A root table has neither a subject column nor a bridge declaration
    #[error("table '{table}' has no subject scope: no subject column and no bridge")]
    UnscopedTable {
        /// The unscoped table
        table: String,
    },

    /// Verifying-mode read of a column the schema registry does not declare
    #[error("read of undeclared column '{column}' on table '{table}' (declared: {declared})")]
    UndeclaredColumn {
        /// Logical table the read targeted
        table: String,
        /// The undeclared column
        column: String,
        /// Declared column names, for the failure message
        declared: String,
    },

    /// Populated columns missing from both the mapped and skipped manifest sets
    #[error("manifest drift on table '{table}': unclassified populated columns [{columns}]")]
    ManifestDrift {
        /// The drifting table
        table: String,
        /// Comma-joined column names
        columns: String,
    },

    /// Mapping catalog inconsistent with the schema registry
    #[error("mapping catalog invalid: {0}")]
    InvalidCatalog(String),

    /// Schema registry file could not be interpreted
    #[error("schema error: {0}")]
    SchemaError(String),

    /// Staging store failure outside plain I/O
    #[error("store error: {0}")]
    StoreError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Parquet error
    #[error("Parquet error: {0}")]
    ParquetError(#[from] parquet::errors::ParquetError),

    /// Arrow error
    #[error("Arrow error: {0}")]
    ArrowError(#[from] ArrowError),

    /// Wrapped contextual error from the I/O helpers
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Alias for Result with `ProjectionError`
pub type Result<T> = std::result::Result<T, ProjectionError>;

impl ProjectionError {
    /// Create a store error with a formatted message
    pub fn store<S: Into<String>>(msg: S) -> Self {
        Self::StoreError(msg.into())
    }

    /// Create a schema error with a formatted message
    pub fn schema<S: Into<String>>(msg: S) -> Self {
        Self::SchemaError(msg.into())
    }

    /// True when the error is a per-table configuration fault that should
    /// skip the affected table and leave the rest of the projection running
    #[must_use]
    pub fn is_table_scoped(&self) -> bool {
        matches!(
            self,
            Self::UnknownSplitGroup(_)
                | Self::UnclassifiedColumn { .. }
                | Self::UnscopedTable { .. }
        )
    }
}
